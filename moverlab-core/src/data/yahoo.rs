//! Yahoo Finance quote feed.
//!
//! Fetches daily closes from Yahoo's v8 chart API. A batch is one call to
//! [`QuoteFeed::fetch_closes`]; inside it the per-symbol chart requests are
//! fanned out over a bounded rayon pool, each with retries and exponential
//! backoff, all sharing one circuit breaker. The breaker counts failed
//! symbols, not failed attempts.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{
    BatchProgress, CloseBatch, DailyClose, DataError, DateRange, PriceSeries, QuoteFeed,
    TracingProgress,
};
use crate::config::QuoteFeedConfig;
use crate::domain::TickerSymbol;
use chrono::{NaiveDate, NaiveTime};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub struct YahooQuoteFeed {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    pool: rayon::ThreadPool,
    progress: Arc<dyn BatchProgress>,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooQuoteFeed {
    pub fn new(
        config: &QuoteFeedConfig,
        circuit_breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallelism.max(1))
            .thread_name(|i| format!("quote-fetch-{i}"))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build fetch pool: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            pool,
            progress: Arc::new(TracingProgress),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn BatchProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Chart URL for `[start, end)`: Yahoo treats `period2` as exclusive.
    fn chart_url(base_url: &str, symbol: &TickerSymbol, range: DateRange) -> String {
        let start_ts = midnight_utc(range.start);
        let end_ts = midnight_utc(range.end);
        format!(
            "{base_url}/v8/finance/chart/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d&events=history"
        )
    }

    /// Parse a chart payload into daily closes.
    ///
    /// A result without timestamps means no sessions in range; that is an
    /// empty series, not an error.
    fn parse_chart(symbol: &TickerSymbol, body: &str) -> Result<PriceSeries, DataError> {
        let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse chart for {symbol}: {e}"))
        })?;

        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let Some(timestamps) = data.timestamp else {
            return Ok(PriceSeries::new(symbol.clone(), Vec::new()));
        };

        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

        let mut closes = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;
            closes.push(DailyClose {
                date,
                close: quote.close.get(i).copied().flatten(),
            });
        }

        Ok(PriceSeries::new(symbol.clone(), closes))
    }

    /// One symbol's chart requests with retry and circuit breaker logic.
    ///
    /// The breaker sees at most one outcome per symbol: retries of a single
    /// symbol never count as separate failures.
    fn fetch_series(&self, symbol: &TickerSymbol, range: DateRange) -> SymbolOutcome {
        let url = Self::chart_url(&self.base_url, symbol, range);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.base_delay, attempt);
                tracing::debug!(%symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying chart request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return match last_error {
                    Some(err) => SymbolOutcome::requested(Err(err)),
                    None => SymbolOutcome::refused(),
                };
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) => {
                    let err = DataError::from_reqwest(e, symbol.as_str());
                    if err.is_transport() {
                        last_error = Some(err);
                        continue;
                    }
                    return SymbolOutcome::requested(Err(err));
                }
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return SymbolOutcome::requested(Err(DataError::CircuitBreakerTripped));
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                self.circuit_breaker.record_success();
                return SymbolOutcome::requested(Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                }));
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return SymbolOutcome::requested(Err(DataError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                )));
            }

            if !status.is_success() {
                last_error = Some(DataError::HttpStatus {
                    status: status.as_u16(),
                    url: url.clone(),
                });
                continue;
            }

            let result = resp
                .text()
                .map_err(|e| DataError::from_reqwest(e, symbol.as_str()))
                .and_then(|body| Self::parse_chart(symbol, &body));
            if result.is_ok() {
                self.circuit_breaker.record_success();
            }
            return SymbolOutcome::requested(result);
        }

        // Retries exhausted: one failure for this symbol.
        self.circuit_breaker.record_failure();
        SymbolOutcome::requested(Err(last_error
            .unwrap_or_else(|| DataError::Other("max retries exceeded".into()))))
    }
}

/// How one symbol fared inside a batch.
struct SymbolOutcome {
    result: Result<PriceSeries, DataError>,
    /// False when the breaker refused the symbol before any request went out.
    requested: bool,
}

impl SymbolOutcome {
    fn requested(result: Result<PriceSeries, DataError>) -> Self {
        Self {
            result,
            requested: true,
        }
    }

    fn refused() -> Self {
        Self {
            result: Err(DataError::CircuitBreakerTripped),
            requested: false,
        }
    }
}

impl QuoteFeed for YahooQuoteFeed {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_closes(
        &self,
        symbols: &[TickerSymbol],
        range: DateRange,
    ) -> Result<CloseBatch, DataError> {
        if symbols.is_empty() {
            return Ok(CloseBatch::new());
        }
        if !self.circuit_breaker.is_allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let mut seen = HashSet::with_capacity(symbols.len());
        let unique: Vec<&TickerSymbol> = symbols.iter().filter(|s| seen.insert(*s)).collect();
        let total = unique.len();
        let completed = AtomicUsize::new(0);

        tracing::info!(
            symbols = total,
            start = %range.start,
            end = %range.end,
            "fetching daily closes"
        );

        let outcomes: Vec<(TickerSymbol, SymbolOutcome)> = self.pool.install(|| {
            unique
                .par_iter()
                .map(|symbol| {
                    let outcome = self.fetch_series(symbol, range);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    self.progress.on_symbol_complete(
                        symbol,
                        done,
                        total,
                        outcome.result.as_ref().map(|_| ()),
                    );
                    ((*symbol).clone(), outcome)
                })
                .collect()
        });

        let failed = outcomes.iter().filter(|(_, o)| o.result.is_err()).count();
        self.progress
            .on_batch_complete(total - failed, failed, total);

        // The feed is down only when every symbol that actually went out failed
        // at the provider. Symbols the breaker refused say nothing on their own.
        let requested: Vec<&SymbolOutcome> = outcomes
            .iter()
            .map(|(_, o)| o)
            .filter(|o| o.requested)
            .collect();
        if requested.is_empty() {
            return Err(DataError::CircuitBreakerTripped);
        }
        if requested
            .iter()
            .all(|o| matches!(&o.result, Err(e) if e.is_provider_failure()))
        {
            if requested
                .iter()
                .any(|o| matches!(o.result, Err(DataError::CircuitBreakerTripped)))
            {
                return Err(DataError::CircuitBreakerTripped);
            }
            let first = requested
                .iter()
                .find_map(|o| o.result.as_ref().err())
                .map(|e| e.to_string())
                .unwrap_or_default();
            return Err(DataError::NetworkUnreachable(format!(
                "all {} chart requests failed (first error: {first})",
                requested.len()
            )));
        }

        Ok(outcomes
            .into_iter()
            .map(|(symbol, outcome)| (symbol, outcome.result))
            .collect())
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

/// `base * 2^(attempt - 1)`, saturating instead of overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::default()).and_utc().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> TickerSymbol {
        TickerSymbol::parse(s).unwrap()
    }

    #[test]
    fn chart_url_uses_exclusive_midnight_bounds() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        let url = YahooQuoteFeed::chart_url("https://query2.finance.yahoo.com", &sym("SPY"), range);
        assert_eq!(
            url,
            "https://query2.finance.yahoo.com/v8/finance/chart/SPY?period1=1704067200&period2=1704153600&interval=1d&events=history"
        );
    }

    #[test]
    fn parses_closes_and_keeps_gaps() {
        let body = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"open":[1,2,3],"close":[472.65,null,467.28]}]}}],"error":null}}"#;
        let series = YahooQuoteFeed::parse_chart(&sym("SPY"), body).unwrap();
        assert_eq!(series.closes.len(), 3);
        assert_eq!(series.closes[1].close, None);
        assert_eq!(series.valid_closes(), vec![472.65, 467.28]);
        assert_eq!(
            series.closes[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn missing_timestamps_is_an_empty_series() {
        let body = r#"{"chart":{"result":[{"indicators":{"quote":[{}]}}],"error":null}}"#;
        let series = YahooQuoteFeed::parse_chart(&sym("NEWCO"), body).unwrap();
        assert!(series.closes.is_empty());
    }

    #[test]
    fn not_found_error_is_classified() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = YahooQuoteFeed::parse_chart(&sym("GONE"), body).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn garbage_body_is_format_change() {
        let err = YahooQuoteFeed::parse_chart(&sym("SPY"), "<html>oops</html>").unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 40), base * u32::MAX);
        assert_eq!(backoff_delay(Duration::MAX, 2), Duration::MAX);
    }

    #[test]
    fn empty_batch_makes_no_requests() {
        let feed = YahooQuoteFeed::new(
            &QuoteFeedConfig::default(),
            Arc::new(CircuitBreaker::default_provider()),
        )
        .unwrap();
        let range = DateRange::trailing(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), 35);
        let batch = feed.fetch_closes(&[], range).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn tripped_breaker_fails_the_whole_batch() {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        breaker.trip();
        let feed = YahooQuoteFeed::new(&QuoteFeedConfig::default(), breaker).unwrap();
        assert!(!feed.is_available());
        let range = DateRange::trailing(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), 35);
        let err = feed.fetch_closes(&[sym("SPY")], range).unwrap_err();
        assert!(matches!(err, DataError::CircuitBreakerTripped));
    }
}
