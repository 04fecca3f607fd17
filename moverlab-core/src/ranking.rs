//! Trailing-window performance ranking.
//!
//! One batched close retrieval covers every symbol. Each symbol's percent
//! change runs from the first to the last valid close in the fetched range;
//! symbols without at least two closes, or whose retrieval failed, get an
//! undefined record instead of aborting the ranking.

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::data::{CloseBatch, DataError, DateRange, QuoteFeed};
use crate::domain::{
    sort_records, PercentChange, PerformanceRecord, TickerSymbol, UndefinedReason,
};

#[derive(Debug, Error)]
pub enum RankError {
    #[error("quote feed failed: {0}")]
    Feed(#[from] DataError),

    /// The listing feed failed while resolving the universe to rank.
    #[error("listing feed failed: {0}")]
    Universe(DataError),

    #[error(
        "invalid window: window_days={window_days}, lookback_buffer_days={lookback_buffer_days}"
    )]
    InvalidWindow {
        window_days: u32,
        lookback_buffer_days: u32,
    },
}

/// Window parameters for a ranking pass.
///
/// `window_days` is the nominal performance window shown to users; the
/// fetched range is `lookback_buffer_days` so that weekends and holidays
/// still leave roughly a month of sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RankOptions {
    pub window_days: u32,
    pub lookback_buffer_days: u32,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            window_days: 30,
            lookback_buffer_days: 35,
        }
    }
}

impl RankOptions {
    pub fn validate(&self) -> Result<(), RankError> {
        if self.window_days == 0 || self.lookback_buffer_days < self.window_days {
            return Err(RankError::InvalidWindow {
                window_days: self.window_days,
                lookback_buffer_days: self.lookback_buffer_days,
            });
        }
        Ok(())
    }

    /// `[today - lookback_buffer_days, today)`.
    pub fn range_ending(&self, today: NaiveDate) -> DateRange {
        DateRange::trailing(today, self.lookback_buffer_days)
    }
}

pub struct Ranker<'a> {
    feed: &'a dyn QuoteFeed,
    options: RankOptions,
}

impl<'a> Ranker<'a> {
    pub fn new(feed: &'a dyn QuoteFeed, options: RankOptions) -> Self {
        Self { feed, options }
    }

    pub fn options(&self) -> RankOptions {
        self.options
    }

    /// Rank `symbols` over the window ending today (UTC).
    pub fn rank(&self, symbols: &[TickerSymbol]) -> Result<Vec<PerformanceRecord>, RankError> {
        self.rank_as_of(symbols, Utc::now().date_naive())
    }

    /// Rank `symbols` over the window ending at `today` (exclusive).
    ///
    /// Returns exactly one record per input entry, duplicates included.
    pub fn rank_as_of(
        &self,
        symbols: &[TickerSymbol],
        today: NaiveDate,
    ) -> Result<Vec<PerformanceRecord>, RankError> {
        self.options.validate()?;
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let range = self.options.range_ending(today);
        let span = tracing::info_span!(
            "rank",
            feed = self.feed.name(),
            symbols = symbols.len(),
            start = %range.start,
            end = %range.end
        );
        let _guard = span.enter();

        let batch = self.feed.fetch_closes(symbols, range)?;
        let records = rank_from_batch(symbols, &batch);

        let defined = records.iter().filter(|r| r.change.is_defined()).count();
        tracing::info!(
            total = records.len(),
            defined,
            undefined = records.len() - defined,
            "ranking complete"
        );
        Ok(records)
    }
}

/// Percent change from the first to the last close.
///
/// Fewer than two closes is `InsufficientData`; a non-positive base price is
/// `InvalidBasePrice`.
pub fn percent_change(closes: &[f64]) -> PercentChange {
    let (Some(&first), Some(&last)) = (closes.first(), closes.last()) else {
        return PercentChange::Undefined(UndefinedReason::InsufficientData);
    };
    if closes.len() < 2 {
        return PercentChange::Undefined(UndefinedReason::InsufficientData);
    }
    if first <= 0.0 {
        return PercentChange::Undefined(UndefinedReason::InvalidBasePrice);
    }
    let pct = (last - first) / first * 100.0;
    if pct.is_finite() {
        PercentChange::Defined(pct)
    } else {
        PercentChange::Undefined(UndefinedReason::MalformedData)
    }
}

/// Build sorted records for `symbols` from an already-fetched batch.
pub fn rank_from_batch(symbols: &[TickerSymbol], batch: &CloseBatch) -> Vec<PerformanceRecord> {
    let mut records: Vec<PerformanceRecord> = symbols
        .iter()
        .map(|symbol| {
            let change = match batch.get(symbol) {
                Some(Ok(series)) => percent_change(&series.valid_closes()),
                Some(Err(e)) => {
                    tracing::debug!(%symbol, error = %e, "no closes for symbol");
                    PercentChange::Undefined(e.undefined_reason())
                }
                None => PercentChange::Undefined(UndefinedReason::Missing),
            };
            PerformanceRecord {
                symbol: symbol.clone(),
                change,
            }
        })
        .collect();
    sort_records(&mut records);
    records
}
