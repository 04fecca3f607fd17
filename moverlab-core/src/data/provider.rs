//! Feed traits and structured error types.
//!
//! The `ListingFeed` and `QuoteFeed` traits abstract over the upstream
//! providers (NASDAQ Trader symbol directory, Yahoo Finance charts) so the
//! resolver and ranker can be exercised against in-memory fakes.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::{ListingFile, TickerSymbol, UndefinedReason};

/// Structured error types for feed operations.
///
/// These are designed to be displayable in CLI output as-is.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: quote provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Map a per-symbol failure onto the reason shown in the movers table.
    pub fn undefined_reason(&self) -> UndefinedReason {
        match self {
            Self::Timeout(_) => UndefinedReason::Timeout,
            Self::RateLimited { .. } => UndefinedReason::RateLimited,
            Self::SymbolNotFound { .. } => UndefinedReason::NotFound,
            Self::ResponseFormatChanged(_) => UndefinedReason::MalformedData,
            Self::NetworkUnreachable(_)
            | Self::CircuitBreakerTripped
            | Self::HttpStatus { .. }
            | Self::AuthenticationRequired(_)
            | Self::Other(_) => UndefinedReason::Network,
        }
    }

    /// Transport-level failures: the provider itself could not be reached.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnreachable(_) | Self::Timeout(_) | Self::CircuitBreakerTripped
        )
    }

    /// Failures that point at the provider rather than the symbol: transport
    /// errors, throttling and server-side 5xx responses.
    pub fn is_provider_failure(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            other => other.is_transport(),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, what: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{what}: {err}"))
        } else if err.is_connect() || err.is_request() {
            Self::NetworkUnreachable(format!("{what}: {err}"))
        } else if err.is_decode() || err.is_body() {
            Self::ResponseFormatChanged(format!("{what}: {err}"))
        } else {
            Self::Other(format!("{what}: {err}"))
        }
    }
}

/// Half-open calendar window `[start, end)` for daily price requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `[end - days, end)`.
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// One daily observation. A `None` close is a session the provider reported
/// without a price (halts, partial rows).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: Option<f64>,
}

/// Date-ordered closing prices for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: TickerSymbol,
    pub closes: Vec<DailyClose>,
}

impl PriceSeries {
    pub fn new(symbol: TickerSymbol, mut closes: Vec<DailyClose>) -> Self {
        closes.sort_by_key(|c| c.date);
        Self { symbol, closes }
    }

    /// Closes with missing and non-finite entries dropped, in date order.
    pub fn valid_closes(&self) -> Vec<f64> {
        self.closes
            .iter()
            .filter_map(|c| c.close)
            .filter(|v| v.is_finite())
            .collect()
    }
}

/// Result of one batched quote retrieval: every requested symbol maps to
/// either its series or the reason it could not be fetched.
#[derive(Debug, Default)]
pub struct CloseBatch {
    entries: HashMap<TickerSymbol, Result<PriceSeries, DataError>>,
}

impl CloseBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: TickerSymbol, result: Result<PriceSeries, DataError>) {
        self.entries.insert(symbol, result);
    }

    pub fn get(&self, symbol: &TickerSymbol) -> Option<&Result<PriceSeries, DataError>> {
        self.entries.get(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.entries.values().filter(|r| r.is_err()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.len() - self.failed()
    }
}

impl FromIterator<(TickerSymbol, Result<PriceSeries, DataError>)> for CloseBatch {
    fn from_iter<I: IntoIterator<Item = (TickerSymbol, Result<PriceSeries, DataError>)>>(
        iter: I,
    ) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// One raw row from a listing file. Both fields may be absent on malformed rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingRow {
    pub symbol: Option<String>,
    pub exchange: Option<String>,
}

/// Source of exchange listing files.
pub trait ListingFeed: Send + Sync {
    /// Human-readable name of this feed.
    fn name(&self) -> &str;

    /// Fetch and parse one listing file.
    fn fetch(&self, file: ListingFile) -> Result<Vec<ListingRow>, DataError>;
}

/// Source of historical daily closes.
///
/// `fetch_closes` is a single batched call: implementations may parallelize
/// internally but must report per-symbol failures inside the returned
/// [`CloseBatch`] and reserve `Err` for failures of the batch as a whole.
pub trait QuoteFeed: Send + Sync {
    /// Human-readable name of this feed.
    fn name(&self) -> &str;

    fn fetch_closes(
        &self,
        symbols: &[TickerSymbol],
        range: DateRange,
    ) -> Result<CloseBatch, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}

/// Progress callback for batched retrievals. Called from worker threads.
pub trait BatchProgress: Send + Sync {
    /// Called when a symbol finishes; `completed` counts finished symbols so far.
    fn on_symbol_complete(
        &self,
        symbol: &TickerSymbol,
        completed: usize,
        total: usize,
        result: Result<(), &DataError>,
    );

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits tracing events.
pub struct TracingProgress;

impl BatchProgress for TracingProgress {
    fn on_symbol_complete(
        &self,
        symbol: &TickerSymbol,
        completed: usize,
        total: usize,
        result: Result<(), &DataError>,
    ) {
        match result {
            Ok(()) => tracing::debug!(%symbol, completed, total, "fetched closes"),
            Err(e) => tracing::debug!(%symbol, completed, total, error = %e, "close fetch failed"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!(succeeded, failed, total, "quote batch complete");
    }
}

/// Progress reporter that draws a single updating line on stderr.
pub struct StderrProgress;

impl BatchProgress for StderrProgress {
    fn on_symbol_complete(
        &self,
        _symbol: &TickerSymbol,
        completed: usize,
        total: usize,
        _result: Result<(), &DataError>,
    ) {
        eprint!("\rFetching prices... {completed}/{total}");
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        eprintln!("\rFetched {succeeded}/{total} symbols ({failed} without data)");
    }
}
