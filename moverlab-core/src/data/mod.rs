//! Upstream data feeds: listing directories, daily quotes, IPO calendar.

pub mod circuit_breaker;
pub mod finnhub;
pub mod listing;
pub mod provider;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use finnhub::{parse_ipo_calendar, IpoCalendarClient};
pub use listing::{parse_listing, NasdaqTraderFeed};
pub use provider::{
    BatchProgress, CloseBatch, DailyClose, DataError, DateRange, ListingFeed, ListingRow,
    PriceSeries, QuoteFeed, StderrProgress, TracingProgress,
};
pub use yahoo::YahooQuoteFeed;
