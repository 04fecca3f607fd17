//! Domain types for MoverLab

pub mod exchange;
pub mod ipo;
pub mod record;
pub mod symbol;

pub use exchange::{ExchangeSelector, ListingFile, AMEX_CODE, NYSE_CODE};
pub use ipo::{countries, filter_by_country, CountryFilter, IpoEntry};
pub use record::{sort_records, PercentChange, PerformanceRecord, UndefinedReason};
pub use symbol::{SymbolError, TickerSymbol, HEADER_SENTINEL};
