//! MoverLab Core: ticker universe, batched quotes, performance ranking, views, IPO calendar.
//!
//! This crate contains everything behind the movers dashboard:
//! - Domain types (ticker symbols, exchange selectors, performance records, IPO entries)
//! - Listing, quote and IPO calendar feeds behind traits, with HTTP implementations
//! - Universe resolution from the NASDAQ Trader symbol directory
//! - Trailing-window percent-change ranking over one batched quote retrieval
//! - Winners/losers/pagination views and a memoizing service facade

pub mod cache;
pub mod config;
pub mod data;
pub mod domain;
pub mod logging;
pub mod ranking;
pub mod service;
pub mod universe;
pub mod views;

pub use config::{ConfigError, MoverLabConfig};
pub use data::DataError;
pub use domain::{ExchangeSelector, PercentChange, PerformanceRecord, TickerSymbol};
pub use ranking::{RankError, RankOptions, Ranker};
pub use service::MoversService;
pub use universe::UniverseResolver;
pub use views::{losers, winners, Paginator, ViewError};
