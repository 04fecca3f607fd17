use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::symbol::TickerSymbol;

/// Why a symbol has no percent-change value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Fewer than two valid closes in the window.
    InsufficientData,
    /// The quote feed returned nothing for the symbol.
    Missing,
    /// The quote feed does not know the symbol.
    NotFound,
    Timeout,
    RateLimited,
    Network,
    /// The per-symbol payload could not be interpreted.
    MalformedData,
    /// First close was zero or negative.
    InvalidBasePrice,
}

impl UndefinedReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InsufficientData => "insufficient data",
            Self::Missing => "missing",
            Self::NotFound => "not found",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate limited",
            Self::Network => "network",
            Self::MalformedData => "malformed data",
            Self::InvalidBasePrice => "invalid base price",
        }
    }
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percent change over the lookback window, or the reason it is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum PercentChange {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl PercentChange {
    pub const fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(*v),
            Self::Undefined(_) => None,
        }
    }

    /// The value, with NaN standing in for undefined.
    pub fn as_f64(&self) -> f64 {
        self.value().unwrap_or(f64::NAN)
    }

    pub const fn is_defined(&self) -> bool {
        matches!(self, Self::Defined(_))
    }

    pub const fn reason(&self) -> Option<UndefinedReason> {
        match self {
            Self::Defined(_) => None,
            Self::Undefined(r) => Some(*r),
        }
    }

    /// Ranking order: defined values descending, every undefined value after them.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Defined(a), Self::Defined(b)) => b.total_cmp(a),
            (Self::Defined(_), Self::Undefined(_)) => Ordering::Less,
            (Self::Undefined(_), Self::Defined(_)) => Ordering::Greater,
            (Self::Undefined(_), Self::Undefined(_)) => Ordering::Equal,
        }
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(v) => write!(f, "{v:+.2}%"),
            Self::Undefined(_) => f.write_str("n/a"),
        }
    }
}

/// One row of the movers table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub symbol: TickerSymbol,
    pub change: PercentChange,
}

impl PerformanceRecord {
    pub fn defined(symbol: TickerSymbol, pct: f64) -> Self {
        Self {
            symbol,
            change: PercentChange::Defined(pct),
        }
    }

    pub fn undefined(symbol: TickerSymbol, reason: UndefinedReason) -> Self {
        Self {
            symbol,
            change: PercentChange::Undefined(reason),
        }
    }
}

/// Stable sort into ranking order.
pub fn sort_records(records: &mut [PerformanceRecord]) {
    records.sort_by(|a, b| a.change.rank_cmp(&b.change));
}
