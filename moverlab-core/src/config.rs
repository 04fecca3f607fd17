//! TOML configuration for feeds, views and caching.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [feeds]
//! timeout_secs = 30
//!
//! [quotes]
//! parallelism = 8
//! window_days = 30
//! lookback_buffer_days = 35
//!
//! [views]
//! top_n = 10
//! page_size = 25
//! max_tickers = 200
//!
//! [ipo]
//! horizon_days = 7
//!
//! [cache]
//! ttl_secs = 900
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable consulted when `[ipo].api_token` is empty.
pub const IPO_TOKEN_ENV: &str = "FINNHUB_API_KEY";

/// Bounds on `max_tickers`, mirroring the dashboard's slider.
pub const MIN_MAX_TICKERS: usize = 50;
pub const MAX_MAX_TICKERS: usize = 500;

/// Upper bound on `[quotes].max_retries`; the backoff doubles per attempt.
pub const MAX_RETRIES_LIMIT: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoverLabConfig {
    pub feeds: ListingFeedConfig,
    pub quotes: QuoteFeedConfig,
    pub views: ViewsConfig,
    pub ipo: IpoConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingFeedConfig {
    pub nasdaq_listed_url: String,
    pub other_listed_url: String,
    pub timeout_secs: u64,
}

impl Default for ListingFeedConfig {
    fn default() -> Self {
        Self {
            nasdaq_listed_url: "https://www.nasdaqtrader.com/dynamic/SymDir/nasdaqlisted.txt"
                .into(),
            other_listed_url: "https://www.nasdaqtrader.com/dynamic/SymDir/otherlisted.txt"
                .into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteFeedConfig {
    pub base_url: String,
    /// Per-request timeout for chart calls.
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Worker threads for the batched fan-out.
    pub parallelism: usize,
    pub window_days: u32,
    pub lookback_buffer_days: u32,
    pub breaker_cooldown_secs: u64,
    pub breaker_failure_threshold: u32,
}

impl Default for QuoteFeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query2.finance.yahoo.com".into(),
            timeout_secs: 15,
            max_retries: 3,
            retry_base_delay_ms: 500,
            parallelism: 8,
            window_days: 30,
            lookback_buffer_days: 35,
            breaker_cooldown_secs: 30 * 60,
            breaker_failure_threshold: 3,
        }
    }
}

impl QuoteFeedConfig {
    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsConfig {
    pub top_n: usize,
    pub page_size: usize,
    pub max_tickers: usize,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            page_size: 25,
            max_tickers: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpoConfig {
    pub base_url: String,
    /// Left empty in checked-in files; see [`IPO_TOKEN_ENV`].
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    pub horizon_days: u32,
}

impl Default for IpoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://finnhub.io/api/v1".into(),
            api_token: None,
            timeout_secs: 15,
            horizon_days: 7,
        }
    }
}

impl IpoConfig {
    /// File token if set, else the given environment value.
    pub fn resolve_token(&mut self, env_value: Option<String>) {
        let file_token = self
            .api_token
            .take()
            .filter(|t| !t.trim().is_empty());
        self.api_token = file_token.or_else(|| env_value.filter(|t| !t.trim().is_empty()));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `None` keeps entries for the lifetime of the process.
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

impl MoverLabConfig {
    /// Load from a TOML file, validate, and pick up the IPO token from the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.ipo.resolve_token(std::env::var(IPO_TOKEN_ENV).ok());
        Ok(config)
    }

    /// Defaults plus the IPO token from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.ipo.resolve_token(std::env::var(IPO_TOKEN_ENV).ok());
        config
    }

    /// Parse and validate without touching the environment.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let q = &self.quotes;
        if q.window_days == 0 {
            return Err(invalid("quotes.window_days", "must be at least 1"));
        }
        if q.lookback_buffer_days < q.window_days {
            return Err(invalid(
                "quotes.lookback_buffer_days",
                format!("must be >= window_days ({})", q.window_days),
            ));
        }
        if q.max_retries > MAX_RETRIES_LIMIT {
            return Err(invalid(
                "quotes.max_retries",
                format!("must be at most {MAX_RETRIES_LIMIT}"),
            ));
        }
        if q.parallelism == 0 {
            return Err(invalid("quotes.parallelism", "must be at least 1"));
        }
        if q.timeout_secs == 0 || self.feeds.timeout_secs == 0 || self.ipo.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "timeouts must be non-zero"));
        }
        if self.views.page_size == 0 {
            return Err(invalid("views.page_size", "must be at least 1"));
        }
        if !(MIN_MAX_TICKERS..=MAX_MAX_TICKERS).contains(&self.views.max_tickers) {
            return Err(invalid(
                "views.max_tickers",
                format!("must be between {MIN_MAX_TICKERS} and {MAX_MAX_TICKERS}"),
            ));
        }
        if self.ipo.horizon_days == 0 {
            return Err(invalid("ipo.horizon_days", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
