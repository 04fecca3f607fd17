//! Movers service: owns the feeds and memoizes universe and ranking results.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::cache::{content_key, ContentKey, MemoCache};
use crate::config::MoverLabConfig;
use crate::data::{
    BatchProgress, CircuitBreaker, DataError, ListingFeed, NasdaqTraderFeed, QuoteFeed,
    TracingProgress, YahooQuoteFeed,
};
use crate::domain::{ExchangeSelector, PerformanceRecord, TickerSymbol};
use crate::ranking::{RankError, RankOptions, Ranker};
use crate::universe::{truncate_universe, UniverseResolver};

pub struct MoversService {
    listing_feed: Box<dyn ListingFeed>,
    quote_feed: Box<dyn QuoteFeed>,
    options: RankOptions,
    universe_cache: MemoCache<ExchangeSelector, Vec<TickerSymbol>>,
    ranking_cache: MemoCache<ContentKey, Vec<PerformanceRecord>>,
}

impl MoversService {
    pub fn new(
        listing_feed: Box<dyn ListingFeed>,
        quote_feed: Box<dyn QuoteFeed>,
        options: RankOptions,
        ttl: Option<std::time::Duration>,
    ) -> Self {
        Self {
            listing_feed,
            quote_feed,
            options,
            universe_cache: MemoCache::new(ttl),
            ranking_cache: MemoCache::new(ttl),
        }
    }

    /// Wire up the NASDAQ Trader and Yahoo feeds from configuration.
    pub fn from_config(config: &MoverLabConfig) -> Result<Self, DataError> {
        Self::from_config_with_progress(config, Arc::new(TracingProgress))
    }

    pub fn from_config_with_progress(
        config: &MoverLabConfig,
        progress: Arc<dyn BatchProgress>,
    ) -> Result<Self, DataError> {
        let breaker = Arc::new(CircuitBreaker::new(
            config.quotes.breaker_cooldown(),
            config.quotes.breaker_failure_threshold,
        ));
        let listing = NasdaqTraderFeed::new(&config.feeds)?;
        let quotes = YahooQuoteFeed::new(&config.quotes, breaker)?.with_progress(progress);
        let options = RankOptions {
            window_days: config.quotes.window_days,
            lookback_buffer_days: config.quotes.lookback_buffer_days,
        };
        Ok(Self::new(
            Box::new(listing),
            Box::new(quotes),
            options,
            config.cache.ttl(),
        ))
    }

    pub fn options(&self) -> RankOptions {
        self.options
    }

    pub fn tickers(&self, selector: ExchangeSelector) -> Result<Vec<TickerSymbol>, DataError> {
        self.universe_cache.get_or_try_insert_with(selector, || {
            UniverseResolver::new(self.listing_feed.as_ref()).resolve(selector)
        })
    }

    /// Rank the first `max_tickers` symbols of the selector's universe.
    pub fn performance(
        &self,
        selector: ExchangeSelector,
        max_tickers: usize,
    ) -> Result<Vec<PerformanceRecord>, RankError> {
        let universe = self.tickers(selector).map_err(RankError::Universe)?;
        let universe = truncate_universe(universe, max_tickers);
        self.performance_of(&universe)
    }

    pub fn performance_of(
        &self,
        symbols: &[TickerSymbol],
    ) -> Result<Vec<PerformanceRecord>, RankError> {
        self.performance_as_of(symbols, Utc::now().date_naive())
    }

    /// Rank `symbols` over the window ending at `today`.
    pub fn performance_as_of(
        &self,
        symbols: &[TickerSymbol],
        today: NaiveDate,
    ) -> Result<Vec<PerformanceRecord>, RankError> {
        let key = ranking_key(symbols, self.options, today);
        self.ranking_cache.get_or_try_insert_with(key, || {
            Ranker::new(self.quote_feed.as_ref(), self.options).rank_as_of(symbols, today)
        })
    }

    pub fn quote_feed_available(&self) -> bool {
        self.quote_feed.is_available()
    }

    pub fn clear_cache(&self) {
        self.universe_cache.clear();
        self.ranking_cache.clear();
    }
}

/// Cache key over the ordered symbol list and the date window.
pub fn ranking_key(
    symbols: &[TickerSymbol],
    options: RankOptions,
    today: NaiveDate,
) -> ContentKey {
    let window = format!(
        "{today}|{}|{}",
        options.window_days, options.lookback_buffer_days
    );
    content_key(std::iter::once(window.as_str()).chain(symbols.iter().map(|s| s.as_str())))
}
