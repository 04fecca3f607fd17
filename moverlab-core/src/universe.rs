//! Ticker universe: which symbols trade on the selected exchange(s).
//!
//! Nasdaq symbols come from the NASDAQ-listed directory; NYSE and AMEX
//! symbols come from the other-listed directory, filtered by exchange code.
//! Output order is Nasdaq, then NYSE, then AMEX. Duplicates across files are
//! kept as-is.

use crate::data::{DataError, ListingFeed, ListingRow};
use crate::domain::{ExchangeSelector, ListingFile, TickerSymbol};

/// Default cap on how many symbols are ranked per request.
pub const DEFAULT_MAX_TICKERS: usize = 200;

pub struct UniverseResolver<'a> {
    feed: &'a dyn ListingFeed,
}

impl<'a> UniverseResolver<'a> {
    pub fn new(feed: &'a dyn ListingFeed) -> Self {
        Self { feed }
    }

    /// Fetch the listing file(s) the selector needs and extract valid symbols.
    ///
    /// The other-listed file is fetched at most once, even for `All`.
    pub fn resolve(&self, selector: ExchangeSelector) -> Result<Vec<TickerSymbol>, DataError> {
        let span = tracing::info_span!(
            "resolve_universe",
            exchange = selector.label(),
            feed = self.feed.name()
        );
        let _guard = span.enter();

        let nasdaq_rows = if selector.includes_nasdaq() {
            self.feed.fetch(ListingFile::NasdaqListed)?
        } else {
            Vec::new()
        };
        let other_rows = if selector.needs_other_listed() {
            self.feed.fetch(ListingFile::OtherListed)?
        } else {
            Vec::new()
        };

        let symbols = collect_symbols(selector, &nasdaq_rows, &other_rows);
        tracing::info!(count = symbols.len(), "universe resolved");
        Ok(symbols)
    }
}

/// Combine parsed listing rows into the selector's symbol list.
pub fn collect_symbols(
    selector: ExchangeSelector,
    nasdaq_rows: &[ListingRow],
    other_rows: &[ListingRow],
) -> Vec<TickerSymbol> {
    let mut symbols = Vec::new();

    if selector.includes_nasdaq() {
        symbols.extend(nasdaq_rows.iter().filter_map(valid_symbol));
    }
    // Per-code passes keep NYSE rows ahead of AMEX rows for `All`.
    for code in selector.other_listed_codes() {
        symbols.extend(
            other_rows
                .iter()
                .filter(|row| row.exchange.as_deref() == Some(code))
                .filter_map(valid_symbol),
        );
    }
    symbols
}

fn valid_symbol(row: &ListingRow) -> Option<TickerSymbol> {
    let raw = row.symbol.as_deref()?;
    match TickerSymbol::parse(raw) {
        Ok(symbol) => Some(symbol),
        Err(e) => {
            tracing::trace!(raw, reason = %e, "dropping listing row");
            None
        }
    }
}

/// Keep the first `max` symbols.
pub fn truncate_universe(mut symbols: Vec<TickerSymbol>, max: usize) -> Vec<TickerSymbol> {
    symbols.truncate(max);
    symbols
}
