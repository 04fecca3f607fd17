//! In-memory feeds shared by the integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use moverlab_core::data::{
    CloseBatch, DailyClose, DataError, DateRange, ListingFeed, ListingRow, PriceSeries, QuoteFeed,
};
use moverlab_core::domain::{ListingFile, TickerSymbol};

pub fn sym(s: &str) -> TickerSymbol {
    TickerSymbol::parse(s).unwrap()
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

// ── Listing feed ─────────────────────────────────────────────────────

pub struct FakeListingFeed {
    nasdaq: Vec<ListingRow>,
    other: Vec<ListingRow>,
    fail: bool,
    nasdaq_fetches: AtomicUsize,
    other_fetches: AtomicUsize,
}

impl FakeListingFeed {
    pub fn new(nasdaq: &[&str], other: &[(&str, &str)]) -> Self {
        Self {
            nasdaq: nasdaq
                .iter()
                .map(|s| ListingRow {
                    symbol: Some(s.to_string()),
                    exchange: None,
                })
                .collect(),
            other: other
                .iter()
                .map(|(s, ex)| ListingRow {
                    symbol: Some(s.to_string()),
                    exchange: Some(ex.to_string()),
                })
                .collect(),
            fail: false,
            nasdaq_fetches: AtomicUsize::new(0),
            other_fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[], &[])
        }
    }

    pub fn fetches(&self, file: ListingFile) -> usize {
        match file {
            ListingFile::NasdaqListed => self.nasdaq_fetches.load(Ordering::SeqCst),
            ListingFile::OtherListed => self.other_fetches.load(Ordering::SeqCst),
        }
    }
}

impl ListingFeed for FakeListingFeed {
    fn name(&self) -> &str {
        "fake_listing"
    }

    fn fetch(&self, file: ListingFile) -> Result<Vec<ListingRow>, DataError> {
        match file {
            ListingFile::NasdaqListed => self.nasdaq_fetches.fetch_add(1, Ordering::SeqCst),
            ListingFile::OtherListed => self.other_fetches.fetch_add(1, Ordering::SeqCst),
        };
        if self.fail {
            return Err(DataError::NetworkUnreachable("listing host down".into()));
        }
        Ok(match file {
            ListingFile::NasdaqListed => self.nasdaq.clone(),
            ListingFile::OtherListed => self.other.clone(),
        })
    }
}

// ── Quote feed ───────────────────────────────────────────────────────

enum Canned {
    Closes(Vec<f64>),
    Fail(fn() -> DataError),
}

/// Serves canned closes; symbols it has never heard of are left out of the batch.
pub struct FakeQuoteFeed {
    canned: HashMap<TickerSymbol, Canned>,
    down: bool,
    calls: Arc<AtomicUsize>,
    last_range: Mutex<Option<DateRange>>,
}

impl FakeQuoteFeed {
    pub fn new() -> Self {
        Self {
            canned: HashMap::new(),
            down: false,
            calls: Arc::new(AtomicUsize::new(0)),
            last_range: Mutex::new(None),
        }
    }

    pub fn down() -> Self {
        Self {
            down: true,
            ..Self::new()
        }
    }

    pub fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.canned
            .insert(sym(symbol), Canned::Closes(closes.to_vec()));
        self
    }

    pub fn with_failure(mut self, symbol: &str, err: fn() -> DataError) -> Self {
        self.canned.insert(sym(symbol), Canned::Fail(err));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Call counter that stays readable after the feed is boxed into a service.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn last_range(&self) -> Option<DateRange> {
        *self.last_range.lock().unwrap()
    }
}

impl QuoteFeed for FakeQuoteFeed {
    fn name(&self) -> &str {
        "fake_quotes"
    }

    fn fetch_closes(
        &self,
        symbols: &[TickerSymbol],
        range: DateRange,
    ) -> Result<CloseBatch, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_range.lock().unwrap() = Some(range);
        if self.down {
            return Err(DataError::NetworkUnreachable("quote host down".into()));
        }

        let mut batch = CloseBatch::new();
        for symbol in symbols {
            match self.canned.get(symbol) {
                Some(Canned::Closes(closes)) => {
                    let daily = closes
                        .iter()
                        .enumerate()
                        .map(|(i, &c)| DailyClose {
                            date: range.start + Duration::days(i as i64),
                            close: Some(c),
                        })
                        .collect();
                    batch.insert(symbol.clone(), Ok(PriceSeries::new(symbol.clone(), daily)));
                }
                Some(Canned::Fail(make)) => batch.insert(symbol.clone(), Err(make())),
                None => {}
            }
        }
        Ok(batch)
    }

    fn is_available(&self) -> bool {
        !self.down
    }
}
