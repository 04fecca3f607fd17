//! End-to-end resolve → rank → view tests against in-memory feeds.

mod common;

use common::{sym, today, FakeListingFeed, FakeQuoteFeed};
use moverlab_core::data::DataError;
use moverlab_core::domain::{ExchangeSelector, ListingFile, PercentChange, UndefinedReason};
use moverlab_core::ranking::{RankError, RankOptions, Ranker};
use moverlab_core::universe::UniverseResolver;
use moverlab_core::views::{losers, winners, Paginator};
use moverlab_core::MoversService;
use std::collections::HashSet;
use std::sync::atomic::Ordering;

fn listing() -> FakeListingFeed {
    FakeListingFeed::new(
        &["Symbol", "AAPL", "MSFT", "QQQ1", "", "NVDA"],
        &[
            ("GE", "N"),
            ("IMO", "A"),
            ("BRK.B", "N"),
            ("SPY", "P"),
            ("F", "N"),
            ("GLDM", "A"),
        ],
    )
}

// ── Universe ─────────────────────────────────────────────────────────

#[test]
fn all_contains_every_single_exchange() {
    let feed = listing();
    let resolver = UniverseResolver::new(&feed);

    let all: HashSet<_> = resolver.resolve(ExchangeSelector::All).unwrap().into_iter().collect();
    for selector in [ExchangeSelector::Nasdaq, ExchangeSelector::Nyse, ExchangeSelector::Amex] {
        for symbol in resolver.resolve(selector).unwrap() {
            assert!(all.contains(&symbol), "{symbol} from {selector} missing in All");
        }
    }
}

#[test]
fn all_fetches_other_listed_once() {
    let feed = listing();
    let symbols = UniverseResolver::new(&feed).resolve(ExchangeSelector::All).unwrap();

    assert_eq!(feed.fetches(ListingFile::NasdaqListed), 1);
    assert_eq!(feed.fetches(ListingFile::OtherListed), 1);
    let names: Vec<_> = symbols.iter().map(|s| s.as_str()).collect();
    assert_eq!(names, vec!["AAPL", "MSFT", "NVDA", "GE", "F", "IMO", "GLDM"]);
}

#[test]
fn nasdaq_only_skips_other_listed() {
    let feed = listing();
    UniverseResolver::new(&feed).resolve(ExchangeSelector::Nasdaq).unwrap();
    assert_eq!(feed.fetches(ListingFile::OtherListed), 0);
}

#[test]
fn listing_failure_aborts_resolution() {
    let feed = FakeListingFeed::failing();
    let err = UniverseResolver::new(&feed).resolve(ExchangeSelector::Nyse).unwrap_err();
    assert!(matches!(err, DataError::NetworkUnreachable(_)));
}

// ── Ranking ──────────────────────────────────────────────────────────

#[test]
fn ranks_defined_before_undefined() {
    let feed = FakeQuoteFeed::new()
        .with_closes("AAA", &[10.0, 12.0])
        .with_closes("BBB", &[]);
    let ranker = Ranker::new(&feed, RankOptions::default());

    let records = ranker.rank_as_of(&[sym("AAA"), sym("BBB")], today()).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].symbol, sym("AAA"));
    assert_eq!(records[0].change, PercentChange::Defined(20.0));
    assert_eq!(records[1].symbol, sym("BBB"));
    assert!(records[1].change.as_f64().is_nan());
}

#[test]
fn one_record_per_input_regardless_of_failures() {
    let feed = FakeQuoteFeed::new()
        .with_closes("AAA", &[10.0, 11.0])
        .with_failure("BAD", || DataError::Timeout("chart".into()))
        .with_failure("GONE", || DataError::SymbolNotFound { symbol: "GONE".into() });
    let ranker = Ranker::new(&feed, RankOptions::default());
    let input = [sym("AAA"), sym("BAD"), sym("GONE"), sym("NONE"), sym("AAA")];

    let records = ranker.rank_as_of(&input, today()).unwrap();

    assert_eq!(records.len(), input.len());
    assert_eq!(feed.calls(), 1);
    let reasons: HashSet<_> = records.iter().filter_map(|r| r.change.reason()).collect();
    assert!(reasons.contains(&UndefinedReason::Timeout));
    assert!(reasons.contains(&UndefinedReason::NotFound));
    assert!(reasons.contains(&UndefinedReason::Missing));
}

#[test]
fn requests_lookback_range_ending_today() {
    let feed = FakeQuoteFeed::new().with_closes("AAA", &[1.0, 2.0]);
    Ranker::new(&feed, RankOptions::default())
        .rank_as_of(&[sym("AAA")], today())
        .unwrap();
    let range = feed.last_range().unwrap();
    assert_eq!(range.end, today());
    assert_eq!(range.num_days(), 35);
}

#[test]
fn empty_input_skips_the_feed() {
    let feed = FakeQuoteFeed::down();
    let records = Ranker::new(&feed, RankOptions::default())
        .rank_as_of(&[], today())
        .unwrap();
    assert!(records.is_empty());
    assert_eq!(feed.calls(), 0);
}

#[test]
fn batch_failure_propagates() {
    let feed = FakeQuoteFeed::down();
    let err = Ranker::new(&feed, RankOptions::default())
        .rank_as_of(&[sym("AAA")], today())
        .unwrap_err();
    assert!(matches!(err, RankError::Feed(DataError::NetworkUnreachable(_))));
}

#[test]
fn repeated_ranking_is_identical() {
    let feed = FakeQuoteFeed::new()
        .with_closes("AAA", &[10.0, 13.0])
        .with_closes("BBB", &[20.0, 18.0, 19.0])
        .with_closes("CCC", &[5.0]);
    let ranker = Ranker::new(&feed, RankOptions::default());
    let input = [sym("CCC"), sym("BBB"), sym("AAA")];
    let first = ranker.rank_as_of(&input, today()).unwrap();
    let second = ranker.rank_as_of(&input, today()).unwrap();
    assert_eq!(first, second);
}

// ── Views ────────────────────────────────────────────────────────────

#[test]
fn losers_on_twelve_records() {
    let mut feed = FakeQuoteFeed::new();
    let names = ["AA", "AB", "AC", "AD", "AE", "AF", "AG", "AH", "AI", "AJ"];
    for (i, name) in names.iter().enumerate() {
        feed = feed.with_closes(name, &[100.0, 100.0 + i as f64]);
    }
    feed = feed.with_closes("UA", &[1.0]).with_closes("UB", &[]);
    let mut input: Vec<_> = names.iter().map(|n| sym(n)).collect();
    input.push(sym("UA"));
    input.push(sym("UB"));

    let records = Ranker::new(&feed, RankOptions::default())
        .rank_as_of(&input, today())
        .unwrap();
    assert_eq!(records.len(), 12);

    let bottom = losers(&records, 10);
    assert_eq!(bottom.len(), 10);
    assert!(bottom.iter().all(|r| r.change.is_defined()));
    let values: Vec<f64> = bottom.iter().map(|r| r.change.as_f64()).collect();
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(values[0], 0.0);

    let top = winners(&records, 10);
    assert_eq!(top[0].symbol, sym("AJ"));
}

#[test]
fn sixty_records_paginate_into_three_pages() {
    let mut feed = FakeQuoteFeed::new();
    let mut input = Vec::new();
    for i in 0..60u8 {
        let name: String = [b'A' + i / 26, b'A' + i % 26].iter().map(|&b| b as char).collect();
        feed = feed.with_closes(&name, &[10.0, 10.0 + f64::from(i)]);
        input.push(sym(&name));
    }
    let records = Ranker::new(&feed, RankOptions::default())
        .rank_as_of(&input, today())
        .unwrap();

    let pager = Paginator::new(25).unwrap();
    assert_eq!(pager.page_count(records.len()), 3);
    let sizes: Vec<_> = (1..=3).map(|p| pager.page(&records, p).unwrap().len()).collect();
    assert_eq!(sizes, vec![25, 25, 10]);
    assert!(pager.page(&records, 0).is_err());
    assert!(pager.page(&records, 4).is_err());
}

// ── Service ──────────────────────────────────────────────────────────

#[test]
fn service_memoizes_ranking_per_symbol_list() {
    let quotes = FakeQuoteFeed::new().with_closes("AAPL", &[1.0, 2.0]);
    let calls = quotes.call_counter();
    let service = MoversService::new(
        Box::new(listing()),
        Box::new(quotes),
        RankOptions::default(),
        None,
    );

    let first = service.performance_as_of(&[sym("AAPL")], today()).unwrap();
    let second = service.performance_as_of(&[sym("AAPL")], today()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].change, PercentChange::Defined(100.0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    service.performance_as_of(&[sym("AAPL"), sym("MSFT")], today()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    service.clear_cache();
    service.performance_as_of(&[sym("AAPL")], today()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn service_does_not_cache_failures() {
    let quotes = FakeQuoteFeed::down();
    let calls = quotes.call_counter();
    let service = MoversService::new(
        Box::new(listing()),
        Box::new(quotes),
        RankOptions::default(),
        None,
    );
    assert!(service.performance_as_of(&[sym("AAA")], today()).is_err());
    assert!(service.performance_as_of(&[sym("AAA")], today()).is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!service.quote_feed_available());
}

#[test]
fn service_truncates_universe() {
    let service = MoversService::new(
        Box::new(listing()),
        Box::new(FakeQuoteFeed::new()),
        RankOptions::default(),
        None,
    );
    let tickers = service.tickers(ExchangeSelector::All).unwrap();
    assert_eq!(tickers.len(), 7);

    let records = service.performance(ExchangeSelector::All, 2).unwrap();
    assert_eq!(records.len(), 2);
    assert!(records
        .iter()
        .all(|r| r.change.reason() == Some(UndefinedReason::Missing)));
}

#[test]
fn service_reports_listing_failures_separately_from_quote_failures() {
    let quotes = FakeQuoteFeed::new();
    let calls = quotes.call_counter();
    let service = MoversService::new(
        Box::new(FakeListingFeed::failing()),
        Box::new(quotes),
        RankOptions::default(),
        None,
    );

    let err = service.performance(ExchangeSelector::Nasdaq, 200).unwrap_err();
    assert!(matches!(err, RankError::Universe(DataError::NetworkUnreachable(_))));
    assert!(err.to_string().starts_with("listing feed failed"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let service = MoversService::new(
        Box::new(listing()),
        Box::new(FakeQuoteFeed::down()),
        RankOptions::default(),
        None,
    );
    let err = service.performance(ExchangeSelector::Nasdaq, 200).unwrap_err();
    assert!(matches!(err, RankError::Feed(_)));
    assert!(err.to_string().starts_with("quote feed failed"));
}
