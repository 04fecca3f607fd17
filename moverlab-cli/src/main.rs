//! MoverLab CLI: ticker universe, 30-day movers and upcoming IPOs.
//!
//! Commands:
//! - `tickers`: list the symbols trading on an exchange
//! - `movers`: rank the universe by trailing percent change (winners, losers, full table)
//! - `ipos`: upcoming IPO calendar, optionally filtered by country

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use moverlab_core::config::MoverLabConfig;
use moverlab_core::data::{IpoCalendarClient, StderrProgress, TracingProgress};
use moverlab_core::domain::{countries, filter_by_country, CountryFilter, IpoEntry};
use moverlab_core::logging::{init_logging, LogConfig};
use moverlab_core::universe::truncate_universe;
use moverlab_core::{
    losers, winners, ExchangeSelector, MoversService, Paginator, PerformanceRecord,
};

#[derive(Parser)]
#[command(name = "moverlab", about = "MoverLab CLI: stock movers and IPO calendar")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the symbols trading on an exchange.
    Tickers {
        /// nasdaq, nyse, amex or all.
        #[arg(long, default_value = "nasdaq")]
        exchange: ExchangeSelector,

        /// How many symbols to print.
        #[arg(long, default_value_t = 20)]
        show: usize,
    },
    /// Rank the exchange's symbols by trailing percent change.
    Movers {
        /// nasdaq, nyse, amex or all.
        #[arg(long, default_value = "nasdaq")]
        exchange: ExchangeSelector,

        #[arg(long, value_enum, default_value_t = View::Winners)]
        view: View,

        /// Symbols to rank (50-500). Defaults to [views].max_tickers.
        #[arg(long, value_parser = clap::value_parser!(u16).range(50..=500))]
        max_tickers: Option<u16>,

        /// Rows in the winners/losers tables. Defaults to [views].top_n.
        #[arg(long)]
        top: Option<usize>,

        /// Page of the full table (with --view all).
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Upcoming IPOs.
    Ipos {
        /// Country to show, or "All".
        #[arg(long, default_value = "All")]
        country: String,

        /// Days ahead to look. Defaults to [ipo].horizon_days.
        #[arg(long)]
        days: Option<u32>,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    Winners,
    Losers,
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env();
    if cli.verbose {
        log_config = log_config.with_default_level("debug");
    }
    init_logging(log_config).context("failed to initialize logging")?;

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Tickers { exchange, show } => run_tickers(&config, exchange, show),
        Commands::Movers {
            exchange,
            view,
            max_tickers,
            top,
            page,
            json,
        } => {
            let max_tickers = max_tickers.map_or(config.views.max_tickers, usize::from);
            let top = top.unwrap_or(config.views.top_n);
            run_movers(&config, exchange, view, max_tickers, top, page, json)
        }
        Commands::Ipos {
            country,
            days,
            json,
        } => run_ipos(&config, &country, days.unwrap_or(config.ipo.horizon_days), json),
    }
}

fn load_config(path: Option<&Path>) -> Result<MoverLabConfig> {
    match path {
        Some(path) => {
            let config = MoverLabConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => {
            tracing::debug!("no config file; using defaults");
            Ok(MoverLabConfig::from_env())
        }
    }
}

fn run_tickers(config: &MoverLabConfig, exchange: ExchangeSelector, show: usize) -> Result<()> {
    let service = MoversService::from_config(config)?;

    let symbols = match service.tickers(exchange) {
        Ok(symbols) => symbols,
        Err(e) => {
            eprintln!("Error fetching tickers: {e}");
            std::process::exit(1);
        }
    };

    println!("{} symbols on {exchange}", symbols.len());
    for symbol in symbols.iter().take(show) {
        println!("  {symbol}");
    }
    if symbols.len() > show {
        println!("  ... and {} more", symbols.len() - show);
    }
    Ok(())
}

fn run_movers(
    config: &MoverLabConfig,
    exchange: ExchangeSelector,
    view: View,
    max_tickers: usize,
    top: usize,
    page: usize,
    json: bool,
) -> Result<()> {
    let service = if json {
        MoversService::from_config_with_progress(config, Arc::new(TracingProgress))?
    } else {
        MoversService::from_config_with_progress(config, Arc::new(StderrProgress))?
    };

    let universe = match service.tickers(exchange) {
        Ok(symbols) => symbols,
        Err(e) => {
            eprintln!("Error fetching tickers: {e}");
            std::process::exit(1);
        }
    };
    let found = universe.len();
    if json {
        eprintln!("{}", found_message(found, exchange));
    } else {
        println!("{}", found_message(found, exchange));
    }
    let universe = truncate_universe(universe, max_tickers);
    tracing::info!(%exchange, found, ranked = universe.len(), "universe resolved");

    let records = match service.performance_of(&universe) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error fetching performance data: {e}");
            std::process::exit(1);
        }
    };
    let window = service.options().window_days;

    match view {
        View::Winners => {
            let rows = winners(&records, top);
            emit(&format!("Top {top} winners ({window}-day change)"), rows, 1, json)
        }
        View::Losers => {
            let rows = losers(&records, top);
            emit(&format!("Top {top} losers ({window}-day change)"), &rows, 1, json)
        }
        View::All => {
            let pager = Paginator::new(config.views.page_size)?;
            let rows = pager.page(&records, page)?;
            let first_rank = (page - 1) * pager.page_size() + 1;
            let title = format!(
                "All {exchange} movers, page {page}/{} ({} symbols)",
                pager.page_count(records.len()),
                records.len()
            );
            emit(&title, rows, first_rank, json)
        }
    }
}

fn found_message(count: usize, exchange: ExchangeSelector) -> String {
    format!("Found {count} tickers for {exchange}.")
}

#[derive(Serialize)]
struct MoverRow<'a> {
    rank: usize,
    symbol: &'a str,
    pct_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

fn emit(title: &str, records: &[PerformanceRecord], first_rank: usize, json: bool) -> Result<()> {
    if json {
        let rows: Vec<MoverRow> = records
            .iter()
            .enumerate()
            .map(|(i, r)| MoverRow {
                rank: first_rank + i,
                symbol: r.symbol.as_str(),
                pct_change: r.change.value(),
                reason: r.change.reason().map(|reason| reason.as_str()),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{title}");
    println!("{}", "=".repeat(title.len()));
    if records.is_empty() {
        println!("  (no symbols)");
        return Ok(());
    }
    println!("{:>5}  {:<8} {:>10}", "#", "Symbol", "Change");
    for (i, r) in records.iter().enumerate() {
        let note = r
            .change
            .reason()
            .map(|reason| format!("  ({reason})"))
            .unwrap_or_default();
        println!(
            "{:>5}  {:<8} {:>10}{note}",
            first_rank + i,
            r.symbol.as_str(),
            r.change.to_string()
        );
    }
    Ok(())
}

fn run_ipos(config: &MoverLabConfig, country: &str, days: u32, json: bool) -> Result<()> {
    let client = IpoCalendarClient::new(&config.ipo)?;
    let from = Utc::now().date_naive();
    let to = from + Duration::days(i64::from(days));

    let entries = match client.upcoming(from, to) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("Error fetching IPO data: {e}");
            std::process::exit(1);
        }
    };

    let scheduled = entries.len();
    let available = countries(&entries);
    let filter = CountryFilter::parse(country);
    let entries = filter_by_country(entries, &filter);
    tracing::info!(scheduled, shown = entries.len(), %filter, "IPO calendar fetched");

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Upcoming IPOs {from} to {to} (country: {filter})");
    println!("Countries: {}", available.join(", "));
    if let Some(message) = empty_ipo_message(scheduled, entries.len(), &filter, days) {
        println!("{message}");
        return Ok(());
    }
    print_ipo_table(&entries);
    Ok(())
}

fn horizon_phrase(days: u32) -> String {
    match days {
        1 => "the next day".to_string(),
        7 => "the coming week".to_string(),
        n => format!("the next {n} days"),
    }
}

/// What to say when there is no table to print; `None` when rows remain.
fn empty_ipo_message(
    scheduled: usize,
    shown: usize,
    filter: &CountryFilter,
    days: u32,
) -> Option<String> {
    if scheduled == 0 {
        Some(format!("No IPOs found for {}.", horizon_phrase(days)))
    } else if shown == 0 {
        Some(format!(
            "No IPOs from {filter} in {} ({scheduled} scheduled in other countries).",
            horizon_phrase(days)
        ))
    } else {
        None
    }
}

fn print_ipo_table(entries: &[IpoEntry]) {
    println!(
        "{:<10}  {:<8} {:<32} {:<16} {:>14} {:>12}",
        "Date", "Symbol", "Name", "Exchange", "Shares", "Price"
    );
    for e in entries {
        let shares = e
            .number_of_shares
            .map(|n| format!("{n:.0}"))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<10}  {:<8} {:<32} {:<16} {:>14} {:>12}",
            e.date.as_deref().unwrap_or("-"),
            e.symbol.as_deref().unwrap_or("-"),
            truncate(e.name.as_deref().unwrap_or("-"), 32),
            e.exchange.as_deref().unwrap_or("-"),
            shares,
            e.price.as_deref().unwrap_or("-"),
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
