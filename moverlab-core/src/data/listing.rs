//! NASDAQ Trader symbol directory feed.
//!
//! Both directory files are pipe-delimited with a header row and a trailing
//! `File Creation Time: ...` row. The footer has fewer columns than the
//! header, so the reader runs in flexible mode and leaves footer filtering to
//! symbol validation downstream.

use super::provider::{DataError, ListingFeed, ListingRow};
use crate::config::ListingFeedConfig;
use crate::domain::ListingFile;
use std::time::Duration;

pub struct NasdaqTraderFeed {
    client: reqwest::blocking::Client,
    nasdaq_listed_url: String,
    other_listed_url: String,
}

impl NasdaqTraderFeed {
    pub fn new(config: &ListingFeedConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("moverlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            nasdaq_listed_url: config.nasdaq_listed_url.clone(),
            other_listed_url: config.other_listed_url.clone(),
        })
    }

    fn url(&self, file: ListingFile) -> &str {
        match file {
            ListingFile::NasdaqListed => &self.nasdaq_listed_url,
            ListingFile::OtherListed => &self.other_listed_url,
        }
    }
}

impl ListingFeed for NasdaqTraderFeed {
    fn name(&self) -> &str {
        "nasdaq_trader"
    }

    fn fetch(&self, file: ListingFile) -> Result<Vec<ListingRow>, DataError> {
        let url = self.url(file);
        tracing::debug!(url, ?file, "fetching listing file");

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::from_reqwest(e, url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = resp.text().map_err(|e| DataError::from_reqwest(e, url))?;
        let rows = parse_listing(&body, file)?;
        tracing::debug!(?file, rows = rows.len(), "parsed listing file");
        Ok(rows)
    }
}

/// Parse a pipe-delimited directory file into raw rows.
///
/// Fails only when a required column is absent from the header.
pub fn parse_listing(body: &str, file: ListingFile) -> Result<Vec<ListingRow>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'|')
        .flexible(true)
        .has_headers(true)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| DataError::ResponseFormatChanged(format!("unreadable listing header: {e}")))?
        .clone();

    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let symbol_idx = column(file.symbol_column()).ok_or_else(|| {
        DataError::ResponseFormatChanged(format!(
            "listing file has no '{}' column",
            file.symbol_column()
        ))
    })?;
    let exchange_idx = match file.exchange_column() {
        Some(name) => Some(column(name).ok_or_else(|| {
            DataError::ResponseFormatChanged(format!("listing file has no '{name}' column"))
        })?),
        None => None,
    };

    let non_empty = |v: &str| {
        let v = v.trim();
        (!v.is_empty()).then(|| v.to_string())
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::trace!(error = %e, "skipping unreadable listing row");
                continue;
            }
        };
        rows.push(ListingRow {
            symbol: record.get(symbol_idx).and_then(non_empty),
            exchange: exchange_idx.and_then(|i| record.get(i)).and_then(non_empty),
        });
    }
    Ok(rows)
}
