//! Finnhub IPO calendar client.

use super::provider::DataError;
use crate::config::IpoConfig;
use crate::domain::IpoEntry;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct IpoCalendarResponse {
    #[serde(rename = "ipoCalendar", default)]
    ipo_calendar: Vec<IpoEntry>,
}

pub struct IpoCalendarClient {
    client: reqwest::blocking::Client,
    base_url: String,
    token: Option<String>,
}

impl IpoCalendarClient {
    /// The token is taken from `config` as-is; resolving it from the
    /// environment happens when the config is loaded.
    pub fn new(config: &IpoConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    fn calendar_url(base_url: &str, from: NaiveDate, to: NaiveDate) -> String {
        format!(
            "{base_url}/calendar/ipo?from={}&to={}",
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        )
    }

    /// IPOs scheduled between `from` and `to`, both inclusive.
    pub fn upcoming(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<IpoEntry>, DataError> {
        let token = self.token.as_deref().ok_or_else(|| {
            DataError::AuthenticationRequired(
                "no IPO calendar token configured (set FINNHUB_API_KEY or [ipo].api_token)".into(),
            )
        })?;

        let url = Self::calendar_url(&self.base_url, from, to);
        tracing::debug!(%from, %to, "fetching IPO calendar");

        // Token goes in a header so it never shows up in logged URLs.
        let resp = self
            .client
            .get(&url)
            .header("X-Finnhub-Token", token)
            .send()
            .map_err(|e| DataError::from_reqwest(e, "ipo calendar"))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DataError::AuthenticationRequired(format!(
                "IPO calendar rejected the token (HTTP {status})"
            )));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                retry_after_secs: 60,
            });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::from_reqwest(e, "ipo calendar"))?;
        let entries = parse_ipo_calendar(&body)?;
        tracing::info!(count = entries.len(), "IPO calendar fetched");
        Ok(entries)
    }
}

pub fn parse_ipo_calendar(body: &str) -> Result<Vec<IpoEntry>, DataError> {
    serde_json::from_str::<IpoCalendarResponse>(body)
        .map(|r| r.ipo_calendar)
        .map_err(|e| DataError::ResponseFormatChanged(format!("failed to parse IPO calendar: {e}")))
}
