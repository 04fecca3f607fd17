use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One upcoming listing from the IPO calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpoEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub number_of_shares: Option<f64>,
    /// Free-form: providers send single prices and ranges ("10.00-12.00").
    #[serde(default, deserialize_with = "price_text")]
    pub price: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriceField {
    Text(String),
    Number(f64),
}

// Some rows carry a bare number instead of a string.
fn price_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(
        Option::<PriceField>::deserialize(deserializer)?.map(|p| match p {
            PriceField::Text(s) => s,
            PriceField::Number(n) => format!("{n:.2}"),
        }),
    )
}

/// Country selection for the IPO table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryFilter {
    All,
    Country(String),
}

impl CountryFilter {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Country(trimmed.to_string())
        }
    }

    pub fn matches(&self, entry: &IpoEntry) -> bool {
        match self {
            Self::All => true,
            Self::Country(c) => entry.country.as_deref() == Some(c.as_str()),
        }
    }
}

impl fmt::Display for CountryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Country(c) => f.write_str(c),
        }
    }
}

/// Selectable countries: "All" followed by the sorted, de-duplicated countries present.
pub fn countries(entries: &[IpoEntry]) -> Vec<String> {
    let unique: BTreeSet<&str> = entries
        .iter()
        .filter_map(|e| e.country.as_deref())
        .filter(|c| !c.trim().is_empty())
        .collect();
    std::iter::once("All".to_string())
        .chain(unique.into_iter().map(String::from))
        .collect()
}

pub fn filter_by_country(entries: Vec<IpoEntry>, filter: &CountryFilter) -> Vec<IpoEntry> {
    entries.into_iter().filter(|e| filter.matches(e)).collect()
}
