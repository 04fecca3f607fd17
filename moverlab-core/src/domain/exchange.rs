use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which exchange(s) contribute symbols to the universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeSelector {
    Nasdaq,
    Nyse,
    Amex,
    All,
}

/// The two reference files published by the listing feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingFile {
    /// NASDAQ-listed securities (`Symbol` column).
    NasdaqListed,
    /// Every other exchange (`ACT Symbol` + `Exchange` code columns).
    OtherListed,
}

impl ListingFile {
    /// Column holding the ticker in this file.
    pub const fn symbol_column(self) -> &'static str {
        match self {
            Self::NasdaqListed => "Symbol",
            Self::OtherListed => "ACT Symbol",
        }
    }

    /// Column holding the exchange code, if the file carries one.
    pub const fn exchange_column(self) -> Option<&'static str> {
        match self {
            Self::NasdaqListed => None,
            Self::OtherListed => Some("Exchange"),
        }
    }
}

impl ExchangeSelector {
    pub const ALL: [ExchangeSelector; 4] = [Self::Nasdaq, Self::Nyse, Self::Amex, Self::All];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Nasdaq => "Nasdaq",
            Self::Nyse => "NYSE",
            Self::Amex => "AMEX",
            Self::All => "All",
        }
    }

    pub const fn includes_nasdaq(self) -> bool {
        matches!(self, Self::Nasdaq | Self::All)
    }

    pub const fn includes_nyse(self) -> bool {
        matches!(self, Self::Nyse | Self::All)
    }

    pub const fn includes_amex(self) -> bool {
        matches!(self, Self::Amex | Self::All)
    }

    /// Whether the shared "other listed" file must be fetched.
    pub const fn needs_other_listed(self) -> bool {
        self.includes_nyse() || self.includes_amex()
    }

    /// Exchange codes to keep from the "other listed" file, in output order.
    pub fn other_listed_codes(self) -> Vec<&'static str> {
        let mut codes = Vec::with_capacity(2);
        if self.includes_nyse() {
            codes.push(NYSE_CODE);
        }
        if self.includes_amex() {
            codes.push(AMEX_CODE);
        }
        codes
    }
}

/// Exchange code for NYSE in the "other listed" file.
pub const NYSE_CODE: &str = "N";
/// Exchange code for NYSE American (formerly AMEX).
pub const AMEX_CODE: &str = "A";

impl fmt::Display for ExchangeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExchangeSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nasdaq" => Ok(Self::Nasdaq),
            "nyse" => Ok(Self::Nyse),
            "amex" => Ok(Self::Amex),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown exchange '{other}'. Valid: nasdaq, nyse, amex, all"
            )),
        }
    }
}
