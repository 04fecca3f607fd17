use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Column-name value that leaks into raw listing rows when a header is read as data.
pub const HEADER_SENTINEL: &str = "Symbol";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("symbol is empty")]
    Empty,

    #[error("symbol '{value}' contains non-alphabetic character '{ch}'")]
    NonAlphabetic { value: String, ch: char },

    #[error("'{0}' is a header sentinel, not a symbol")]
    HeaderSentinel(String),
}

/// Uppercase, purely alphabetic exchange ticker.
///
/// Share-class suffixes (`BRK.B`), preferred series (`ABC$A`) and feed footer
/// rows are rejected at parse time, so every value is safe in a URL path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TickerSymbol(String);

impl TickerSymbol {
    pub fn parse(input: &str) -> Result<Self, SymbolError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SymbolError::Empty);
        }
        if trimmed == HEADER_SENTINEL {
            return Err(SymbolError::HeaderSentinel(trimmed.to_string()));
        }
        if let Some(ch) = trimmed.chars().find(|c| !c.is_ascii_alphabetic()) {
            return Err(SymbolError::NonAlphabetic {
                value: trimmed.to_string(),
                ch,
            });
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TickerSymbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for TickerSymbol {
    type Error = SymbolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TickerSymbol> for String {
    fn from(value: TickerSymbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_uppercases() {
        let sym = TickerSymbol::parse(" aapl ").unwrap();
        assert_eq!(sym.as_str(), "AAPL");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(TickerSymbol::parse("   "), Err(SymbolError::Empty));
    }

    #[test]
    fn rejects_non_alphabetic() {
        assert!(matches!(
            TickerSymbol::parse("BRK.B"),
            Err(SymbolError::NonAlphabetic { ch: '.', .. })
        ));
        assert!(matches!(
            TickerSymbol::parse("File Creation Time: 1019202611:02"),
            Err(SymbolError::NonAlphabetic { ch: ' ', .. })
        ));
    }

    #[test]
    fn rejects_header_sentinel() {
        assert!(matches!(
            TickerSymbol::parse("Symbol"),
            Err(SymbolError::HeaderSentinel(_))
        ));
    }

    #[test]
    fn long_alphabetic_symbols_are_kept() {
        let sym = TickerSymbol::parse("abcdefghijkl").unwrap();
        assert_eq!(sym.as_str(), "ABCDEFGHIJKL");
    }

    #[test]
    fn serde_goes_through_validation() {
        let ok: TickerSymbol = serde_json::from_str("\"msft\"").unwrap();
        assert_eq!(ok.as_str(), "MSFT");
        assert!(serde_json::from_str::<TickerSymbol>("\"MS FT\"").is_err());
    }
}
