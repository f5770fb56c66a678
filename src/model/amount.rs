//! Amount type for handling numeric CSV cells that may carry dollar signs and commas.
//!
//! Spreadsheet exports write money as `$1,234.50`, `1,234.50` or `1234.50`. All three must parse
//! to the same `Decimal`, so every `$` and `,` is stripped before parsing.

use rust_decimal::Decimal;
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// A numeric value parsed from a CSV cell.
///
/// ```
/// # use harvest_import::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("$1,234.50").unwrap();
/// let b = Amount::from_str("1234.50").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "1234.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// An error that can occur when a cell does not hold a number after cleanup.
pub struct AmountError {
    cleaned: String,
    source: Option<rust_decimal::Error>,
}

impl AmountError {
    /// The input with `$`, `,` and surrounding whitespace removed.
    pub fn cleaned(&self) -> &str {
        &self.cleaned
    }
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AmountError({:?})", self.cleaned)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(e) => write!(f, "'{}' is not a number: {e}", self.cleaned),
            None => write!(f, "an empty value is not a number"),
        }
    }
}

impl Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn Error + 'static))
    }
}

/// Removes every `$` and `,` and trims the result.
pub fn clean_numeric(s: &str) -> String {
    s.chars()
        .filter(|&c| c != '$' && c != ',')
        .collect::<String>()
        .trim()
        .to_string()
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = clean_numeric(s);
        if cleaned.is_empty() {
            return Err(AmountError {
                cleaned,
                source: None,
            });
        }

        // Spreadsheets occasionally emit exponent notation for large quantities.
        let parsed = if cleaned.contains(['e', 'E']) {
            Decimal::from_scientific(&cleaned)
        } else {
            Decimal::from_str(&cleaned)
        };

        parsed.map(Amount).map_err(|e| AmountError {
            cleaned,
            source: Some(e),
        })
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_with_dollar_and_commas() {
        let amount = Amount::from_str("$1,234.50").unwrap();
        assert_eq!(amount.value(), dec("1234.50"));
    }

    #[test]
    fn test_parse_negative_with_dollar_sign() {
        assert_eq!(Amount::from_str("-$50.00").unwrap().value(), dec("-50.00"));
        assert_eq!(Amount::from_str("$-50.00").unwrap().value(), dec("-50.00"));
    }

    #[test]
    fn test_parse_whitespace() {
        let amount = Amount::from_str("  $50.00  ").unwrap();
        assert_eq!(amount.value(), dec("50.00"));
    }

    #[test]
    fn test_parse_scientific() {
        let amount = Amount::from_str("1.5e3").unwrap();
        assert_eq!(amount.value(), dec("1500"));
    }

    #[test]
    fn test_parse_empty_is_error() {
        let err = Amount::from_str(" $ ").unwrap_err();
        assert_eq!(err.cleaned(), "");
    }

    #[test]
    fn test_parse_garbage_keeps_cleaned_text() {
        let err = Amount::from_str("$1,2x3").unwrap_err();
        assert_eq!(err.cleaned(), "12x3");
        assert!(err.to_string().contains("12x3"));
    }

    #[test]
    fn test_clean_numeric() {
        assert_eq!(clean_numeric(" $1,234.50 "), "1234.50");
        assert_eq!(clean_numeric("abc"), "abc");
    }
}
