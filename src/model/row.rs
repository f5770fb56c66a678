//! Row-level types that flow through the import pipeline.

use crate::model::Amount;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// One data line of a CSV file: header -> cell, in header order.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(cells: Vec<(String, String)>) -> Self {
        Self { cells }
    }

    /// The cell under `header`. With duplicate headers the first one wins.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }
}

impl<H, V> FromIterator<(H, V)> for RawRow
where
    H: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (H, V)>>(iter: T) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(h, v)| (h.into(), v.into()))
                .collect(),
        )
    }
}

/// The value of one field in a `TransformedRow`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum FieldValue {
    /// Text as it came from the CSV or manual value. For numeric fields that did not parse, this
    /// holds the input with `$` and `,` removed.
    Text(String),
    /// A numeric field that parsed successfully.
    Number(Decimal),
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Text(String::new())
    }
}

impl FieldValue {
    /// Only empty text counts as a missing value. `Number(0)` is present.
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }

    /// The numeric value, stripping `$` and `,` from text first.
    pub fn to_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => Amount::from_str(s).ok().map(|a| a.value()),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => Display::fmt(n, f),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Number(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Number(n) => serializer.serialize_str(&n.to_string()),
        }
    }
}

/// A CSV row re-keyed by field key. Its position in the preview (1-based) is the row number used
/// by `ValidationError`.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TransformedRow(BTreeMap<String, FieldValue>);

impl TransformedRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// The value under `key` as text; numbers are rendered, missing keys are empty.
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(|v| v.to_string()).unwrap_or_default()
    }

    /// The value under `key` as a number, if it is one.
    pub fn number(&self, key: &str) -> Option<Decimal> {
        self.get(key).and_then(FieldValue::to_number)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A problem found in one field of one row.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize)]
pub struct ValidationError {
    /// 1-based position of the row in the preview.
    pub row: usize,
    /// The field key.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(row: usize, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {} ({}): {}", self.row, self.field, self.message)
    }
}

/// The outcome of committing rows to storage. `successful + failed == total` always holds.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ImportResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl ImportResult {
    /// Builds a result from the row total and the number of rows stored.
    pub fn new(total: usize, successful: usize, errors: Vec<String>) -> Self {
        let successful = successful.min(total);
        Self {
            total,
            successful,
            failed: total - successful,
            errors,
        }
    }

    pub fn title(&self) -> &'static str {
        if self.failed == 0 {
            "Import Complete"
        } else {
            "Import Completed with Errors"
        }
    }

    /// At most `limit` error strings, with a trailing note when some were left out.
    pub fn display_errors(&self, limit: usize) -> Vec<String> {
        let mut shown: Vec<String> = self.errors.iter().take(limit).cloned().collect();
        if self.errors.len() > limit {
            shown.push(format!("...and {} more", self.errors.len() - limit));
        }
        shown
    }
}

impl Display for ImportResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} of {} rows imported, {} failed",
            self.title(),
            self.successful,
            self.total,
            self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_first_duplicate_wins() {
        let row: RawRow = vec![("A", "1"), ("B", "2"), ("A", "3")].into_iter().collect();
        assert_eq!(row.get("A"), Some("1"));
        assert_eq!(row.get("C"), None);
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_field_value_emptiness() {
        assert!(FieldValue::default().is_empty());
        assert!(!FieldValue::Number(Decimal::ZERO).is_empty());
        assert!(!FieldValue::from("0").is_empty());
    }

    #[test]
    fn test_field_value_to_number() {
        assert_eq!(
            FieldValue::from("$1,234.50").to_number(),
            Some(Decimal::from_str("1234.50").unwrap())
        );
        assert_eq!(FieldValue::from("abc").to_number(), None);
        assert_eq!(FieldValue::from("").to_number(), None);
    }

    #[test]
    fn test_import_result_counts() {
        let result = ImportResult::new(120, 100, vec!["Batch 2: boom".into()]);
        assert_eq!(result.failed, 20);
        assert_eq!(result.successful + result.failed, result.total);
        assert_eq!(result.title(), "Import Completed with Errors");

        let clean = ImportResult::new(3, 3, vec![]);
        assert_eq!(clean.title(), "Import Complete");
    }

    #[test]
    fn test_import_result_never_over_counts() {
        let result = ImportResult::new(5, 9, vec![]);
        assert_eq!(result.successful, 5);
        assert_eq!(result.failed, 0);
    }

    #[test]
    fn test_display_errors_is_bounded() {
        let errors = (1..=7).map(|i| format!("Batch {i}: x")).collect();
        let result = ImportResult::new(350, 0, errors);
        let shown = result.display_errors(5);
        assert_eq!(shown.len(), 6);
        assert_eq!(shown[5], "...and 2 more");
    }
}
