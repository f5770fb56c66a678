//! Advisory per-row checks run before commit.

use crate::model::{parse_date, FieldType, FieldValue, ImportKind, TransformedRow, ValidationError};
use tracing::debug;

/// Checks every row and returns all problems found. Rows are never modified.
///
/// Row numbers are 1-based positions in `rows`. Per row, in this order:
/// - each required field that is empty yields `"<label> is required"`;
/// - each non-empty date field that does not parse yields `"Invalid date format"`;
/// - each non-empty numeric field of the kind that does not parse yields
///   `"<key> must be a valid number"`.
pub fn validate(rows: &[TransformedRow], kind: ImportKind) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        validate_row(idx + 1, row, kind, &mut errors);
    }
    debug!(
        "Validated {} {kind} rows, found {} problems",
        rows.len(),
        errors.len()
    );
    errors
}

fn validate_row(
    row_number: usize,
    row: &TransformedRow,
    kind: ImportKind,
    errors: &mut Vec<ValidationError>,
) {
    for field in kind.fields().iter().filter(|f| f.required) {
        if row.get(field.key).map_or(true, FieldValue::is_empty) {
            errors.push(ValidationError::new(
                row_number,
                field.key,
                format!("{} is required", field.label),
            ));
        }
    }

    for field in kind.fields().iter().filter(|f| f.r#type == FieldType::Date) {
        let text = row.text(field.key);
        if !text.is_empty() && parse_date(&text).is_none() {
            errors.push(ValidationError::new(
                row_number,
                field.key,
                "Invalid date format",
            ));
        }
    }

    for key in kind.numeric_fields() {
        match row.get(key) {
            Some(value) if !value.is_empty() && value.to_number().is_none() => {
                errors.push(ValidationError::new(
                    row_number,
                    *key,
                    format!("{key} must be a valid number"),
                ));
            }
            _ => {}
        }
    }
}

/// The 1-based row numbers that have at least one error, ascending and without duplicates.
pub fn rows_with_errors(errors: &[ValidationError]) -> Vec<usize> {
    let mut rows: Vec<usize> = errors.iter().map(|e| e.row).collect();
    rows.sort_unstable();
    rows.dedup();
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::transform_rows;
    use crate::model::{ColumnMapping, ManualValues, MappingTarget, RawRow};

    fn row(pairs: &[(&str, &str)]) -> TransformedRow {
        let mut row = TransformedRow::new();
        for (k, v) in pairs {
            row.insert(*k, *v);
        }
        row
    }

    fn full_expense() -> Vec<(&'static str, &'static str)> {
        vec![
            ("date", "2024-01-15"),
            ("vendor", "Acme"),
            ("category", "Seeds"),
            ("item", "Corn"),
            ("unitCost", "25.00"),
            ("quantity", "10"),
            ("notes", ""),
        ]
    }

    #[test]
    fn test_valid_row_has_no_errors() {
        let rows = vec![row(&full_expense())];
        assert!(validate(&rows, ImportKind::Expenses).is_empty());
    }

    #[test]
    fn test_two_missing_required_fields() {
        let mut pairs = full_expense();
        pairs[1].1 = "";
        pairs[2].1 = "";
        let rows = vec![row(&full_expense()), row(&pairs)];
        let errors = validate(&rows, ImportKind::Expenses);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.row == 2));
        assert_eq!(errors[0].field, "vendor");
        assert_eq!(errors[0].message, "Vendor is required");
        assert_eq!(errors[1].message, "Category is required");
    }

    #[test]
    fn test_missing_key_counts_as_empty() {
        let rows = vec![row(&[("date", "2024-01-15")])];
        let errors = validate(&rows, ImportKind::Income);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["item", "quantity", "price", "amount"]);
    }

    #[test]
    fn test_invalid_date() {
        let mut pairs = full_expense();
        pairs[0].1 = "not-a-date";
        let errors = validate(&[row(&pairs)], ImportKind::Expenses);
        assert_eq!(
            errors,
            vec![ValidationError::new(1, "date", "Invalid date format")]
        );
    }

    #[test]
    fn test_invalid_numbers_collect_all() {
        let mut pairs = full_expense();
        pairs[4].1 = "abc";
        pairs[5].1 = "ten";
        let errors = validate(&[row(&pairs)], ImportKind::Expenses);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].message, "unitCost must be a valid number");
        assert_eq!(errors[1].message, "quantity must be a valid number");
    }

    #[test]
    fn test_currency_text_is_a_valid_number() {
        let mut pairs = full_expense();
        pairs[4].1 = "$1,234.50";
        assert!(validate(&[row(&pairs)], ImportKind::Expenses).is_empty());
    }

    #[test]
    fn test_currency_symbol_alone_is_an_invalid_number() {
        let mut mapping = ColumnMapping::unmapped(ImportKind::Income);
        for (key, header) in [
            ("date", "Date"),
            ("item", "Item"),
            ("quantity", "Quantity"),
            ("price", "Price"),
            ("amount", "Amount"),
        ] {
            mapping.set(key, MappingTarget::from(header)).unwrap();
        }
        let raw: RawRow = vec![
            ("Date", "2024-01-20"),
            ("Item", "Eggs"),
            ("Quantity", "1"),
            ("Price", "4"),
            ("Amount", "$"),
        ]
        .into_iter()
        .collect();
        let rows = transform_rows(&[raw], &mapping, &ManualValues::new());
        assert_eq!(
            validate(&rows, ImportKind::Income),
            vec![ValidationError::new(1, "amount", "amount must be a valid number")]
        );
    }

    #[test]
    fn test_zero_number_is_present() {
        let mut r = row(&[
            ("date", "2024-01-20"),
            ("item", "Eggs"),
            ("quantity", "1"),
            ("price", "0"),
        ]);
        r.insert("amount", rust_decimal::Decimal::ZERO);
        assert!(validate(&[r], ImportKind::Income).is_empty());
    }

    #[test]
    fn test_rows_with_errors() {
        let errors = vec![
            ValidationError::new(3, "vendor", "x"),
            ValidationError::new(1, "date", "x"),
            ValidationError::new(3, "item", "x"),
        ];
        assert_eq!(rows_with_errors(&errors), vec![1, 3]);
    }
}
