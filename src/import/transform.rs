//! Applies a column mapping to raw rows.

use crate::model::{
    Amount, ColumnMapping, FieldType, FieldValue, ImportKind, ManualValues, MappingTarget, RawRow,
    TransformedRow,
};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Re-keys `row` by field key using `mapping`, then normalizes numbers.
///
/// For each field of the mapping's kind:
/// - `Manual` takes `manual[key]`, or the empty string.
/// - `Column(h)` takes `row[h]` when the row has that header, otherwise falls back to
///   `manual[key]` or the empty string.
/// - `Unmapped` falls back to `manual[key]` or the empty string.
///
/// Numeric fields have `$` and `,` removed. Those that then parse become `FieldValue::Number`;
/// the rest stay as the cleaned text so validation can flag them. A cell holding nothing but `$`
/// and `,` keeps its trimmed text. For income, a zero amount with positive quantity and price is
/// replaced by `quantity * price`.
pub fn transform_row(
    row: &RawRow,
    mapping: &ColumnMapping,
    manual: &ManualValues,
) -> TransformedRow {
    let kind = mapping.kind();
    let mut out = TransformedRow::new();

    for (key, target) in mapping.iter() {
        let fallback = || manual.get(key).unwrap_or_default().to_string();
        let raw = match target {
            MappingTarget::Manual => fallback(),
            MappingTarget::Column(header) => match row.get(header) {
                Some(value) => value.to_string(),
                None => fallback(),
            },
            MappingTarget::Unmapped => fallback(),
        };

        let is_number = kind
            .field(key)
            .is_some_and(|f| f.r#type == FieldType::Number);
        let value = if is_number {
            numeric_value(&raw)
        } else {
            FieldValue::Text(raw)
        };
        out.insert(key, value);
    }

    if kind == ImportKind::Income {
        derive_income_amount(&mut out);
    }

    out
}

/// Transforms every row, preserving order and count.
pub fn transform_rows(
    rows: &[RawRow],
    mapping: &ColumnMapping,
    manual: &ManualValues,
) -> Vec<TransformedRow> {
    rows.iter()
        .map(|row| transform_row(row, mapping, manual))
        .collect()
}

fn numeric_value(raw: &str) -> FieldValue {
    match Amount::from_str(raw) {
        Ok(amount) => FieldValue::Number(amount.value()),
        // A cell of only `$` and `,` is not missing, it is a bad number.
        Err(e) if e.cleaned().is_empty() => FieldValue::Text(raw.trim().to_string()),
        Err(e) => FieldValue::Text(e.cleaned().to_string()),
    }
}

/// Replaces a literal zero amount with `quantity * price` when both are positive. The zero is kept
/// if the product does not fit in a `Decimal`.
fn derive_income_amount(row: &mut TransformedRow) {
    let amount = match row.get("amount") {
        Some(FieldValue::Number(n)) => *n,
        _ => return,
    };
    if !amount.is_zero() {
        return;
    }
    if let (Some(quantity), Some(price)) = (row.number("quantity"), row.number("price")) {
        if quantity > Decimal::ZERO && price > Decimal::ZERO {
            if let Some(amount) = quantity.checked_mul(price) {
                row.insert("amount", amount);
            }
        }
    }
}
