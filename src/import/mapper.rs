//! Guesses which CSV column feeds each target field.

use crate::model::{ColumnMapping, ImportKind, MappingTarget};
use tracing::debug;

/// Known header spellings for each field key, in priority order.
const SYNONYMS: &[(&str, &[&str])] = &[
    (
        "date",
        &[
            "date",
            "transaction date",
            "trans date",
            "purchase date",
            "sale date",
            "invoice date",
        ],
    ),
    (
        "vendor",
        &["vendor", "supplier", "merchant", "company", "store", "payee"],
    ),
    (
        "category",
        &[
            "category",
            "type",
            "expense type",
            "income type",
            "classification",
        ],
    ),
    (
        "item",
        &[
            "item",
            "product",
            "description",
            "line item",
            "name",
            "service",
        ],
    ),
    (
        "unitCost",
        &[
            "unit cost",
            "price",
            "unit price",
            "cost",
            "rate",
            "amount per unit",
        ],
    ),
    (
        "quantity",
        &["quantity", "qty", "count", "units", "number"],
    ),
    (
        "notes",
        &["notes", "description", "memo", "comments", "remarks"],
    ),
    (
        "price",
        &["price", "unit price", "rate", "cost per unit", "unit cost"],
    ),
    (
        "amount",
        &[
            "amount",
            "total",
            "grand total",
            "sum",
            "value",
            "total amount",
        ],
    ),
    (
        "paymentMethod",
        &[
            "payment method",
            "payment type",
            "method",
            "paid by",
            "payment",
        ],
    ),
];

/// The synonyms for `key`, if it has an entry in the table.
pub fn synonyms(key: &str) -> Option<&'static [&'static str]> {
    SYNONYMS.iter().find(|(k, _)| *k == key).map(|(_, s)| *s)
}

/// Builds a best-effort mapping from `headers` to the fields of `kind`.
///
/// For each field, synonyms are tried in order; for each synonym the first header that equals
/// it (case-insensitively), contains it, or is contained by it wins. Fields without a table entry
/// use their lower-cased key as the only synonym. Empty headers never match. Fields with no match
/// are left unmapped.
pub fn detect_mappings(headers: &[String], kind: ImportKind) -> ColumnMapping {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut mapping = ColumnMapping::unmapped(kind);

    for field in kind.fields() {
        let fallback = [field.key.to_lowercase()];
        let found = match synonyms(field.key) {
            Some(list) => find_header(&normalized, list.iter().copied()),
            None => find_header(&normalized, fallback.iter().map(String::as_str)),
        };

        if let Some(idx) = found {
            debug!("Detected column '{}' for field '{}'", headers[idx], field.key);
            // Keys come from `kind.fields()`, so `set` cannot reject them.
            let _ = mapping.set(field.key, MappingTarget::Column(headers[idx].clone()));
        }
    }

    mapping
}

fn find_header<'a>(
    normalized: &[String],
    synonyms: impl IntoIterator<Item = &'a str>,
) -> Option<usize> {
    synonyms.into_iter().find_map(|synonym| {
        normalized.iter().position(|h| {
            !h.is_empty() && (h == synonym || h.contains(synonym) || synonym.contains(h.as_str()))
        })
    })
}
