//! The target schemas for each kind of import.

use serde::{Deserialize, Serialize};

/// The value type a target field expects.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Date,
}

/// Describes one target field of an import kind.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub struct FieldSpec {
    /// The unique key of the field, e.g. `unitCost`.
    pub key: &'static str,
    /// The human-readable label used in messages, e.g. `Unit Cost`.
    pub label: &'static str,
    pub required: bool,
    pub r#type: FieldType,
}

impl FieldSpec {
    const fn new(key: &'static str, label: &'static str, required: bool, r#type: FieldType) -> Self {
        Self {
            key,
            label,
            required,
            r#type,
        }
    }
}

const EXPENSE_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("date", "Date", true, FieldType::Date),
    FieldSpec::new("vendor", "Vendor", true, FieldType::String),
    FieldSpec::new("category", "Category", true, FieldType::String),
    FieldSpec::new("item", "Item", true, FieldType::String),
    FieldSpec::new("unitCost", "Unit Cost", true, FieldType::Number),
    FieldSpec::new("quantity", "Quantity", true, FieldType::Number),
    FieldSpec::new("notes", "Notes/Description", false, FieldType::String),
];

const INCOME_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("date", "Date", true, FieldType::Date),
    FieldSpec::new("item", "Item/Description", true, FieldType::String),
    FieldSpec::new("quantity", "Quantity", true, FieldType::Number),
    FieldSpec::new("price", "Unit Price", true, FieldType::Number),
    FieldSpec::new("amount", "Total Amount", true, FieldType::Number),
    FieldSpec::new("paymentMethod", "Payment Method", false, FieldType::String),
    FieldSpec::new("notes", "Notes", false, FieldType::String),
];

/// The kind of record being imported. Each kind has its own set of target fields.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    /// Expense line items: one row per purchased item.
    #[default]
    Expenses,
    /// Income rows: one row per sale.
    Income,
}

serde_plain::derive_display_from_serialize!(ImportKind);
serde_plain::derive_fromstr_from_deserialize!(ImportKind);

impl ImportKind {
    /// The target fields, in display order.
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            ImportKind::Expenses => EXPENSE_FIELDS,
            ImportKind::Income => INCOME_FIELDS,
        }
    }

    /// Looks up a field by key.
    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|f| f.key == key)
    }

    /// The fields that are checked as numbers during validation.
    pub fn numeric_fields(&self) -> &'static [&'static str] {
        match self {
            ImportKind::Expenses => &["unitCost", "quantity"],
            ImportKind::Income => &["quantity", "price", "amount"],
        }
    }

    /// The storage collection that committed records are inserted into.
    pub fn collection(&self) -> &'static str {
        match self {
            ImportKind::Expenses => "expense_line_items",
            ImportKind::Income => "income",
        }
    }

    /// The file name used when writing the sample template for this kind.
    pub fn template_file_name(&self) -> String {
        format!("{self}-import-template.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;

    #[test]
    fn test_field_keys_are_unique() {
        for kind in [ImportKind::Expenses, ImportKind::Income] {
            let keys: HashSet<&str> = kind.fields().iter().map(|f| f.key).collect();
            assert_eq!(keys.len(), kind.fields().len());
        }
    }

    #[test]
    fn test_numeric_fields_are_number_typed() {
        for kind in [ImportKind::Expenses, ImportKind::Income] {
            for key in kind.numeric_fields() {
                assert_eq!(kind.field(key).unwrap().r#type, FieldType::Number);
            }
        }
    }

    #[test]
    fn test_kind_display_and_parse() {
        assert_eq!(ImportKind::Expenses.to_string(), "expenses");
        assert_eq!(ImportKind::from_str("income").unwrap(), ImportKind::Income);
        assert!(ImportKind::from_str("invoices").is_err());
    }

    #[test]
    fn test_template_file_name() {
        assert_eq!(
            ImportKind::Expenses.template_file_name(),
            "expenses-import-template.csv"
        );
        assert_eq!(
            ImportKind::Income.template_file_name(),
            "income-import-template.csv"
        );
    }
}
