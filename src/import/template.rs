//! Sample CSV files users can download and fill in.

use crate::model::ImportKind;
use crate::utils;
use crate::Result;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXPENSE_HEADERS: &[&str] = &[
    "Date",
    "Vendor",
    "Category",
    "Item",
    "Unit Cost",
    "Quantity",
    "Notes",
];

const INCOME_HEADERS: &[&str] = &[
    "Date",
    "Item",
    "Quantity",
    "Price",
    "Amount",
    "Payment Method",
    "Notes",
];

const EXPENSE_EXAMPLES: &[&[&str]] = &[
    &[
        "2024-01-15",
        "Farm Supply Co",
        "Seeds",
        "Corn Seeds",
        "25.00",
        "10",
        "Spring planting",
    ],
    &[
        "2024-01-16",
        "Equipment Rental",
        "Equipment",
        "Tractor Rental",
        "150.00",
        "1",
        "Weekly rental",
    ],
];

const INCOME_EXAMPLES: &[&[&str]] = &[
    &[
        "2024-01-20",
        "Fresh Eggs",
        "100",
        "4.50",
        "450.00",
        "Cash",
        "Farmers market sale",
    ],
    &[
        "2024-01-22",
        "Grass-fed Beef",
        "50",
        "24.00",
        "1200.00",
        "Check",
        "Wholesale to restaurant",
    ],
];

type Template = (&'static [&'static str], &'static [&'static [&'static str]]);

fn template(kind: ImportKind) -> Template {
    match kind {
        ImportKind::Expenses => (EXPENSE_HEADERS, EXPENSE_EXAMPLES),
        ImportKind::Income => (INCOME_HEADERS, INCOME_EXAMPLES),
    }
}

/// Builds the template for `kind`: a header row followed by two example rows.
///
/// Feeding the result back through `parse` and `detect_mappings` maps every field.
pub fn generate_template(kind: ImportKind) -> Result<String> {
    let (headers, examples) = template(kind);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(headers)
        .context("Unable to write the template header")?;
    for row in examples {
        writer
            .write_record(*row)
            .context("Unable to write a template row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Unable to finish the template: {}", e.error()))?;
    String::from_utf8(bytes).context("The template is not valid UTF-8")
}

/// Writes the template for `kind` into `dir` as `<kind>-import-template.csv` and returns its path.
pub async fn write_template(kind: ImportKind, dir: &Path) -> Result<PathBuf> {
    let content = generate_template(kind)?;
    let path = dir.join(kind.template_file_name());
    utils::write(&path, content).await?;
    debug!("Wrote the {kind} template to {}", path.display());
    Ok(path)
}
