//! Typed records built from transformed rows, ready to be stored.

use crate::model::{parse_date, ImportKind, TransformedRow};
use crate::Result;
use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How an income sale was paid.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Check,
    CreditCard,
    DebitCard,
    BankTransfer,
    Online,
    Other,
}

serde_plain::derive_display_from_serialize!(PaymentMethod);

impl PaymentMethod {
    /// Maps the free text found in a payment method column. Unknown text yields `None`.
    pub fn from_text(s: &str) -> Option<Self> {
        let method = match s.trim().to_lowercase().as_str() {
            "cash" => PaymentMethod::Cash,
            "check" | "cheque" => PaymentMethod::Check,
            "credit_card" | "credit card" | "creditcard" => PaymentMethod::CreditCard,
            "debit_card" | "debit card" | "debitcard" => PaymentMethod::DebitCard,
            "bank_transfer" | "bank transfer" | "banktransfer" | "wire" => {
                PaymentMethod::BankTransfer
            }
            "online" | "paypal" | "venmo" => PaymentMethod::Online,
            "other" => PaymentMethod::Other,
            _ => return None,
        };
        Some(method)
    }
}

/// One purchased item from an expense import.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExpenseLine {
    pub date: String,
    pub vendor: String,
    pub category: String,
    pub item: String,
    pub unit_cost: Decimal,
    pub quantity: Decimal,
    pub line_total: Decimal,
    pub notes: String,
}

/// One sale from an income import.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct IncomeEntry {
    pub date: String,
    pub item: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub notes: String,
}

/// A record handed to a `BatchSink`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Expense(ExpenseLine),
    Income(IncomeEntry),
}

impl Record {
    /// Builds the stored form of `row`. Validation has already told the user about bad values,
    /// and any that remain fall back to the defaults below.
    ///
    /// - Unit cost and price default to 0; quantity defaults to 1.
    /// - Expense `line_total` is `unit_cost * quantity`.
    /// - An income amount of zero with positive quantity and price becomes `quantity * price`.
    /// - Dates that parse are written as `YYYY-MM-DD`, others are kept as typed.
    ///
    /// # Errors
    /// - Returns an error if a computed total does not fit in a `Decimal`.
    pub fn prepare(kind: ImportKind, row: &TransformedRow) -> Result<Self> {
        let date = normalize_date(&row.text("date"));
        let record = match kind {
            ImportKind::Expenses => {
                let unit_cost = row.number("unitCost").unwrap_or(Decimal::ZERO);
                let quantity = non_zero_or_one(row.number("quantity"));
                let line_total = unit_cost.checked_mul(quantity).with_context(|| {
                    format!(
                        "The line total of '{}' ({unit_cost} x {quantity}) is too large",
                        row.text("item")
                    )
                })?;
                Record::Expense(ExpenseLine {
                    date,
                    vendor: row.text("vendor"),
                    category: row.text("category"),
                    item: row.text("item"),
                    unit_cost,
                    quantity,
                    line_total,
                    notes: row.text("notes"),
                })
            }
            ImportKind::Income => {
                let quantity = non_zero_or_one(row.number("quantity"));
                let price = row.number("price").unwrap_or(Decimal::ZERO);
                let mut amount = row.number("amount").unwrap_or(Decimal::ZERO);
                if amount.is_zero() && quantity > Decimal::ZERO && price > Decimal::ZERO {
                    amount = quantity.checked_mul(price).with_context(|| {
                        format!(
                            "The amount of '{}' ({quantity} x {price}) is too large",
                            row.text("item")
                        )
                    })?;
                }
                Record::Income(IncomeEntry {
                    date,
                    item: row.text("item"),
                    quantity,
                    price,
                    amount,
                    payment_method: PaymentMethod::from_text(&row.text("paymentMethod")),
                    notes: row.text("notes"),
                })
            }
        };
        Ok(record)
    }
}

/// Expense lines that share a date and vendor. They are stored as one expense whose grand total
/// is the sum of the line totals.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExpenseGroup<'a> {
    pub date: &'a str,
    pub vendor: &'a str,
    pub lines: Vec<&'a ExpenseLine>,
}

impl ExpenseGroup<'_> {
    /// The notes of the first line, which become the notes of the expense.
    pub fn notes(&self) -> &str {
        self.lines.first().map(|l| l.notes.as_str()).unwrap_or_default()
    }

    /// The sum of the line totals, or `None` if it does not fit in a `Decimal`.
    pub fn grand_total(&self) -> Option<Decimal> {
        self.lines
            .iter()
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line.line_total))
    }
}

/// Groups `lines` by `(date, vendor)`. Groups are in order of first appearance and lines keep
/// their order within a group.
pub fn group_by_vendor_date<'a>(
    lines: impl IntoIterator<Item = &'a ExpenseLine>,
) -> Vec<ExpenseGroup<'a>> {
    let mut groups: Vec<ExpenseGroup<'a>> = Vec::new();
    for line in lines {
        match groups
            .iter_mut()
            .find(|g| g.date == line.date && g.vendor == line.vendor)
        {
            Some(group) => group.lines.push(line),
            None => groups.push(ExpenseGroup {
                date: &line.date,
                vendor: &line.vendor,
                lines: vec![line],
            }),
        }
    }
    groups
}

fn non_zero_or_one(value: Option<Decimal>) -> Decimal {
    match value {
        Some(v) if !v.is_zero() => v,
        _ => Decimal::ONE,
    }
}

fn normalize_date(s: &str) -> String {
    match parse_date(s) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => s.trim().to_string(),
    }
}
