//! This module is responsible for reading, writing and managing the SQLite database that holds
//! imported records and the import history.

mod migrations;

use crate::model::{
    group_by_vendor_date, ExpenseGroup, ImportKind, ImportResult, IncomeEntry, Record,
};
use crate::sink::BatchSink;
use crate::Result;
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// The overall outcome of one import, as recorded in the history.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Every row was stored.
    Completed,
    /// Some rows were stored and some were not.
    CompletedWithErrors,
    /// No rows were stored.
    Failed,
}

serde_plain::derive_display_from_serialize!(ImportStatus);
serde_plain::derive_fromstr_from_deserialize!(ImportStatus);

impl ImportStatus {
    pub fn from_result(result: &ImportResult) -> Self {
        if result.failed == 0 {
            ImportStatus::Completed
        } else if result.successful == 0 {
            ImportStatus::Failed
        } else {
            ImportStatus::CompletedWithErrors
        }
    }
}

/// One entry in the import history.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ImportLog {
    pub id: Uuid,
    pub farm_id: String,
    pub kind: ImportKind,
    pub filename: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub status: ImportStatus,
    pub created_at: DateTime<Utc>,
}

impl ImportLog {
    /// Builds a new entry, stamped now, for a finished import.
    pub fn new(
        farm_id: impl Into<String>,
        kind: ImportKind,
        filename: impl Into<String>,
        result: &ImportResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            farm_id: farm_id.into(),
            kind,
            filename: filename.into(),
            total: result.total,
            successful: result.successful,
            failed: result.failed,
            status: ImportStatus::from_result(result),
            // Stored with microsecond precision.
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("id")?;
        let kind: String = row.try_get("kind")?;
        let status: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;
        let total: i64 = row.try_get("total_rows")?;
        let successful: i64 = row.try_get("successful_rows")?;
        let failed: i64 = row.try_get("failed_rows")?;
        Ok(Self {
            id: Uuid::parse_str(&id).with_context(|| format!("Bad import id '{id}'"))?,
            farm_id: row.try_get("farm_id")?,
            kind: ImportKind::from_str(&kind).with_context(|| format!("Bad import kind '{kind}'"))?,
            filename: row.try_get("filename")?,
            total: usize::try_from(total)?,
            successful: usize::try_from(successful)?,
            failed: usize::try_from(failed)?,
            status: ImportStatus::from_str(&status)
                .with_context(|| format!("Bad import status '{status}'"))?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .with_context(|| format!("Bad import timestamp '{created_at}'"))?
                .with_timezone(&Utc),
        })
    }
}

/// The SQLite store for one farm.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
    farm_id: String,
}

impl Db {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Creates the schema at the latest version
    pub async fn init(path: impl AsRef<Path>, farm_id: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at {}", path.display());
        }
        let pool = connect(path, true).await?;
        migrations::bootstrap(&pool).await?;
        migrations::run(&pool, 0, migrations::LATEST_VERSION).await?;
        info!("Created database at {}", path.display());
        Ok(Self {
            pool,
            farm_id: farm_id.into(),
        })
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Migrates the schema forward if it is out-of-date
    pub async fn load(path: impl AsRef<Path>, farm_id: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!(
                "No database found at {}, run 'harvest init' first",
                path.display()
            );
        }
        let pool = connect(path, false).await?;
        let current = migrations::version(&pool).await?;
        if current > migrations::LATEST_VERSION {
            bail!(
                "The database schema is at version {current}, newer than this program supports ({})",
                migrations::LATEST_VERSION
            );
        }
        migrations::run(&pool, current, migrations::LATEST_VERSION).await?;
        Ok(Self {
            pool,
            farm_id: farm_id.into(),
        })
    }

    pub fn farm_id(&self) -> &str {
        &self.farm_id
    }

    /// The number of this farm's rows in `collection`.
    pub async fn count(&self, collection: &str) -> Result<u64> {
        let table = match collection {
            EXPENSES => EXPENSES,
            other => table_for(other)?,
        };
        let (count,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM {table} WHERE farm_id = ?"))
                .bind(&self.farm_id)
                .fetch_one(&self.pool)
                .await
                .with_context(|| format!("Unable to count rows in {table}"))?;
        Ok(u64::try_from(count)?)
    }

    /// Appends `log` to the import history.
    pub async fn log_import(&self, log: &ImportLog) -> Result<()> {
        sqlx::query(
            "INSERT INTO import_history \
             (id, farm_id, kind, filename, total_rows, successful_rows, failed_rows, status, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(log.id.to_string())
        .bind(&log.farm_id)
        .bind(log.kind.to_string())
        .bind(&log.filename)
        .bind(i64::try_from(log.total)?)
        .bind(i64::try_from(log.successful)?)
        .bind(i64::try_from(log.failed)?)
        .bind(log.status.to_string())
        .bind(timestamp(&log.created_at))
        .execute(&self.pool)
        .await
        .context("Unable to write to the import history")?;
        debug!("Logged import {} of {}", log.id, log.filename);
        Ok(())
    }

    /// This farm's most recent imports, newest first, optionally only those of `kind`.
    pub async fn import_history(
        &self,
        kind: Option<ImportKind>,
        limit: u32,
    ) -> Result<Vec<ImportLog>> {
        let rows = sqlx::query(
            "SELECT * FROM import_history \
             WHERE farm_id = ?1 AND (?2 IS NULL OR kind = ?2) \
             ORDER BY created_at DESC, rowid DESC LIMIT ?3",
        )
        .bind(&self.farm_id)
        .bind(kind.map(|k| k.to_string()))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .context("Unable to read the import history")?;
        rows.iter().map(ImportLog::from_row).collect()
    }
}

#[async_trait::async_trait]
impl BatchSink for Db {
    /// Inserts the whole batch in one transaction: either every record is stored or none is.
    ///
    /// Expense lines are grouped by date and vendor. Each group becomes one row in `expenses`
    /// holding the grand total, and its lines point at that row.
    async fn insert_batch(&mut self, collection: &str, records: &[Record]) -> Result<usize> {
        let table = table_for(collection)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Unable to begin a transaction")?;
        let created_at = timestamp(&Utc::now());

        if table == EXPENSE_LINE_ITEMS {
            let lines = records
                .iter()
                .map(|record| match record {
                    Record::Expense(line) => Ok(line),
                    Record::Income(_) => Err(anyhow!("Cannot store an income record in {table}")),
                })
                .collect::<Result<Vec<_>>>()?;
            let groups = group_by_vendor_date(lines);
            for group in &groups {
                insert_expense(&mut tx, &self.farm_id, group, &created_at).await?;
            }
            debug!("Grouped {} lines into {} expenses", records.len(), groups.len());
        } else {
            for record in records {
                match record {
                    Record::Income(entry) => {
                        insert_income(&mut tx, &self.farm_id, entry, &created_at).await?
                    }
                    Record::Expense(_) => bail!("Cannot store an expense record in {table}"),
                }
            }
        }

        tx.commit()
            .await
            .with_context(|| format!("Unable to commit a batch into {table}"))?;
        debug!("Stored {} records in {table}", records.len());
        Ok(records.len())
    }
}

async fn connect(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create);
    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open the database at {}", path.display()))
}

const EXPENSES: &str = "expenses";
const EXPENSE_LINE_ITEMS: &str = "expense_line_items";
const INCOME: &str = "income";

/// The table that records of `collection` are inserted into.
fn table_for(collection: &str) -> Result<&'static str> {
    match collection {
        EXPENSE_LINE_ITEMS => Ok(EXPENSE_LINE_ITEMS),
        INCOME => Ok(INCOME),
        other => bail!("Unknown collection '{other}'"),
    }
}

/// RFC 3339 with a fixed precision, so that text ordering is time ordering.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn optional(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Inserts one expense and its line items.
async fn insert_expense(
    tx: &mut Transaction<'_, Sqlite>,
    farm_id: &str,
    group: &ExpenseGroup<'_>,
    created_at: &str,
) -> Result<()> {
    let grand_total = group.grand_total().with_context(|| {
        format!(
            "The grand total for {} on {} is too large",
            group.vendor, group.date
        )
    })?;
    let expense_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO expenses (id, farm_id, date, vendor, notes, grand_total, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&expense_id)
    .bind(farm_id)
    .bind(group.date)
    .bind(group.vendor)
    .bind(optional(group.notes()))
    .bind(grand_total.to_string())
    .bind(created_at)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("Unable to insert the expense for {}", group.vendor))?;

    for line in &group.lines {
        sqlx::query(
            "INSERT INTO expense_line_items \
             (id, expense_id, farm_id, category, item, unit_cost, quantity, line_total, notes, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&expense_id)
        .bind(farm_id)
        .bind(&line.category)
        .bind(&line.item)
        .bind(line.unit_cost.to_string())
        .bind(line.quantity.to_string())
        .bind(line.line_total.to_string())
        .bind(optional(&line.notes))
        .bind(created_at)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("Unable to insert expense line '{}'", line.item))?;
    }
    Ok(())
}

async fn insert_income(
    tx: &mut Transaction<'_, Sqlite>,
    farm_id: &str,
    entry: &IncomeEntry,
    created_at: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO income \
         (id, farm_id, date, item, quantity, price, amount, payment_method, notes, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(farm_id)
    .bind(&entry.date)
    .bind(&entry.item)
    .bind(entry.quantity.to_string())
    .bind(entry.price.to_string())
    .bind(entry.amount.to_string())
    .bind(entry.payment_method.map(|m| m.to_string()))
    .bind(optional(&entry.notes))
    .bind(created_at)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("Unable to insert income '{}'", entry.item))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PaymentMethod, TransformedRow};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    async fn fresh_db() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("harvest.sqlite"), "farm-1")
            .await
            .unwrap();
        (dir, db)
    }

    fn income(item: &str) -> Record {
        let mut row = TransformedRow::new();
        row.insert("date", "01/20/2024");
        row.insert("item", item);
        row.insert("quantity", Decimal::from(100));
        row.insert("price", Decimal::new(450, 2));
        row.insert("amount", Decimal::ZERO);
        row.insert("paymentMethod", "cash");
        Record::prepare(ImportKind::Income, &row).unwrap()
    }

    fn expense(date: &str, vendor: &str, item: &str, unit_cost: Decimal) -> Record {
        let mut row = TransformedRow::new();
        row.insert("date", date);
        row.insert("vendor", vendor);
        row.insert("category", "Feed");
        row.insert("item", item);
        row.insert("unitCost", unit_cost);
        row.insert("quantity", Decimal::from(2));
        row.insert("notes", format!("{item} for the barn").as_str());
        Record::prepare(ImportKind::Expenses, &row).unwrap()
    }

    #[tokio::test]
    async fn test_init_then_load() {
        let (dir, db) = fresh_db().await;
        let path = dir.path().join("harvest.sqlite");
        assert!(Db::init(&path, "farm-1").await.is_err());
        drop(db);
        let db = Db::load(&path, "farm-1").await.unwrap();
        assert_eq!(db.count("income").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Db::load(dir.path().join("nope.sqlite"), "farm-1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("harvest init"));
    }

    #[tokio::test]
    async fn test_insert_batch() {
        let (_dir, mut db) = fresh_db().await;
        let stored = db
            .insert_batch("income", &[income("Fresh Eggs"), income("Honey")])
            .await
            .unwrap();
        assert_eq!(stored, 2);
        assert_eq!(db.count("income").await.unwrap(), 2);

        let (amount, method, date): (String, Option<String>, String) =
            sqlx::query_as("SELECT amount, payment_method, date FROM income WHERE item = 'Honey'")
                .fetch_one(&db.pool)
                .await
                .unwrap();
        assert_eq!(amount, "450.00");
        assert_eq!(method.as_deref(), Some(PaymentMethod::Cash.to_string().as_str()));
        assert_eq!(date, "2024-01-20");
    }

    #[tokio::test]
    async fn test_mismatched_batch_is_rolled_back() {
        let (_dir, mut db) = fresh_db().await;
        let mut expense = TransformedRow::new();
        expense.insert("item", "Seeds");
        let records = vec![
            income("Eggs"),
            Record::prepare(ImportKind::Expenses, &expense).unwrap(),
        ];
        assert!(db.insert_batch("income", &records).await.is_err());
        assert_eq!(db.count("income").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expense_lines_are_grouped_by_date_and_vendor() {
        let (_dir, mut db) = fresh_db().await;
        let records = vec![
            expense("01/15/2024", "Acme Feed", "Hay", Decimal::new(12500, 2)),
            expense("01/16/2024", "Acme Feed", "Oats", Decimal::new(1000, 2)),
            expense("2024-01-15", "Acme Feed", "Straw", Decimal::new(7500, 2)),
        ];
        let stored = db
            .insert_batch("expense_line_items", &records)
            .await
            .unwrap();
        assert_eq!(stored, 3);
        assert_eq!(db.count("expense_line_items").await.unwrap(), 3);
        assert_eq!(db.count("expenses").await.unwrap(), 2);

        let (id, grand_total, notes): (String, String, Option<String>) = sqlx::query_as(
            "SELECT id, grand_total, notes FROM expenses \
             WHERE date = '2024-01-15' AND vendor = 'Acme Feed'",
        )
        .fetch_one(&db.pool)
        .await
        .unwrap();
        assert_eq!(grand_total, "400.00");
        assert_eq!(notes.as_deref(), Some("Hay for the barn"));

        let items: Vec<(String,)> = sqlx::query_as(
            "SELECT item FROM expense_line_items WHERE expense_id = ? ORDER BY item",
        )
        .bind(&id)
        .fetch_all(&db.pool)
        .await
        .unwrap();
        let items: Vec<_> = items.into_iter().map(|(item,)| item).collect();
        assert_eq!(items, vec!["Hay", "Straw"]);
    }

    #[tokio::test]
    async fn test_failed_expense_batch_leaves_no_expense() {
        let (_dir, mut db) = fresh_db().await;
        let records = vec![
            expense("01/15/2024", "Acme Feed", "Hay", Decimal::new(12500, 2)),
            income("Eggs"),
        ];
        assert!(db
            .insert_batch("expense_line_items", &records)
            .await
            .is_err());
        assert_eq!(db.count("expenses").await.unwrap(), 0);
        assert_eq!(db.count("expense_line_items").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let (_dir, mut db) = fresh_db().await;
        let err = db.insert_batch("cows", &[income("Eggs")]).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown collection 'cows'");
        assert!(db.count("cows").await.is_err());
    }

    #[tokio::test]
    async fn test_import_history() {
        let (_dir, db) = fresh_db().await;
        let partial = ImportResult::new(10, 8, vec!["Batch 1: boom".to_string()]);
        let first = ImportLog::new("farm-1", ImportKind::Expenses, "a.csv", &partial);
        let second = ImportLog::new(
            "farm-1",
            ImportKind::Income,
            "b.csv",
            &ImportResult::new(3, 3, vec![]),
        );
        let other_farm = ImportLog::new(
            "farm-2",
            ImportKind::Income,
            "c.csv",
            &ImportResult::new(1, 0, vec![]),
        );
        for log in [&first, &second, &other_farm] {
            db.log_import(log).await.unwrap();
        }

        let all = db.import_history(None, 10).await.unwrap();
        assert_eq!(all, vec![second.clone(), first.clone()]);
        assert_eq!(all[1].status, ImportStatus::CompletedWithErrors);
        assert_eq!(all[1].failed, 2);

        let income_only = db
            .import_history(Some(ImportKind::Income), 10)
            .await
            .unwrap();
        assert_eq!(income_only, vec![second]);

        assert_eq!(db.import_history(None, 1).await.unwrap().len(), 1);
    }

    #[test]
    fn test_import_log_json() {
        let log = ImportLog::new(
            "farm-1",
            ImportKind::Expenses,
            "feed.csv",
            &ImportResult::new(4, 3, vec!["Batch 2: boom".to_string()]),
        );
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains(&log.id.to_string()));
        let back: ImportLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }

    #[test]
    fn test_import_status() {
        let status = |total, ok| ImportStatus::from_result(&ImportResult::new(total, ok, vec![]));
        assert_eq!(status(5, 5), ImportStatus::Completed);
        assert_eq!(status(5, 2), ImportStatus::CompletedWithErrors);
        assert_eq!(status(5, 0), ImportStatus::Failed);
        assert_eq!(
            ImportStatus::CompletedWithErrors.to_string(),
            "completed_with_errors"
        );
    }
}
