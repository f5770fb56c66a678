//! Schema migrations for the local store.
//!
//! Each schema version `NN` has two embedded scripts:
//! - `migration_NN_up.sql` moves the schema from `NN-1` to `NN`
//! - `migration_NN_down.sql` moves it from `NN` back to `NN-1`
//!
//! The applied version is kept in the single-row `schema_version` table.

use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

use crate::Result;

struct Migration {
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

/// The schema version this build expects.
pub(crate) const LATEST_VERSION: i32 = 1;

/// Creates the `schema_version` table at version 0 on a fresh database.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin schema bootstrap")?;
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
        .execute(&mut *tx)
        .await
        .context("Failed to create the schema_version table")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
        .execute(&mut *tx)
        .await
        .context("Failed to insert the initial schema version")?;
    tx.commit()
        .await
        .context("Failed to commit schema bootstrap")?;
    Ok(())
}

/// Reads the applied schema version.
pub(crate) async fn version(pool: &SqlitePool) -> Result<i32> {
    let (version,): (Option<i32>,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to read the schema version, is this a harvest database?")?;
    version.context("The schema_version table is empty")
}

/// Moves the schema from `current` to `target`, one version per transaction.
///
/// Every migration needed is checked for before any of them is run.
pub(crate) async fn run(pool: &SqlitePool, current: i32, target: i32) -> Result<()> {
    if current == target {
        debug!("Schema is already at version {target}");
        return Ok(());
    }
    check_available(current, target)?;

    if current < target {
        for version in (current + 1)..=target {
            debug!("Applying migration {version:02} (up)");
            apply(pool, find(version)?.up_sql, version).await?;
        }
    } else {
        for version in ((target + 1)..=current).rev() {
            debug!("Applying migration {version:02} (down)");
            apply(pool, find(version)?.down_sql, version - 1).await?;
        }
    }

    debug!("Schema is now at version {target}");
    Ok(())
}

fn find(version: i32) -> Result<&'static Migration> {
    MIGRATIONS
        .iter()
        .find(|m| m.version == version)
        .with_context(|| format!("Migration {version} not found"))
}

async fn apply(pool: &SqlitePool, sql: &str, new_version: i32) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    tx.execute(sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("UPDATE schema_version SET version = ?")
        .bind(new_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")?;
    Ok(())
}

fn check_available(current: i32, target: i32) -> Result<()> {
    let range = if current < target {
        (current + 1)..=target
    } else {
        (target + 1)..=current
    };
    for version in range {
        if !MIGRATIONS.iter().any(|m| m.version == version) {
            bail!("Migration {version} is required to go from version {current} to {target} but does not exist");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use tempfile::TempDir;

    async fn fresh_pool() -> (TempDir, SqlitePool) {
        let dir = TempDir::new().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(dir.path().join("test.sqlite"))
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        bootstrap(&pool).await.unwrap();
        (dir, pool)
    }

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_one(pool)
                .await
                .unwrap();
        count > 0
    }

    const TABLES: [&str; 4] = ["expenses", "expense_line_items", "income", "import_history"];

    #[tokio::test]
    async fn test_up_creates_tables() {
        let (_dir, pool) = fresh_pool().await;
        assert_eq!(version(&pool).await.unwrap(), 0);

        run(&pool, 0, LATEST_VERSION).await.unwrap();

        assert_eq!(version(&pool).await.unwrap(), LATEST_VERSION);
        for table in TABLES {
            assert!(table_exists(&pool, table).await, "{table}");
        }
    }

    #[tokio::test]
    async fn test_down_drops_tables() {
        let (_dir, pool) = fresh_pool().await;
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 0).await.unwrap();

        assert_eq!(version(&pool).await.unwrap(), 0);
        for table in TABLES {
            assert!(!table_exists(&pool, table).await, "{table}");
        }
    }

    #[tokio::test]
    async fn test_same_version_is_a_no_op() {
        let (_dir, pool) = fresh_pool().await;
        run(&pool, 0, 1).await.unwrap();
        run(&pool, 1, 1).await.unwrap();
        assert_eq!(version(&pool).await.unwrap(), 1);
    }

    #[test]
    fn test_check_available() {
        assert!(check_available(0, 1).is_ok());
        assert!(check_available(1, 0).is_ok());
        assert!(check_available(0, 2).is_err());
        assert!(check_available(1, 3).is_err());
    }
}
