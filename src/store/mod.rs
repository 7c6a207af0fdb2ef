mod codec;
mod session;
mod tenant_config;

pub use session::Session;
pub use tenant_config::{CONFIG_TABLE, TenantConfig};

pub(crate) use codec::{cell_to_json, decode_row};

use crate::config::StoreLayout;
use crate::schema::{SchemaSet, quote_ident};
use anyhow::{Context, Result};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    ReadOnly,
    ReadWrite,
}

/// Open a single-connection pool on `path`.
///
/// Read-only pools never create the file. Foreign keys stay off: tables are
/// migrated one at a time and may reference rows that arrive later in the step.
pub async fn open_pool(path: &Path, mode: SessionMode) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .read_only(mode == SessionMode::ReadOnly)
        .create_if_missing(mode == SessionMode::ReadWrite)
        .journal_mode(SqliteJournalMode::Delete)
        .foreign_keys(false);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", path.display()))
}

/// Create a brand-new database file holding every table of `schema`.
pub async fn create_database(path: &Path, schema: &SchemaSet) -> Result<()> {
    anyhow::ensure!(
        !path.exists(),
        "refusing to create database over existing file {}",
        path.display()
    );

    let pool = open_pool(path, SessionMode::ReadWrite).await?;
    let result = async {
        let mut tx = pool.begin().await?;
        for ddl in schema.ddl() {
            sqlx::query(&ddl)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("create table: {ddl}"))?;
        }
        tx.commit().await?;
        anyhow::Ok(())
    }
    .await;
    pool.close().await;
    result.with_context(|| format!("Failed to create schema in {}", path.display()))
}

pub async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(pool)
            .await
            .with_context(|| format!("look up table {table}"))?;
    Ok(count > 0)
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<u64> {
    let row = sqlx::query(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))
        .fetch_one(pool)
        .await
        .with_context(|| format!("count rows of {table}"))?;
    let count: i64 = row.try_get(0)?;
    Ok(u64::try_from(count).unwrap_or_default())
}

/// Schema version persisted by a deployment, or `None` for a fresh install.
///
/// The single-file layout records it as tenant 1's `version_db` config entry;
/// older deployments are recognized by their per-version file names.
pub async fn detect_stored_version(layout: &StoreLayout) -> Result<Option<u32>> {
    let final_db = layout.final_db();
    if final_db.exists() {
        let pool = open_pool(&final_db, SessionMode::ReadOnly).await?;
        let version = read_version_db(&pool).await;
        pool.close().await;
        return version.map(Some);
    }

    let legacy_dir = layout.legacy_dir();
    if !legacy_dir.is_dir() {
        return Ok(None);
    }

    let mut newest = None;
    for entry in std::fs::read_dir(&legacy_dir)
        .with_context(|| format!("list {}", legacy_dir.display()))?
    {
        let entry = entry?;
        if let Some(version) = entry
            .file_name()
            .to_str()
            .and_then(|name| layout.parse_legacy_file_name(name))
        {
            newest = newest.max(Some(version));
        }
    }
    Ok(newest)
}

async fn read_version_db(pool: &SqlitePool) -> Result<u32> {
    anyhow::ensure!(
        table_exists(pool, CONFIG_TABLE).await?,
        "database has no {CONFIG_TABLE} table"
    );

    let (has_tid,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = 'tid'")
            .bind(CONFIG_TABLE)
            .fetch_one(pool)
            .await?;

    let sql = if has_tid > 0 {
        "SELECT value FROM \"Config\" WHERE var_name = 'version_db' AND tid = 1"
    } else {
        "SELECT value FROM \"Config\" WHERE var_name = 'version_db'"
    };
    let row = sqlx::query(sql)
        .fetch_optional(pool)
        .await?
        .context("no version_db entry in Config")?;
    let record = decode_row(&row)?;
    let value = record.get("value").map(cell_to_json).unwrap_or_default();

    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .and_then(|v| u32::try_from(v).ok())
        .with_context(|| format!("invalid version_db value: {value}"))
}
