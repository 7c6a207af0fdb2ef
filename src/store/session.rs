use super::codec::{bind_all, decode_row};
use super::{SessionMode, open_pool};
use crate::schema::{Record, SchemaSet, TableDef, Value, quote_ident};
use anyhow::{Context, Result};
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool};
use sqlx::{Row, Transaction};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A database session bound to one file and one schema version.
///
/// Every statement runs inside a lazily opened transaction; [`Session::commit`]
/// is the unit of durability. Dropping a session without committing rolls the
/// pending work back.
pub struct Session {
    path: PathBuf,
    mode: SessionMode,
    schema: Arc<SchemaSet>,
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
}

impl Session {
    pub async fn open(path: &Path, schema: Arc<SchemaSet>, mode: SessionMode) -> Result<Self> {
        let pool = open_pool(path, mode).await?;
        Ok(Self {
            path: path.to_path_buf(),
            mode,
            schema,
            pool,
            tx: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn schema(&self) -> &SchemaSet {
        &self.schema
    }

    /// Definition of `table` in this session's schema.
    pub fn table(&self, table: &str) -> Result<Arc<TableDef>> {
        self.schema
            .get(table)
            .cloned()
            .with_context(|| format!("table {table} is not part of the schema bound to {}", self.path.display()))
    }

    /// The session transaction, opened on first use.
    pub async fn connection(&mut self) -> Result<&mut SqliteConnection> {
        if self.tx.is_none() {
            let tx = self
                .pool
                .begin()
                .await
                .with_context(|| format!("begin transaction on {}", self.path.display()))?;
            self.tx = Some(tx);
        }
        let tx = self.tx.as_mut().context("session transaction missing")?;
        Ok(&mut **tx)
    }

    pub async fn count(&mut self, table: &str) -> Result<u64> {
        let def = self.table(table)?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&def.name));
        let conn = self.connection().await?;
        let row = sqlx::query(&sql)
            .fetch_one(&mut *conn)
            .await
            .with_context(|| format!("count rows of {table}"))?;
        let count: i64 = row.try_get(0)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// All rows of `table`, restricted to the columns the bound schema
    /// declares, in insertion order.
    pub async fn rows(&mut self, table: &str) -> Result<Vec<Record>> {
        let def = self.table(table)?;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            def.column_list(),
            quote_ident(&def.name)
        );
        self.fetch(&sql, &[])
            .await
            .with_context(|| format!("read rows of {table}"))
    }

    /// Run an arbitrary query and decode every row.
    pub async fn fetch(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Record>> {
        let conn = self.connection().await?;
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut *conn)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    /// Run a statement and return the number of affected rows.
    pub async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        anyhow::ensure!(
            self.mode == SessionMode::ReadWrite,
            "session on {} is read-only",
            self.path.display()
        );
        let conn = self.connection().await?;
        let result = bind_all(sqlx::query(sql), params)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert(&mut self, table: &str, record: &Record) -> Result<()> {
        let def = self.table(table)?;
        for column in record.keys() {
            anyhow::ensure!(def.has_field(column), "table {table} has no column {column}");
        }

        let sql = if record.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(&def.name))
        } else {
            let columns = record
                .keys()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; record.len()].join(", ");
            format!(
                "INSERT INTO {} ({columns}) VALUES ({placeholders})",
                quote_ident(&def.name)
            )
        };
        let values: Vec<Value> = record.values().cloned().collect();
        self.execute(&sql, &values)
            .await
            .with_context(|| format!("insert into {table}"))?;
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit()
                .await
                .with_context(|| format!("commit on {}", self.path.display()))?;
        }
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback()
                .await
                .with_context(|| format!("rollback on {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Roll back anything uncommitted and release the file. Safe to call twice.
    pub async fn close(&mut self) {
        if let Err(err) = self.rollback().await {
            tracing::warn!(path = %self.path.display(), "rollback on close failed: {err:#}");
        }
        self.pool.close().await;
    }
}
