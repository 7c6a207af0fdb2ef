use super::codec::{cell_to_json, decode_row};
use anyhow::{Context, Result};
use sqlx::sqlite::SqliteConnection;

pub const CONFIG_TABLE: &str = "Config";

/// Tenant-scoped view over the `Config(tid, var_name, value)` table.
///
/// Values are stored as JSON text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantConfig {
    tid: i64,
}

impl TenantConfig {
    pub fn new(tid: i64) -> Self {
        Self { tid }
    }

    pub fn tid(&self) -> i64 {
        self.tid
    }

    pub async fn get(
        &self,
        conn: &mut SqliteConnection,
        key: &str,
    ) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query("SELECT value FROM \"Config\" WHERE tid = ? AND var_name = ?")
            .bind(self.tid)
            .bind(key)
            .fetch_optional(&mut *conn)
            .await
            .with_context(|| format!("load config {key} for tenant {}", self.tid))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let record = decode_row(&row)?;
        Ok(record.get("value").map(cell_to_json))
    }

    pub async fn set(
        &self,
        conn: &mut SqliteConnection,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO \"Config\" (tid, var_name, value) VALUES (?, ?, ?)
             ON CONFLICT (tid, var_name) DO UPDATE SET value = excluded.value",
        )
        .bind(self.tid)
        .bind(key)
        .bind(value.to_string())
        .execute(&mut *conn)
        .await
        .with_context(|| format!("store config {key} for tenant {}", self.tid))?;
        Ok(())
    }

    pub async fn keys(&self, conn: &mut SqliteConnection) -> Result<Vec<String>> {
        let keys: Vec<(String,)> =
            sqlx::query_as("SELECT var_name FROM \"Config\" WHERE tid = ? ORDER BY var_name")
                .bind(self.tid)
                .fetch_all(&mut *conn)
                .await
                .with_context(|| format!("list config keys for tenant {}", self.tid))?;
        Ok(keys.into_iter().map(|(k,)| k).collect())
    }

    pub async fn delete(&self, conn: &mut SqliteConnection, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM \"Config\" WHERE tid = ? AND var_name = ?")
            .bind(self.tid)
            .bind(key)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("delete config {key} for tenant {}", self.tid))?;
        Ok(result.rows_affected() > 0)
    }
}
