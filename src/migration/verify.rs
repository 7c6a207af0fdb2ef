//! Post-step row-count reconciliation.

use super::driver::CountPolicy;
use crate::error::MigrationError;
use crate::store::{SessionMode, count_rows, open_pool};
use serde::Serialize;
use std::path::Path;

/// A table to reconcile: source count captured before the step ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityCheck {
    pub table: String,
    pub expected: u64,
    pub policy: CountPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityEntry {
    pub table: String,
    pub expected: u64,
    pub actual: u64,
    pub policy: CountPolicy,
}

impl IntegrityEntry {
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub version: u32,
    pub entries: Vec<IntegrityEntry>,
}

impl IntegrityReport {
    pub fn mismatches(&self) -> impl Iterator<Item = &IntegrityEntry> {
        self.entries.iter().filter(|e| !e.matches())
    }
}

/// Count every checked table in `path` through a fresh read-only connection.
///
/// A `StrictEqual` mismatch aborts with [`MigrationError::IntegrityMismatch`];
/// a `WarnOnMismatch` one is logged.
pub async fn verify_step(
    path: &Path,
    version: u32,
    checks: &[IntegrityCheck],
) -> Result<IntegrityReport, MigrationError> {
    let pool = open_pool(path, SessionMode::ReadOnly)
        .await
        .map_err(MigrationError::Workspace)?;

    let mut report = IntegrityReport {
        version,
        entries: Vec::with_capacity(checks.len()),
    };
    let mut failure = None;

    for check in checks {
        let actual = match count_rows(&pool, &check.table).await {
            Ok(actual) => actual,
            Err(source) => {
                failure = Some(MigrationError::TableMigration {
                    table: check.table.clone(),
                    version,
                    source,
                });
                break;
            }
        };

        let entry = IntegrityEntry {
            table: check.table.clone(),
            expected: check.expected,
            actual,
            policy: check.policy,
        };

        if entry.matches() {
            tracing::info!(version, table = %entry.table, "{} table migrated ({} entries)", entry.table, actual);
        } else if entry.policy == CountPolicy::WarnOnMismatch {
            tracing::warn!(
                version,
                table = %entry.table,
                expected = entry.expected,
                actual,
                "{} table migrated (entries count changed from {} to {})",
                entry.table,
                entry.expected,
                actual
            );
        } else {
            tracing::error!(
                version,
                table = %entry.table,
                expected = entry.expected,
                actual,
                "integrity check failed on count equality"
            );
            failure = Some(MigrationError::IntegrityMismatch {
                table: entry.table.clone(),
                version,
                expected: entry.expected,
                actual,
            });
            report.entries.push(entry);
            break;
        }
        report.entries.push(entry);
    }

    pool.close().await;
    match failure {
        Some(err) => Err(err),
        None => Ok(report),
    }
}
