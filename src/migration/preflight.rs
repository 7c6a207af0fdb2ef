//! Checks that refuse a migration before any file is created or mutated.

use crate::catalog::{ENABLED_LANGUAGE_COLUMN, ENABLED_LANGUAGE_TABLE};
use crate::error::MigrationError;
use crate::schema::{SchemaRegistry, quote_ident};
use crate::store::{SessionMode, open_pool, table_exists};
use std::collections::BTreeSet;
use std::path::Path;

pub fn check_version(registry: &SchemaRegistry, starting: u32) -> Result<(), MigrationError> {
    if starting < registry.first_version() {
        return Err(MigrationError::UnsupportedStartingVersion {
            version: starting,
            first: registry.first_version(),
        });
    }
    if starting > registry.current_version() {
        return Err(MigrationError::NewerThanSupported {
            version: starting,
            current: registry.current_version(),
        });
    }
    Ok(())
}

/// Enabled languages without bundled translations, sorted.
pub fn unsupported_languages<'a>(
    enabled: impl IntoIterator<Item = &'a str>,
    supported: &BTreeSet<String>,
) -> Vec<String> {
    enabled
        .into_iter()
        .filter(|code| !supported.contains(*code))
        .map(ToString::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Refuse when the live database enables a language this release no longer
/// ships. Opens the live file read-only.
pub async fn check_languages(
    live: &Path,
    supported: &BTreeSet<String>,
) -> Result<(), MigrationError> {
    if !live.exists() {
        return Err(MigrationError::LiveDatabaseMissing(live.display().to_string()));
    }

    let pool = open_pool(live, SessionMode::ReadOnly)
        .await
        .map_err(|err| MigrationError::LiveDatabaseMissing(format!("{}: {err:#}", live.display())))?;

    let enabled = async {
        if !table_exists(&pool, ENABLED_LANGUAGE_TABLE).await? {
            return anyhow::Ok(Vec::new());
        }
        let sql = format!(
            "SELECT DISTINCT {} FROM {}",
            quote_ident(ENABLED_LANGUAGE_COLUMN),
            quote_ident(ENABLED_LANGUAGE_TABLE)
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql).fetch_all(&pool).await?;
        Ok(rows.into_iter().map(|(code,)| code).collect::<Vec<_>>())
    }
    .await;
    pool.close().await;

    let enabled = enabled.map_err(MigrationError::Workspace)?;
    let languages = unsupported_languages(enabled.iter().map(String::as_str), supported);
    if languages.is_empty() {
        Ok(())
    } else {
        Err(MigrationError::LanguageCompatibility { languages })
    }
}
