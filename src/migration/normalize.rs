//! One-shot reconciliation of a current-version database against the
//! bundled defaults.

use super::preflight::unsupported_languages;
use super::seed::{enabled_languages, ensure_submission_statuses, tenant_ids};
use crate::appdata::{AppData, DefaultsProvider};
use crate::error::MigrationError;
use crate::schema::{Record, SchemaSet, Value};
use crate::store::{Session, SessionMode, TenantConfig};
use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

const ROOT_TENANT: i64 = 1;
const CONFIG_L10N_TABLE: &str = "ConfigL10N";
const ENABLED_LANGUAGE_TABLE: &str = "EnabledLanguage";

pub struct PostMigrationNormalizer {
    defaults: Arc<dyn DefaultsProvider>,
    app_version: String,
}

impl PostMigrationNormalizer {
    pub fn new(defaults: Arc<dyn DefaultsProvider>, app_version: &str) -> Self {
        Self {
            defaults,
            app_version: app_version.to_string(),
        }
    }

    /// Reconcile the database at `path` inside one transaction, rolled back
    /// in full on any error.
    pub async fn run(
        &self,
        path: &Path,
        schema: Arc<SchemaSet>,
        schema_version: u32,
    ) -> Result<(), MigrationError> {
        let mut session = Session::open(path, schema, SessionMode::ReadWrite)
            .await
            .map_err(MigrationError::Normalization)?;

        let result = self.apply(&mut session, schema_version).await;
        let result = match result {
            Ok(()) => session.commit().await.map_err(MigrationError::Normalization),
            Err(err) => {
                tracing::error!("normalization failed, rolling back: {err}");
                if let Err(rollback) = session.rollback().await {
                    tracing::warn!("rollback failed: {rollback:#}");
                }
                Err(err)
            }
        };
        session.close().await;
        result
    }

    /// Seed tenant 1 with its first language, then run the regular pass.
    pub async fn initialize(
        &self,
        path: &Path,
        schema: Arc<SchemaSet>,
        schema_version: u32,
    ) -> Result<(), MigrationError> {
        let mut session = Session::open(path, schema.clone(), SessionMode::ReadWrite)
            .await
            .map_err(MigrationError::Normalization)?;

        let seeded = async {
            let mut tenant = Record::new();
            tenant.insert("id".into(), Value::from(ROOT_TENANT));
            tenant.insert("active".into(), Value::from(true));
            tenant.insert(
                "creation_date".into(),
                Value::from(chrono::Utc::now().to_rfc3339()),
            );
            session.insert("Tenant", &tenant).await?;
            enable_language(&mut session, ROOT_TENANT, "en").await?;
            session.commit().await
        }
        .await;
        session.close().await;
        seeded.map_err(MigrationError::Normalization)?;

        self.run(path, schema, schema_version).await
    }

    async fn apply(&self, session: &mut Session, schema_version: u32) -> Result<(), MigrationError> {
        let supported = self.defaults.supported_language_codes();
        let enabled = session
            .fetch("SELECT DISTINCT name FROM \"EnabledLanguage\"", &[])
            .await
            .map_err(MigrationError::Normalization)?;
        let languages = unsupported_languages(
            enabled
                .iter()
                .filter_map(|row| row.get("name").and_then(Value::as_str)),
            &supported,
        );
        if !languages.is_empty() {
            return Err(MigrationError::LanguageCompatibility { languages });
        }

        self.refresh(session, schema_version)
            .await
            .map_err(MigrationError::Normalization)
    }

    async fn refresh(&self, session: &mut Session, schema_version: u32) -> Result<()> {
        let root = TenantConfig::new(ROOT_TENANT);
        let stored = root.get(session.connection().await?, "version").await?;

        if stored.as_ref().and_then(serde_json::Value::as_str) != Some(self.app_version.as_str()) {
            tracing::info!(
                from = ?stored,
                to = %self.app_version,
                "refreshing defaults for new application version"
            );
            let data = self.defaults.load_defaults()?;
            for tid in tenant_ids(session).await? {
                update_tenant_defaults(session, tid, &data)
                    .await
                    .with_context(|| format!("update defaults of tenant {tid}"))?;
            }
        }

        let conn = session.connection().await?;
        root.set(conn, "version", &json!(self.app_version)).await?;
        root.set(conn, "latest_version", &json!(self.app_version)).await?;
        root.set(conn, "version_db", &json!(schema_version)).await?;
        Ok(())
    }
}

async fn update_tenant_defaults(session: &mut Session, tid: i64, data: &AppData) -> Result<()> {
    let config = TenantConfig::new(tid);

    let existing = config.keys(session.connection().await?).await?;
    for (key, value) in &data.config {
        if !existing.contains(key) {
            config.set(session.connection().await?, key, value).await?;
        }
    }
    for key in existing.iter().filter(|k| !data.is_known_config_key(k)) {
        tracing::debug!(tid, key = %key, "dropping unknown config key");
        config.delete(session.connection().await?, key).await?;
    }

    let languages = fix_languages(session, tid, data).await?;

    for lang in &languages {
        for key in &data.localized_keys {
            let present = session
                .fetch(
                    "SELECT 1 AS present FROM \"ConfigL10N\" WHERE tid = ? AND lang = ? AND var_name = ?",
                    &[Value::from(tid), Value::from(lang.as_str()), Value::from(key.as_str())],
                )
                .await?;
            if present.is_empty() {
                let mut record = Record::new();
                record.insert("tid".into(), Value::from(tid));
                record.insert("lang".into(), Value::from(lang.as_str()));
                record.insert("var_name".into(), Value::from(key.as_str()));
                record.insert(
                    "value".into(),
                    Value::from(data.localized_text(lang, key).unwrap_or_default()),
                );
                session.insert(CONFIG_L10N_TABLE, &record).await?;
            }
        }
    }

    ensure_submission_statuses(session, tid, &data.submission_statuses).await?;
    Ok(())
}

/// Every tenant keeps at least one enabled language and a `default_language`
/// that is one of them. Returns the enabled languages.
async fn fix_languages(session: &mut Session, tid: i64, data: &AppData) -> Result<Vec<String>> {
    let config = TenantConfig::new(tid);
    let mut languages = enabled_languages(session, tid).await?;

    let default_language = config
        .get(session.connection().await?, "default_language")
        .await?
        .and_then(|v| v.as_str().map(ToString::to_string));

    if languages.is_empty() {
        let lang = default_language
            .clone()
            .filter(|l| data.localized.contains_key(l))
            .unwrap_or_else(|| "en".to_string());
        enable_language(session, tid, &lang).await?;
        languages.push(lang);
    }

    if let Some(first) = languages.first()
        && default_language.as_deref().is_none_or(|l| !languages.iter().any(|e| e == l))
    {
        tracing::info!(tid, language = %first, "resetting default_language to an enabled language");
        config
            .set(session.connection().await?, "default_language", &json!(first))
            .await?;
    }

    Ok(languages)
}

async fn enable_language(session: &mut Session, tid: i64, lang: &str) -> Result<()> {
    let mut record = Record::new();
    record.insert("tid".into(), Value::from(tid));
    record.insert("name".into(), Value::from(lang));
    session.insert(ENABLED_LANGUAGE_TABLE, &record).await
}
