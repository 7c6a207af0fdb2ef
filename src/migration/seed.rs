use crate::appdata::StatusDefault;
use crate::schema::{Record, Value};
use crate::store::Session;
use anyhow::Result;
use std::collections::BTreeMap;
use uuid::Uuid;

pub const SUBMISSION_STATUS_TABLE: &str = "SubmissionStatus";

/// Insert every system status tenant `tid` lacks. Returns the id of each
/// system status by usage, existing ones included.
pub async fn ensure_submission_statuses(
    session: &mut Session,
    tid: i64,
    defaults: &[StatusDefault],
) -> Result<BTreeMap<String, String>> {
    let existing = session
        .fetch(
            "SELECT id, system_usage FROM \"SubmissionStatus\" WHERE tid = ? AND system_defined = 1",
            &[Value::from(tid)],
        )
        .await?;

    let mut ids: BTreeMap<String, String> = existing
        .iter()
        .filter_map(|row| {
            let usage = row.get("system_usage")?.as_str()?;
            let id = row.get("id")?.as_str()?;
            Some((usage.to_string(), id.to_string()))
        })
        .collect();

    for status in defaults {
        if ids.contains_key(&status.system_usage) {
            continue;
        }
        let id = Uuid::new_v4().to_string();
        let mut record = Record::new();
        record.insert("id".into(), Value::from(id.clone()));
        record.insert("tid".into(), Value::from(tid));
        record.insert("label".into(), Value::from(status.label.to_string()));
        record.insert("system_defined".into(), Value::from(true));
        record.insert("system_usage".into(), Value::from(status.system_usage.clone()));
        record.insert(
            "presentation_order".into(),
            Value::from(status.presentation_order),
        );
        session.insert(SUBMISSION_STATUS_TABLE, &record).await?;
        ids.insert(status.system_usage.clone(), id);
    }
    Ok(ids)
}

/// Ids of every tenant, ascending.
pub async fn tenant_ids(session: &mut Session) -> Result<Vec<i64>> {
    let rows = session
        .fetch("SELECT id FROM \"Tenant\" ORDER BY id", &[])
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get("id").and_then(Value::as_i64))
        .collect())
}

/// Languages enabled for tenant `tid`, sorted.
pub async fn enabled_languages(session: &mut Session, tid: i64) -> Result<Vec<String>> {
    let rows = session
        .fetch(
            "SELECT name FROM \"EnabledLanguage\" WHERE tid = ? ORDER BY name",
            &[Value::from(tid)],
        )
        .await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get("name").and_then(Value::as_str).map(ToString::to_string))
        .collect())
}
