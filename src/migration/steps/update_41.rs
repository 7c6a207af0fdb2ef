//! Multi-tenancy: every tenant-scoped table gains `tid`, the single `Node`
//! row is folded into tenant 1's `Config`, and `var_group` disappears.

use crate::catalog::TENANT_TABLE;
use crate::migration::driver::{CountPolicy, StepContext, StepDriver, StepFuture};
use crate::schema::{FieldKind, Record, Value};
use crate::store::{CONFIG_TABLE, cell_to_json};
use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;

const NODE_TABLE: &str = "Node";
const CONFIG_L10N_TABLE: &str = "ConfigL10N";
const DEFAULT_TID: i64 = 1;

pub struct MultiTenant {
    ctx: StepContext,
}

impl MultiTenant {
    pub fn new(mut ctx: StepContext) -> Self {
        // Node entries join Config and dropping var_group can merge keys.
        ctx.set_policy(CONFIG_TABLE, CountPolicy::WarnOnMismatch);
        ctx.set_policy(CONFIG_L10N_TABLE, CountPolicy::WarnOnMismatch);
        Self { ctx }
    }

    async fn migrate_config(&mut self) -> Result<()> {
        let mut entries: BTreeMap<String, Value> = BTreeMap::new();
        for row in self.ctx.source.rows(CONFIG_TABLE).await? {
            if let Some(name) = row.get("var_name").and_then(Value::as_str) {
                let value = row.get("value").cloned().unwrap_or(Value::Null);
                entries.insert(name.to_string(), value);
            }
        }

        if let Some(node) = self.ctx.source_schema(NODE_TABLE) {
            for row in self.ctx.source.rows(NODE_TABLE).await? {
                for field in node.fields.iter().filter(|f| f.name != "id") {
                    let cell = row.get(&field.name).cloned().unwrap_or(Value::Null);
                    let json = node_value_json(field.kind, &cell);
                    entries.insert(field.name.clone(), Value::Text(json.to_string()));
                }
            }
        }

        for (name, value) in entries {
            let mut record = Record::new();
            record.insert("tid".into(), Value::from(DEFAULT_TID));
            record.insert("var_name".into(), Value::from(name));
            record.insert("value".into(), value);
            self.ctx.target.insert(CONFIG_TABLE, &record).await?;
        }
        Ok(())
    }

    async fn migrate_config_l10n(&mut self) -> Result<()> {
        let def = self.ctx.target.table(CONFIG_L10N_TABLE)?;
        let mut entries: BTreeMap<(String, String), Record> = BTreeMap::new();
        for row in self.ctx.source.rows(CONFIG_L10N_TABLE).await? {
            let lang = row.get("lang").and_then(Value::as_str).unwrap_or_default();
            let name = row.get("var_name").and_then(Value::as_str).unwrap_or_default();
            entries.insert((lang.to_string(), name.to_string()), def.project(&row));
        }

        for record in entries.values() {
            self.ctx.target.insert(CONFIG_L10N_TABLE, record).await?;
        }
        Ok(())
    }
}

fn node_value_json(kind: FieldKind, cell: &Value) -> serde_json::Value {
    match kind {
        FieldKind::Bool => serde_json::Value::Bool(cell.as_i64().unwrap_or_default() != 0),
        FieldKind::Text | FieldKind::Timestamp => cell
            .as_str()
            .map_or(serde_json::Value::Null, serde_json::Value::from),
        _ => cell_to_json(cell),
    }
}

impl StepDriver for MultiTenant {
    fn context(&self) -> &StepContext {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut StepContext {
        &mut self.ctx
    }

    fn prologue(&mut self) -> StepFuture<'_, ()> {
        Box::pin(async move {
            let mut tenant = Record::new();
            tenant.insert("id".into(), Value::from(DEFAULT_TID));
            tenant.insert("active".into(), Value::from(true));
            tenant.insert("creation_date".into(), Value::from(Utc::now().to_rfc3339()));
            self.ctx.target.insert(TENANT_TABLE, &tenant).await
        })
    }

    fn migrate_table<'a>(&'a mut self, table: &'a str) -> StepFuture<'a, ()> {
        Box::pin(async move {
            match table {
                CONFIG_TABLE => self.migrate_config().await,
                CONFIG_L10N_TABLE => self.migrate_config_l10n().await,
                _ => self.ctx.carry_over(table).await.map(|_| ()),
            }
        })
    }
}
