//! Submission statuses: every tenant gets the system statuses and existing
//! submissions start out as `new`.

use crate::appdata::system_statuses;
use crate::migration::driver::{StepContext, StepDriver, StepFuture};
use crate::migration::seed::{enabled_languages, ensure_submission_statuses, tenant_ids};
use crate::schema::Value;
use std::collections::{BTreeMap, BTreeSet};

const INTERNAL_TIP_TABLE: &str = "InternalTip";

pub struct SubmissionStatuses {
    ctx: StepContext,
    /// tid → id of the tenant's `new` status
    new_status: BTreeMap<i64, String>,
}

impl SubmissionStatuses {
    pub fn new(ctx: StepContext) -> Self {
        Self {
            ctx,
            new_status: BTreeMap::new(),
        }
    }
}

impl StepDriver for SubmissionStatuses {
    fn context(&self) -> &StepContext {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut StepContext {
        &mut self.ctx
    }

    fn prologue(&mut self) -> StepFuture<'_, ()> {
        Box::pin(async move {
            for tid in tenant_ids(&mut self.ctx.source).await? {
                let mut languages: BTreeSet<String> =
                    enabled_languages(&mut self.ctx.source, tid).await?.into_iter().collect();
                if languages.is_empty() {
                    languages.insert("en".to_string());
                }
                let ids =
                    ensure_submission_statuses(&mut self.ctx.target, tid, &system_statuses(&languages))
                        .await?;
                if let Some(id) = ids.get("new") {
                    self.new_status.insert(tid, id.clone());
                }
            }
            Ok(())
        })
    }

    fn migrate_table<'a>(&'a mut self, table: &'a str) -> StepFuture<'a, ()> {
        Box::pin(async move {
            if table != INTERNAL_TIP_TABLE {
                return self.ctx.carry_over(table).await.map(|_| ());
            }

            let new_status = &self.new_status;
            self.ctx
                .carry_over_with(table, |row| {
                    let tid = row.get("tid").and_then(Value::as_i64).unwrap_or(1);
                    if let Some(id) = new_status.get(&tid) {
                        row.insert("status".into(), Value::from(id.clone()));
                    }
                })
                .await
                .map(|_| ())
        })
    }
}
