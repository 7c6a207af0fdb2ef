use crate::schema::{Record, SchemaRegistry, TableDef};
use crate::store::Session;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type StepFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// How a table's row count is reconciled after a step.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CountPolicy {
    #[default]
    StrictEqual,
    WarnOnMismatch,
}

/// Live state of one `v → v+1` step. Created fresh per step and dropped
/// after its integrity check.
pub struct StepContext {
    from_version: u32,
    registry: Arc<SchemaRegistry>,
    pub source: Session,
    pub target: Session,
    entries_count: BTreeMap<String, u64>,
    policies: BTreeMap<String, CountPolicy>,
}

impl StepContext {
    /// Bind the two sessions and capture the source row count of every table
    /// present on both sides, before any driver code runs.
    pub async fn open(
        from_version: u32,
        registry: Arc<SchemaRegistry>,
        mut source: Session,
        target: Session,
    ) -> Result<Self> {
        let mut entries_count = BTreeMap::new();
        for table in migrated_tables(&registry, &source, &target) {
            let count = source
                .count(&table)
                .await
                .with_context(|| format!("count source rows of {table}"))?;
            entries_count.insert(table, count);
        }

        Ok(Self {
            from_version,
            registry,
            source,
            target,
            entries_count,
            policies: BTreeMap::new(),
        })
    }

    pub fn from_version(&self) -> u32 {
        self.from_version
    }

    pub fn to_version(&self) -> u32 {
        self.from_version + 1
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Tables present in both schemas, in registration order.
    pub fn migrated_tables(&self) -> Vec<String> {
        migrated_tables(&self.registry, &self.source, &self.target)
    }

    pub fn source_schema(&self, table: &str) -> Option<Arc<TableDef>> {
        self.source.schema().get(table).cloned()
    }

    pub fn target_schema(&self, table: &str) -> Option<Arc<TableDef>> {
        self.target.schema().get(table).cloned()
    }

    pub fn expected_count(&self, table: &str) -> Option<u64> {
        self.entries_count.get(table).copied()
    }

    pub fn set_policy(&mut self, table: &str, policy: CountPolicy) {
        self.policies.insert(table.to_string(), policy);
    }

    pub fn policy(&self, table: &str) -> CountPolicy {
        self.policies.get(table).copied().unwrap_or_default()
    }

    /// Copy every row of `table`: shared columns are kept, new columns take
    /// their default. Returns the number of rows written.
    pub async fn carry_over(&mut self, table: &str) -> Result<u64> {
        self.carry_over_with(table, |_| {}).await
    }

    /// Like [`Self::carry_over`], letting `reshape` edit each source row
    /// before it is projected onto the target layout.
    pub async fn carry_over_with<F>(&mut self, table: &str, mut reshape: F) -> Result<u64>
    where
        F: FnMut(&mut Record) + Send,
    {
        let def = self.target.table(table)?;
        let rows = self.source.rows(table).await?;
        let mut written = 0;
        for mut row in rows {
            reshape(&mut row);
            self.target.insert(table, &def.project(&row)).await?;
            written += 1;
        }
        Ok(written)
    }

    pub async fn close(&mut self) {
        self.source.close().await;
        self.target.close().await;
    }
}

fn migrated_tables(registry: &SchemaRegistry, source: &Session, target: &Session) -> Vec<String> {
    registry
        .table_names()
        .filter(|name| source.schema().contains(name) && target.schema().contains(name))
        .map(ToString::to_string)
        .collect()
}

/// Per-step transformation contract.
///
/// Every hook has a default; a driver overrides only what its version
/// changes. `migrate_table` is called once per table present on both sides
/// and followed by [`StepDriver::commit`], so a driver must not leave a table
/// half-written when it returns an error.
pub trait StepDriver: Send {
    fn context(&self) -> &StepContext;

    fn context_mut(&mut self) -> &mut StepContext;

    fn prologue(&mut self) -> StepFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn migrate_table<'a>(&'a mut self, table: &'a str) -> StepFuture<'a, ()> {
        Box::pin(async move {
            self.context_mut().carry_over(table).await?;
            Ok(())
        })
    }

    fn epilogue(&mut self) -> StepFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn commit(&mut self) -> StepFuture<'_, ()> {
        Box::pin(async move { self.context_mut().target.commit().await })
    }

    fn close(&mut self) -> StepFuture<'_, ()> {
        Box::pin(async move {
            self.context_mut().close().await;
            Ok(())
        })
    }

    fn source_schema(&self, table: &str) -> Option<Arc<TableDef>> {
        self.context().source_schema(table)
    }

    fn target_schema(&self, table: &str) -> Option<Arc<TableDef>> {
        self.context().target_schema(table)
    }

    fn expected_count(&self, table: &str) -> Option<u64> {
        self.context().expected_count(table)
    }

    fn count_policy(&self, table: &str) -> CountPolicy {
        self.context().policy(table)
    }
}

/// Driver for steps whose only changes are added columns with defaults.
pub struct CarryOver {
    ctx: StepContext,
}

impl CarryOver {
    pub fn new(ctx: StepContext) -> Self {
        Self { ctx }
    }
}

impl StepDriver for CarryOver {
    fn context(&self) -> &StepContext {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut StepContext {
        &mut self.ctx
    }
}
