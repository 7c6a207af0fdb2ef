//! Version-indexed schema registry.
//!
//! Each logical table carries one [`Revision`] per schema version in
//! `first..=current`. Resolution carries the nearest explicit definition
//! forward until the table is redefined or removed; a removal holds from its
//! own version onward, so no earlier definition can resurface past it.
//!
//! The registry is built once by [`RegistryBuilder`] and is immutable
//! afterwards. Every version gets its own [`SchemaSet`], so two different
//! shapes of the same table name never share a namespace.

use super::table::{SchemaSet, TableDef};
use crate::error::SchemaError;
use std::collections::BTreeSet;
use std::sync::Arc;

/// State of one logical table at one schema version.
#[derive(Debug, Clone, PartialEq)]
pub enum Revision {
    /// Same shape as the nearest earlier explicit definition.
    Inherit,
    /// The table does not exist at or after this version.
    Removed,
    /// Shape effective from this version until superseded.
    Explicit(Arc<TableDef>),
}

impl Revision {
    pub fn explicit(def: TableDef) -> Self {
        Self::Explicit(Arc::new(def))
    }
}

#[derive(Debug, Clone)]
struct TableHistory {
    name: String,
    revisions: Vec<Revision>,
}

/// Collects per-table revision arrays, then precomputes every version.
#[derive(Debug)]
pub struct RegistryBuilder {
    first: u32,
    current: u32,
    tables: Vec<TableHistory>,
    current_schema: Option<SchemaSet>,
}

impl RegistryBuilder {
    pub fn new(first: u32, current: u32) -> Self {
        Self {
            first,
            current,
            tables: Vec::new(),
            current_schema: None,
        }
    }

    fn span(&self) -> usize {
        (self.current.saturating_sub(self.first) + 1) as usize
    }

    /// Register a table with its full revision array, one entry per version
    /// from `first` to `current` inclusive.
    pub fn table(mut self, name: &str, revisions: Vec<Revision>) -> Self {
        self.tables.push(TableHistory {
            name: name.to_string(),
            revisions,
        });
        self
    }

    /// Start a sparse history for `name`; unset versions are `Inherit`.
    pub fn history(self, name: &str) -> HistoryBuilder {
        let span = self.span();
        HistoryBuilder {
            parent: self,
            name: name.to_string(),
            revisions: vec![Revision::Inherit; span],
            error: None,
        }
    }

    /// Authoritative schema used for databases at `current`.
    pub fn current(mut self, schema: SchemaSet) -> Self {
        self.current_schema = Some(schema);
        self
    }

    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        if self.first > self.current {
            return Err(SchemaError::InvalidRange {
                first: self.first,
                current: self.current,
            });
        }

        let span = self.span();
        let mut seen = BTreeSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }
            if table.revisions.len() != span {
                return Err(SchemaError::RevisionCount {
                    table: table.name.clone(),
                    expected: span,
                    actual: table.revisions.len(),
                });
            }
            for revision in &table.revisions {
                if let Revision::Explicit(def) = revision {
                    if def.name != table.name {
                        return Err(SchemaError::NameMismatch {
                            table: table.name.clone(),
                            found: def.name.clone(),
                        });
                    }
                    if def.fields.is_empty() {
                        return Err(SchemaError::EmptyTable(table.name.clone()));
                    }
                }
            }
        }

        let mut registry = SchemaRegistry {
            first: self.first,
            current: self.current,
            tables: self.tables,
            versions: Vec::with_capacity(span),
            current_schema: SchemaSet::new(),
        };

        for offset in 0..span {
            let mut set = SchemaSet::new();
            for table in &registry.tables {
                if let Some(def) = resolve_offset(&table.revisions, offset) {
                    set.insert(def);
                }
            }
            registry.versions.push(set);
        }

        registry.current_schema = match self.current_schema {
            Some(schema) => schema,
            None => registry.versions[span - 1].clone(),
        };

        Ok(registry)
    }
}

/// Sparse per-table history, keyed by absolute version.
#[derive(Debug)]
pub struct HistoryBuilder {
    parent: RegistryBuilder,
    name: String,
    revisions: Vec<Revision>,
    error: Option<SchemaError>,
}

impl HistoryBuilder {
    fn set(mut self, version: u32, revision: Revision) -> Self {
        let first = self.parent.first;
        let current = self.parent.current;
        if version < first || version > current {
            self.error.get_or_insert(SchemaError::VersionOutOfRange {
                table: self.name.clone(),
                version,
                first,
                current,
            });
            return self;
        }
        self.revisions[(version - first) as usize] = revision;
        self
    }

    /// Explicit shape effective from `version` onward.
    pub fn define(self, version: u32, def: TableDef) -> Self {
        self.set(version, Revision::explicit(def))
    }

    /// Table dropped at `version`.
    pub fn remove(self, version: u32) -> Self {
        self.set(version, Revision::Removed)
    }

    /// Table absent for every version in `from..to`.
    pub fn absent(mut self, from: u32, to: u32) -> Self {
        for version in from..to {
            self = self.set(version, Revision::Removed);
        }
        self
    }

    pub fn done(self) -> Result<RegistryBuilder, SchemaError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(self.parent.table(&self.name, self.revisions))
    }
}

/// Resolve one revision array at `offset`.
fn resolve_offset(revisions: &[Revision], offset: usize) -> Option<Arc<TableDef>> {
    if matches!(revisions.get(offset)?, Revision::Removed) {
        return None;
    }

    for revision in revisions[..=offset].iter().rev() {
        match revision {
            Revision::Explicit(def) => return Some(Arc::clone(def)),
            Revision::Removed => return None,
            Revision::Inherit => {}
        }
    }
    None
}

/// Immutable, fully resolved schema history.
#[derive(Debug)]
pub struct SchemaRegistry {
    first: u32,
    current: u32,
    tables: Vec<TableHistory>,
    versions: Vec<SchemaSet>,
    current_schema: SchemaSet,
}

impl SchemaRegistry {
    pub fn builder(first: u32, current: u32) -> RegistryBuilder {
        RegistryBuilder::new(first, current)
    }

    pub fn first_version(&self) -> u32 {
        self.first
    }

    pub fn current_version(&self) -> u32 {
        self.current
    }

    pub fn supports(&self, version: u32) -> bool {
        (self.first..=self.current).contains(&version)
    }

    fn offset(&self, version: u32) -> Option<usize> {
        self.supports(version)
            .then(|| (version - self.first) as usize)
    }

    /// Logical table names in registration order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Raw revision cell of `table` at `version`.
    pub fn revision(&self, table: &str, version: u32) -> Option<&Revision> {
        let offset = self.offset(version)?;
        self.tables
            .iter()
            .find(|t| t.name == table)
            .and_then(|t| t.revisions.get(offset))
    }

    /// Definition of `table` effective at `version`, or `None` when the table
    /// does not exist there.
    pub fn resolve(&self, table: &str, version: u32) -> Option<Arc<TableDef>> {
        let offset = self.offset(version)?;
        let history = self.tables.iter().find(|t| t.name == table)?;
        resolve_offset(&history.revisions, offset)
    }

    /// Precomputed registry snapshot for `version`.
    pub fn schema_at(&self, version: u32) -> Option<&SchemaSet> {
        self.offset(version).and_then(|o| self.versions.get(o))
    }

    /// Schema a database at `version` is created with. The current version
    /// uses the authoritative schema rather than the registry snapshot.
    pub fn target_schema(&self, version: u32) -> Option<&SchemaSet> {
        if version == self.current {
            Some(&self.current_schema)
        } else {
            self.schema_at(version)
        }
    }

    pub fn current_schema(&self) -> &SchemaSet {
        &self.current_schema
    }

    /// Tables whose registry shape at the current version differs from the
    /// authoritative schema, with a short reason each.
    pub fn drift(&self) -> Vec<(String, &'static str)> {
        let Some(snapshot) = self.schema_at(self.current) else {
            return Vec::new();
        };
        let mut report = Vec::new();
        for table in snapshot.tables() {
            match self.current_schema.get(&table.name) {
                None => report.push((table.name.clone(), "missing from current schema")),
                Some(def) if def.as_ref() != table.as_ref() => {
                    report.push((table.name.clone(), "field layout differs"));
                }
                Some(_) => {}
            }
        }
        for name in self.current_schema.names() {
            if !snapshot.contains(name) {
                report.push((name.to_string(), "missing from registry snapshot"));
            }
        }
        report
    }
}
