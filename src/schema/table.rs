use super::value::{Record, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use strum::{Display, EnumString};

/// Logical column type. Storage classes follow SQLite affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Real,
    Text,
    Blob,
    Bool,
    Json,
    Timestamp,
}

impl FieldKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer | Self::Bool => "INTEGER",
            Self::Real => "REAL",
            Self::Text | Self::Json | Self::Timestamp => "TEXT",
            Self::Blob => "BLOB",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,
}

impl FieldDef {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: false,
            default: None,
            primary_key: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Value used when a row carried over from an older shape lacks this column.
    pub fn fill_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }

    fn column_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.kind.sql_type());
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            let _ = write!(sql, " DEFAULT {default}");
        }
        sql
    }
}

/// Field layout of one logical table at one schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl TableDef {
    pub fn new(name: &str, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Quoted, comma-separated column list in declaration order.
    pub fn column_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| quote_ident(&f.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn create_table_sql(&self) -> String {
        let mut columns: Vec<String> = self.fields.iter().map(FieldDef::column_sql).collect();
        let keys: Vec<String> = self
            .fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| quote_ident(&f.name))
            .collect();
        if !keys.is_empty() {
            columns.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }
        format!(
            "CREATE TABLE {} (\n    {}\n)",
            quote_ident(&self.name),
            columns.join(",\n    ")
        )
    }

    /// A record holding every column's fill value.
    pub fn default_record(&self) -> Record {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.fill_value()))
            .collect()
    }

    /// Reshape `row` into this layout: shared columns are copied, columns the
    /// row lacks take their fill value, columns this layout lacks are dropped.
    pub fn project(&self, row: &Record) -> Record {
        self.fields
            .iter()
            .map(|f| {
                let value = row.get(&f.name).cloned().unwrap_or_else(|| f.fill_value());
                (f.name.clone(), value)
            })
            .collect()
    }
}

/// Ordered set of table definitions effective at one schema version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaSet {
    order: Vec<String>,
    tables: BTreeMap<String, Arc<TableDef>>,
}

impl SchemaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `table`, keeping its first insertion position.
    pub fn insert(&mut self, table: Arc<TableDef>) {
        if !self.tables.contains_key(&table.name) {
            self.order.push(table.name.clone());
        }
        self.tables.insert(table.name.clone(), table);
    }

    pub fn with(mut self, table: TableDef) -> Self {
        self.insert(Arc::new(table));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TableDef>> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<TableDef>> {
        self.order.iter().filter_map(|name| self.tables.get(name))
    }

    pub fn ddl(&self) -> Vec<String> {
        self.tables().map(|t| t.create_table_sql()).collect()
    }
}

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
