use crate::schema::{Record, Value};
use anyhow::{Context, Result};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

pub(crate) fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Integer(v) => query.bind(*v),
        Value::Real(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Blob(v) => query.bind(v.clone()),
    }
}

pub(crate) fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &[Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = bind_value(query, value);
    }
    query
}

/// Decode the cell at `index` by its runtime storage class.
pub(crate) fn decode_cell(row: &SqliteRow, index: usize) -> Result<Value> {
    let (is_null, storage) = {
        let raw = row
            .try_get_raw(index)
            .with_context(|| format!("read column {index}"))?;
        (raw.is_null(), raw.type_info().name().to_ascii_uppercase())
    };

    if is_null {
        return Ok(Value::Null);
    }

    let value = match storage.as_str() {
        "INTEGER" | "BIGINT" | "INT8" | "BOOLEAN" => Value::Integer(row.try_get::<i64, _>(index)?),
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => Value::Real(row.try_get::<f64, _>(index)?),
        "BLOB" => Value::Blob(row.try_get::<Vec<u8>, _>(index)?),
        _ => Value::Text(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

pub(crate) fn decode_row(row: &SqliteRow) -> Result<Record> {
    let mut record = Record::new();
    for column in row.columns() {
        let value = decode_cell(row, column.ordinal())
            .with_context(|| format!("decode column {}", column.name()))?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

/// Interpret a config cell: JSON text is parsed, other storage classes are
/// mapped directly.
pub(crate) fn cell_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(v) => serde_json::Value::from(*v),
        Value::Real(v) => serde_json::Value::from(*v),
        Value::Text(text) => serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.clone())),
        Value::Blob(bytes) => serde_json::Value::from(bytes.clone()),
    }
}
