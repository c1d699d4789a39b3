//! Dynamic row mapping and Postgres row decoding.
//!
//! A [`Row`] is an ordered mapping from column name to JSON value; no schema
//! is enforced by the core, and column names are whatever keys the caller
//! supplies. Mapping iteration order is insertion order (`serde_json`'s
//! `preserve_order` feature), which the fragment builder relies on to keep
//! SQL placeholders and value arrays aligned.

use crate::error::{ModelError, ModelResult};
use serde_json::Value;
use tokio_postgres::types::Type;

/// An in-memory mapping representing one table record's column values.
pub type Row = serde_json::Map<String, Value>;

/// Equality-predicate mapping used to build a WHERE clause.
pub type Conditions = Row;

/// Column → new-value mapping used to build a SET clause.
pub type Changes = Row;

/// Column → direction mapping used to build an ORDER BY clause.
pub type OrderBy = Row;

/// Build a [`Row`] from a JSON object literal.
///
/// # Example
/// ```ignore
/// let user = pgmodel::row!({"username": "alice", "active": true});
/// ```
#[macro_export]
macro_rules! row {
    ($($json:tt)+) => {
        match ::serde_json::json!($($json)+) {
            ::serde_json::Value::Object(map) => map,
            other => panic!("row! expects a JSON object literal, got {other}"),
        }
    };
}

/// Decode a `tokio_postgres::Row` into a dynamic [`Row`].
///
/// NULLs decode to `Value::Null`; date/time columns decode to RFC 3339 /
/// ISO 8601 strings; `json`/`jsonb` pass through. A column whose type has
/// no JSON representation here is a decode error naming the column.
pub fn decode_row(row: &tokio_postgres::Row) -> ModelResult<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        out.insert(column.name().to_string(), decode_column(row, idx)?);
    }
    Ok(out)
}

fn decode_column(row: &tokio_postgres::Row, idx: usize) -> ModelResult<Value> {
    let column = &row.columns()[idx];
    let name = column.name();
    let ty = column.type_();

    macro_rules! take {
        ($rust:ty, $to_value:expr) => {
            row.try_get::<_, Option<$rust>>(idx)
                .map_err(|e| ModelError::decode(name, e.to_string()))?
                .map($to_value)
                .unwrap_or(Value::Null)
        };
    }

    let value = if *ty == Type::BOOL {
        take!(bool, Value::Bool)
    } else if *ty == Type::INT2 {
        take!(i16, Value::from)
    } else if *ty == Type::INT4 {
        take!(i32, Value::from)
    } else if *ty == Type::INT8 {
        take!(i64, Value::from)
    } else if *ty == Type::FLOAT4 {
        take!(f32, |v| Value::from(v as f64))
    } else if *ty == Type::FLOAT8 {
        take!(f64, Value::from)
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
    {
        take!(String, Value::String)
    } else if *ty == Type::UUID {
        take!(uuid::Uuid, |v| Value::String(v.to_string()))
    } else if *ty == Type::TIMESTAMPTZ {
        take!(chrono::DateTime<chrono::Utc>, |v| Value::String(
            v.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        ))
    } else if *ty == Type::TIMESTAMP {
        take!(chrono::NaiveDateTime, |v| Value::String(
            v.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
        ))
    } else if *ty == Type::DATE {
        take!(chrono::NaiveDate, |v| Value::String(v.to_string()))
    } else if *ty == Type::TIME {
        take!(chrono::NaiveTime, |v| Value::String(v.to_string()))
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        take!(Value, |v| v)
    } else {
        return Err(ModelError::decode(
            name,
            format!("unsupported column type {ty}"),
        ));
    };

    Ok(value)
}
