//! Dynamic parameter binding for JSON-valued rows.
//!
//! Rows in this crate are dynamic mappings, so parameter values are
//! `serde_json::Value`s rather than statically-typed Rust values. [`Param`]
//! bridges the gap: it implements `ToSql` by dispatching on the *target*
//! Postgres type at encode time. The server infers each placeholder's type
//! from the statement, so a JSON string binds cleanly to a `text`, `uuid`,
//! or `timestamptz` column, and a JSON number to the integer/float width
//! the column actually has.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A clone-friendly dynamic SQL parameter wrapping one JSON value.
#[derive(Clone, PartialEq)]
pub struct Param(Value);

impl Param {
    /// Wrap a JSON value as a parameter.
    pub fn new(value: Value) -> Self {
        Param(value)
    }

    /// The wrapped JSON value.
    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Param").field(&self.0).finish()
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Param(value)
    }
}

fn mismatch(value: &Value, ty: &Type) -> Box<dyn Error + Sync + Send> {
    format!("cannot encode JSON value {value} as Postgres type {ty}").into()
}

impl ToSql for Param {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        // SQL NULL for every target type, including json/jsonb.
        if self.0.is_null() {
            return Ok(IsNull::Yes);
        }
        if *ty == Type::JSON || *ty == Type::JSONB {
            return self.0.to_sql(ty, out);
        }
        match &self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => {
                if *ty == Type::BOOL {
                    b.to_sql(ty, out)
                } else {
                    Err(mismatch(&self.0, ty))
                }
            }
            Value::Number(n) => {
                if *ty == Type::INT2 {
                    let v = n.as_i64().ok_or_else(|| mismatch(&self.0, ty))?;
                    i16::try_from(v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    let v = n.as_i64().ok_or_else(|| mismatch(&self.0, ty))?;
                    i32::try_from(v)?.to_sql(ty, out)
                } else if *ty == Type::INT8 {
                    n.as_i64().ok_or_else(|| mismatch(&self.0, ty))?.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    let v = n.as_f64().ok_or_else(|| mismatch(&self.0, ty))?;
                    (v as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    n.as_f64().ok_or_else(|| mismatch(&self.0, ty))?.to_sql(ty, out)
                } else {
                    Err(mismatch(&self.0, ty))
                }
            }
            Value::String(s) => {
                if *ty == Type::TEXT
                    || *ty == Type::VARCHAR
                    || *ty == Type::BPCHAR
                    || *ty == Type::NAME
                    || *ty == Type::UNKNOWN
                {
                    s.as_str().to_sql(ty, out)
                } else if *ty == Type::UUID {
                    uuid::Uuid::parse_str(s)?.to_sql(ty, out)
                } else if *ty == Type::TIMESTAMPTZ {
                    DateTime::parse_from_rfc3339(s)?
                        .with_timezone(&Utc)
                        .to_sql(ty, out)
                } else if *ty == Type::TIMESTAMP {
                    // Accept RFC 3339 as well as a bare naive timestamp.
                    match DateTime::parse_from_rfc3339(s) {
                        Ok(dt) => dt.naive_utc().to_sql(ty, out),
                        Err(_) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")?
                            .to_sql(ty, out),
                    }
                } else if *ty == Type::DATE {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")?.to_sql(ty, out)
                } else if *ty == Type::TIME {
                    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")?.to_sql(ty, out)
                } else {
                    Err(mismatch(&self.0, ty))
                }
            }
            Value::Array(_) | Value::Object(_) => Err(mismatch(&self.0, ty)),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Dispatch happens at encode time; a genuinely unbindable pairing
        // surfaces as an encode error rather than a prepare-time rejection.
        true
    }

    to_sql_checked!();
}

/// An ordered collection of [`Param`]s aligned with generated placeholders.
#[derive(Clone, Debug, Default)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    /// Create a new empty parameter list.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a value and return its 1-based placeholder index.
    pub fn push(&mut self, value: Value) -> usize {
        self.params.push(Param::new(value));
        self.params.len()
    }

    /// Append every value of a mapping, in mapping iteration order.
    pub fn extend_from(&mut self, columns: &crate::row::Row) {
        self.params
            .extend(columns.values().cloned().map(Param::new));
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Borrow the parameters as a slice for execution.
    pub fn as_slice(&self) -> &[Param] {
        &self.params
    }
}

/// Parameter refs compatible with `tokio-postgres`.
pub fn param_refs(params: &[Param]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}
