//! Core data types shared between the query builder and the store
//!
//! - `SqlValue`: a literal that is only ever sent as a bound parameter
//! - `Statement`: query text plus its ordered parameters
//! - `Row`: one returned row, positionally addressed

use crate::store::error::{StoreError, StoreResult};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::Serialize;
use std::fmt;

/// A literal value bound to a statement placeholder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Text value
    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(value.into())
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        SqlValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(i64::from(value))
    }
}

impl From<Value> for SqlValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Integer(i) => SqlValue::Integer(i),
            Value::Real(f) => SqlValue::Real(f),
            Value::Text(s) => SqlValue::Text(s),
            // Blobs are never produced by the series tables
            Value::Blob(_) => SqlValue::Null,
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{}", r),
            SqlValue::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// A fully built statement: query text with `?N` placeholders and the
/// values bound to them, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<SqlValue>,
}

impl Statement {
    pub(crate) fn new(sql: String, params: Vec<SqlValue>) -> Self {
        Self { sql, params }
    }

    /// Query text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters in placeholder order
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
            write!(f, " -- [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

/// One row returned by the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    fn value(&self, idx: usize) -> StoreResult<&SqlValue> {
        self.values
            .get(idx)
            .ok_or_else(|| StoreError::Mapping(format!("row has no column {}", idx)))
    }

    /// Integer column (NULL reads as 0, the way COUNT over an empty set does)
    pub fn get_i64(&self, idx: usize) -> StoreResult<i64> {
        match self.value(idx)? {
            SqlValue::Integer(i) => Ok(*i),
            SqlValue::Real(f) => Ok(*f as i64),
            SqlValue::Null => Ok(0),
            SqlValue::Text(s) => s
                .parse()
                .map_err(|_| StoreError::Mapping(format!("column {} is not an integer: {}", idx, s))),
        }
    }

    /// Non-negative count column
    pub fn get_count(&self, idx: usize) -> StoreResult<u64> {
        let value = self.get_i64(idx)?;
        u64::try_from(value)
            .map_err(|_| StoreError::Mapping(format!("column {} is a negative count: {}", idx, value)))
    }

    /// Text column (NULL reads as empty)
    pub fn get_text(&self, idx: usize) -> StoreResult<String> {
        match self.value(idx)? {
            SqlValue::Text(s) => Ok(s.clone()),
            SqlValue::Integer(i) => Ok(i.to_string()),
            SqlValue::Real(f) => Ok(f.to_string()),
            SqlValue::Null => Ok(String::new()),
        }
    }
}
