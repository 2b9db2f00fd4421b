//! Conversion between JSON values and SQLite values.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Statement;
use serde_json::{Number, Value};

use crate::error::RouterError;
use crate::protocol::Params;

/// Convert a JSON bind value into an SQLite value.
///
/// Booleans bind as 0/1 and arrays of byte values bind as blobs. Objects and
/// any other array are rejected.
pub fn to_sql(value: &Value) -> Result<SqlValue, String> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => n
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| format!("number {n} is out of range")),
        },
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| "arrays bind only as blobs of byte values (0-255)".to_string())
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(SqlValue::Blob),
        Value::Object(_) => Err("objects cannot be bound".to_string()),
    }
}

/// Convert an SQLite column value into JSON.
///
/// Non-finite reals become `null`; blobs become arrays of byte values.
pub fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|&b| Value::from(b)).collect()),
    }
}

/// Bind parameters to a prepared statement.
///
/// Positional parameters must match the statement's parameter count.
/// Named parameters must each exist in the statement.
pub fn bind(stmt: &mut Statement<'_>, params: &Params) -> Result<(), RouterError> {
    match params {
        Params::Positional(values) => {
            let expected = stmt.parameter_count();
            if values.len() != expected {
                return Err(rusqlite::Error::InvalidParameterCount(values.len(), expected).into());
            }
            for (idx, value) in values.iter().enumerate() {
                let position = idx + 1;
                let sql = to_sql(value).map_err(|reason| RouterError::Bind {
                    position: position.to_string(),
                    reason,
                })?;
                stmt.raw_bind_parameter(position, sql)?;
            }
        }
        Params::Named(values) => {
            for (name, value) in values {
                let position = stmt
                    .parameter_index(name)?
                    .ok_or_else(|| rusqlite::Error::InvalidParameterName(name.clone()))?;
                let sql = to_sql(value).map_err(|reason| RouterError::Bind {
                    position: name.clone(),
                    reason,
                })?;
                stmt.raw_bind_parameter(position, sql)?;
            }
        }
    }
    Ok(())
}
