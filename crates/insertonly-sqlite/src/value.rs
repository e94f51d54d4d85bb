//! JSON <-> SQLite value conversion.

use insertonly_core::{InsertOnlyError, InsertOnlyResult, Statement};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

/// Convert a JSON value into a bindable SQLite value.
///
/// Booleans become 0/1, arrays and objects are stored as JSON text.
/// Integers outside the signed 64-bit range are rejected.
pub fn to_sql(value: &Value) -> InsertOnlyResult<SqlValue> {
    let converted = match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if n.is_u64() {
                return Err(InsertOnlyError::unsupported_value(format!(
                    "integer {} does not fit in a signed 64-bit column",
                    n
                )));
            } else {
                match n.as_f64() {
                    Some(f) => SqlValue::Real(f),
                    None => {
                        return Err(InsertOnlyError::unsupported_value(format!(
                            "number {} has no SQLite representation",
                            n
                        )))
                    }
                }
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    };
    Ok(converted)
}

/// Convert a value bound for a BLOB column.
///
/// Arrays of byte values (the shape [`from_sql`] reads blobs as) become
/// blobs again; anything else converts like [`to_sql`].
pub fn to_sql_binary(value: &Value) -> InsertOnlyResult<SqlValue> {
    let Value::Array(items) = value else {
        return to_sql(value);
    };

    let bytes = items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(|| {
                    InsertOnlyError::unsupported_value(format!(
                        "blob element {} is not a byte value",
                        item
                    ))
                })
        })
        .collect::<InsertOnlyResult<Vec<u8>>>()?;
    Ok(SqlValue::Blob(bytes))
}

/// Bindable parameters of a compiled statement, in order.
pub fn statement_params(statement: &Statement) -> InsertOnlyResult<Vec<SqlValue>> {
    statement
        .params
        .iter()
        .enumerate()
        .map(|(index, value)| {
            if statement.binary_params.contains(&index) {
                to_sql_binary(value)
            } else {
                to_sql(value)
            }
        })
        .collect()
}

/// Convert a column read from SQLite into JSON.
///
/// Blobs come back as arrays of byte values; non-finite reals as null.
pub fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
