//! Row payloads exchanged with callers and backends.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{InsertOnlyError, InsertOnlyResult};

/// Column name to value mapping.
///
/// Used for insert payloads, update patches, equality where-mappings and
/// returned rows alike.
pub type Record = serde_json::Map<String, Value>;

/// Build a [`Record`] from a JSON object value.
pub fn record_from_value(value: Value) -> InsertOnlyResult<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(InsertOnlyError::Serialization(<serde_json::Error as serde::de::Error>::custom(format!(
            "expected a JSON object, got {}",
            other
        )))),
    }
}

/// Deserialize a record into a caller type.
pub fn record_into<T: DeserializeOwned>(record: Record) -> InsertOnlyResult<T> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Convenience accessors on [`Record`].
pub trait RecordExt {
    /// Get a column value as a string.
    fn get_str(&self, column: &str) -> Option<&str>;

    /// Interpret a column as a boolean flag with [`is_truthy`]. Missing reads as `false`.
    fn flag(&self, column: &str) -> bool;
}

impl RecordExt for Record {
    fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(|v| v.as_str())
    }

    fn flag(&self, column: &str) -> bool {
        self.get(column).map(is_truthy).unwrap_or(false)
    }
}

/// Whether a flag value counts as set.
///
/// Same rule as the `COALESCE(column, 0) = 0` filter used by set-based
/// reads: only null, `false` and numeric zero are unset. Any other value,
/// text included, is set.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(_) | Value::Array(_) | Value::Object(_) => true,
    }
}
