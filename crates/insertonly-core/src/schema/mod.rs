//! Table schema descriptions.
//!
//! Column lists are always introspected from the live database and never
//! hardcoded; [`SchemaCache`] keeps them around per table.

mod cache;

pub use cache::SchemaCache;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::VersionColumns;
use crate::error::{ErrorCode, InsertOnlyError, InsertOnlyResult};
use crate::types::{is_truthy, Record};

/// One physical column as reported by the storage engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Declared type, if any (SQLite allows untyped columns).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    /// NOT NULL constraint.
    pub not_null: bool,
    /// Default value expression as written in the DDL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// 1-based position in the primary key, 0 when not part of it.
    pub primary_key: u32,
}

impl ColumnDescriptor {
    /// Create an untyped, nullable column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            not_null: false,
            default_value: None,
            primary_key: 0,
        }
    }

    /// Set the declared type.
    pub fn with_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    /// Whether the declared type names a boolean.
    pub fn is_boolean(&self) -> bool {
        self.declared_type
            .as_deref()
            .map(|t| t.to_ascii_uppercase().starts_with("BOOL"))
            .unwrap_or(false)
    }

    /// Whether the declared type names a byte string.
    pub fn is_binary(&self) -> bool {
        self.declared_type
            .as_deref()
            .map(|t| t.to_ascii_uppercase().contains("BLOB"))
            .unwrap_or(false)
    }
}

/// Ordered column list of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in the order the schema exposes them.
    pub columns: Vec<ColumnDescriptor>,
}

impl TableSchema {
    /// Create a schema description.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether the table has a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Every column callers may see: all but the surrogate key.
    pub fn visible_columns<'a>(&'a self, columns: &'a VersionColumns) -> Vec<&'a str> {
        self.column_names()
            .filter(|name| *name != columns.surrogate_key)
            .collect()
    }

    /// Names of the columns declared as byte strings.
    pub fn binary_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.is_binary())
            .map(|c| c.name.as_str())
    }

    /// Turn numeric values of boolean-typed columns into JSON booleans.
    ///
    /// Engines without a native boolean (SQLite) hand back 0/1.
    pub fn normalize_row(&self, row: &mut Record) {
        for column in self.columns.iter().filter(|c| c.is_boolean()) {
            if let Some(value) = row.get_mut(&column.name) {
                if value.is_number() {
                    *value = Value::Bool(is_truthy(value));
                }
            }
        }
    }

    /// Check that the table can hold versioned rows.
    pub fn ensure_versioned(&self, columns: &VersionColumns) -> InsertOnlyResult<()> {
        if self.columns.is_empty() {
            return Err(InsertOnlyError::schema(
                ErrorCode::SchemaTableNotFound,
                &self.name,
                "table does not exist or has no columns",
            ));
        }

        let required = [&columns.surrogate_key, &columns.identifier, &columns.deleted];
        let missing: Vec<&str> = required
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| name.as_str())
            .collect();

        if !missing.is_empty() {
            return Err(InsertOnlyError::schema(
                ErrorCode::SchemaMissingColumn,
                &self.name,
                format!("missing versioning column(s): {}", missing.join(", ")),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> TableSchema {
        TableSchema::new(
            "players",
            vec![
                ColumnDescriptor::new("id").with_type("INTEGER"),
                ColumnDescriptor::new("uuid").with_type("TEXT"),
                ColumnDescriptor::new("created_at").with_type("TEXT"),
                ColumnDescriptor::new("deleted").with_type("BOOLEAN"),
                ColumnDescriptor::new("name"),
                ColumnDescriptor::new("avatar").with_type("blob"),
            ],
        )
    }

    #[test]
    fn test_visible_columns_keep_order_and_drop_surrogate_key() {
        let schema = players();
        let columns = VersionColumns::default();
        assert_eq!(
            schema.visible_columns(&columns),
            vec!["uuid", "created_at", "deleted", "name", "avatar"]
        );
    }

    #[test]
    fn test_ensure_versioned() {
        let columns = VersionColumns::default();
        assert!(players().ensure_versioned(&columns).is_ok());

        let mut schema = players();
        schema.columns.retain(|c| c.name != "deleted");
        let err = schema.ensure_versioned(&columns).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SchemaMissingColumn);
        assert!(err.to_string().contains("deleted"));

        let err = TableSchema::new("ghost", vec![])
            .ensure_versioned(&columns)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SchemaTableNotFound);
    }

    #[test]
    fn test_normalize_row() {
        let schema = players();
        let mut row = crate::types::record_from_value(serde_json::json!({
            "uuid": "u1", "deleted": 0, "name": 1
        }))
        .unwrap();
        schema.normalize_row(&mut row);
        assert_eq!(row["deleted"], serde_json::json!(false));
        assert_eq!(row["name"], serde_json::json!(1));

        row.insert("deleted".to_string(), serde_json::json!(1));
        schema.normalize_row(&mut row);
        assert_eq!(row["deleted"], serde_json::json!(true));
    }

    #[test]
    fn test_boolean_detection() {
        let schema = players();
        assert!(schema.column("deleted").unwrap().is_boolean());
        assert!(!schema.column("uuid").unwrap().is_boolean());
        assert!(!schema.column("name").unwrap().is_boolean());
    }

    #[test]
    fn test_binary_columns() {
        let schema = players();
        assert_eq!(schema.binary_columns().collect::<Vec<_>>(), vec!["avatar"]);
        assert!(!schema.column("name").unwrap().is_binary());
    }
}
