//! SQLite storage backend.
//!
//! Provides the [`StorageBackend`] capabilities on top of a single
//! `rusqlite` connection guarded by a mutex.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use insertonly_core::error::{ErrorCode, InsertOnlyError, InsertOnlyResult};
use insertonly_core::schema::{ColumnDescriptor, TableSchema};
use insertonly_core::{Record, StorageBackend, Statement, StoreConfig};
use rusqlite::{params_from_iter, Connection};

use crate::value::{from_sql, statement_params};

fn db_err(err: rusqlite::Error) -> InsertOnlyError {
    InsertOnlyError::database_source(ErrorCode::DbOperationFailed, err)
}

fn connection_err(err: rusqlite::Error) -> InsertOnlyError {
    InsertOnlyError::database_source(ErrorCode::DbConnectionFailed, err)
}

/// SQLite-backed storage.
///
/// `INTEGER PRIMARY KEY AUTOINCREMENT` surrogate keys satisfy the ordering
/// the accessor relies on: SQLite allows a single writer at a time and never
/// reuses or lowers an AUTOINCREMENT key.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Wrap an open connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> InsertOnlyResult<Self> {
        tracing::debug!(path = %path.as_ref().display(), "Opening SQLite database");
        let conn = Connection::open(path.as_ref()).map_err(connection_err)?;
        Ok(Self::new(conn))
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> InsertOnlyResult<Self> {
        let conn = Connection::open_in_memory().map_err(connection_err)?;
        Ok(Self::new(conn))
    }

    /// Open the database named by `config`, creating parent directories.
    pub fn from_config(config: &StoreConfig) -> InsertOnlyResult<Self> {
        match &config.database_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Self::open(path)
            }
            None => Self::in_memory(),
        }
    }

    /// Run caller code (DDL, ad-hoc queries) on the guarded connection.
    pub fn with_connection<F, T>(&self, f: F) -> InsertOnlyResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.lock()?;
        f(&conn).map_err(db_err)
    }

    /// Give the connection back.
    pub fn into_inner(self) -> InsertOnlyResult<Connection> {
        self.conn
            .into_inner()
            .map_err(|e| InsertOnlyError::Internal(format!("Connection lock poisoned: {}", e)))
    }

    fn lock(&self) -> InsertOnlyResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| InsertOnlyError::Internal(format!("Failed to acquire lock: {}", e)))
    }
}

impl StorageBackend for SqliteBackend {
    fn execute_insert(&self, statement: &Statement) -> InsertOnlyResult<usize> {
        let params = statement_params(statement)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&statement.sql).map_err(db_err)?;
        stmt.execute(params_from_iter(params.iter())).map_err(db_err)
    }

    fn fetch_rows(&self, statement: &Statement) -> InsertOnlyResult<Vec<Record>> {
        let params = statement_params(statement)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&statement.sql).map_err(db_err)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(db_err)?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(db_err)? {
            let mut record = Record::new();
            for (index, name) in names.iter().enumerate() {
                let value = row.get_ref(index).map_err(db_err)?;
                record.insert(name.clone(), from_sql(value));
            }
            records.push(record);
        }

        Ok(records)
    }

    fn describe_table(&self, table: &str) -> InsertOnlyResult<TableSchema> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                r#"SELECT name, type, "notnull", dflt_value, pk
                   FROM pragma_table_info(?1)
                   ORDER BY cid"#,
            )
            .map_err(db_err)?;

        let columns = stmt
            .query_map([table], |row| {
                let declared_type: Option<String> = row.get(1)?;
                Ok(ColumnDescriptor {
                    name: row.get(0)?,
                    declared_type: declared_type.filter(|t| !t.is_empty()),
                    not_null: row.get::<_, i64>(2)? != 0,
                    default_value: row.get(3)?,
                    primary_key: u32::try_from(row.get::<_, i64>(4)?).unwrap_or(0),
                })
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(TableSchema::new(table, columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insertonly_core::query::{compile_insert, compile_select, ColumnRef, SelectSpec, Source};
    use insertonly_core::{record_from_value, InsertSpec};
    use serde_json::json;

    fn backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend
            .with_connection(|conn| {
                conn.execute_batch(
                    r#"
                    CREATE TABLE things (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        uuid TEXT NOT NULL,
                        deleted BOOLEAN NOT NULL DEFAULT 0,
                        label TEXT,
                        weight REAL
                    );
                    "#,
                )
            })
            .unwrap();
        backend
    }

    #[test]
    fn test_describe_table() {
        let schema = backend().describe_table("things").unwrap();
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(names, vec!["id", "uuid", "deleted", "label", "weight"]);

        let id = schema.column("id").unwrap();
        assert_eq!(id.primary_key, 1);
        assert_eq!(id.declared_type.as_deref(), Some("INTEGER"));

        let deleted = schema.column("deleted").unwrap();
        assert!(deleted.not_null);
        assert!(deleted.is_boolean());
        assert_eq!(deleted.default_value.as_deref(), Some("0"));
    }

    #[test]
    fn test_describe_missing_table_is_empty() {
        let schema = backend().describe_table("nope").unwrap();
        assert!(schema.columns.is_empty());
    }

    #[test]
    fn test_insert_and_fetch_rows() {
        let backend = backend();
        let values = record_from_value(json!({
            "uuid": "u1", "deleted": false, "label": "a", "weight": 2.5
        }))
        .unwrap();
        let inserted = backend
            .execute_insert(&compile_insert(&InsertSpec::new("things", values)).unwrap())
            .unwrap();
        assert_eq!(inserted, 1);

        let spec = SelectSpec::from(Source::table("things"))
            .columns(None, ["uuid", "deleted", "label", "weight"])
            .filter(insertonly_core::query::Predicate::Eq(ColumnRef::new("uuid"), json!("u1")));
        let rows = backend.fetch_rows(&compile_select(&spec).unwrap()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["uuid"], json!("u1"));
        assert_eq!(rows[0]["deleted"], json!(0));
        assert_eq!(rows[0]["weight"], json!(2.5));

        let first = backend.fetch_optional(&compile_select(&spec).unwrap()).unwrap();
        assert!(first.is_some());
    }

    #[test]
    fn test_storage_errors_pass_through() {
        let backend = backend();
        let values = record_from_value(json!({"no_such_column": 1})).unwrap();
        let err = backend
            .execute_insert(&compile_insert(&InsertSpec::new("things", values)).unwrap())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DbOperationFailed);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_into_inner_returns_connection() {
        let conn = backend().into_inner().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM things", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
