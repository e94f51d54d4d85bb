//! insertonly-sqlite - SQLite storage backend for insertonly.
//!
//! # Example
//!
//! ```ignore
//! use insertonly_sqlite::{in_memory_store, SqliteStore};
//!
//! let store: SqliteStore = in_memory_store()?;
//! store.backend().with_connection(|conn| conn.execute_batch(SCHEMA))?;
//! let uuid = store.insert("players", record)?;
//! ```

mod backend;
mod value;

pub use backend::SqliteBackend;
pub use value::{from_sql, statement_params, to_sql, to_sql_binary};

use insertonly_core::{InsertOnlyResult, StoreConfig, VersionedAccessor};

/// Versioned accessor over SQLite.
pub type SqliteStore = VersionedAccessor<SqliteBackend>;

/// Open the database described by `config` and wrap it in an accessor.
pub fn open_store(config: &StoreConfig) -> InsertOnlyResult<SqliteStore> {
    config.validate()?;
    let backend = SqliteBackend::from_config(config)?;
    VersionedAccessor::with_config(backend, config)
}

/// Accessor over a fresh in-memory database with default settings.
pub fn in_memory_store() -> InsertOnlyResult<SqliteStore> {
    Ok(VersionedAccessor::new(SqliteBackend::in_memory()?))
}
