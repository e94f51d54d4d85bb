//! insertonly-core - Core library for insertonly.
//!
//! This crate provides the versioned table accessor, the query
//! specifications it compiles to SQL, and the storage trait backends
//! implement.
//!
//! Rows are never updated or removed. Every insert, update and delete
//! appends one physical row; the row with the greatest surrogate key per
//! identifier is the current version, and a current version flagged
//! `deleted` hides the entity from readers.
//!
//! # Example
//!
//! ```ignore
//! use insertonly_core::{record_from_value, VersionedAccessor};
//! use serde_json::json;
//!
//! let store = VersionedAccessor::new(backend);
//!
//! let uuid = store.insert("players", record_from_value(json!({"name": "Ana"}))?)?;
//! store.update("players", &uuid, record_from_value(json!({"name": "Ana B."}))?)?;
//! store.delete_by_uuid("players", &uuid)?;
//!
//! assert!(store.fetch_by_uuid("players", &uuid)?.is_none());
//! assert_eq!(store.history("players", &uuid)?.len(), 3);
//! ```

pub mod accessor;
pub mod config;
pub mod error;
pub mod query;
pub mod schema;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use accessor::VersionedAccessor;
pub use config::{StoreConfig, VersionColumns};
pub use error::{ErrorCode, InsertOnlyError, InsertOnlyResult};
pub use query::{InsertSpec, SelectSpec, Statement};
pub use schema::{ColumnDescriptor, SchemaCache, TableSchema};
pub use traits::StorageBackend;
pub use types::{
    is_truthy, record_from_value, record_into, AssociationConfig, AssociationKind, JoinColumn,
    Record, RecordExt,
};
