//! Versioned table accessor.
//!
//! Every write appends exactly one physical row. Readers resolve, per
//! identifier, the row with the greatest surrogate key and hide it when it is
//! a tombstone.
//!
//! # Consistency
//!
//! No transactions, locks or retries are used here. `update` reads the
//! current version and appends a new one in two statements, so two
//! concurrent updates of the same entity may both succeed from the same
//! base: the row that received the higher surrogate key wins and the
//! patches are not merged. Callers needing more must serialize updates per
//! identifier themselves.

mod association;
mod read;
mod write;


use std::sync::Arc;

use crate::config::{StoreConfig, VersionColumns};
use crate::error::{ErrorCode, InsertOnlyError, InsertOnlyResult};
use crate::query::{ColumnRef, Predicate, Projection, SelectSpec, Source};
use crate::schema::{SchemaCache, TableSchema};
use crate::traits::StorageBackend;
use crate::types::Record;

/// Insert-only access to versioned tables through a [`StorageBackend`].
pub struct VersionedAccessor<B: StorageBackend> {
    backend: B,
    columns: VersionColumns,
    schemas: SchemaCache,
    cache_schemas: bool,
}

impl<B: StorageBackend> VersionedAccessor<B> {
    /// Create an accessor with default column names and schema caching.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            columns: VersionColumns::default(),
            schemas: SchemaCache::new(),
            cache_schemas: true,
        }
    }

    /// Create an accessor using the column names and caching policy of `config`.
    pub fn with_config(backend: B, config: &StoreConfig) -> InsertOnlyResult<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            columns: config.columns.clone(),
            schemas: SchemaCache::new(),
            cache_schemas: config.cache_schemas,
        })
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Give the backend (and its connection) back to the caller.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Bookkeeping column names in use.
    pub fn columns(&self) -> &VersionColumns {
        &self.columns
    }

    /// Drop the cached schema of `table`, e.g. after altering it.
    pub fn invalidate_schema(&self, table: &str) -> InsertOnlyResult<()> {
        self.schemas.invalidate(table)?;
        Ok(())
    }

    /// Drop every cached schema.
    pub fn clear_schema_cache(&self) -> InsertOnlyResult<()> {
        self.schemas.clear()
    }

    /// Introspected schema of a versioned table.
    pub fn schema(&self, table: &str) -> InsertOnlyResult<Arc<TableSchema>> {
        let schema = if self.cache_schemas {
            self.schemas
                .get_or_load(table, || self.backend.describe_table(table))?
        } else {
            Arc::new(self.backend.describe_table(table)?)
        };
        schema.ensure_versioned(&self.columns)?;
        Ok(schema)
    }

    fn require_column(&self, schema: &TableSchema, column: &str) -> InsertOnlyResult<()> {
        if schema.has_column(column) {
            return Ok(());
        }
        Err(InsertOnlyError::schema(
            ErrorCode::SchemaMissingColumn,
            &schema.name,
            format!("column '{}' does not exist", column),
        ))
    }

    fn identifier_criteria(&self, uuid: &str) -> Record {
        let mut criteria = Record::new();
        criteria.insert(self.columns.identifier.clone(), uuid.into());
        criteria
    }

    /// `MAX(surrogate_key)` per identifier.
    fn latest_versions(&self, table: &str) -> SelectSpec {
        SelectSpec::from(Source::table(table))
            .project(Projection::Max(ColumnRef::new(&self.columns.surrogate_key)))
            .group_by(ColumnRef::new(&self.columns.identifier))
    }

    /// Restrict `qualifier`'s rows to current, non-tombstoned versions of `table`.
    fn current_version_filters(&self, table: &str, qualifier: Option<&str>) -> [Predicate; 2] {
        let column = |name: &str| ColumnRef {
            qualifier: qualifier.map(str::to_string),
            name: name.to_string(),
        };
        [
            Predicate::InSubquery(
                column(&self.columns.surrogate_key),
                Box::new(self.latest_versions(table)),
            ),
            Predicate::IsFalse(column(&self.columns.deleted)),
        ]
    }
}

fn is_blank(uuid: &str) -> bool {
    uuid.trim().is_empty()
}
