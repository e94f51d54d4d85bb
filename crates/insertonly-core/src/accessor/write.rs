//! Forward-only writes: insert, update, delete.

use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use super::{is_blank, VersionedAccessor};
use crate::error::{InsertOnlyError, InsertOnlyResult};
use crate::query::{compile_insert, InsertSpec};
use crate::schema::TableSchema;
use crate::traits::StorageBackend;
use crate::types::Record;

impl<B: StorageBackend> VersionedAccessor<B> {
    /// Create a new entity and return its freshly generated identifier.
    ///
    /// `values` must not carry the identifier or the surrogate key; both are
    /// owned by the store. The tombstone flag is always written as `false`.
    pub fn insert(&self, table: &str, mut values: Record) -> InsertOnlyResult<String> {
        if values.contains_key(&self.columns.identifier) {
            return Err(InsertOnlyError::identifier_must_be_empty(table, &self.columns.identifier));
        }
        if values.contains_key(&self.columns.surrogate_key) {
            return Err(InsertOnlyError::surrogate_key_set(table, &self.columns.surrogate_key));
        }

        let schema = self.schema(table)?;

        let uuid = Uuid::new_v4().to_string();
        values.insert(self.columns.identifier.clone(), Value::String(uuid.clone()));
        values.insert(self.columns.deleted.clone(), Value::Bool(false));

        self.append(&schema, values)?;
        debug!(table, uuid = %uuid, "Inserted entity");
        Ok(uuid)
    }

    /// Append a new version of `uuid` with `values` merged over the current one.
    ///
    /// Returns `Ok(None)` without writing when the entity never existed or is
    /// deleted; deleted entities cannot be brought back.
    pub fn update(&self, table: &str, uuid: &str, values: Record) -> InsertOnlyResult<Option<String>> {
        if is_blank(uuid) {
            return Err(InsertOnlyError::identifier_required(table));
        }

        let Some(mut row) = self.fetch_by_uuid(table, uuid)? else {
            debug!(table, uuid, "Update skipped, no current version");
            return Ok(None);
        };

        for (column, value) in values {
            if column != self.columns.surrogate_key {
                row.insert(column, value);
            }
        }
        row.remove(&self.columns.surrogate_key);
        row.insert(self.columns.identifier.clone(), Value::String(uuid.to_string()));
        row.insert(self.columns.deleted.clone(), Value::Bool(false));

        let schema = self.schema(table)?;
        self.append(&schema, row)?;
        debug!(table, uuid, "Appended version");
        Ok(Some(uuid.to_string()))
    }

    /// Tombstone the row `fetch(table, criteria)` resolves to.
    ///
    /// Criteria may name any columns, e.g. both foreign keys of a join row.
    /// Returns the number of rows written, or `Ok(None)` when nothing live
    /// matched.
    pub fn delete(&self, table: &str, criteria: &Record) -> InsertOnlyResult<Option<usize>> {
        if criteria.is_empty() {
            return Err(InsertOnlyError::identifier_required(table));
        }

        let Some(mut row) = self.fetch(table, criteria)? else {
            debug!(table, "Delete skipped, no current version");
            return Ok(None);
        };

        row.remove(&self.columns.surrogate_key);
        row.insert(self.columns.deleted.clone(), Value::Bool(true));

        let uuid = row
            .get(&self.columns.identifier)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default();
        let schema = self.schema(table)?;
        let written = self.append(&schema, row)?;
        debug!(table, uuid = %uuid, "Appended tombstone");
        Ok(Some(written))
    }

    /// [`delete`](Self::delete) by identifier.
    pub fn delete_by_uuid(&self, table: &str, uuid: &str) -> InsertOnlyResult<Option<usize>> {
        if is_blank(uuid) {
            return Ok(None);
        }
        self.delete(table, &self.identifier_criteria(uuid))
    }

    fn append(&self, schema: &TableSchema, values: Record) -> InsertOnlyResult<usize> {
        let spec = InsertSpec::new(&schema.name, values).binary_columns(schema.binary_columns());
        let statement = compile_insert(&spec)?;
        trace!(sql = %statement.sql, "Appending row");
        self.backend.execute_insert(&statement)
    }
}
