//! Latest-version reads.

use serde::de::DeserializeOwned;
use tracing::trace;

use super::{is_blank, VersionedAccessor};
use crate::error::InsertOnlyResult;
use crate::query::{compile_select, ColumnRef, Order, SelectSpec, Source, Statement};
use crate::schema::TableSchema;
use crate::traits::StorageBackend;
use crate::types::{record_into, Record, RecordExt};

impl<B: StorageBackend> VersionedAccessor<B> {
    /// The most recent row matching every equality in `criteria`.
    ///
    /// `Ok(None)` when nothing matches or the most recent match is a tombstone.
    pub fn fetch(&self, table: &str, criteria: &Record) -> InsertOnlyResult<Option<Record>> {
        let schema = self.schema(table)?;
        let spec = SelectSpec::from(Source::table(table))
            .columns(None, schema.visible_columns(&self.columns))
            .filter_eq(None, criteria)
            .order_by(ColumnRef::new(&self.columns.surrogate_key), Order::Desc)
            .limit(1);

        let statement = compile_select(&spec)?;
        trace!(sql = %statement.sql, "Fetching latest row");

        match self.backend.fetch_optional(&statement)? {
            Some(row) if row.flag(&self.columns.deleted) => Ok(None),
            Some(mut row) => {
                schema.normalize_row(&mut row);
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    /// Current version of one entity.
    pub fn fetch_by_uuid(&self, table: &str, uuid: &str) -> InsertOnlyResult<Option<Record>> {
        if is_blank(uuid) {
            return Ok(None);
        }
        self.fetch(table, &self.identifier_criteria(uuid))
    }

    /// Current version of every live entity, ordered by identifier.
    pub fn fetch_all(&self, table: &str) -> InsertOnlyResult<Vec<Record>> {
        let schema = self.schema(table)?;
        let [latest, live] = self.current_version_filters(table, None);
        let spec = SelectSpec::from(Source::table(table))
            .columns(None, schema.visible_columns(&self.columns))
            .filter(latest)
            .filter(live)
            .order_by(ColumnRef::new(&self.columns.identifier), Order::Asc);

        let statement = compile_select(&spec)?;
        trace!(sql = %statement.sql, "Fetching current rows");
        self.fetch_normalized(&schema, &statement)
    }

    /// Every stored version of one entity, oldest first, tombstones included.
    pub fn history(&self, table: &str, uuid: &str) -> InsertOnlyResult<Vec<Record>> {
        if is_blank(uuid) {
            return Ok(Vec::new());
        }

        let schema = self.schema(table)?;
        let spec = SelectSpec::from(Source::table(table))
            .columns(None, schema.visible_columns(&self.columns))
            .filter_eq(None, &self.identifier_criteria(uuid))
            .order_by(ColumnRef::new(&self.columns.surrogate_key), Order::Asc);

        let statement = compile_select(&spec)?;
        trace!(sql = %statement.sql, "Fetching history");
        self.fetch_normalized(&schema, &statement)
    }

    pub(super) fn fetch_normalized(
        &self,
        schema: &TableSchema,
        statement: &Statement,
    ) -> InsertOnlyResult<Vec<Record>> {
        let mut rows = self.backend.fetch_rows(statement)?;
        for row in &mut rows {
            schema.normalize_row(row);
        }
        Ok(rows)
    }

    /// [`fetch_by_uuid`](Self::fetch_by_uuid) deserialized into `T`.
    pub fn fetch_as<T: DeserializeOwned>(&self, table: &str, uuid: &str) -> InsertOnlyResult<Option<T>> {
        self.fetch_by_uuid(table, uuid)?.map(record_into).transpose()
    }

    /// [`fetch_all`](Self::fetch_all) deserialized into `T`.
    pub fn fetch_all_as<T: DeserializeOwned>(&self, table: &str) -> InsertOnlyResult<Vec<T>> {
        self.fetch_all(table)?.into_iter().map(record_into).collect()
    }
}
