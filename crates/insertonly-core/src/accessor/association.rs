//! Many-to-many resolution across three versioned tables.

use serde_json::Value;
use tracing::trace;

use super::VersionedAccessor;
use crate::error::InsertOnlyResult;
use crate::query::{compile_select, ColumnRef, Join, Order, Predicate, SelectSpec, Source};
use crate::traits::StorageBackend;
use crate::types::{AssociationConfig, Record};

const INVERSE: &str = "i";
const JOIN: &str = "j";
const OWNING: &str = "o";

impl<B: StorageBackend> VersionedAccessor<B> {
    /// Current `inverse` rows linked to any `owning` row through live join rows.
    ///
    /// Both the inverse rows and the join rows must be current and not
    /// tombstoned; owning rows are matched by value only. Ordered by the
    /// inverse identifier.
    pub fn fetch_association(
        &self,
        owning: &str,
        inverse: &str,
        config: &AssociationConfig,
    ) -> InsertOnlyResult<Vec<Record>> {
        self.resolve_association(owning, inverse, config, None)
    }

    /// Like [`fetch_association`](Self::fetch_association), restricted to
    /// join rows pointing at `owner` (a value of the owning referenced column).
    pub fn fetch_association_for(
        &self,
        owning: &str,
        inverse: &str,
        config: &AssociationConfig,
        owner: impl Into<Value>,
    ) -> InsertOnlyResult<Vec<Record>> {
        self.resolve_association(owning, inverse, config, Some(owner.into()))
    }

    fn resolve_association(
        &self,
        owning: &str,
        inverse: &str,
        config: &AssociationConfig,
        owner: Option<Value>,
    ) -> InsertOnlyResult<Vec<Record>> {
        config.validate()?;

        let owning_fk = &config.join_columns;
        let inverse_fk = &config.inverse_join_columns;

        let owning_schema = self.schema(owning)?;
        let inverse_schema = self.schema(inverse)?;
        let join_schema = self.schema(&config.join_table)?;
        self.require_column(&owning_schema, &owning_fk.referenced_column_name)?;
        self.require_column(&inverse_schema, &inverse_fk.referenced_column_name)?;
        self.require_column(&join_schema, &owning_fk.name)?;
        self.require_column(&join_schema, &inverse_fk.name)?;

        let owners = SelectSpec::from(Source::aliased(owning, OWNING))
            .columns(Some(OWNING), [owning_fk.referenced_column_name.as_str()]);

        let [inverse_latest, inverse_live] = self.current_version_filters(inverse, Some(INVERSE));
        let [join_latest, join_live] = self.current_version_filters(&config.join_table, Some(JOIN));

        let mut spec = SelectSpec::from(Source::aliased(inverse, INVERSE))
            .columns(Some(INVERSE), inverse_schema.visible_columns(&self.columns))
            .join(Join {
                source: Source::aliased(&config.join_table, JOIN),
                on: vec![(
                    ColumnRef::qualified(JOIN, &inverse_fk.name),
                    ColumnRef::qualified(INVERSE, &inverse_fk.referenced_column_name),
                )],
            })
            .filter(inverse_latest)
            .filter(inverse_live)
            .filter(join_latest)
            .filter(join_live)
            .filter(Predicate::InSubquery(
                ColumnRef::qualified(JOIN, &owning_fk.name),
                Box::new(owners),
            ));

        if let Some(owner) = owner {
            spec = spec.filter(Predicate::Eq(ColumnRef::qualified(JOIN, &owning_fk.name), owner));
        }

        let spec = spec.order_by(ColumnRef::qualified(INVERSE, &self.columns.identifier), Order::Asc);

        let statement = compile_select(&spec)?;
        trace!(sql = %statement.sql, "Resolving association");
        self.fetch_normalized(&inverse_schema, &statement)
    }
}
