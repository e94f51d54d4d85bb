//! Storage backend trait.

use crate::error::InsertOnlyResult;
use crate::query::Statement;
use crate::schema::TableSchema;
use crate::types::Record;

/// The relational capabilities the accessor consumes.
///
/// Implementations execute compiled statements against a live connection and
/// report table columns. They must not retry, wrap in transactions, or mask
/// driver errors: failures are returned as [`crate::InsertOnlyError::Database`]
/// with the driver error as source.
///
/// Surrogate keys assigned by the backend must be strictly increasing per
/// table, in commit order. Latest-version resolution depends on it.
#[cfg_attr(test, mockall::automock)]
pub trait StorageBackend: Send + Sync {
    /// Execute a parameterized INSERT, returning the affected row count.
    fn execute_insert(&self, statement: &Statement) -> InsertOnlyResult<usize>;

    /// Execute a parameterized SELECT, returning every row.
    fn fetch_rows(&self, statement: &Statement) -> InsertOnlyResult<Vec<Record>>;

    /// Execute a parameterized SELECT, returning the first row if any.
    fn fetch_optional(&self, statement: &Statement) -> InsertOnlyResult<Option<Record>> {
        Ok(self.fetch_rows(statement)?.into_iter().next())
    }

    /// Describe the live columns of a table in schema order.
    ///
    /// A table that does not exist yields an empty column list.
    fn describe_table(&self, table: &str) -> InsertOnlyResult<TableSchema>;
}
