//! Per-table schema cache.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::TableSchema;
use crate::error::{InsertOnlyError, InsertOnlyResult};

/// Introspected schemas keyed by table name.
///
/// Entries live until invalidated; callers that run DDL against a cached
/// table must call [`SchemaCache::invalidate`].
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<String, Arc<TableSchema>>>,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached schema or load and remember it.
    pub fn get_or_load<F>(&self, table: &str, load: F) -> InsertOnlyResult<Arc<TableSchema>>
    where
        F: FnOnce() -> InsertOnlyResult<TableSchema>,
    {
        if let Some(schema) = self.get(table)? {
            return Ok(schema);
        }

        let schema = Arc::new(load()?);
        let mut entries = self
            .entries
            .write()
            .map_err(|e| InsertOnlyError::Internal(format!("Failed to acquire lock: {}", e)))?;
        tracing::debug!(table, columns = schema.columns.len(), "Cached table schema");
        Ok(entries
            .entry(table.to_string())
            .or_insert(schema)
            .clone())
    }

    /// Cached schema for a table, if present.
    pub fn get(&self, table: &str) -> InsertOnlyResult<Option<Arc<TableSchema>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| InsertOnlyError::Internal(format!("Failed to acquire lock: {}", e)))?;
        Ok(entries.get(table).cloned())
    }

    /// Forget one table.
    pub fn invalidate(&self, table: &str) -> InsertOnlyResult<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| InsertOnlyError::Internal(format!("Failed to acquire lock: {}", e)))?;
        Ok(entries.remove(table).is_some())
    }

    /// Forget every table.
    pub fn clear(&self) -> InsertOnlyResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| InsertOnlyError::Internal(format!("Failed to acquire lock: {}", e)))?;
        entries.clear();
        Ok(())
    }

    /// Number of cached tables.
    pub fn len(&self) -> InsertOnlyResult<usize> {
        let entries = self
            .entries
            .read()
            .map_err(|e| InsertOnlyError::Internal(format!("Failed to acquire lock: {}", e)))?;
        Ok(entries.len())
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> InsertOnlyResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDescriptor;
    use std::cell::Cell;

    fn schema(name: &str) -> TableSchema {
        TableSchema::new(name, vec![ColumnDescriptor::new("id")])
    }

    #[test]
    fn test_loads_once() {
        let cache = SchemaCache::new();
        let loads = Cell::new(0);

        for _ in 0..3 {
            let loaded = cache
                .get_or_load("teams", || {
                    loads.set(loads.get() + 1);
                    Ok(schema("teams"))
                })
                .unwrap();
            assert_eq!(loaded.name, "teams");
        }

        assert_eq!(loads.get(), 1);
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let cache = SchemaCache::new();
        cache.get_or_load("teams", || Ok(schema("teams"))).unwrap();
        assert!(cache.invalidate("teams").unwrap());
        assert!(!cache.invalidate("teams").unwrap());
        assert!(cache.is_empty().unwrap());

        cache.get_or_load("a", || Ok(schema("a"))).unwrap();
        cache.get_or_load("b", || Ok(schema("b"))).unwrap();
        cache.clear().unwrap();
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_poisoned_lock_is_reported() {
        let cache = std::sync::Arc::new(SchemaCache::new());
        let poisoner = std::sync::Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.write().unwrap();
            panic!("poison the cache lock");
        })
        .join();

        let err = cache.len().unwrap_err();
        assert!(matches!(err, InsertOnlyError::Internal(_)));
        assert!(cache.is_empty().is_err());
        assert!(cache.get("teams").is_err());
    }

    #[test]
    fn test_load_error_is_not_cached() {
        let cache = SchemaCache::new();
        let result = cache.get_or_load("teams", || Err(InsertOnlyError::database("boom")));
        assert!(result.is_err());
        assert!(cache.get("teams").unwrap().is_none());
    }
}
