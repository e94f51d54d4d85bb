//! Configuration system for insertonly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{InsertOnlyError, InsertOnlyResult};

/// Names of the bookkeeping columns every versioned table carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionColumns {
    /// Storage-assigned, strictly increasing row key. Never returned to callers.
    pub surrogate_key: String,
    /// Stable logical identifier shared by every version of an entity.
    pub identifier: String,
    /// Tombstone flag.
    pub deleted: String,
}

impl Default for VersionColumns {
    fn default() -> Self {
        Self {
            surrogate_key: "id".to_string(),
            identifier: "uuid".to_string(),
            deleted: "deleted".to_string(),
        }
    }
}

impl VersionColumns {
    /// Reject empty or clashing column names.
    pub fn validate(&self) -> InsertOnlyResult<()> {
        let names = [
            ("surrogate_key", &self.surrogate_key),
            ("identifier", &self.identifier),
            ("deleted", &self.deleted),
        ];
        for (role, name) in names {
            if name.trim().is_empty() {
                return Err(InsertOnlyError::Configuration(format!(
                    "column name for '{}' must not be empty",
                    role
                )));
            }
        }
        if self.surrogate_key == self.identifier
            || self.surrogate_key == self.deleted
            || self.identifier == self.deleted
        {
            return Err(InsertOnlyError::Configuration(
                "surrogate_key, identifier and deleted must name distinct columns".to_string(),
            ));
        }
        Ok(())
    }
}

/// Main store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file. `None` opens an in-memory database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    /// Bookkeeping column names.
    pub columns: VersionColumns,
    /// Keep introspected table schemas for the lifetime of the accessor.
    pub cache_schemas: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            columns: VersionColumns::default(),
            cache_schemas: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> InsertOnlyResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| InsertOnlyError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| InsertOnlyError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| InsertOnlyError::Configuration(e.to_string()))?,
            _ => {
                return Err(InsertOnlyError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("INSERTONLY_DATABASE_PATH") {
            config.database_path = match path.as_str() {
                "" | ":memory:" => None,
                _ => Some(PathBuf::from(path)),
            };
        }

        if let Ok(flag) = std::env::var("INSERTONLY_CACHE_SCHEMAS") {
            config.cache_schemas = !matches!(flag.to_lowercase().as_str(), "0" | "false" | "no" | "off");
        }

        if let Ok(name) = std::env::var("INSERTONLY_ID_COLUMN") {
            config.columns.surrogate_key = name;
        }
        if let Ok(name) = std::env::var("INSERTONLY_UUID_COLUMN") {
            config.columns.identifier = name;
        }
        if let Ok(name) = std::env::var("INSERTONLY_DELETED_COLUMN") {
            config.columns.deleted = name;
        }

        config
    }

    /// Check the configuration for inconsistencies.
    pub fn validate(&self) -> InsertOnlyResult<()> {
        self.columns.validate()
    }
}
