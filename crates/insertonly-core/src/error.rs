//! Error types for insertonly operations.
//!
//! This module provides the error hierarchy shared by the accessor and the
//! storage backends, with structured error codes and resolution hints.
//!
//! There is no "not found" error: a missing or tombstoned entity is an
//! `Ok(None)` result, never an error.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for insertonly operations.
pub type InsertOnlyResult<T> = Result<T, InsertOnlyError>;

/// Main error type for all insertonly operations.
#[derive(Error, Debug)]
pub enum InsertOnlyError {
    /// The caller broke an operation contract. Raised before any I/O.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// Association configuration is missing, incomplete or not many-to-many.
    #[error("Invalid association: {message}")]
    InvalidAssociation { message: String, code: ErrorCode },

    /// The table does not exist or is not a versioned table.
    #[error("Schema error on table '{table}': {message}")]
    Schema {
        message: String,
        code: ErrorCode,
        table: String,
    },

    /// Storage layer failure, passed through unchanged.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValIdentifierNotEmpty,
    ValIdentifierRequired,
    ValSurrogateKeySet,
    ValInvalidIdentifier,
    ValUnsupportedValue,

    // Query (QUERY_xxx)
    QueryMalformed,

    // Association (ASSOC_xxx)
    AssocMissingType,
    AssocUnsupportedType,
    AssocIncomplete,

    // Schema (SCHEMA_xxx)
    SchemaTableNotFound,
    SchemaMissingColumn,

    // Database (DB_xxx)
    DbConnectionFailed,
    DbOperationFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValIdentifierNotEmpty => "VAL_001",
            ErrorCode::ValIdentifierRequired => "VAL_002",
            ErrorCode::ValSurrogateKeySet => "VAL_003",
            ErrorCode::ValInvalidIdentifier => "VAL_004",
            ErrorCode::ValUnsupportedValue => "VAL_005",
            ErrorCode::QueryMalformed => "QUERY_001",
            ErrorCode::AssocMissingType => "ASSOC_001",
            ErrorCode::AssocUnsupportedType => "ASSOC_002",
            ErrorCode::AssocIncomplete => "ASSOC_003",
            ErrorCode::SchemaTableNotFound => "SCHEMA_001",
            ErrorCode::SchemaMissingColumn => "SCHEMA_002",
            ErrorCode::DbConnectionFailed => "DB_001",
            ErrorCode::DbOperationFailed => "DB_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl InsertOnlyError {
    /// Create a validation error with an explicit code.
    pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// The caller supplied an identifier on insert.
    pub fn identifier_must_be_empty(table: &str, column: &str) -> Self {
        let mut details = HashMap::new();
        details.insert("table".to_string(), table.to_string());
        details.insert("column".to_string(), column.to_string());
        Self::Validation {
            message: format!("'{}' must be empty on insert into '{}'", column, table),
            code: ErrorCode::ValIdentifierNotEmpty,
            details,
            suggestion: Some("Identifiers are generated on insert; use update() to write a new version".to_string()),
        }
    }

    /// An operation that targets one entity was given an empty identifier.
    pub fn identifier_required(table: &str) -> Self {
        let mut details = HashMap::new();
        details.insert("table".to_string(), table.to_string());
        Self::Validation {
            message: format!("an identifier is required to address an entity in '{}'", table),
            code: ErrorCode::ValIdentifierRequired,
            details,
            suggestion: Some("Pass the uuid returned by insert()".to_string()),
        }
    }

    /// The caller tried to set the storage-assigned surrogate key.
    pub fn surrogate_key_set(table: &str, column: &str) -> Self {
        let mut details = HashMap::new();
        details.insert("table".to_string(), table.to_string());
        details.insert("column".to_string(), column.to_string());
        Self::Validation {
            message: format!("'{}' is assigned by the storage engine in '{}'", column, table),
            code: ErrorCode::ValSurrogateKeySet,
            details,
            suggestion: None,
        }
    }

    /// A table, column or alias name cannot be used in a statement.
    pub fn invalid_identifier(name: &str) -> Self {
        Self::validation(
            ErrorCode::ValInvalidIdentifier,
            format!("invalid SQL identifier '{}'", name.escape_debug()),
        )
    }

    /// A value cannot be stored without losing information.
    pub fn unsupported_value(message: impl Into<String>) -> Self {
        Self::validation(ErrorCode::ValUnsupportedValue, message)
    }

    /// A query specification cannot be compiled to a statement.
    pub fn malformed_query(message: impl Into<String>) -> Self {
        Self::validation(ErrorCode::QueryMalformed, message)
    }

    /// Create an invalid association error.
    pub fn invalid_association(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::InvalidAssociation {
            message: message.into(),
            code,
        }
    }

    /// Create a schema error.
    pub fn schema(code: ErrorCode, table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            code,
            table: table.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Wrap a storage driver error, keeping it as the source.
    pub fn database_source<E>(code: ErrorCode, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Database {
            message: err.to_string(),
            code,
            source: Some(Box::new(err)),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::InvalidAssociation { code, .. } => *code,
            Self::Schema { code, .. } => *code,
            Self::Database { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether the caller broke an operation contract (nothing was written).
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::InvalidAssociation { .. } => {
                Some("Only type = \"manyToMany\" with a join table and both join columns is supported")
            }
            Self::Schema {
                code: ErrorCode::SchemaMissingColumn,
                ..
            } => Some("Versioned tables need surrogate key, identifier and deleted columns"),
            Self::Schema { .. } => Some("Please check the table name and that its schema has been created"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_must_be_empty() {
        let err = InsertOnlyError::identifier_must_be_empty("teams", "uuid");
        assert_eq!(err.code(), ErrorCode::ValIdentifierNotEmpty);
        assert!(err.is_contract_violation());
        assert!(err.to_string().contains("'uuid' must be empty"));
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_invalid_association_is_not_contract_violation() {
        let err = InsertOnlyError::invalid_association(ErrorCode::AssocMissingType, "type missing");
        assert_eq!(err.code(), ErrorCode::AssocMissingType);
        assert!(!err.is_contract_violation());
        assert!(err.suggestion().unwrap().contains("manyToMany"));
    }

    #[test]
    fn test_database_source_is_kept() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = InsertOnlyError::database_source(ErrorCode::DbOperationFailed, io);
        assert_eq!(err.code(), ErrorCode::DbOperationFailed);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValIdentifierNotEmpty.as_str(), "VAL_001");
        assert_eq!(ErrorCode::AssocUnsupportedType.as_str(), "ASSOC_002");
        assert_eq!(InsertOnlyError::Internal("x".into()).code().as_str(), "INT_001");
    }
}
