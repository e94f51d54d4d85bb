//! Association configuration between versioned tables.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, InsertOnlyError, InsertOnlyResult};

/// Association cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssociationKind {
    /// Resolved through a versioned join table.
    ManyToMany,
    /// Not supported.
    OneToMany,
    /// Not supported.
    ManyToOne,
    /// Not supported.
    OneToOne,
}

impl AssociationKind {
    /// Convert to the configuration spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManyToMany => "manyToMany",
            Self::OneToMany => "oneToMany",
            Self::ManyToOne => "manyToOne",
            Self::OneToOne => "oneToOne",
        }
    }
}

/// A foreign column in the join table and the column it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinColumn {
    /// Column in the join table.
    pub name: String,
    /// Column in the referenced table, conventionally the identifier.
    pub referenced_column_name: String,
}

impl JoinColumn {
    /// Create a join column.
    pub fn new(name: impl Into<String>, referenced_column_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            referenced_column_name: referenced_column_name.into(),
        }
    }
}

/// Association between an owning and an inverse table.
///
/// Deserializes from the camelCase shape:
///
/// ```json
/// {
///   "type": "manyToMany",
///   "joinTable": "teams_players",
///   "joinColumns": { "name": "team_uuid", "referencedColumnName": "uuid" },
///   "inverseJoinColumns": { "name": "player_uuid", "referencedColumnName": "uuid" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationConfig {
    /// Association kind. Missing is rejected at query time, not parse time.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AssociationKind>,
    /// Versioned join table name.
    pub join_table: String,
    /// Join-table column pointing at the owning table.
    pub join_columns: JoinColumn,
    /// Join-table column pointing at the inverse table.
    pub inverse_join_columns: JoinColumn,
}

impl AssociationConfig {
    /// Create a many-to-many association.
    pub fn many_to_many(
        join_table: impl Into<String>,
        join_columns: JoinColumn,
        inverse_join_columns: JoinColumn,
    ) -> Self {
        Self {
            kind: Some(AssociationKind::ManyToMany),
            join_table: join_table.into(),
            join_columns,
            inverse_join_columns,
        }
    }

    /// Ensure the association can be resolved.
    pub fn validate(&self) -> InsertOnlyResult<()> {
        match self.kind {
            None => {
                return Err(InsertOnlyError::invalid_association(
                    ErrorCode::AssocMissingType,
                    "association type is required",
                ))
            }
            Some(AssociationKind::ManyToMany) => {}
            Some(other) => {
                return Err(InsertOnlyError::invalid_association(
                    ErrorCode::AssocUnsupportedType,
                    format!("association type '{}' is not supported", other.as_str()),
                ))
            }
        }

        let parts = [
            ("joinTable", &self.join_table),
            ("joinColumns.name", &self.join_columns.name),
            ("joinColumns.referencedColumnName", &self.join_columns.referenced_column_name),
            ("inverseJoinColumns.name", &self.inverse_join_columns.name),
            (
                "inverseJoinColumns.referencedColumnName",
                &self.inverse_join_columns.referenced_column_name,
            ),
        ];
        if let Some((field, _)) = parts.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(InsertOnlyError::invalid_association(
                ErrorCode::AssocIncomplete,
                format!("association field '{}' must not be empty", field),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn players_json() -> serde_json::Value {
        json!({
            "type": "manyToMany",
            "joinTable": "teams_players",
            "joinColumns": {"name": "team_uuid", "referencedColumnName": "uuid"},
            "inverseJoinColumns": {"name": "player_uuid", "referencedColumnName": "uuid"}
        })
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: AssociationConfig = serde_json::from_value(players_json()).unwrap();
        assert_eq!(
            config,
            AssociationConfig::many_to_many(
                "teams_players",
                JoinColumn::new("team_uuid", "uuid"),
                JoinColumn::new("player_uuid", "uuid"),
            )
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_type_rejected() {
        let mut value = players_json();
        value.as_object_mut().unwrap().remove("type");
        let config: AssociationConfig = serde_json::from_value(value).unwrap();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::AssocMissingType);
    }

    #[test]
    fn test_other_kinds_rejected() {
        for kind in ["oneToMany", "manyToOne", "oneToOne"] {
            let mut value = players_json();
            value["type"] = json!(kind);
            let config: AssociationConfig = serde_json::from_value(value).unwrap();
            let err = config.validate().unwrap_err();
            assert_eq!(err.code(), ErrorCode::AssocUnsupportedType);
            assert!(err.to_string().contains(kind));
        }
    }

    #[test]
    fn test_empty_join_column_rejected() {
        let config = AssociationConfig::many_to_many(
            "teams_players",
            JoinColumn::new("", "uuid"),
            JoinColumn::new("player_uuid", "uuid"),
        );
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::AssocIncomplete);
        assert!(err.to_string().contains("joinColumns.name"));
    }
}
