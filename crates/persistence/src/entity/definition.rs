//! Entity type definitions and the catalog of exposed types.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BackendError, StorageResult, ValidationError};

/// Names that would collide with routes or internal tables.
const RESERVED_NAMES: &[&str] = &["tenants", "health", "schema_version", "entity_tables"];

/// Which lifecycle operations an entity type supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecyclePolicy {
    /// Only the visibility toggle; trash operations are rejected.
    HiddenOnly,
    /// Full trash lifecycle.
    Trash {
        /// Whether restoring a record also clears `hidden`.
        #[serde(default)]
        restore_clears_hidden: bool,
    },
}

impl LifecyclePolicy {
    /// Full trash lifecycle that leaves `hidden` alone on restore.
    pub const fn trash() -> Self {
        LifecyclePolicy::Trash {
            restore_clears_hidden: false,
        }
    }
}

/// Describes one entity type: its table, its label field and its policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Table name; also the path segment in the HTTP surface.
    pub name: String,
    /// Field of the record data used as the audit label.
    pub label_field: String,
    /// Supported lifecycle operations.
    pub policy: LifecyclePolicy,
}

impl EntityDefinition {
    /// Creates a definition after validating its table name.
    pub fn new(
        name: impl Into<String>,
        label_field: impl Into<String>,
        policy: LifecyclePolicy,
    ) -> Result<Self, ValidationError> {
        let definition = Self {
            name: name.into(),
            label_field: label_field.into(),
            policy,
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Checks the table name: `^[a-z][a-z0-9_]{0,62}$` and not reserved.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name.as_str();
        let well_formed = name.len() <= 63
            && name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

        if !well_formed {
            return Err(ValidationError::InvalidIdentifier {
                kind: "entity name",
                value: self.name.clone(),
                reason: "must match ^[a-z][a-z0-9_]{0,62}$".to_string(),
            });
        }
        if RESERVED_NAMES.contains(&name) {
            return Err(ValidationError::InvalidIdentifier {
                kind: "entity name",
                value: self.name.clone(),
                reason: "name is reserved".to_string(),
            });
        }
        if self.label_field.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "label_field".to_string(),
            });
        }
        Ok(())
    }

    /// Returns the table name.
    pub fn table(&self) -> &str {
        &self.name
    }

    /// Returns `true` if trash operations are allowed.
    pub fn supports_trash(&self) -> bool {
        matches!(self.policy, LifecyclePolicy::Trash { .. })
    }

    /// Returns `true` if restoring clears `hidden`.
    pub fn restore_clears_hidden(&self) -> bool {
        matches!(
            self.policy,
            LifecyclePolicy::Trash {
                restore_clears_hidden: true
            }
        )
    }
}

/// The set of entity types a deployment exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityCatalog {
    entries: BTreeMap<String, EntityDefinition>,
}

impl EntityCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition, replacing any previous one with the same name.
    pub fn with(mut self, definition: EntityDefinition) -> Self {
        self.entries.insert(definition.name.clone(), definition);
        self
    }

    /// The built-in catalog.
    ///
    /// ```
    /// use atrium_persistence::entity::EntityCatalog;
    ///
    /// let catalog = EntityCatalog::builtin();
    /// assert!(catalog.get("clients").unwrap().supports_trash());
    /// assert!(!catalog.get("accounts").unwrap().supports_trash());
    /// ```
    pub fn builtin() -> Self {
        let definitions = [
            ("clients", "nome", LifecyclePolicy::trash()),
            ("courses", "titulo", LifecyclePolicy::trash()),
            (
                "leads",
                "nome",
                LifecyclePolicy::Trash {
                    restore_clears_hidden: true,
                },
            ),
            ("accounts", "descricao", LifecyclePolicy::HiddenOnly),
        ];

        definitions
            .into_iter()
            .fold(Self::new(), |catalog, (name, label_field, policy)| {
                catalog.with(EntityDefinition {
                    name: name.to_string(),
                    label_field: label_field.to_string(),
                    policy,
                })
            })
    }

    /// Parses a JSON array of definitions.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let definitions: Vec<EntityDefinition> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for definition in definitions {
            definition.validate()?;
            catalog = catalog.with(definition);
        }
        Ok(catalog)
    }

    /// Loads a catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> StorageResult<Self> {
        let json = std::fs::read_to_string(path.as_ref()).map_err(BackendError::from)?;
        Self::from_json(&json)
    }

    /// Looks up a definition, failing with `UnknownEntity`.
    pub fn get(&self, name: &str) -> Result<&EntityDefinition, ValidationError> {
        self.entries
            .get(name)
            .ok_or_else(|| ValidationError::UnknownEntity {
                entity: name.to_string(),
            })
    }

    /// Iterates definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityDefinition> {
        self.entries.values()
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    #[test]
    fn test_definition_validation() {
        assert!(EntityDefinition::new("clients", "nome", LifecyclePolicy::trash()).is_ok());
        assert!(EntityDefinition::new("Clients", "nome", LifecyclePolicy::trash()).is_err());
        assert!(EntityDefinition::new("1clients", "nome", LifecyclePolicy::trash()).is_err());
        assert!(EntityDefinition::new("drop table", "nome", LifecyclePolicy::trash()).is_err());
        assert!(EntityDefinition::new("tenants", "nome", LifecyclePolicy::trash()).is_err());
        assert!(EntityDefinition::new("clients", "", LifecyclePolicy::trash()).is_err());
    }

    #[test]
    fn test_policy_helpers() {
        let hidden_only =
            EntityDefinition::new("accounts", "descricao", LifecyclePolicy::HiddenOnly).unwrap();
        assert!(!hidden_only.supports_trash());
        assert!(!hidden_only.restore_clears_hidden());

        let clearing = EntityDefinition::new(
            "leads",
            "nome",
            LifecyclePolicy::Trash {
                restore_clears_hidden: true,
            },
        )
        .unwrap();
        assert!(clearing.supports_trash());
        assert!(clearing.restore_clears_hidden());
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = EntityCatalog::builtin();
        assert_eq!(catalog.len(), 4);
        let names: Vec<_> = catalog.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["accounts", "clients", "courses", "leads"]);
        for definition in catalog.iter() {
            assert!(definition.validate().is_ok());
        }
    }

    #[test]
    fn test_unknown_entity() {
        let err = EntityCatalog::builtin().get("widgets").unwrap_err();
        assert!(matches!(err, ValidationError::UnknownEntity { .. }));
    }

    #[test]
    fn test_catalog_from_json() {
        let catalog = EntityCatalog::from_json(
            r#"[
                {"name": "students", "label_field": "nome", "policy": {"type": "trash", "restore_clears_hidden": true}},
                {"name": "payments", "label_field": "descricao", "policy": {"type": "hidden_only"}}
            ]"#,
        )
        .unwrap();

        assert!(catalog.get("students").unwrap().restore_clears_hidden());
        assert!(!catalog.get("payments").unwrap().supports_trash());
    }

    #[test]
    fn test_catalog_from_json_rejects_bad_names() {
        let err = EntityCatalog::from_json(
            r#"[{"name": "x; drop", "label_field": "nome", "policy": {"type": "hidden_only"}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }
}
