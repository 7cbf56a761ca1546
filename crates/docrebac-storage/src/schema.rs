//! Relation schema for the local relationship store.
//!
//! Declares, per entity type, which relations exist and which actions each
//! relation grants. Relations marked exclusive may be held by at most one
//! subject per target.

use std::collections::{HashMap, HashSet};

use crate::error::{StorageError, StorageResult};

#[derive(Debug, Clone, Default)]
struct RelationDef {
    actions: HashSet<String>,
    exclusive: bool,
}

/// Entity type → relation → granted actions.
#[derive(Debug, Clone, Default)]
pub struct RelationSchema {
    types: HashMap<String, HashMap<String, RelationDef>>,
}

impl RelationSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a relation on `entity_type` that grants `actions`.
    pub fn with_relation<I, S>(mut self, entity_type: &str, relation: &str, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.define(entity_type, relation, actions, false);
        self
    }

    /// Declares a relation held by at most one subject per target.
    pub fn with_exclusive_relation<I, S>(
        mut self,
        entity_type: &str,
        relation: &str,
        actions: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.define(entity_type, relation, actions, true);
        self
    }

    fn define<I, S>(&mut self, entity_type: &str, relation: &str, actions: I, exclusive: bool)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types.entry(entity_type.to_string()).or_default().insert(
            relation.to_string(),
            RelationDef {
                actions: actions.into_iter().map(Into::into).collect(),
                exclusive,
            },
        );
    }

    /// Fails with `NotConfigured` if the entity type is not declared.
    pub fn require_type(&self, entity_type: &str) -> StorageResult<()> {
        if self.types.contains_key(entity_type) {
            Ok(())
        } else {
            Err(StorageError::NotConfigured {
                message: format!("entity type '{entity_type}' is not defined"),
            })
        }
    }

    /// Fails with `NotConfigured` if the relation is not declared on the type.
    pub fn require_relation(&self, entity_type: &str, relation: &str) -> StorageResult<()> {
        self.relation(entity_type, relation).map(|_| ())
    }

    /// Returns true if the relation is exclusive on the type.
    pub fn is_exclusive(&self, entity_type: &str, relation: &str) -> bool {
        self.relation(entity_type, relation)
            .map(|def| def.exclusive)
            .unwrap_or(false)
    }

    /// Returns true if holding `relation` on `entity_type` grants `action`.
    pub fn grants(&self, entity_type: &str, relation: &str, action: &str) -> bool {
        self.relation(entity_type, relation)
            .map(|def| def.actions.contains(action))
            .unwrap_or(false)
    }

    fn relation(&self, entity_type: &str, relation: &str) -> StorageResult<&RelationDef> {
        self.require_type(entity_type)?;
        self.types
            .get(entity_type)
            .and_then(|relations| relations.get(relation))
            .ok_or_else(|| StorageError::NotConfigured {
                message: format!("relation '{relation}' is not defined on '{entity_type}'"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> RelationSchema {
        RelationSchema::new()
            .with_exclusive_relation("folder", "owner", ["read", "write"])
            .with_relation("folder", "viewer", ["read"])
    }

    #[test]
    fn test_grants() {
        let s = schema();
        assert!(s.grants("folder", "owner", "write"));
        assert!(s.grants("folder", "viewer", "read"));
        assert!(!s.grants("folder", "viewer", "write"));
        assert!(!s.grants("folder", "editor", "read"));
    }

    #[test]
    fn test_exclusive() {
        let s = schema();
        assert!(s.is_exclusive("folder", "owner"));
        assert!(!s.is_exclusive("folder", "viewer"));
    }

    #[test]
    fn test_undeclared_type_and_relation_are_not_configured() {
        let s = schema();
        assert!(matches!(
            s.require_type("document"),
            Err(StorageError::NotConfigured { .. })
        ));
        assert!(matches!(
            s.require_relation("folder", "editor"),
            Err(StorageError::NotConfigured { .. })
        ));
        assert!(s.require_relation("folder", "viewer").is_ok());
    }
}
