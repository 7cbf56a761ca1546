//! Store trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HealthStatus, StorageError, StorageResult};

/// Maximum length of an entity type, key or relation name.
pub const MAX_KEY_LENGTH: usize = 256;

/// An entity addressed by type and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKey {
    pub entity_type: String,
    pub key: String,
}

impl EntityKey {
    pub fn new(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key: key.into(),
        }
    }
}

/// An entitlement question: may `subject` perform `action` on `target`?
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementQuery {
    pub subject: EntityKey,
    pub target: EntityKey,
    pub action: String,
}

/// A relation assignment in the relations API wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAssignment {
    pub subject_entity_type_key: String,
    pub subject_key: String,
    pub relation_key: String,
    pub target_entity_type_key: String,
    pub target_key: String,
}

impl StoredAssignment {
    pub fn subject(&self) -> EntityKey {
        EntityKey::new(&self.subject_entity_type_key, &self.subject_key)
    }

    pub fn target(&self) -> EntityKey {
        EntityKey::new(&self.target_entity_type_key, &self.target_key)
    }
}

/// Filter for reading assignments. `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub target_entity_type_key: Option<String>,
    pub target_key: Option<String>,
    pub relation_key: Option<String>,
    pub subject_key: Option<String>,
}

impl AssignmentFilter {
    pub fn matches(&self, assignment: &StoredAssignment) -> bool {
        fn field_matches(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |f| f == value)
        }
        field_matches(&self.target_entity_type_key, &assignment.target_entity_type_key)
            && field_matches(&self.target_key, &assignment.target_key)
            && field_matches(&self.relation_key, &assignment.relation_key)
            && field_matches(&self.subject_key, &assignment.subject_key)
    }
}

/// Relationship store: answers entitlement queries and holds assignments.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations.
#[async_trait]
pub trait RelationshipStore: Send + Sync + 'static {
    /// Checks that the store is ready to answer queries.
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Answers an entitlement query with the store's raw JSON response.
    async fn is_entitled_to(&self, query: &EntitlementQuery) -> StorageResult<Value>;

    /// Creates assignments on behalf of the caller identified by `token`.
    async fn assign(&self, assignments: &[StoredAssignment], token: &str) -> StorageResult<()>;

    /// Removes assignments on behalf of the caller identified by `token`.
    async fn unassign(&self, assignments: &[StoredAssignment], token: &str) -> StorageResult<()>;

    /// Human-readable endpoint description for logs.
    fn describe(&self) -> String;
}

/// A stored document record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    pub owner_id: String,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub owner_id: String,
    pub tenant_id: String,
}

/// Partial update of a document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Record store holding documents and their owner.
///
/// The `owner_id` is written once at creation and never changes.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn insert(&self, document: NewDocument) -> StorageResult<DocumentRecord>;

    async fn get(&self, id: &str) -> StorageResult<Option<DocumentRecord>>;

    /// Returns the owner of a document, or `None` if it does not exist.
    async fn find_owner(&self, id: &str) -> StorageResult<Option<String>>;

    /// Lists all documents, newest first.
    async fn list(&self) -> StorageResult<Vec<DocumentRecord>>;

    /// Lists the documents owned by `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: &str) -> StorageResult<Vec<DocumentRecord>>;

    async fn update(&self, id: &str, patch: DocumentPatch) -> StorageResult<DocumentRecord>;

    async fn delete(&self, id: &str) -> StorageResult<()>;
}

/// Validates one component of an assignment or query.
pub fn validate_key(field: &str, value: &str) -> StorageResult<()> {
    if value.is_empty() {
        return Err(StorageError::InvalidInput {
            message: format!("{field} cannot be empty"),
        });
    }
    if value.len() > MAX_KEY_LENGTH {
        return Err(StorageError::InvalidInput {
            message: format!("{field} exceeds {MAX_KEY_LENGTH} bytes"),
        });
    }
    Ok(())
}

/// Validates every field of an assignment.
pub fn validate_assignment(assignment: &StoredAssignment) -> StorageResult<()> {
    validate_key("subjectEntityTypeKey", &assignment.subject_entity_type_key)?;
    validate_key("subjectKey", &assignment.subject_key)?;
    validate_key("relationKey", &assignment.relation_key)?;
    validate_key("targetEntityTypeKey", &assignment.target_entity_type_key)?;
    validate_key("targetKey", &assignment.target_key)
}
