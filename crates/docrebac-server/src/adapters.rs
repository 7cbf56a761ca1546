//! Adapters that bridge the storage layer to the domain layer.
//!
//! The domain crate defines the collaborator traits it consumes:
//! - `EntitlementReader` / `HealthProbe`: relationship store reads
//! - `RelationWriter`: relationship store writes
//! - `OwnershipReader`: record store ownership lookups
//!
//! The storage crate implements `RelationshipStore` and `RecordStore`. This
//! module implements the domain traits on top of them and translates storage
//! errors into domain errors.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use docrebac_domain::engine::{EntitlementReader, EntitlementTarget, HealthProbe, OwnershipReader};
use docrebac_domain::error::{DomainError, DomainResult};
use docrebac_domain::model::{Assignment, Credential, EntityRef, Relation, DOCUMENT_ENTITY_TYPE};
use docrebac_domain::mutation::{MutationError, MutationResult, RelationWriter};
use docrebac_storage::{
    EntitlementQuery, EntityKey, RecordStore, RelationSchema, RelationshipStore, StorageError,
    StoredAssignment,
};

/// Relation schema for documents, derived from the domain relation model.
///
/// Used to configure a local relationship store so it evaluates exactly the
/// actions each relation implies; `owner` is exclusive.
pub fn document_schema() -> RelationSchema {
    Relation::ALL
        .iter()
        .fold(RelationSchema::new(), |schema, relation| {
            let actions = relation.allowed_actions().iter().map(|a| a.as_str());
            if *relation == Relation::Owner {
                schema.with_exclusive_relation(DOCUMENT_ENTITY_TYPE, relation.as_str(), actions)
            } else {
                schema.with_relation(DOCUMENT_ENTITY_TYPE, relation.as_str(), actions)
            }
        })
}

/// Converts a domain assignment into the relations API wire shape.
pub fn to_stored(assignment: &Assignment) -> StoredAssignment {
    StoredAssignment {
        subject_entity_type_key: assignment.subject.entity_type.clone(),
        subject_key: assignment.subject.key.clone(),
        relation_key: assignment.relation.as_str().to_string(),
        target_entity_type_key: assignment.target.entity_type.clone(),
        target_key: assignment.target.key.clone(),
    }
}

/// Maps a storage error onto the mutation error taxonomy.
pub fn mutation_error(err: StorageError) -> MutationError {
    match err {
        StorageError::Unauthorized {
            message, trace_id, ..
        } => MutationError::Unauthorized { message, trace_id },
        StorageError::NotConfigured { message } => MutationError::NotConfigured { message },
        StorageError::Unreachable { message } => MutationError::Unreachable { message },
        StorageError::Timeout { operation } => MutationError::Unreachable {
            message: format!("{operation} timed out"),
        },
        StorageError::OwnerConflict {
            target_key,
            existing_subject,
            ..
        } => MutationError::OwnerConflict {
            resource_id: target_key,
            existing_owner: existing_subject,
        },
        StorageError::InvalidInput { message } => {
            MutationError::InvalidInput(DomainError::InvalidIdentifier {
                field: "assignment",
                reason: message,
            })
        }
        other => MutationError::Backend {
            message: other.to_string(),
        },
    }
}

/// Adapter that implements `EntitlementReader` and `HealthProbe` using a
/// `RelationshipStore`.
pub struct StoreEntitlementReader<S: RelationshipStore> {
    store: Arc<S>,
}

impl<S: RelationshipStore> StoreEntitlementReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: RelationshipStore> EntitlementReader for StoreEntitlementReader<S> {
    async fn is_entitled_to(
        &self,
        subject: &EntityRef,
        target: &EntitlementTarget,
    ) -> DomainResult<Value> {
        let query = EntitlementQuery {
            subject: EntityKey::new(&subject.entity_type, &subject.key),
            target: EntityKey::new(&target.entity_type, &target.key),
            action: target.action.as_str().to_string(),
        };
        self.store
            .is_entitled_to(&query)
            .await
            .map_err(|e| DomainError::StoreQueryFailed {
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl<S: RelationshipStore> HealthProbe for StoreEntitlementReader<S> {
    async fn probe(&self) -> DomainResult<()> {
        let status = self
            .store
            .health_check()
            .await
            .map_err(|e| DomainError::StoreUnhealthy {
                message: e.to_string(),
            })?;
        if status.healthy {
            Ok(())
        } else {
            Err(DomainError::StoreUnhealthy {
                message: status
                    .message
                    .unwrap_or_else(|| "health check failed".to_string()),
            })
        }
    }

    fn endpoint(&self) -> String {
        self.store.describe()
    }
}

/// Adapter that implements `RelationWriter` using a `RelationshipStore`.
///
/// The caller's credential is passed through unchanged.
pub struct StoreRelationWriter<S: RelationshipStore> {
    store: Arc<S>,
}

impl<S: RelationshipStore> StoreRelationWriter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: RelationshipStore> RelationWriter for StoreRelationWriter<S> {
    async fn assign(
        &self,
        assignments: &[Assignment],
        credential: &Credential,
    ) -> MutationResult<()> {
        let stored: Vec<StoredAssignment> = assignments.iter().map(to_stored).collect();
        self.store
            .assign(&stored, credential.expose())
            .await
            .map_err(mutation_error)
    }

    async fn unassign(
        &self,
        assignments: &[Assignment],
        credential: &Credential,
    ) -> MutationResult<()> {
        let stored: Vec<StoredAssignment> = assignments.iter().map(to_stored).collect();
        self.store
            .unassign(&stored, credential.expose())
            .await
            .map_err(mutation_error)
    }
}

/// Adapter that implements `OwnershipReader` using a `RecordStore`.
pub struct RecordOwnershipReader<R: RecordStore> {
    records: Arc<R>,
}

impl<R: RecordStore> RecordOwnershipReader<R> {
    pub fn new(records: Arc<R>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl<R: RecordStore> OwnershipReader for RecordOwnershipReader<R> {
    async fn find_owner(&self, resource_id: &str) -> DomainResult<Option<String>> {
        self.records
            .find_owner(resource_id)
            .await
            .map_err(|e| DomainError::RecordLookupFailed {
                message: e.to_string(),
            })
    }
}
