//! Document workflow over the authorization core.
//!
//! Each operation runs the request guard for its route, then touches the
//! record store and, for create/share/revoke, the relationship store. The
//! routing layer maps [`ServiceError::status_code`] and
//! [`ServiceError::body`] onto its responses.

use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, warn};

use docrebac_domain::model::Guard;
use docrebac_domain::mutation::RevokeResult;
use docrebac_domain::{Credential, MutationError, MutationErrorKind, Principal, Relation};
use docrebac_storage::{
    DocumentPatch, DocumentRecord, NewDocument, RecordStore, RelationshipStore, StorageError,
};

use crate::guard::{authorize, ClaimRequirement, GuardRejection};
use crate::runtime::AuthzRuntime;

const STORE_DOWN_HINT: &str =
    "Relationship store is not responding; failed checks fall back to document ownership";

/// Errors returned by [`DocumentService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Rejected(#[from] GuardRejection),

    #[error("document not found: {id}")]
    NotFound { id: String },

    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Rejected(rejection) => rejection.status_code(),
            ServiceError::NotFound { .. } => 404,
            ServiceError::Mutation(err) => match err.kind() {
                MutationErrorKind::BadRequest => 400,
                MutationErrorKind::Unauthorized => 403,
                MutationErrorKind::Conflict => 409,
                MutationErrorKind::Transient => 503,
                MutationErrorKind::NotConfigured | MutationErrorKind::Internal => 500,
            },
            ServiceError::Storage(StorageError::InvalidInput { .. }) => 400,
            ServiceError::Storage(StorageError::RecordNotFound { .. }) => 404,
            ServiceError::Storage(_) => 500,
        }
    }

    pub fn body(&self) -> Value {
        match self {
            ServiceError::Rejected(rejection) => rejection.body(),
            ServiceError::NotFound { .. } => json!({ "error": "Document not found" }),
            ServiceError::Mutation(err) => json!({
                "error": err.to_string(),
                "kind": err.kind(),
                "hint": err.hint(),
            }),
            ServiceError::Storage(err) => json!({ "error": err.to_string() }),
        }
    }
}

/// Static claim requirements per route. All default to none.
#[derive(Debug, Clone, Default)]
pub struct RouteClaims {
    pub create: ClaimRequirement,
    pub read: ClaimRequirement,
    pub write: ClaimRequirement,
    pub delete: ClaimRequirement,
    pub share: ClaimRequirement,
}

/// A relationship mutation that failed without failing the operation.
#[derive(Debug, Clone, Serialize)]
pub struct MutationWarning {
    pub kind: MutationErrorKind,
    pub message: String,
    pub hint: &'static str,
}

impl From<&MutationError> for MutationWarning {
    fn from(err: &MutationError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            hint: err.hint(),
        }
    }
}

/// A newly created document.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedDocument {
    pub document: DocumentRecord,
    /// Set when the owner relation could not be written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<MutationWarning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareReceipt {
    pub document_id: String,
    pub user_id: String,
    pub relation: Relation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// `healthy` or `degraded`.
    pub status: &'static str,
    /// Engine mode label fixed at startup.
    pub mode: &'static str,
    /// Live health of the relationship store.
    pub relationship_store: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<&'static str>,
}

/// Document operations, each guarded by claims and a relationship check.
pub struct DocumentService<S: RelationshipStore, R: RecordStore> {
    runtime: AuthzRuntime<S, R>,
    claims: RouteClaims,
}

impl<S: RelationshipStore, R: RecordStore> DocumentService<S, R> {
    pub fn new(runtime: AuthzRuntime<S, R>) -> Self {
        Self {
            runtime,
            claims: RouteClaims::default(),
        }
    }

    pub fn with_claims(mut self, claims: RouteClaims) -> Self {
        self.claims = claims;
        self
    }

    pub fn runtime(&self) -> &AuthzRuntime<S, R> {
        &self.runtime
    }

    /// Creates a document owned by the caller and assigns the owner relation.
    ///
    /// The record is kept when the owner assignment fails; the failure is
    /// returned as a warning.
    pub async fn create(
        &self,
        principal: &Principal,
        credential: Option<&Credential>,
        title: &str,
        content: &str,
    ) -> ServiceResult<CreatedDocument> {
        self.claims
            .create
            .check(principal)
            .map_err(GuardRejection::MissingClaims)?;

        let document = self
            .runtime
            .records
            .insert(NewDocument {
                title: title.to_string(),
                content: content.to_string(),
                owner_id: principal.user_id.clone(),
                tenant_id: principal.tenant_id.clone(),
            })
            .await?;

        let outcome = self
            .runtime
            .mutator
            .assign_owner_best_effort(&principal.user_id, &document.id, credential)
            .await;

        info!(
            document_id = %document.id,
            owner_id = %principal.user_id,
            owner_assigned = outcome.is_assigned(),
            "document created"
        );

        Ok(CreatedDocument {
            warning: outcome.error().map(MutationWarning::from),
            document,
        })
    }

    /// Returns a document the caller may read.
    ///
    /// The read check runs before the lookup, so a missing document is only
    /// reported to callers the policy lets through.
    pub async fn get(&self, principal: &Principal, id: &str) -> ServiceResult<DocumentRecord> {
        self.guard(principal, &self.claims.read, id, Guard::Reader)
            .await?;
        self.runtime
            .records
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound { id: id.to_string() })
    }

    /// Lists every document the caller may read, newest first.
    pub async fn list_accessible(
        &self,
        principal: &Principal,
    ) -> ServiceResult<Vec<DocumentRecord>> {
        self.claims
            .read
            .check(principal)
            .map_err(GuardRejection::MissingClaims)?;

        let documents = self.runtime.records.list().await?;
        let checks = documents.iter().map(|doc| {
            self.runtime
                .engine
                .can_access(&principal.user_id, &doc.id, "read")
        });
        let decisions = join_all(checks).await;

        Ok(documents
            .into_iter()
            .zip(decisions)
            .filter_map(|(doc, decision)| matches!(decision, Ok(true)).then_some(doc))
            .collect())
    }

    /// Lists the documents the caller owns.
    pub async fn my_documents(&self, principal: &Principal) -> ServiceResult<Vec<DocumentRecord>> {
        Ok(self
            .runtime
            .records
            .list_by_owner(&principal.user_id)
            .await?)
    }

    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        patch: DocumentPatch,
    ) -> ServiceResult<DocumentRecord> {
        self.guard(principal, &self.claims.write, id, Guard::Editor)
            .await?;
        self.runtime
            .records
            .update(id, patch)
            .await
            .map_err(|err| not_found(err, id))
    }

    /// Deletes a document. Only the owner passes the guard.
    pub async fn delete(&self, principal: &Principal, id: &str) -> ServiceResult<()> {
        self.guard(principal, &self.claims.delete, id, Guard::Owner)
            .await?;
        self.runtime
            .records
            .delete(id)
            .await
            .map_err(|err| not_found(err, id))?;

        // TODO: unassign the document's relations once the relations API
        // offers a per-target listing to enumerate them.
        warn!(
            document_id = id,
            "document deleted; its relationship assignments are left in place"
        );
        Ok(())
    }

    /// Shares a document with another user as `viewer` or `editor`.
    pub async fn share(
        &self,
        principal: &Principal,
        credential: Option<&Credential>,
        id: &str,
        target_user_id: &str,
        permission: &str,
    ) -> ServiceResult<ShareReceipt> {
        self.guard(principal, &self.claims.share, id, Guard::Sharer)
            .await?;
        let relation = self
            .runtime
            .mutator
            .share(id, target_user_id, permission, credential)
            .await?;
        Ok(ShareReceipt {
            document_id: id.to_string(),
            user_id: target_user_id.to_string(),
            relation,
        })
    }

    /// Removes every shared relation a user holds on a document.
    pub async fn revoke(
        &self,
        principal: &Principal,
        credential: Option<&Credential>,
        id: &str,
        target_user_id: &str,
    ) -> ServiceResult<Vec<RevokeResult>> {
        self.guard(principal, &self.claims.share, id, Guard::Sharer)
            .await?;
        Ok(self
            .runtime
            .mutator
            .revoke_all(id, target_user_id, credential)
            .await?)
    }

    /// Reports the startup mode and the relationship store's current health.
    ///
    /// A store that does not answer within the call timeout is reported
    /// unhealthy.
    pub async fn health(&self) -> HealthReport {
        let check = timeout(self.runtime.call_timeout, self.runtime.store.health_check()).await;
        let store_healthy = matches!(check, Ok(Ok(status)) if status.healthy);
        let mode = self.runtime.mode();
        let hint = if mode.is_degraded() {
            Some(mode.denial_hint())
        } else if !store_healthy {
            Some(STORE_DOWN_HINT)
        } else {
            None
        };

        HealthReport {
            status: if hint.is_some() { "degraded" } else { "healthy" },
            mode: mode.label(),
            relationship_store: store_healthy,
            hint,
        }
    }

    async fn guard(
        &self,
        principal: &Principal,
        requirement: &ClaimRequirement,
        id: &str,
        guard: Guard,
    ) -> Result<(), GuardRejection> {
        authorize(self.runtime.engine.as_ref(), principal, requirement, id, guard)
            .await
            .map(|_| ())
    }
}

fn not_found(err: StorageError, id: &str) -> ServiceError {
    match err {
        StorageError::RecordNotFound { .. } => ServiceError::NotFound { id: id.to_string() },
        other => ServiceError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_status_codes() {
        let cases = [
            (MutationError::MissingCredential, 403),
            (
                MutationError::NotConfigured {
                    message: "404".to_string(),
                },
                500,
            ),
            (
                MutationError::Unreachable {
                    message: "timeout".to_string(),
                },
                503,
            ),
            (
                MutationError::OwnerConflict {
                    resource_id: "doc-1".to_string(),
                    existing_owner: "alice".to_string(),
                },
                409,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServiceError::Mutation(err).status_code(), status);
        }
    }

    #[test]
    fn test_mutation_body_carries_hint() {
        let err = ServiceError::Mutation(MutationError::NotConfigured {
            message: "relation schema missing".to_string(),
        });
        let body = err.body();
        assert_eq!(body["kind"], "not_configured");
        assert_eq!(
            body["hint"],
            MutationError::NotConfigured {
                message: String::new()
            }
            .hint()
        );
    }

    #[test]
    fn test_record_not_found_maps_to_404() {
        let err = not_found(
            StorageError::RecordNotFound {
                id: "doc-9".to_string(),
            },
            "doc-9",
        );
        assert!(matches!(err, ServiceError::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.body()["error"], "Document not found");
    }

    #[test]
    fn test_invalid_record_input_is_bad_request() {
        let err = ServiceError::Storage(StorageError::InvalidInput {
            message: "title cannot be empty".to_string(),
        });
        assert_eq!(err.status_code(), 400);
    }
}
