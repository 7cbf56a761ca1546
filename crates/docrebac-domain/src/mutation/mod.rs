//! Relationship mutation protocol.
//!
//! Creates and removes (user, relation, document) assignments on the
//! relationship store on behalf of a caller:
//!
//! - `assign_owner`: the single owner assignment, made at document creation.
//!   [`RelationshipMutator::assign_owner_best_effort`] wraps it so a failure
//!   is reported as an outcome instead of aborting the creation.
//! - `share`: grants `viewer` or `editor`; the store supersedes any previous
//!   relation for the same (user, document) pair.
//! - `revoke_all`: removes `viewer` and `editor` independently and reports
//!   one result per relation, since partial success is normal.
//!
//! All mutations forward the caller's credential and never retry.

mod error;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::engine::DEFAULT_QUERY_TIMEOUT;
use crate::model::{Assignment, Credential, Relation};
use crate::validation::validate_identifier;

pub use error::{MutationError, MutationErrorKind, MutationResult};

/// Relationship store write operations.
#[async_trait]
pub trait RelationWriter: Send + Sync {
    /// Creates assignments, superseding any existing relation for the same
    /// (subject, target) pair.
    async fn assign(
        &self,
        assignments: &[Assignment],
        credential: &Credential,
    ) -> MutationResult<()>;

    /// Removes assignments. Removing an absent assignment succeeds.
    async fn unassign(
        &self,
        assignments: &[Assignment],
        credential: &Credential,
    ) -> MutationResult<()>;
}

/// Outcome of a best-effort assignment.
#[derive(Debug)]
pub enum AssignmentOutcome {
    Assigned,
    /// The assignment failed; the enclosing operation continues.
    Failed(MutationError),
}

impl AssignmentOutcome {
    pub fn is_assigned(&self) -> bool {
        matches!(self, AssignmentOutcome::Assigned)
    }

    pub fn error(&self) -> Option<&MutationError> {
        match self {
            AssignmentOutcome::Assigned => None,
            AssignmentOutcome::Failed(err) => Some(err),
        }
    }
}

/// Per-relation result of a revoke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevokeResult {
    pub relation: Relation,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<MutationErrorKind>,
}

impl RevokeResult {
    fn from_result(relation: Relation, result: MutationResult<()>) -> Self {
        match result {
            Ok(()) => Self {
                relation,
                success: true,
                error: None,
                kind: None,
            },
            Err(err) => Self {
                relation,
                success: false,
                kind: Some(err.kind()),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Performs relationship mutations with the caller's credential.
pub struct RelationshipMutator<W> {
    writer: Arc<W>,
    call_timeout: Duration,
}

impl<W> RelationshipMutator<W>
where
    W: RelationWriter + 'static,
{
    pub fn new(writer: Arc<W>) -> Self {
        Self {
            writer,
            call_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Sets the bound on a single store call.
    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Creates the owner assignment for a newly created document.
    pub async fn assign_owner(
        &self,
        owner_id: &str,
        resource_id: &str,
        credential: Option<&Credential>,
    ) -> MutationResult<()> {
        validate_ids(owner_id, resource_id)?;
        let credential = credential.ok_or(MutationError::MissingCredential)?;

        let assignment = Assignment::user_on_document(owner_id, Relation::Owner, resource_id);
        self.write(&[assignment], credential, Op::Assign).await?;

        info!(owner_id, resource_id, "owner relation assigned");
        Ok(())
    }

    /// Assigns the owner without letting a failure escape.
    ///
    /// Used on document creation: the record already exists and stays; its
    /// `owner_id` remains the fallback ground truth.
    pub async fn assign_owner_best_effort(
        &self,
        owner_id: &str,
        resource_id: &str,
        credential: Option<&Credential>,
    ) -> AssignmentOutcome {
        match self.assign_owner(owner_id, resource_id, credential).await {
            Ok(()) => AssignmentOutcome::Assigned,
            Err(err) => {
                warn!(
                    owner_id,
                    resource_id,
                    error = %err,
                    kind = %err.kind(),
                    hint = err.hint(),
                    "owner relation assignment failed; document created without it"
                );
                AssignmentOutcome::Failed(err)
            }
        }
    }

    /// Shares a document with another user as `viewer` or `editor`.
    pub async fn share(
        &self,
        resource_id: &str,
        target_user_id: &str,
        permission: &str,
        credential: Option<&Credential>,
    ) -> MutationResult<Relation> {
        let relation = Relation::parse_share(permission).map_err(MutationError::InvalidInput)?;
        validate_ids(target_user_id, resource_id)?;
        let credential = credential.ok_or(MutationError::MissingCredential)?;

        let assignment = Assignment::user_on_document(target_user_id, relation, resource_id);
        self.write(&[assignment], credential, Op::Assign).await?;

        info!(resource_id, target_user_id, relation = %relation, "document shared");
        Ok(relation)
    }

    /// Removes one shared relation for a user.
    pub async fn revoke_access(
        &self,
        resource_id: &str,
        target_user_id: &str,
        relation: Relation,
        credential: Option<&Credential>,
    ) -> MutationResult<()> {
        if relation == Relation::Owner {
            return Err(MutationError::InvalidInput(
                crate::error::DomainError::InvalidSharePermission {
                    value: relation.to_string(),
                },
            ));
        }
        validate_ids(target_user_id, resource_id)?;
        let credential = credential.ok_or(MutationError::MissingCredential)?;

        let assignment = Assignment::user_on_document(target_user_id, relation, resource_id);
        self.write(&[assignment], credential, Op::Unassign).await
    }

    /// Removes both `viewer` and `editor` for a user.
    ///
    /// Each removal is attempted independently. Only malformed identifiers
    /// fail the call as a whole; everything else is reported per relation.
    pub async fn revoke_all(
        &self,
        resource_id: &str,
        target_user_id: &str,
        credential: Option<&Credential>,
    ) -> MutationResult<Vec<RevokeResult>> {
        validate_ids(target_user_id, resource_id)?;

        let mut results = Vec::with_capacity(Relation::SHARED.len());
        for relation in Relation::SHARED {
            let result = self
                .revoke_access(resource_id, target_user_id, relation, credential)
                .await;
            results.push(RevokeResult::from_result(relation, result));
        }

        let failed = results.iter().filter(|r| !r.success).count();
        if failed > 0 {
            warn!(resource_id, target_user_id, failed, "revoke partially failed");
        } else {
            info!(resource_id, target_user_id, "access revoked");
        }
        Ok(results)
    }

    /// Writes several assignments in one store call.
    pub async fn assign_batch(
        &self,
        assignments: &[Assignment],
        credential: Option<&Credential>,
    ) -> MutationResult<()> {
        if assignments.is_empty() {
            return Ok(());
        }
        for assignment in assignments {
            validate_ids(&assignment.subject.key, &assignment.target.key)?;
        }
        let credential = credential.ok_or(MutationError::MissingCredential)?;
        self.write(assignments, credential, Op::Assign).await
    }

    async fn write(
        &self,
        assignments: &[Assignment],
        credential: &Credential,
        op: Op,
    ) -> MutationResult<()> {
        debug!(
            operation = op.as_str(),
            count = assignments.len(),
            token = %credential.preview(),
            "writing relation assignments"
        );
        let call = async {
            match op {
                Op::Assign => self.writer.assign(assignments, credential).await,
                Op::Unassign => self.writer.unassign(assignments, credential).await,
            }
        };

        timeout(self.call_timeout, call)
            .await
            .map_err(|_| MutationError::Unreachable {
                message: format!(
                    "{} timed out after {}ms",
                    op.as_str(),
                    self.call_timeout.as_millis()
                ),
            })?
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Assign,
    Unassign,
}

impl Op {
    fn as_str(&self) -> &'static str {
        match self {
            Op::Assign => "assign",
            Op::Unassign => "unassign",
        }
    }
}

fn validate_ids(user_id: &str, resource_id: &str) -> MutationResult<()> {
    validate_identifier("user_id", user_id).map_err(MutationError::InvalidInput)?;
    validate_identifier("resource_id", resource_id).map_err(MutationError::InvalidInput)
}
