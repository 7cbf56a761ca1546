//! Error taxonomy for relationship mutations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DomainError;

/// Errors raised by assign/unassign operations.
///
/// Each variant maps onto one [`MutationErrorKind`] so the calling layer can
/// choose between a permission hint, a configuration hint and a retry hint.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Malformed identifiers or relation, rejected before any store call.
    #[error("invalid mutation input: {0}")]
    InvalidInput(#[source] DomainError),

    /// No caller credential was supplied. Mutations are never performed with
    /// a service credential.
    #[error("caller credential is required for relationship mutations")]
    MissingCredential,

    /// The caller is not allowed to create or remove this relation.
    #[error("not authorized to modify relationships: {message}")]
    Unauthorized {
        message: String,
        /// Trace id reported by the store, when it returned one.
        trace_id: Option<String>,
    },

    /// The relation schema is not configured on the store.
    #[error("relationship schema not configured: {message}")]
    NotConfigured { message: String },

    /// Network failure or timeout talking to the store.
    #[error("relationship store unreachable: {message}")]
    Unreachable { message: String },

    /// The resource already has a different owner.
    #[error("document {resource_id} already has owner {existing_owner}")]
    OwnerConflict {
        resource_id: String,
        existing_owner: String,
    },

    /// Any other store failure.
    #[error("relationship store error: {message}")]
    Backend { message: String },
}

/// Protocol-agnostic classification of a mutation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationErrorKind {
    BadRequest,
    Unauthorized,
    NotConfigured,
    Transient,
    Conflict,
    Internal,
}

impl MutationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationErrorKind::BadRequest => "bad_request",
            MutationErrorKind::Unauthorized => "unauthorized",
            MutationErrorKind::NotConfigured => "not_configured",
            MutationErrorKind::Transient => "transient",
            MutationErrorKind::Conflict => "conflict",
            MutationErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for MutationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MutationError {
    /// Classifies the error.
    pub fn kind(&self) -> MutationErrorKind {
        match self {
            MutationError::InvalidInput(_) => MutationErrorKind::BadRequest,
            MutationError::MissingCredential | MutationError::Unauthorized { .. } => {
                MutationErrorKind::Unauthorized
            }
            MutationError::NotConfigured { .. } => MutationErrorKind::NotConfigured,
            MutationError::Unreachable { .. } => MutationErrorKind::Transient,
            MutationError::OwnerConflict { .. } => MutationErrorKind::Conflict,
            MutationError::Backend { .. } => MutationErrorKind::Internal,
        }
    }

    /// Operator/user facing hint for this error's category.
    pub fn hint(&self) -> &'static str {
        match self.kind() {
            MutationErrorKind::BadRequest => {
                "Check the document id, user id and permission values"
            }
            MutationErrorKind::Unauthorized => {
                "The caller's token cannot create relationships; sign in again or ask an administrator for access"
            }
            MutationErrorKind::NotConfigured => {
                "Enable and configure the document relationship schema on the policy store"
            }
            MutationErrorKind::Transient => "The relationship store is unreachable; retry later",
            MutationErrorKind::Conflict => {
                "The document already has an owner; ownership is assigned once at creation"
            }
            MutationErrorKind::Internal => "Unexpected relationship store error; check server logs",
        }
    }

    /// Returns true if a later retry may succeed.
    pub fn is_retryable(&self) -> bool {
        self.kind() == MutationErrorKind::Transient
    }
}

/// Result type for mutation operations.
pub type MutationResult<T> = Result<T, MutationError>;
