//! Domain error types for authorization operations.

use thiserror::Error;

/// Domain-specific errors for authorization operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A required identifier was empty or missing.
    #[error("missing identifier: {field}")]
    MissingIdentifier { field: &'static str },

    /// An identifier was present but malformed.
    #[error("invalid {field}: {reason}")]
    InvalidIdentifier { field: &'static str, reason: String },

    /// Action outside the closed action set.
    #[error("unknown action: {value}")]
    UnknownAction { value: String },

    /// Relation outside the closed relation set.
    #[error("unknown relation: {value}")]
    UnknownRelation { value: String },

    /// Share permission other than viewer/editor.
    #[error("invalid share permission '{value}': must be \"viewer\" or \"editor\"")]
    InvalidSharePermission { value: String },

    /// Claim object could not be turned into a principal.
    #[error("invalid principal: {reason}")]
    InvalidPrincipal { reason: String },

    /// The relationship store failed to answer an entitlement query.
    #[error("relationship store query failed: {message}")]
    StoreQueryFailed { message: String },

    /// The record store failed to answer an ownership lookup.
    #[error("record lookup failed: {message}")]
    RecordLookupFailed { message: String },

    /// Health probe against the relationship store failed.
    #[error("relationship store unhealthy: {message}")]
    StoreUnhealthy { message: String },

    /// Timeout during a store call.
    #[error("timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

impl DomainError {
    /// Returns true for errors caused by malformed caller input.
    ///
    /// These are surfaced as "bad request", distinct from an access denial.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            DomainError::MissingIdentifier { .. }
                | DomainError::InvalidIdentifier { .. }
                | DomainError::UnknownAction { .. }
                | DomainError::UnknownRelation { .. }
                | DomainError::InvalidSharePermission { .. }
                | DomainError::InvalidPrincipal { .. }
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_bad_request() {
        let errors = [
            DomainError::MissingIdentifier { field: "resource_id" },
            DomainError::InvalidIdentifier {
                field: "user_id",
                reason: "too long".to_string(),
            },
            DomainError::UnknownAction {
                value: "publish".to_string(),
            },
            DomainError::UnknownRelation {
                value: "admin".to_string(),
            },
            DomainError::InvalidSharePermission {
                value: "owner".to_string(),
            },
            DomainError::InvalidPrincipal {
                reason: "missing sub".to_string(),
            },
        ];
        for err in errors {
            assert!(err.is_bad_request(), "{err} should be a bad request");
        }
    }

    #[test]
    fn test_backend_errors_are_not_bad_request() {
        let errors = [
            DomainError::StoreQueryFailed {
                message: "connection refused".to_string(),
            },
            DomainError::RecordLookupFailed {
                message: "db down".to_string(),
            },
            DomainError::StoreUnhealthy {
                message: "503".to_string(),
            },
            DomainError::Timeout { duration_ms: 2000 },
        ];
        for err in errors {
            assert!(!err.is_bad_request(), "{err} should not be a bad request");
        }
    }

    #[test]
    fn test_share_permission_message_lists_allowed_values() {
        let err = DomainError::InvalidSharePermission {
            value: "owner".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("viewer"));
        assert!(msg.contains("editor"));
    }
}
