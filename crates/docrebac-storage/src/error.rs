//! Storage error types.

use std::time::Duration;

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The caller's credential was rejected (HTTP 401/403).
    #[error("unauthorized (status {status}): {message}")]
    Unauthorized {
        status: u16,
        message: String,
        /// Trace id reported in the error body, if any.
        trace_id: Option<String>,
    },

    /// The relation schema or endpoint does not exist (HTTP 404, or an
    /// entity type / relation missing from the local schema).
    #[error("not configured: {message}")]
    NotConfigured { message: String },

    /// Connection failure or gateway error (HTTP 502/503/504).
    #[error("store unreachable: {message}")]
    Unreachable { message: String },

    /// The call did not complete within the client timeout.
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    /// Any other non-success HTTP status.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The target already has a holder of an exclusive relation.
    #[error("{target_type}:{target_key} already has {relation} {existing_subject}")]
    OwnerConflict {
        target_type: String,
        target_key: String,
        relation: String,
        existing_subject: String,
    },

    /// Record not found.
    #[error("record not found: {id}")]
    RecordNotFound { id: String },

    /// Serialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

impl StorageError {
    /// Returns true if the error is a network-level failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Unreachable { .. } | StorageError::Timeout { .. }
        )
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of a store health check.
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub latency: Duration,
    pub message: Option<String>,
}

/// Extracts a trace id from an error body containing `Trace ID: <hex>`.
///
/// Vendor gateways return HTML error pages with the id embedded in text;
/// the match is case-insensitive on the label.
pub fn extract_trace_id(body: &str) -> Option<String> {
    const LABEL: &str = "trace id:";
    let start = body.to_ascii_lowercase().find(LABEL)? + LABEL.len();
    let id: String = body[start..]
        .trim_start()
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect();
    (!id.is_empty()).then_some(id)
}
