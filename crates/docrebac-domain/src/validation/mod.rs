//! Input validation for authorization requests.
//!
//! Malformed identifiers are rejected before any store call so that a bad
//! request never reaches the relationship store or the record store.

use crate::error::{DomainError, DomainResult};

/// Maximum identifier length accepted for user and resource ids.
pub const MAX_IDENTIFIER_LENGTH: usize = 256;

/// Validates a user or resource identifier.
///
/// Rejects empty (or whitespace-only) values, values longer than
/// [`MAX_IDENTIFIER_LENGTH`], and values containing control characters.
///
/// # Examples
///
/// ```
/// use docrebac_domain::validation::validate_identifier;
///
/// assert!(validate_identifier("resource_id", "doc-1").is_ok());
/// assert!(validate_identifier("resource_id", "").is_err());
/// assert!(validate_identifier("resource_id", "bad\nid").is_err());
/// ```
pub fn validate_identifier(field: &'static str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::MissingIdentifier { field });
    }
    if value.len() > MAX_IDENTIFIER_LENGTH {
        return Err(DomainError::InvalidIdentifier {
            field,
            reason: format!("exceeds {MAX_IDENTIFIER_LENGTH} bytes"),
        });
    }
    if value.chars().any(char::is_control) {
        return Err(DomainError::InvalidIdentifier {
            field,
            reason: "contains control characters".to_string(),
        });
    }
    Ok(())
}
