//! Request guard: static claims first, relationship check second.
//!
//! A route may require token claims (checked by the Permission Gate without
//! touching any store) and always requires a relationship-based decision on
//! the target document. Both must pass.

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use docrebac_domain::engine::{
    AccessRequest, CheckOutcome, EngineMode, EntitlementReader, OwnershipReader,
};
use docrebac_domain::model::{Action, Guard};
use docrebac_domain::{AuthorizationEngine, DomainError, GateDenied, PermissionGate, Principal};

/// Static claims a route requires before any relationship check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClaimRequirement {
    #[default]
    None,
    One(String),
    /// Every claim must be present.
    All(Vec<String>),
    /// At least one claim must be present.
    Any(Vec<String>),
}

impl ClaimRequirement {
    pub fn one(claim: impl Into<String>) -> Self {
        ClaimRequirement::One(claim.into())
    }

    pub fn all<I, S>(claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ClaimRequirement::All(claims.into_iter().map(Into::into).collect())
    }

    pub fn any<I, S>(claims: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ClaimRequirement::Any(claims.into_iter().map(Into::into).collect())
    }

    /// Evaluates the requirement with the Permission Gate.
    pub fn check(&self, principal: &Principal) -> Result<(), GateDenied> {
        match self {
            ClaimRequirement::None => Ok(()),
            ClaimRequirement::One(claim) => PermissionGate::require_permission(principal, claim),
            ClaimRequirement::All(claims) => {
                PermissionGate::require_all_permissions(principal, claims)
            }
            ClaimRequirement::Any(claims) => {
                PermissionGate::require_any_permission(principal, claims)
            }
        }
    }
}

/// Payload for a relationship-based denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDenied {
    pub error: &'static str,
    pub reason: &'static str,
    pub hint: &'static str,
    /// `rebac` or `fallback`.
    pub mode: &'static str,
}

impl AccessDenied {
    pub fn for_mode(mode: EngineMode) -> Self {
        Self {
            error: "Access denied",
            reason: "Insufficient permissions",
            hint: mode.denial_hint(),
            mode: mode.label(),
        }
    }
}

/// Why a guarded request was rejected.
#[derive(Debug, Error)]
pub enum GuardRejection {
    /// The token lacks a required static claim.
    #[error("insufficient permissions: {0}")]
    MissingClaims(#[source] GateDenied),

    /// The relationship check denied the action.
    #[error("access denied (mode {})", .0.mode)]
    Denied(AccessDenied),

    /// Malformed identifiers or action.
    #[error("bad request: {0}")]
    BadRequest(#[source] DomainError),
}

impl GuardRejection {
    /// HTTP status the routing layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            GuardRejection::MissingClaims(_) | GuardRejection::Denied(_) => 403,
            GuardRejection::BadRequest(_) => 400,
        }
    }

    /// JSON body the routing layer should answer with.
    pub fn body(&self) -> Value {
        match self {
            GuardRejection::MissingClaims(denied) => json!({
                "error": "Insufficient permissions",
                "message": denied.message,
                "required": denied.required,
                "hint": denied.hint,
            }),
            GuardRejection::Denied(denied) => json!(denied),
            GuardRejection::BadRequest(err) => json!({
                "error": "Bad request",
                "message": err.to_string(),
            }),
        }
    }
}

/// Runs the static claim check, then the relationship check for `guard`.
///
/// The engine is not consulted when the claim check fails.
pub async fn authorize<E, O>(
    engine: &AuthorizationEngine<E, O>,
    principal: &Principal,
    requirement: &ClaimRequirement,
    resource_id: &str,
    guard: Guard,
) -> Result<CheckOutcome, GuardRejection>
where
    E: EntitlementReader + 'static,
    O: OwnershipReader + 'static,
{
    requirement
        .check(principal)
        .map_err(GuardRejection::MissingClaims)?;

    let action = Action::for_guard(guard);
    let outcome = engine
        .check(&AccessRequest::new(
            principal.user_id.as_str(),
            resource_id,
            action.as_str(),
        ))
        .await
        .map_err(GuardRejection::BadRequest)?;

    if outcome.is_allowed() {
        Ok(outcome)
    } else {
        debug!(
            user_id = %principal.user_id,
            resource_id,
            action = %action,
            mode = outcome.mode.label(),
            "guard denied"
        );
        Err(GuardRejection::Denied(AccessDenied::for_mode(outcome.mode)))
    }
}
