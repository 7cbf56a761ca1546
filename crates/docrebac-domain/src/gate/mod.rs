//! Permission gate: static claim checks.
//!
//! Checks whether a principal's token carries the claims needed to use a
//! feature or endpoint at all. This is independent of the authorization
//! engine: no store, no network, a pure function of the principal's
//! normalized [`ClaimSet`](crate::model::ClaimSet).

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::model::Principal;

/// Hint attached to every gate denial.
pub const GATE_DENIAL_HINT: &str = "Contact your administrator to request this permission";

/// A static permission check failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct GateDenied {
    /// Human-readable reason.
    pub message: String,
    /// The claim(s) the route required.
    pub required: Vec<String>,
    pub hint: &'static str,
}

/// Static claim checks over a principal.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionGate;

impl PermissionGate {
    /// Returns true if the principal holds `claim`.
    pub fn has_permission(principal: &Principal, claim: &str) -> bool {
        principal.claims.contains(claim)
    }

    /// Returns true if the principal holds every claim (AND).
    ///
    /// An empty requirement list is satisfied.
    pub fn has_all_permissions<S: AsRef<str>>(principal: &Principal, claims: &[S]) -> bool {
        claims
            .iter()
            .all(|c| Self::has_permission(principal, c.as_ref()))
    }

    /// Returns true if the principal holds at least one claim (OR).
    ///
    /// An empty requirement list is never satisfied.
    pub fn has_any_permission<S: AsRef<str>>(principal: &Principal, claims: &[S]) -> bool {
        claims
            .iter()
            .any(|c| Self::has_permission(principal, c.as_ref()))
    }

    /// Like [`Self::has_permission`], with denial details.
    pub fn require_permission(principal: &Principal, claim: &str) -> Result<(), GateDenied> {
        if Self::has_permission(principal, claim) {
            return Ok(());
        }
        debug!(user_id = %principal.user_id, claim, "static permission missing");
        Err(GateDenied {
            message: format!("This action requires the '{claim}' permission"),
            required: vec![claim.to_string()],
            hint: GATE_DENIAL_HINT,
        })
    }

    /// Like [`Self::has_all_permissions`]; reports the first missing claim.
    pub fn require_all_permissions<S: AsRef<str>>(
        principal: &Principal,
        claims: &[S],
    ) -> Result<(), GateDenied> {
        claims
            .iter()
            .try_for_each(|c| Self::require_permission(principal, c.as_ref()))
    }

    /// Like [`Self::has_any_permission`], with denial details.
    pub fn require_any_permission<S: AsRef<str>>(
        principal: &Principal,
        claims: &[S],
    ) -> Result<(), GateDenied> {
        if Self::has_any_permission(principal, claims) {
            return Ok(());
        }
        let required: Vec<String> = claims.iter().map(|c| c.as_ref().to_string()).collect();
        debug!(user_id = %principal.user_id, ?required, "none of the static permissions present");
        Err(GateDenied {
            message: format!("This action requires one of: {}", required.join(", ")),
            required,
            hint: GATE_DENIAL_HINT,
        })
    }
}
