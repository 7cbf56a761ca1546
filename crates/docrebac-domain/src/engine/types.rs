//! Types for the authorization engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Action, DOCUMENT_ENTITY_TYPE};

use super::config::EngineMode;

/// Request for an access decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    /// The user asking for access.
    pub user_id: String,
    /// The document being accessed.
    pub resource_id: String,
    /// The action name (`read`, `write`, `delete`, `share`).
    /// Kept as a string so unknown actions are rejected at validation.
    pub action: String,
}

impl AccessRequest {
    pub fn new(
        user_id: impl Into<String>,
        resource_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            resource_id: resource_id.into(),
            action: action.into(),
        }
    }
}

/// The target of an entitlement query: an action on a specific entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementTarget {
    pub entity_type: String,
    pub key: String,
    pub action: Action,
}

impl EntitlementTarget {
    pub fn document(key: impl Into<String>, action: Action) -> Self {
        Self {
            entity_type: DOCUMENT_ENTITY_TYPE.to_string(),
            key: key.into(),
            action,
        }
    }
}

/// Normalized answer to an entitlement query.
///
/// `Unrecognized` keeps "the store said no" apart from "the answer could not
/// be parsed"; both collapse to a denial at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
    Unrecognized,
}

impl Decision {
    /// Normalizes a raw store response.
    ///
    /// Accepted shapes:
    /// - `true` / `false`
    /// - `{"result": bool, ...}`
    /// - `{"entitled": bool, ...}`
    ///
    /// When `result` is present it alone decides; `entitled` is only read
    /// in its absence. A deciding field that is not a boolean, or any other
    /// shape, is `Unrecognized`.
    pub fn from_response(response: &Value) -> Self {
        match response {
            Value::Bool(allowed) => Self::from_bool(*allowed),
            Value::Object(map) => map
                .get("result")
                .or_else(|| map.get("entitled"))
                .and_then(Value::as_bool)
                .map(Self::from_bool)
                .unwrap_or(Decision::Unrecognized),
            _ => Decision::Unrecognized,
        }
    }

    pub fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allowed
        } else {
            Decision::Denied
        }
    }

    /// Collapses the decision to the external boolean (fail-closed).
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// Which policy produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// Answered by the relationship store.
    RelationshipStore,
    /// Answered by the ownership fallback policy.
    OwnershipFallback,
    /// The store did not allow the request but the record store names the
    /// user as owner.
    RecordOwner,
}

/// Result of an access check, with provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    pub decision: Decision,
    pub source: DecisionSource,
    /// The engine's startup mode (not changed by a per-call fallback).
    pub mode: EngineMode,
}

impl CheckOutcome {
    pub fn is_allowed(&self) -> bool {
        self.decision.is_allowed()
    }
}
