//! Authenticated principal and its normalized claim set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// A flattened set of permission claims.
///
/// Claims may arrive on the token as a flat `permissions` array or nested
/// inside role objects; both shapes collapse into this one set at the
/// boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet(BTreeSet<String>);

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a claim set from verified token claims.
    ///
    /// Reads `permissions: [string]` and `roles: [{ permissions: [string] }]`
    /// and returns their union. Role entries that are plain strings are role
    /// keys, not permission claims, and are skipped. Non-string entries are
    /// ignored.
    pub fn from_token_claims(claims: &Value) -> Self {
        let mut set = BTreeSet::new();

        if let Some(perms) = claims.get("permissions").and_then(Value::as_array) {
            set.extend(perms.iter().filter_map(Value::as_str).map(str::to_string));
        }

        if let Some(roles) = claims.get("roles").and_then(Value::as_array) {
            for role in roles {
                if let Some(perms) = role.get("permissions").and_then(Value::as_array) {
                    set.extend(perms.iter().filter_map(Value::as_str).map(str::to_string));
                }
            }
        }

        Self(set)
    }

    pub fn contains(&self, claim: &str) -> bool {
        self.0.contains(claim)
    }

    pub fn insert(&mut self, claim: impl Into<String>) -> bool {
        self.0.insert(claim.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// The authenticated identity making a request.
///
/// Produced from already-verified token claims; immutable for the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub tenant_id: String,
    pub claims: ClaimSet,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, tenant_id: impl Into<String>, claims: ClaimSet) -> Self {
        Self {
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            claims,
        }
    }

    /// Builds a principal from a verified claim object.
    ///
    /// `sub` is required. The tenant is read from `tenantId`, then
    /// `tenant_id`; a token without a tenant gets an empty tenant id.
    pub fn from_token_claims(claims: &Value) -> DomainResult<Self> {
        let user_id = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| DomainError::InvalidPrincipal {
                reason: "missing or empty 'sub' claim".to_string(),
            })?;

        let tenant_id = claims
            .get("tenantId")
            .or_else(|| claims.get("tenant_id"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        Ok(Self {
            user_id: user_id.to_string(),
            tenant_id: tenant_id.to_string(),
            claims: ClaimSet::from_token_claims(claims),
        })
    }
}
