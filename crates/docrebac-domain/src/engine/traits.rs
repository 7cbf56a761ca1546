//! Collaborator traits consumed by the authorization engine.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DomainResult;
use crate::model::EntityRef;

use super::types::EntitlementTarget;

/// Entitlement queries against the relationship store.
#[async_trait]
pub trait EntitlementReader: Send + Sync {
    /// Asks whether `subject` may perform `target.action` on the target.
    ///
    /// Returns the store's raw answer. Stores are known to answer with a bare
    /// boolean or with an object carrying a `result` or `entitled` field;
    /// normalization happens in [`super::Decision::from_response`].
    async fn is_entitled_to(
        &self,
        subject: &EntityRef,
        target: &EntitlementTarget,
    ) -> DomainResult<Value>;
}

/// Ownership lookups against the record store.
///
/// The record store's `owner_id` is the ground truth when the relationship
/// store disagrees or is unavailable.
#[async_trait]
pub trait OwnershipReader: Send + Sync {
    /// Returns the owner of `resource_id`, or `None` if the record does not
    /// exist.
    async fn find_owner(&self, resource_id: &str) -> DomainResult<Option<String>>;
}

/// Startup health probe for the relationship store.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Succeeds only if the store is ready to answer queries.
    async fn probe(&self) -> DomainResult<()>;

    /// Human-readable description of the probed endpoint, for logs.
    fn endpoint(&self) -> String {
        "relationship store".to_string()
    }
}
