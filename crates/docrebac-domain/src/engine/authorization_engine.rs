//! Authorization engine for resource-scoped access decisions.
//!
//! # Modes
//!
//! - **Connected**: every decision is delegated to the relationship store's
//!   entitlement query. If a single query fails (error or timeout), that one
//!   call is answered by the ownership fallback; the mode itself does not
//!   change. When the store does not allow a request, the record store's
//!   `owner_id` is consulted: the recorded owner may do everything, even if
//!   the owner assignment was never written.
//! - **Degraded**: the store was unavailable at startup. `read` is open to
//!   any authenticated principal; `write`, `delete` and `share` require the
//!   record store's `owner_id` to match the user.
//!
//! Decisions are never cached. The mode is fixed at construction, so the
//! engine holds no mutable state and checks may run fully in parallel.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::error::{DomainError, DomainResult};
use crate::model::{Action, EntityRef};
use crate::validation::validate_identifier;

use super::config::{EngineConfig, EngineMode};
use super::traits::{EntitlementReader, OwnershipReader};
use super::types::{AccessRequest, CheckOutcome, Decision, DecisionSource, EntitlementTarget};

/// Error text produced by a known entitlement client defect (an internal
/// null dereference while the agent is still starting).
const KNOWN_CLIENT_DEFECT: &str = "Cannot read properties of undefined";

/// Relationship-based authorization engine.
pub struct AuthorizationEngine<E, O> {
    entitlements: Arc<E>,
    ownership: Arc<O>,
    mode: EngineMode,
    config: EngineConfig,
}

impl<E, O> AuthorizationEngine<E, O>
where
    E: EntitlementReader + 'static,
    O: OwnershipReader + 'static,
{
    /// Creates a new engine in the given mode.
    pub fn new(mode: EngineMode, entitlements: Arc<E>, ownership: Arc<O>) -> Self {
        Self::with_config(mode, entitlements, ownership, EngineConfig::default())
    }

    /// Creates a new engine with custom configuration.
    pub fn with_config(
        mode: EngineMode,
        entitlements: Arc<E>,
        ownership: Arc<O>,
        config: EngineConfig,
    ) -> Self {
        Self {
            entitlements,
            ownership,
            mode,
            config,
        }
    }

    /// Returns the mode decided at startup.
    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    /// Returns true if `user_id` may perform `action` on `resource_id`.
    ///
    /// A denial is `Ok(false)`. The only error is a bad request (missing or
    /// malformed identifiers, unknown action); store failures are folded into
    /// the fallback policy.
    pub async fn can_access(
        &self,
        user_id: &str,
        resource_id: &str,
        action: &str,
    ) -> DomainResult<bool> {
        let outcome = self
            .check(&AccessRequest::new(user_id, resource_id, action))
            .await?;
        Ok(outcome.is_allowed())
    }

    /// Performs an access check and reports how the decision was reached.
    pub async fn check(&self, request: &AccessRequest) -> DomainResult<CheckOutcome> {
        let action = self.validate_request(request)?;

        let (decision, source) = match self.mode {
            EngineMode::Degraded => (
                self.fallback_decision(&request.user_id, &request.resource_id, action)
                    .await,
                DecisionSource::OwnershipFallback,
            ),
            EngineMode::Connected => {
                match self
                    .query_store(&request.user_id, &request.resource_id, action)
                    .await
                {
                    Ok(Decision::Allowed) => (Decision::Allowed, DecisionSource::RelationshipStore),
                    Ok(decision) => {
                        if self.is_recorded_owner(&request.user_id, &request.resource_id).await {
                            debug!(
                                user_id = %request.user_id,
                                resource_id = %request.resource_id,
                                store_decision = ?decision,
                                "relationship store disagrees with record owner; record wins"
                            );
                            (Decision::Allowed, DecisionSource::RecordOwner)
                        } else {
                            (decision, DecisionSource::RelationshipStore)
                        }
                    }
                    Err(err) => {
                        log_store_failure(&err, request);
                        (
                            self.fallback_decision(
                                &request.user_id,
                                &request.resource_id,
                                action,
                            )
                            .await,
                            DecisionSource::OwnershipFallback,
                        )
                    }
                }
            }
        };

        debug!(
            user_id = %request.user_id,
            resource_id = %request.resource_id,
            action = %action,
            mode = self.mode.label(),
            ?decision,
            ?source,
            "access decision"
        );

        Ok(CheckOutcome {
            decision,
            source,
            mode: self.mode,
        })
    }

    fn validate_request(&self, request: &AccessRequest) -> DomainResult<Action> {
        validate_identifier("user_id", &request.user_id)?;
        validate_identifier("resource_id", &request.resource_id)?;
        request.action.parse()
    }

    async fn query_store(
        &self,
        user_id: &str,
        resource_id: &str,
        action: Action,
    ) -> DomainResult<Decision> {
        let subject = EntityRef::user(user_id);
        let target = EntitlementTarget::document(resource_id, action);

        let response = timeout(
            self.config.query_timeout,
            self.entitlements.is_entitled_to(&subject, &target),
        )
        .await
        .map_err(|_| DomainError::Timeout {
            duration_ms: self.config.query_timeout.as_millis() as u64,
        })??;

        let decision = Decision::from_response(&response);
        if decision == Decision::Unrecognized {
            warn!(
                user_id,
                resource_id,
                action = %action,
                response = %response,
                "unexpected response format from relationship store, denying"
            );
        }
        Ok(decision)
    }

    /// Ownership fallback: reads are open, everything else needs ownership.
    async fn fallback_decision(
        &self,
        user_id: &str,
        resource_id: &str,
        action: Action,
    ) -> Decision {
        if !action.requires_ownership() {
            return Decision::Allowed;
        }
        Decision::from_bool(self.is_recorded_owner(user_id, resource_id).await)
    }

    /// True when the record store names `user_id` as the document's owner.
    /// A missing record, failed lookup or timeout counts as not the owner.
    async fn is_recorded_owner(&self, user_id: &str, resource_id: &str) -> bool {
        let lookup = timeout(
            self.config.query_timeout,
            self.ownership.find_owner(resource_id),
        )
        .await;

        match lookup {
            Ok(Ok(Some(owner))) => owner == user_id,
            Ok(Ok(None)) => false,
            Ok(Err(err)) => {
                error!(resource_id, error = %err, "ownership lookup failed, denying");
                false
            }
            Err(_) => {
                error!(resource_id, "ownership lookup timed out, denying");
                false
            }
        }
    }
}

fn log_store_failure(err: &DomainError, request: &AccessRequest) {
    let message = err.to_string();
    if message.contains(KNOWN_CLIENT_DEFECT) {
        error!(
            user_id = %request.user_id,
            resource_id = %request.resource_id,
            error = %message,
            "entitlement client not ready (likely version mismatch); using ownership fallback"
        );
    } else {
        error!(
            user_id = %request.user_id,
            resource_id = %request.resource_id,
            error = %message,
            "relationship check failed; using ownership fallback"
        );
    }
}
