//! Mock implementations for engine testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::engine::{EntitlementReader, EntitlementTarget, HealthProbe, OwnershipReader};
use crate::error::{DomainError, DomainResult};
use crate::model::{relations_allow, EntityRef, Relation};

/// Mock entitlement reader backed by a relation table.
pub struct MockEntitlementReader {
    relations: RwLock<HashMap<(String, String), Vec<Relation>>>,
    raw_response: RwLock<Option<Value>>,
    failure: RwLock<Option<String>>,
    delay: RwLock<Option<Duration>>,
    calls: AtomicUsize,
}

impl MockEntitlementReader {
    pub fn new() -> Self {
        Self {
            relations: RwLock::new(HashMap::new()),
            raw_response: RwLock::new(None),
            failure: RwLock::new(None),
            delay: RwLock::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub async fn grant(&self, user_id: &str, resource_id: &str, relation: Relation) {
        self.relations
            .write()
            .await
            .entry((user_id.to_string(), resource_id.to_string()))
            .or_default()
            .push(relation);
    }

    pub async fn revoke_all(&self, user_id: &str, resource_id: &str) {
        self.relations
            .write()
            .await
            .remove(&(user_id.to_string(), resource_id.to_string()));
    }

    /// Answers every query with `response` regardless of relations.
    pub async fn respond_with(&self, response: Value) {
        *self.raw_response.write().await = Some(response);
    }

    /// Fails every query with `message`.
    pub async fn fail_with(&self, message: &str) {
        *self.failure.write().await = Some(message.to_string());
    }

    pub async fn delay_by(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntitlementReader for MockEntitlementReader {
    async fn is_entitled_to(
        &self,
        subject: &EntityRef,
        target: &EntitlementTarget,
    ) -> DomainResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failure.read().await.clone() {
            return Err(DomainError::StoreQueryFailed { message });
        }

        if let Some(response) = self.raw_response.read().await.clone() {
            return Ok(response);
        }

        let relations = self.relations.read().await;
        let held = relations
            .get(&(subject.key.clone(), target.key.clone()))
            .cloned()
            .unwrap_or_default();
        Ok(json!({ "result": relations_allow(&held, target.action) }))
    }
}

/// Mock ownership reader backed by a map of resource id to owner.
pub struct MockOwnershipReader {
    owners: RwLock<HashMap<String, String>>,
    failing: RwLock<bool>,
    calls: AtomicUsize,
}

impl MockOwnershipReader {
    pub fn new() -> Self {
        Self {
            owners: RwLock::new(HashMap::new()),
            failing: RwLock::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub async fn add_record(&self, resource_id: &str, owner_id: &str) {
        self.owners
            .write()
            .await
            .insert(resource_id.to_string(), owner_id.to_string());
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OwnershipReader for MockOwnershipReader {
    async fn find_owner(&self, resource_id: &str) -> DomainResult<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing.read().await {
            return Err(DomainError::RecordLookupFailed {
                message: "record store unavailable".to_string(),
            });
        }
        Ok(self.owners.read().await.get(resource_id).cloned())
    }
}

/// Health probe with a fixed answer and optional delay.
pub struct MockHealthProbe {
    pub healthy: bool,
    pub delay: Option<Duration>,
}

#[async_trait]
impl HealthProbe for MockHealthProbe {
    async fn probe(&self) -> DomainResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.healthy {
            Ok(())
        } else {
            Err(DomainError::StoreUnhealthy {
                message: "connection refused".to_string(),
            })
        }
    }

    fn endpoint(&self) -> String {
        "mock://pdp".to_string()
    }
}
