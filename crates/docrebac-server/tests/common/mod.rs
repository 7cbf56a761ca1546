//! Shared fixtures for docrebac-server integration tests.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use docrebac_domain::{ClaimSet, Credential, EngineMode, Principal};
use docrebac_server::adapters::document_schema;
use docrebac_server::config::PdpSettings;
use docrebac_server::{AuthzRuntime, DocumentService};
use docrebac_storage::{
    AssignmentFilter, EntitlementQuery, HealthStatus, MemoryRecordStore, MemoryRelationshipStore,
    RelationshipStore, StorageError, StorageResult, StoredAssignment,
};

/// Per-call timeout used by every fixture.
pub const TEST_TIMEOUT_MS: u64 = 500;

/// A memory relationship store that can be taken offline or made to answer
/// with an arbitrary response body.
pub struct SwitchableStore {
    inner: MemoryRelationshipStore,
    online: AtomicBool,
    health_stalled: AtomicBool,
    response_override: Mutex<Option<Value>>,
}

impl SwitchableStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryRelationshipStore::new(document_schema()),
            online: AtomicBool::new(true),
            health_stalled: AtomicBool::new(false),
            response_override: Mutex::new(None),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Health checks hang instead of answering.
    pub fn stall_health(&self, stalled: bool) {
        self.health_stalled.store(stalled, Ordering::SeqCst);
    }

    /// Every entitlement query answers with `response` from now on.
    pub fn answer_with(&self, response: Value) {
        *self.response_override.lock().unwrap() = Some(response);
    }

    /// Owner assignments recorded for a document.
    pub fn owners_of(&self, document_id: &str) -> Vec<String> {
        self.inner
            .read_assignments(&AssignmentFilter {
                target_entity_type_key: Some("document".to_string()),
                target_key: Some(document_id.to_string()),
                relation_key: Some("owner".to_string()),
                subject_key: None,
            })
            .into_iter()
            .map(|a| a.subject_key)
            .collect()
    }

    fn check_online(&self) -> StorageResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unreachable {
                message: "connection refused".to_string(),
            })
        }
    }
}

#[async_trait]
impl RelationshipStore for SwitchableStore {
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        if self.health_stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.check_online()?;
        self.inner.health_check().await
    }

    async fn is_entitled_to(&self, query: &EntitlementQuery) -> StorageResult<Value> {
        self.check_online()?;
        let response_override = self.response_override.lock().unwrap().clone();
        if let Some(response) = response_override {
            return Ok(response);
        }
        self.inner.is_entitled_to(query).await
    }

    async fn assign(&self, assignments: &[StoredAssignment], token: &str) -> StorageResult<()> {
        self.check_online()?;
        self.inner.assign(assignments, token).await
    }

    async fn unassign(&self, assignments: &[StoredAssignment], token: &str) -> StorageResult<()> {
        self.check_online()?;
        self.inner.unassign(assignments, token).await
    }

    fn describe(&self) -> String {
        "switchable memory store".to_string()
    }
}

pub type TestService = DocumentService<SwitchableStore, MemoryRecordStore>;

pub struct Fixture {
    pub service: TestService,
    pub store: Arc<SwitchableStore>,
    pub records: Arc<MemoryRecordStore>,
}

pub fn settings() -> PdpSettings {
    PdpSettings {
        timeout_ms: TEST_TIMEOUT_MS,
        ..PdpSettings::default()
    }
}

/// Starts a service through the startup probe. A store that is offline at
/// startup yields a degraded engine.
pub async fn start(store_online: bool) -> Fixture {
    let store = SwitchableStore::new();
    store.set_online(store_online);
    let records = MemoryRecordStore::new_shared();
    let runtime = AuthzRuntime::start(&settings(), Arc::clone(&store), Arc::clone(&records)).await;
    Fixture {
        service: DocumentService::new(runtime),
        store,
        records,
    }
}

/// Builds a service in a fixed mode, leaving the store online.
pub fn in_mode(mode: EngineMode) -> Fixture {
    let store = SwitchableStore::new();
    let records = MemoryRecordStore::new_shared();
    let runtime =
        AuthzRuntime::with_mode(mode, &settings(), Arc::clone(&store), Arc::clone(&records));
    Fixture {
        service: DocumentService::new(runtime),
        store,
        records,
    }
}

pub fn user(id: &str) -> Principal {
    Principal::new(id, "tenant-1", ClaimSet::new())
}

pub fn user_with_claims(id: &str, claims: &[&str]) -> Principal {
    Principal::new(id, "tenant-1", claims.iter().copied().collect())
}

pub fn token(user_id: &str) -> Credential {
    Credential::new(format!("token-{user_id}"))
}
