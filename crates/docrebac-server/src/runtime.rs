//! Runtime assembly: mode detection and the shared authorization components.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use docrebac_domain::engine::{detect_mode, EngineConfig, EngineMode, HealthProbe};
use docrebac_domain::{AuthorizationEngine, RelationshipMutator};
use docrebac_storage::{
    HttpRelationshipStore, HttpStoreConfig, RecordStore, RelationshipStore, StorageResult,
};

use crate::adapters::{RecordOwnershipReader, StoreEntitlementReader, StoreRelationWriter};
use crate::config::PdpSettings;

/// Engine type produced by [`AuthzRuntime`].
pub type StoreEngine<S, R> =
    AuthorizationEngine<StoreEntitlementReader<S>, RecordOwnershipReader<R>>;

/// Mutator type produced by [`AuthzRuntime`].
pub type StoreMutator<S> = RelationshipMutator<StoreRelationWriter<S>>;

/// Decides the engine mode from configuration and a single health probe.
///
/// `disabled` skips the probe and forces degraded mode.
pub async fn resolve_mode<P>(settings: &PdpSettings, probe: &P) -> EngineMode
where
    P: HealthProbe + ?Sized,
{
    if settings.is_disabled() {
        warn!("relationship checks disabled by configuration, running in degraded mode");
        return EngineMode::Degraded;
    }
    detect_mode(probe, settings.timeout()).await
}

/// Builds the remote relationship store from PDP settings.
pub fn http_store(settings: &PdpSettings) -> StorageResult<HttpRelationshipStore> {
    HttpRelationshipStore::new(&HttpStoreConfig {
        agent_url: settings.agent_url.clone(),
        api_base_url: settings.api_base_url.clone(),
        timeout: settings.timeout(),
    })
}

/// Authorization components shared by every request.
///
/// Built once at startup. The engine mode is fixed for the life of the
/// runtime.
pub struct AuthzRuntime<S: RelationshipStore, R: RecordStore> {
    pub store: Arc<S>,
    pub engine: Arc<StoreEngine<S, R>>,
    pub mutator: Arc<StoreMutator<S>>,
    pub records: Arc<R>,
    /// Upper bound on any single call to the relationship store.
    pub call_timeout: Duration,
}

impl<S: RelationshipStore, R: RecordStore> Clone for AuthzRuntime<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            engine: Arc::clone(&self.engine),
            mutator: Arc::clone(&self.mutator),
            records: Arc::clone(&self.records),
            call_timeout: self.call_timeout,
        }
    }
}

impl<S: RelationshipStore, R: RecordStore> AuthzRuntime<S, R> {
    /// Probes the relationship store and assembles the runtime.
    pub async fn start(settings: &PdpSettings, store: Arc<S>, records: Arc<R>) -> Self {
        let probe = StoreEntitlementReader::new(Arc::clone(&store));
        let mode = resolve_mode(settings, &probe).await;
        let runtime = Self::with_mode(mode, settings, store, records);
        info!(mode = mode.label(), "authorization runtime ready");
        runtime
    }

    /// Assembles the runtime in a known mode without probing.
    pub fn with_mode(
        mode: EngineMode,
        settings: &PdpSettings,
        store: Arc<S>,
        records: Arc<R>,
    ) -> Self {
        let reader = Arc::new(StoreEntitlementReader::new(Arc::clone(&store)));
        let ownership = Arc::new(RecordOwnershipReader::new(Arc::clone(&records)));
        let engine = AuthorizationEngine::with_config(
            mode,
            reader,
            ownership,
            EngineConfig::default().with_query_timeout(settings.timeout()),
        );
        let mutator =
            RelationshipMutator::new(Arc::new(StoreRelationWriter::new(Arc::clone(&store))))
                .with_timeout(settings.timeout());

        Self {
            store,
            engine: Arc::new(engine),
            mutator: Arc::new(mutator),
            records,
            call_timeout: settings.timeout(),
        }
    }

    pub fn mode(&self) -> EngineMode {
        self.engine.mode()
    }
}
