//! Startup mode detection.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use super::config::EngineMode;
use super::traits::HealthProbe;

/// Probes the relationship store once and decides the engine mode.
///
/// Any failure (timeout, non-success status, connection refused) yields
/// [`EngineMode::Degraded`]. This never fails: an unavailable store degrades
/// authorization, it does not stop the process.
pub async fn detect_mode<P>(probe: &P, probe_timeout: Duration) -> EngineMode
where
    P: HealthProbe + ?Sized,
{
    let endpoint = probe.endpoint();

    match timeout(probe_timeout, probe.probe()).await {
        Ok(Ok(())) => {
            info!(endpoint = %endpoint, "relationship store available, using relationship checks");
            EngineMode::Connected
        }
        Ok(Err(err)) => {
            warn!(
                endpoint = %endpoint,
                error = %err,
                "relationship store not available, running in degraded mode with ownership fallback"
            );
            EngineMode::Degraded
        }
        Err(_) => {
            warn!(
                endpoint = %endpoint,
                timeout_ms = probe_timeout.as_millis() as u64,
                "relationship store health probe timed out, running in degraded mode with ownership fallback"
            );
            EngineMode::Degraded
        }
    }
}
