//! Engine configuration and operating mode.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound on a single relationship store call.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Operating mode of the authorization engine.
///
/// Decided once at startup by a health probe and never written afterwards;
/// every decision reads it without locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// The relationship store answered the startup probe; decisions are
    /// delegated to it.
    Connected,
    /// The relationship store was unavailable at startup; decisions use the
    /// ownership fallback policy.
    Degraded,
}

impl EngineMode {
    /// Short label for access-denied payloads.
    pub fn label(&self) -> &'static str {
        match self {
            EngineMode::Connected => "rebac",
            EngineMode::Degraded => "fallback",
        }
    }

    /// Operational hint attached to an access denial.
    pub fn denial_hint(&self) -> &'static str {
        match self {
            EngineMode::Connected => {
                "Check the relationship configuration for this document type on the policy store"
            }
            EngineMode::Degraded => {
                "Running in fallback mode; check relationship store availability for full access control"
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, EngineMode::Degraded)
    }
}

/// Configuration for the authorization engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timeout applied to every store call on the decision path.
    pub query_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with the specified query timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }
}
