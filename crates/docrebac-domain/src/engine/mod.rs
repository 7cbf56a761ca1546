//! Authorization engine.
//!
//! Decides whether a user may perform an action on a document by consulting
//! the relationship store, falling back to record-store ownership when the
//! store is unavailable.

mod authorization_engine;
mod config;
mod mode;
pub mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use authorization_engine::AuthorizationEngine;
pub use config::{EngineConfig, EngineMode, DEFAULT_QUERY_TIMEOUT};
pub use mode::detect_mode;
pub use traits::{EntitlementReader, HealthProbe, OwnershipReader};
pub use types::{AccessRequest, CheckOutcome, Decision, DecisionSource, EntitlementTarget};
