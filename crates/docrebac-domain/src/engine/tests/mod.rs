//! Tests for the authorization engine.
//!
//! Organized by functionality:
//! - Connected mode decisions
//! - Degraded mode (ownership fallback)
//! - Per-call fallback on store failure
//! - Response normalization (fail-closed)
//! - Input validation
//! - Startup mode detection

mod mocks;
