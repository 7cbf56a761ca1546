//! docrebac-server: Wiring for the authorization core
//!
//! Connects the domain crate to concrete stores and exposes the document
//! workflow the routing layer calls into:
//! - Configuration loading (defaults, YAML file, `DOCREBAC_` env overrides)
//! - Structured logging initialization
//! - Adapters from `docrebac-storage` stores to the domain's collaborator traits
//! - Startup mode detection and runtime assembly
//! - Request guard (static claims first, relationship check second)
//! - Document service (create, read, list, update, delete, share, revoke)

pub mod adapters;
pub mod config;
pub mod guard;
pub mod observability;
pub mod runtime;
pub mod service;

pub use config::{ConfigLoadError, ServerConfig};
pub use guard::{AccessDenied, ClaimRequirement, GuardRejection};
pub use runtime::AuthzRuntime;
pub use service::{DocumentService, RouteClaims, ServiceError, ServiceResult};
