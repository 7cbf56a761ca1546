//! docrebac-domain: Core authorization domain logic
//!
//! This crate contains the relationship-based authorization core:
//! - Relation model (owner/editor/viewer) and the actions each relation implies
//! - Authorization engine with connected and degraded (ownership fallback) modes
//! - Relationship mutation protocol (assign owner, share, revoke)
//! - Permission gate for static claim checks
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              docrebac-domain                 │
//! ├─────────────────────────────────────────────┤
//! │  model/      - Relations, actions, principal│
//! │  engine/     - can_access decision engine   │
//! │  mutation/   - assign/share/revoke protocol │
//! │  gate/       - Static claim checks          │
//! │  validation/ - Identifier validation        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The crate performs no I/O of its own. Collaborators (the remote
//! relationship store, the record store) are reached through the traits in
//! [`engine::traits`].

pub mod engine;
pub mod error;
pub mod gate;
pub mod model;
pub mod mutation;
pub mod validation;

// Re-export commonly used types at the crate root
pub use engine::{AuthorizationEngine, Decision, EngineConfig, EngineMode};
pub use error::{DomainError, DomainResult};
pub use gate::{GateDenied, PermissionGate};
pub use model::{Action, Assignment, ClaimSet, Credential, EntityRef, Principal, Relation};
pub use mutation::{MutationError, MutationErrorKind, RelationshipMutator};
