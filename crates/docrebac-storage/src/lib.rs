//! docrebac-storage: Collaborator implementations
//!
//! This crate provides the stores the authorization core talks to:
//! - RelationshipStore trait for entitlement queries and relation writes
//! - In-memory relationship store (local PDP) for tests and single-node use
//! - HTTP client for a remote PDP agent and relations API
//! - Document record store holding the ownership ground truth
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              docrebac-storage                │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs  - RelationshipStore, RecordStore│
//! │  schema.rs  - Relation schema (local PDP)   │
//! │  memory.rs  - In-memory relationship store  │
//! │  remote.rs  - HTTP relationship store       │
//! │  records.rs - In-memory record store        │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod records;
pub mod remote;
pub mod schema;
pub mod traits;

// Re-export commonly used types
pub use error::{HealthStatus, StorageError, StorageResult};
pub use memory::MemoryRelationshipStore;
pub use records::MemoryRecordStore;
pub use remote::{HttpRelationshipStore, HttpStoreConfig};
pub use schema::RelationSchema;
pub use traits::{
    AssignmentFilter, DocumentPatch, DocumentRecord, EntitlementQuery, EntityKey, NewDocument,
    RecordStore, RelationshipStore, StoredAssignment,
};
