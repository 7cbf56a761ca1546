//! In-memory relationship store.
//!
//! A local PDP: holds assignments in memory and evaluates entitlement queries
//! against a [`RelationSchema`].
//!
//! # Semantics
//!
//! - A subject holds at most one non-exclusive relation per target; assigning
//!   another one supersedes it.
//! - An exclusive relation (e.g. `owner`) has at most one holder per target.
//!   Assigning it to a second subject fails with `OwnerConflict`; assigning it
//!   again to the same subject succeeds without change.
//! - Removing an assignment that does not exist succeeds.
//! - An assign batch is all-or-nothing. If a concurrent writer takes an
//!   exclusive relation between the precheck and the write, rows already
//!   written by the batch are rolled back.
//! - A query is allowed if any relation the subject holds grants the action.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::{HealthStatus, StorageError, StorageResult};
use crate::schema::RelationSchema;
use crate::traits::{
    validate_assignment, validate_key, AssignmentFilter, EntitlementQuery, EntityKey,
    RelationshipStore, StoredAssignment,
};

type SubjectRelations = HashMap<EntityKey, BTreeSet<String>>;

/// What one applied row changed, so a failed batch can undo it.
struct AppliedRow {
    target: EntityKey,
    subject: EntityKey,
    inserted: Option<String>,
    superseded: Vec<String>,
}

/// In-memory implementation of RelationshipStore.
///
/// Uses DashMap keyed by target so writes to different targets do not
/// contend. Each target entry is mutated under its shard lock, which keeps
/// the exclusive-relation check and the insert atomic.
#[derive(Debug)]
pub struct MemoryRelationshipStore {
    schema: RelationSchema,
    relations: DashMap<EntityKey, SubjectRelations>,
}

impl MemoryRelationshipStore {
    /// Creates an empty store evaluating against `schema`.
    pub fn new(schema: RelationSchema) -> Self {
        Self {
            schema,
            relations: DashMap::new(),
        }
    }

    /// Creates an empty store wrapped in Arc.
    pub fn new_shared(schema: RelationSchema) -> Arc<Self> {
        Arc::new(Self::new(schema))
    }

    /// Reads assignments matching the filter, sorted by target then subject.
    pub fn read_assignments(&self, filter: &AssignmentFilter) -> Vec<StoredAssignment> {
        let mut out: Vec<StoredAssignment> = self
            .relations
            .iter()
            .flat_map(|entry| {
                let target = entry.key().clone();
                entry
                    .value()
                    .iter()
                    .flat_map(|(subject, held)| {
                        held.iter().map(|relation| StoredAssignment {
                            subject_entity_type_key: subject.entity_type.clone(),
                            subject_key: subject.key.clone(),
                            relation_key: relation.clone(),
                            target_entity_type_key: target.entity_type.clone(),
                            target_key: target.key.clone(),
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|a| filter.matches(a))
            .collect();
        out.sort_by(|a, b| {
            (&a.target_key, &a.subject_key, &a.relation_key).cmp(&(
                &b.target_key,
                &b.subject_key,
                &b.relation_key,
            ))
        });
        out
    }

    /// Number of targets with at least one assignment.
    pub fn target_count(&self) -> usize {
        self.relations.len()
    }

    fn validate(&self, assignment: &StoredAssignment) -> StorageResult<()> {
        validate_assignment(assignment)?;
        self.schema
            .require_relation(&assignment.target_entity_type_key, &assignment.relation_key)
    }

    fn conflict(target: &EntityKey, relation: &str, holder: &EntityKey) -> StorageError {
        StorageError::OwnerConflict {
            target_type: target.entity_type.clone(),
            target_key: target.key.clone(),
            relation: relation.to_string(),
            existing_subject: holder.key.clone(),
        }
    }

    /// Rejects a batch that would give an exclusive relation a second holder,
    /// before anything is written.
    fn precheck_exclusive(&self, assignments: &[StoredAssignment]) -> StorageResult<()> {
        let mut claimed: HashMap<(EntityKey, &str), EntityKey> = HashMap::new();
        for a in assignments {
            if !self
                .schema
                .is_exclusive(&a.target_entity_type_key, &a.relation_key)
            {
                continue;
            }
            let target = a.target();
            let subject = a.subject();
            if let Some(holder) = self.exclusive_holder(&target, &a.relation_key) {
                if holder != subject {
                    return Err(Self::conflict(&target, &a.relation_key, &holder));
                }
            }
            let key = (target.clone(), a.relation_key.as_str());
            if let Some(other) = claimed.get(&key) {
                if *other != subject {
                    return Err(Self::conflict(&target, &a.relation_key, other));
                }
            }
            claimed.insert(key, subject);
        }
        Ok(())
    }

    fn exclusive_holder(&self, target: &EntityKey, relation: &str) -> Option<EntityKey> {
        self.relations.get(target).and_then(|subjects| {
            subjects
                .iter()
                .find(|(_, held)| held.contains(relation))
                .map(|(subject, _)| subject.clone())
        })
    }

    fn apply_batch(&self, assignments: &[StoredAssignment]) -> StorageResult<()> {
        let mut applied = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            match self.apply_assign(assignment) {
                Ok(row) => applied.push(row),
                Err(err) => {
                    debug!(rolled_back = applied.len(), "assign batch failed, rolling back");
                    for row in applied.into_iter().rev() {
                        self.undo(row);
                    }
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    fn apply_assign(&self, assignment: &StoredAssignment) -> StorageResult<AppliedRow> {
        let target = assignment.target();
        let subject = assignment.subject();
        let relation = assignment.relation_key.as_str();
        let exclusive = self.schema.is_exclusive(&target.entity_type, relation);

        let mut subjects = self.relations.entry(target.clone()).or_default();
        if exclusive {
            if let Some((holder, _)) = subjects
                .iter()
                .find(|(s, held)| **s != subject && held.contains(relation))
            {
                return Err(Self::conflict(&target, relation, holder));
            }
        }

        let held = subjects.entry(subject.clone()).or_default();
        let mut superseded = Vec::new();
        if !exclusive {
            // Supersede the previous shared relation for this pair
            held.retain(|r| {
                let keep = r == relation || self.schema.is_exclusive(&target.entity_type, r);
                if !keep {
                    superseded.push(r.clone());
                }
                keep
            });
        }
        let inserted = held
            .insert(relation.to_string())
            .then(|| relation.to_string());

        Ok(AppliedRow {
            target,
            subject,
            inserted,
            superseded,
        })
    }

    fn undo(&self, row: AppliedRow) {
        if let Some(mut subjects) = self.relations.get_mut(&row.target) {
            let held = subjects.entry(row.subject.clone()).or_default();
            if let Some(relation) = &row.inserted {
                held.remove(relation);
            }
            held.extend(row.superseded);
            if held.is_empty() {
                subjects.remove(&row.subject);
            }
        }
        self.relations
            .remove_if(&row.target, |_, subjects| subjects.is_empty());
    }

    fn apply_unassign(&self, assignment: &StoredAssignment) {
        let target = assignment.target();
        let subject = assignment.subject();
        if let Some(mut subjects) = self.relations.get_mut(&target) {
            if let Some(held) = subjects.get_mut(&subject) {
                held.remove(&assignment.relation_key);
                if held.is_empty() {
                    subjects.remove(&subject);
                }
            }
        }
        self.relations.remove_if(&target, |_, subjects| subjects.is_empty());
    }
}

#[async_trait]
impl RelationshipStore for MemoryRelationshipStore {
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        // No external dependencies
        Ok(HealthStatus {
            healthy: true,
            latency: Duration::ZERO,
            message: Some("in-memory relationship store".to_string()),
        })
    }

    #[instrument(
        skip(self, query),
        fields(
            subject = %query.subject.key,
            target = %query.target.key,
            action = %query.action
        )
    )]
    async fn is_entitled_to(&self, query: &EntitlementQuery) -> StorageResult<Value> {
        validate_key("subject key", &query.subject.key)?;
        validate_key("target key", &query.target.key)?;
        validate_key("action", &query.action)?;
        self.schema.require_type(&query.target.entity_type)?;

        let allowed = self
            .relations
            .get(&query.target)
            .and_then(|subjects| {
                subjects.get(&query.subject).map(|held| {
                    held.iter().any(|relation| {
                        self.schema
                            .grants(&query.target.entity_type, relation, &query.action)
                    })
                })
            })
            .unwrap_or(false);

        debug!(allowed, "entitlement evaluated");
        Ok(json!({ "result": allowed }))
    }

    #[instrument(skip(self, assignments, _token), fields(count = assignments.len()))]
    async fn assign(&self, assignments: &[StoredAssignment], _token: &str) -> StorageResult<()> {
        for assignment in assignments {
            self.validate(assignment)?;
        }
        self.precheck_exclusive(assignments)?;
        self.apply_batch(assignments)
    }

    #[instrument(skip(self, assignments, _token), fields(count = assignments.len()))]
    async fn unassign(&self, assignments: &[StoredAssignment], _token: &str) -> StorageResult<()> {
        for assignment in assignments {
            self.validate(assignment)?;
        }
        for assignment in assignments {
            self.apply_unassign(assignment);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory relationship store".to_string()
    }
}
