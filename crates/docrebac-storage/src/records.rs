//! In-memory document record store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::traits::{validate_key, DocumentPatch, DocumentRecord, NewDocument, RecordStore};

/// In-memory implementation of RecordStore.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    documents: DashMap<String, DocumentRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn newest_first(mut docs: Vec<DocumentRecord>) -> Vec<DocumentRecord> {
        docs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        docs
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    #[instrument(skip(self, document), fields(owner_id = %document.owner_id))]
    async fn insert(&self, document: NewDocument) -> StorageResult<DocumentRecord> {
        validate_key("owner_id", &document.owner_id)?;
        if document.title.trim().is_empty() {
            return Err(StorageError::InvalidInput {
                message: "title cannot be empty".to_string(),
            });
        }

        let now = Utc::now();
        let record = DocumentRecord {
            id: Uuid::new_v4().to_string(),
            title: document.title,
            content: document.content,
            owner_id: document.owner_id,
            tenant_id: document.tenant_id,
            created_at: now,
            updated_at: now,
        };
        self.documents.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &str) -> StorageResult<Option<DocumentRecord>> {
        Ok(self.documents.get(id).map(|d| d.value().clone()))
    }

    async fn find_owner(&self, id: &str) -> StorageResult<Option<String>> {
        Ok(self.documents.get(id).map(|d| d.owner_id.clone()))
    }

    async fn list(&self) -> StorageResult<Vec<DocumentRecord>> {
        let docs = self.documents.iter().map(|d| d.value().clone()).collect();
        Ok(Self::newest_first(docs))
    }

    async fn list_by_owner(&self, owner_id: &str) -> StorageResult<Vec<DocumentRecord>> {
        let docs = self
            .documents
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .map(|d| d.value().clone())
            .collect();
        Ok(Self::newest_first(docs))
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &str, patch: DocumentPatch) -> StorageResult<DocumentRecord> {
        let mut doc = self
            .documents
            .get_mut(id)
            .ok_or_else(|| StorageError::RecordNotFound { id: id.to_string() })?;
        if let Some(title) = patch.title {
            doc.title = title;
        }
        if let Some(content) = patch.content {
            doc.content = content;
        }
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::RecordNotFound { id: id.to_string() })
    }
}
