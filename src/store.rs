//! Content store port.
//!
//! The pipeline only needs read access to the enabled documents plus a
//! stable per-document storage key. The store itself (CMS persistence,
//! querying, tenancy) lives outside this subsystem; a query failure here is
//! the one batch-fatal condition.

use crate::document::RawCharacterDocument;
use crate::error::ResolveError;
use crate::types::StorageKey;
use async_trait::async_trait;

/// A raw document together with its stable storage key.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub storage_key: StorageKey,
    pub document: RawCharacterDocument,
}

/// Read-only query interface over the content store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Enabled agent documents for the current tenant/owner scope.
    async fn fetch_enabled(&self) -> Result<Vec<StoredDocument>, ResolveError>;
}

/// In-memory store over a fixed document list, for the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentStore {
    documents: Vec<StoredDocument>,
}

impl InMemoryContentStore {
    pub fn new(documents: Vec<StoredDocument>) -> Self {
        Self { documents }
    }

    pub fn push(&mut self, storage_key: impl Into<StorageKey>, document: RawCharacterDocument) {
        self.documents.push(StoredDocument {
            storage_key: storage_key.into(),
            document,
        });
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn fetch_enabled(&self) -> Result<Vec<StoredDocument>, ResolveError> {
        Ok(self.documents.clone())
    }
}
