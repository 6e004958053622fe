//! Search engine seam.
//!
//! [`SearchEngine`] is the narrow set of requests the indexer issues to an
//! Elasticsearch-compatible engine. [`MemoryEngine`] runs in process;
//! `HttpEngine` (feature `http`) speaks the REST API.

#[cfg(feature = "http")]
pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::IndexDocument;
use crate::error::Result;
use crate::schema::{DynamicSettings, IndexSchema, Mapping};

#[cfg(feature = "http")]
pub use http::{HttpEngine, HttpEngineConfig};
pub use memory::MemoryEngine;

/// External document version. Writes whose version is not greater than
/// the stored one are discarded by the engine.
pub type Version = u64;

/// What a single write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Created,
    Updated,
    Deleted,
    /// Delete of a document that was not indexed.
    NotFound,
    /// The engine holds a newer (or equal) version; nothing was written.
    Stale,
}

impl WriteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOutcome::Created => "created",
            WriteOutcome::Updated => "updated",
            WriteOutcome::Deleted => "deleted",
            WriteOutcome::NotFound => "not_found",
            WriteOutcome::Stale => "stale",
        }
    }

    /// Returns true if the engine state changed.
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            WriteOutcome::Created | WriteOutcome::Updated | WriteOutcome::Deleted
        )
    }
}

/// One entry of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    Index {
        document: IndexDocument,
        version: Version,
    },
    Delete {
        id: i64,
        version: Version,
    },
}

impl BulkOperation {
    pub fn id(&self) -> i64 {
        match self {
            BulkOperation::Index { document, .. } => document.id,
            BulkOperation::Delete { id, .. } => *id,
        }
    }

    pub fn version(&self) -> Version {
        match self {
            BulkOperation::Index { version, .. } | BulkOperation::Delete { version, .. } => {
                *version
            }
        }
    }
}

/// Per-operation result of a bulk request, in request order.
#[derive(Debug)]
pub struct BulkItem {
    pub id: i64,
    pub result: Result<WriteOutcome>,
}

#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Create the index with its settings, analysis and mapping.
    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()>;

    async fn get_mapping(&self, index: &str) -> Result<Mapping>;

    /// Merge `mapping` into the live mapping. Type changes are rejected
    /// with [`IndexerError::SchemaConflict`](crate::IndexerError::SchemaConflict).
    async fn put_mapping(&self, index: &str, mapping: &Mapping) -> Result<()>;

    async fn put_settings(&self, index: &str, settings: &DynamicSettings) -> Result<()>;

    async fn index_document(
        &self,
        index: &str,
        document: &IndexDocument,
        version: Version,
    ) -> Result<WriteOutcome>;

    async fn delete_document(&self, index: &str, id: i64, version: Version)
    -> Result<WriteOutcome>;

    /// Apply several writes in one request.
    ///
    /// An `Err` means the request as a whole failed; individual
    /// operations report their own result in the returned items.
    async fn bulk(&self, index: &str, operations: Vec<BulkOperation>) -> Result<Vec<BulkItem>>;

    /// Make all writes so far visible to search.
    async fn refresh(&self, index: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_applied() {
        assert!(WriteOutcome::Created.is_applied());
        assert!(WriteOutcome::Deleted.is_applied());
        assert!(!WriteOutcome::Stale.is_applied());
        assert!(!WriteOutcome::NotFound.is_applied());
    }
}
