//! Error types for the indexing pipeline.
//!
//! All fallible operations return [`Result`], whose error type
//! [`IndexerError`] separates failures the sync driver may retry
//! (engine unavailability) from failures that must be surfaced
//! (schema conflicts) or skipped (extraction errors).

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Errors produced by the indexing pipeline.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The live mapping already declares `field` with a different type.
    /// Requires an explicit migration; never resolved automatically.
    #[error("schema conflict on field `{field}`: index has `{existing}`, schema requests `{requested}`")]
    SchemaConflict {
        field: String,
        existing: String,
        requested: String,
    },

    /// The search engine could not be reached (connection, timeout, overload).
    #[error("search engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The search engine rejected the request.
    #[error("search engine error: {0}")]
    Engine(String),

    /// A record could not be turned into a document.
    #[error("extraction failed for record {id}: {reason}")]
    Extraction { id: i64, reason: String },

    #[error("analysis error: {0}")]
    Analysis(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The primary store failed as a whole (not a single record).
    #[error("record store error: {0}")]
    Store(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexerError {
    pub fn schema_conflict(
        field: impl Into<String>,
        existing: impl Into<String>,
        requested: impl Into<String>,
    ) -> Self {
        IndexerError::SchemaConflict {
            field: field.into(),
            existing: existing.into(),
            requested: requested.into(),
        }
    }

    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        IndexerError::EngineUnavailable(msg.into())
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        IndexerError::Engine(msg.into())
    }

    pub fn extraction(id: i64, reason: impl Into<String>) -> Self {
        IndexerError::Extraction {
            id,
            reason: reason.into(),
        }
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        IndexerError::Analysis(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        IndexerError::InvalidConfig(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        IndexerError::InvalidArgument(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        IndexerError::Store(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        IndexerError::Internal(msg.into())
    }

    /// Returns true if the operation may succeed when attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexerError::EngineUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailability_is_retryable() {
        assert!(IndexerError::engine_unavailable("timeout").is_retryable());
        assert!(!IndexerError::engine("mapper_parsing_exception").is_retryable());
        assert!(!IndexerError::schema_conflict("id", "keyword", "long").is_retryable());
        assert!(!IndexerError::extraction(1, "tags not loaded").is_retryable());
    }

    #[test]
    fn test_schema_conflict_message_names_field() {
        let err = IndexerError::schema_conflict("created_at", "text", "date");
        let msg = err.to_string();
        assert!(msg.contains("created_at"));
        assert!(msg.contains("text"));
        assert!(msg.contains("date"));
    }
}
