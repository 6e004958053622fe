//! # status-index
//!
//! Keeps social-network statuses in sync with an Elasticsearch-compatible
//! full-text index.
//!
//! ## Features
//!
//! - Multilingual analysis (Japanese morphology, English stemming, URL and
//!   hashtag aware tokenization) reproducible in process
//! - Pure field extraction from typed records
//! - A single eligibility policy deciding index or removal
//! - Schema creation and compatible in-place updates
//! - Versioned writes, coalescing async sync workers and resumable rebuilds
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use status_index::{IndexManager, IndexerConfig, MemoryEngine, MemoryStore, SyncService};
//!
//! # async fn run() -> status_index::Result<()> {
//! let config = IndexerConfig::from_env()?;
//! let engine = Arc::new(MemoryEngine::standard()?);
//! let manager = Arc::new(IndexManager::new(engine, &config));
//! manager.ensure_schema().await?;
//!
//! let store = Arc::new(MemoryStore::new());
//! let sync = SyncService::start(manager, store, config.sync.clone());
//! sync.enqueue(42)?;
//! sync.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod document;
pub mod engine;
mod error;
pub mod extract;
pub mod manager;
pub mod policy;
pub mod record;
pub mod report;
pub mod schema;
pub mod store;
pub mod sync;
pub mod version;

pub use analysis::{Analyzer, AnalyzerRegistry};
pub use config::{ClusterPreset, IndexSettings, IndexerConfig, ReindexOptions, SyncConfig};
pub use document::{IndexDocument, SearchableProperty, clamp_date};
#[cfg(feature = "http")]
pub use engine::{HttpEngine, HttpEngineConfig};
pub use engine::{BulkItem, BulkOperation, MemoryEngine, SearchEngine, Version, WriteOutcome};
pub use error::{IndexerError, Result};
pub use manager::{
    IndexManager, ReindexCheckpoint, ReindexReport, SchemaOutcome, ScopePredicate, all_records,
};
pub use policy::{Decision, EligibilityPolicy, RemovalReason};
pub use record::{Association, SourceRecord, Status};
pub use report::{ChannelReporter, Failure, FailureReporter, FailureSource, LogReporter};
pub use schema::{IndexSchema, Mapping};
pub use store::{MemoryStore, RecordStore};
pub use sync::{Enqueued, SyncService, SyncStats};
pub use version::VersionClock;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
