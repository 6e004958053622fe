//! Configuration for the indexer.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IndexerError, Result};

/// Base name of the status index.
pub const STATUSES_INDEX: &str = "statuses";

/// Cluster sizing presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPreset {
    /// One node: no replicas.
    #[default]
    SingleNodeCluster,
    /// A few nodes: one replica.
    SmallCluster,
    /// Many nodes: one replica, twice the shards.
    LargeCluster,
}

impl ClusterPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterPreset::SingleNodeCluster => "single_node_cluster",
            ClusterPreset::SmallCluster => "small_cluster",
            ClusterPreset::LargeCluster => "large_cluster",
        }
    }

    pub fn number_of_replicas(&self) -> u32 {
        match self {
            ClusterPreset::SingleNodeCluster => 0,
            ClusterPreset::SmallCluster | ClusterPreset::LargeCluster => 1,
        }
    }

    pub fn number_of_shards(&self, base: u32) -> u32 {
        match self {
            ClusterPreset::LargeCluster => base.saturating_mul(2),
            _ => base,
        }
    }
}

impl FromStr for ClusterPreset {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "single_node_cluster" => Ok(ClusterPreset::SingleNodeCluster),
            "small_cluster" => Ok(ClusterPreset::SmallCluster),
            "large_cluster" => Ok(ClusterPreset::LargeCluster),
            other => Err(IndexerError::invalid_config(format!(
                "unknown cluster preset `{other}`"
            ))),
        }
    }
}

/// Index-level settings before the cluster preset is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// How often writes become visible to search, in seconds.
    pub refresh_interval_secs: u64,
    /// Primary shard count for a single-node or small cluster.
    pub number_of_shards: u32,
    /// Overrides the preset's replica count.
    #[serde(default)]
    pub number_of_replicas: Option<u32>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        IndexSettings {
            refresh_interval_secs: 30,
            number_of_shards: 5,
            number_of_replicas: None,
        }
    }
}

impl IndexSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Settings for the asynchronous sync queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Maximum number of distinct pending record ids.
    pub queue_capacity: usize,
    /// Attempts after the first one before a task is abandoned.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            workers: 4,
            queue_capacity: 10_000,
            max_retries: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

impl SyncConfig {
    /// Delay before retry number `attempt` (1-based): doubles each time, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Settings for bulk rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexOptions {
    /// Records fetched and written per batch.
    pub batch_size: usize,
    /// Pause between batches, leaving engine capacity to interactive writes.
    pub batch_pause_ms: u64,
    /// Stop after this many batches; resume later from the checkpoint.
    #[serde(default)]
    pub max_batches: Option<usize>,
}

impl Default for ReindexOptions {
    fn default() -> Self {
        ReindexOptions {
            batch_size: 1_000,
            batch_pause_ms: 0,
            max_batches: None,
        }
    }
}

impl ReindexOptions {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IndexerConfig {
    /// Prefix prepended to index names (`{prefix}_statuses`).
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub preset: ClusterPreset,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub reindex: ReindexOptions,
}

impl IndexerConfig {
    pub fn builder() -> IndexerConfigBuilder {
        IndexerConfigBuilder::default()
    }

    /// Parse a JSON configuration; missing sections take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: IndexerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Defaults overridden by `ES_PREFIX` and `ES_PRESET`.
    pub fn from_env() -> Result<Self> {
        let mut config = IndexerConfig::default();
        if let Ok(prefix) = std::env::var("ES_PREFIX") {
            if !prefix.trim().is_empty() {
                config.prefix = Some(prefix.trim().to_string());
            }
        }
        if let Ok(preset) = std::env::var("ES_PRESET") {
            config.preset = preset.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.index.number_of_shards == 0 {
            return Err(IndexerError::invalid_config("number_of_shards must be positive"));
        }
        if self.sync.workers == 0 {
            return Err(IndexerError::invalid_config("sync.workers must be positive"));
        }
        if self.sync.queue_capacity == 0 {
            return Err(IndexerError::invalid_config("sync.queue_capacity must be positive"));
        }
        if self.reindex.batch_size == 0 {
            return Err(IndexerError::invalid_config("reindex.batch_size must be positive"));
        }
        if self.sync.initial_backoff_ms > self.sync.max_backoff_ms {
            return Err(IndexerError::invalid_config(
                "sync.initial_backoff_ms exceeds sync.max_backoff_ms",
            ));
        }
        Ok(())
    }

    /// Full name of the status index.
    pub fn index_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{STATUSES_INDEX}"),
            None => STATUSES_INDEX.to_string(),
        }
    }

    /// Shard count after applying the preset.
    pub fn number_of_shards(&self) -> u32 {
        self.preset.number_of_shards(self.index.number_of_shards)
    }

    /// Replica count: explicit override, else the preset's.
    pub fn number_of_replicas(&self) -> u32 {
        self.index
            .number_of_replicas
            .unwrap_or_else(|| self.preset.number_of_replicas())
    }
}

#[derive(Default)]
pub struct IndexerConfigBuilder {
    config: IndexerConfig,
}

impl IndexerConfigBuilder {
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = Some(prefix.into());
        self
    }

    pub fn preset(mut self, preset: ClusterPreset) -> Self {
        self.config.preset = preset;
        self
    }

    pub fn refresh_interval_secs(mut self, secs: u64) -> Self {
        self.config.index.refresh_interval_secs = secs;
        self
    }

    pub fn number_of_shards(mut self, shards: u32) -> Self {
        self.config.index.number_of_shards = shards;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.sync.workers = workers;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.sync.max_retries = retries;
        self
    }

    pub fn backoff_ms(mut self, initial: u64, max: u64) -> Self {
        self.config.sync.initial_backoff_ms = initial;
        self.config.sync.max_backoff_ms = max;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.reindex.batch_size = batch_size;
        self
    }

    pub fn batch_pause_ms(mut self, pause: u64) -> Self {
        self.config.reindex.batch_pause_ms = pause;
        self
    }

    pub fn max_batches(mut self, batches: usize) -> Self {
        self.config.reindex.max_batches = Some(batches);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.sync.queue_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<IndexerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
