//! Index schema management and versioned writes.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{IndexerConfig, ReindexOptions, SyncConfig};
use crate::document::IndexDocument;
use crate::engine::{BulkOperation, SearchEngine, Version, WriteOutcome};
use crate::error::{IndexerError, Result};
use crate::extract::REQUIRED_ASSOCIATIONS;
use crate::policy::{Decision, EligibilityPolicy};
use crate::record::SourceRecord;
use crate::report::{Failure, FailureReporter, FailureSource, LogReporter};
use crate::schema::IndexSchema;
use crate::store::RecordStore;
use crate::version::VersionClock;

/// Selects the records a rebuild touches.
pub type ScopePredicate = dyn Fn(&dyn SourceRecord) -> bool + Send + Sync;

/// Scope that selects every record.
pub fn all_records(_: &dyn SourceRecord) -> bool {
    true
}

/// What [`IndexManager::ensure_schema`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaOutcome {
    /// The index did not exist and was created.
    Created,
    /// The index existed with a compatible mapping; missing fields and
    /// dynamic settings were applied.
    Updated,
}

/// Position of a rebuild: every record with id up to `last_id` was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReindexCheckpoint {
    pub last_id: Option<i64>,
}

/// Result of a (possibly partial) rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReindexReport {
    /// Resume point for the next run.
    pub checkpoint: ReindexCheckpoint,
    pub batches: usize,
    /// Documents created or updated.
    pub indexed: usize,
    /// Documents removed, or confirmed absent.
    pub removed: usize,
    /// Writes superseded by a newer version already in the index.
    pub stale: usize,
    /// Records outside the scope predicate.
    pub skipped: usize,
    /// Records that failed and were reported.
    pub failed: usize,
    /// Bulk requests or items retried after the engine was unavailable.
    pub retries: usize,
    /// True once the store has no records past the checkpoint.
    pub completed: bool,
    /// Set when the run stopped early on a request-level failure.
    pub interrupted: Option<String>,
}

impl ReindexReport {
    fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Created | WriteOutcome::Updated => self.indexed += 1,
            WriteOutcome::Deleted | WriteOutcome::NotFound => self.removed += 1,
            WriteOutcome::Stale => self.stale += 1,
        }
    }
}

/// Owns the status index: its schema, and every write to it.
pub struct IndexManager {
    engine: Arc<dyn SearchEngine>,
    index: String,
    schema: IndexSchema,
    policy: EligibilityPolicy,
    clock: Arc<VersionClock>,
    reporter: Arc<dyn FailureReporter>,
    retry: SyncConfig,
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("index", &self.index)
            .field("last_version", &self.clock.last())
            .finish()
    }
}

impl IndexManager {
    pub fn new(engine: Arc<dyn SearchEngine>, config: &IndexerConfig) -> Self {
        IndexManager {
            engine,
            index: config.index_name(),
            schema: IndexSchema::statuses(config),
            policy: EligibilityPolicy::new(),
            clock: Arc::new(VersionClock::new()),
            reporter: Arc::new(LogReporter),
            retry: config.sync.clone(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_clock(mut self, clock: Arc<VersionClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }

    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    pub fn policy(&self) -> &EligibilityPolicy {
        &self.policy
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngine> {
        &self.engine
    }

    pub fn reporter(&self) -> &Arc<dyn FailureReporter> {
        &self.reporter
    }

    /// A fresh version, greater than every version issued before.
    pub fn next_version(&self) -> Version {
        self.clock.next()
    }

    /// Create the index, or bring a compatible live index up to date.
    ///
    /// A field whose type or analyzer differs from the live mapping fails
    /// with [`IndexerError::SchemaConflict`] before anything is written.
    pub async fn ensure_schema(&self) -> Result<SchemaOutcome> {
        if !self.engine.index_exists(&self.index).await? {
            match self.engine.create_index(&self.index, &self.schema).await {
                Ok(()) => {
                    info!("created index {}", self.index);
                    return Ok(SchemaOutcome::Created);
                }
                Err(e @ IndexerError::Engine(_)) => {
                    // Lost a creation race: fall through to the update path.
                    if !self.engine.index_exists(&self.index).await? {
                        return Err(e);
                    }
                    debug!("index {} appeared concurrently: {e}", self.index);
                }
                Err(e) => return Err(e),
            }
        }

        let live = self.engine.get_mapping(&self.index).await?;
        live.check_compatible(&self.schema.mapping)?;
        if !live.contains_all(&self.schema.mapping) {
            self.engine.put_mapping(&self.index, &self.schema.mapping).await?;
            info!("added missing fields to the mapping of {}", self.index);
        }
        self.engine
            .put_settings(&self.index, &self.schema.dynamic)
            .await?;
        Ok(SchemaOutcome::Updated)
    }

    /// Versioned write of a document. A superseded version is reported as
    /// [`WriteOutcome::Stale`], not as an error.
    pub async fn upsert(&self, document: &IndexDocument, version: Version) -> Result<WriteOutcome> {
        let outcome = self
            .engine
            .index_document(&self.index, document, version)
            .await?;
        debug!("upsert {} v{version}: {}", document.id, outcome.as_str());
        Ok(outcome)
    }

    /// Versioned delete. Deleting an absent document is not an error.
    pub async fn delete(&self, id: i64, version: Version) -> Result<WriteOutcome> {
        let outcome = self.engine.delete_document(&self.index, id, version).await?;
        debug!("delete {id} v{version}: {}", outcome.as_str());
        Ok(outcome)
    }

    /// Perform the write a [`Decision`] calls for.
    pub async fn apply(&self, decision: &Decision, version: Version) -> Result<WriteOutcome> {
        match decision {
            Decision::Index(document) => self.upsert(document, version).await,
            Decision::Remove { id, reason } => {
                debug!("removing {id}: {}", reason.as_str());
                self.delete(*id, version).await
            }
        }
    }

    /// Re-evaluate one record against the store and apply the result.
    pub async fn reconcile(
        &self,
        store: &dyn RecordStore,
        id: i64,
        version: Version,
    ) -> Result<WriteOutcome> {
        let record = store.fetch(id, REQUIRED_ASSOCIATIONS).await?;
        let decision = self.policy.decide_optional(id, record.as_deref())?;
        self.apply(&decision, version).await
    }

    /// Rebuild the records selected by `scope`, in batches of ascending id.
    ///
    /// Each batch is one bulk request. Its version is taken before the
    /// batch is read, so a concurrent sync write of a newer state always
    /// wins over the rebuild's snapshot. A record that fails to load or
    /// extract is reported and skipped without failing its batch.
    ///
    /// Engine unavailability, for the whole request or single items, is
    /// retried with the sync backoff. Once retries run out, or the store or
    /// engine rejects a request outright, the run stops and the report's
    /// checkpoint points after the last completed batch.
    pub async fn reindex_scope(
        &self,
        store: &dyn RecordStore,
        scope: &ScopePredicate,
        options: &ReindexOptions,
        resume: Option<ReindexCheckpoint>,
    ) -> Result<ReindexReport> {
        if options.batch_size == 0 {
            return Err(IndexerError::invalid_argument("batch_size must be positive"));
        }

        let mut report = ReindexReport {
            checkpoint: resume.unwrap_or_default(),
            ..Default::default()
        };
        info!(
            "reindexing {} from {:?} in batches of {}",
            self.index, report.checkpoint.last_id, options.batch_size
        );

        loop {
            if options.max_batches.is_some_and(|max| report.batches >= max) {
                break;
            }

            let version = self.clock.next();
            let items = match store
                .scan(report.checkpoint.last_id, options.batch_size, REQUIRED_ASSOCIATIONS)
                .await
            {
                Ok(items) => items,
                Err(e) => {
                    warn!("reindex of {} interrupted: {e}", self.index);
                    report.interrupted = Some(e.to_string());
                    return Ok(report);
                }
            };
            let Some(last_id) = items.last().map(|item| item.id) else {
                report.completed = true;
                break;
            };
            let scanned = items.len();

            let mut operations = Vec::with_capacity(scanned);
            for item in items {
                let record = match item.record {
                    Ok(record) => record,
                    Err(e) => {
                        self.fail(&mut report, item.id, 1, &e);
                        continue;
                    }
                };
                if !scope(record.as_ref()) {
                    report.skipped += 1;
                    continue;
                }
                match self.policy.decide(record.as_ref()) {
                    Ok(Decision::Index(document)) => {
                        operations.push(BulkOperation::Index { document, version })
                    }
                    Ok(Decision::Remove { id, .. }) => {
                        operations.push(BulkOperation::Delete { id, version })
                    }
                    Err(e) => self.fail(&mut report, item.id, 1, &e),
                }
            }

            if let Err(e) = self.write_batch(&mut report, operations).await {
                warn!("reindex of {} interrupted: {e}", self.index);
                report.interrupted = Some(e.to_string());
                return Ok(report);
            }

            report.checkpoint.last_id = Some(last_id);
            report.batches += 1;
            debug!(
                "reindex batch {} of {} done at id {last_id}",
                report.batches, self.index
            );

            if scanned < options.batch_size {
                report.completed = true;
                break;
            }
            let pause = options.batch_pause();
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        info!(
            "reindex of {}: {} indexed, {} removed, {} stale, {} skipped, {} failed",
            self.index, report.indexed, report.removed, report.stale, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Send one batch, resending what the engine could not take until the
    /// retry budget is spent. Items keep their version across attempts.
    async fn write_batch(
        &self,
        report: &mut ReindexReport,
        mut operations: Vec<BulkOperation>,
    ) -> Result<()> {
        let mut attempt: u32 = 0;
        while !operations.is_empty() {
            attempt += 1;
            let exhausted = attempt > self.retry.max_retries;

            match self.engine.bulk(&self.index, operations.clone()).await {
                Ok(results) => {
                    let mut pending: HashMap<i64, BulkOperation> =
                        operations.into_iter().map(|op| (op.id(), op)).collect();
                    let mut unavailable = None;
                    for item in results {
                        match item.result {
                            Ok(outcome) => {
                                pending.remove(&item.id);
                                report.record(outcome);
                            }
                            Err(e) if e.is_retryable() => {
                                if exhausted {
                                    self.fail(report, item.id, attempt, &e);
                                }
                                unavailable = Some(e);
                            }
                            Err(e) => {
                                pending.remove(&item.id);
                                self.fail(report, item.id, attempt, &e);
                            }
                        }
                    }
                    operations = pending.into_values().collect();
                    if let Some(e) = unavailable
                        && exhausted
                    {
                        return Err(e);
                    }
                }
                Err(e) if e.is_retryable() && !exhausted => {
                    debug!("bulk request to {} failed: {e}", self.index);
                }
                Err(e) => return Err(e),
            }

            if !operations.is_empty() {
                let delay = self.retry.backoff(attempt);
                warn!(
                    "retrying {} bulk operations on {} in {delay:?} (attempt {attempt})",
                    operations.len(),
                    self.index
                );
                report.retries += 1;
                tokio::time::sleep(delay).await;
            }
        }
        Ok(())
    }

    fn fail(&self, report: &mut ReindexReport, id: i64, attempts: u32, err: &IndexerError) {
        report.failed += 1;
        self.reporter
            .report(Failure::new(id, FailureSource::Reindex, attempts, err));
    }
}
