//! Asynchronous index synchronization.
//!
//! Record mutations call [`SyncService::enqueue`], which returns at once.
//! A fixed pool of workers re-evaluates each queued record against the
//! store and writes the result to the index.
//!
//! - An id waiting in the queue is never queued twice.
//! - An id enqueued while a worker is processing it is marked dirty and
//!   processed again right after, by the same worker. At most one task per
//!   id is in flight.
//! - Every attempt carries a fresh version, so a slower, older write can
//!   never replace a newer one in the engine.
//! - Engine unavailability is retried with exponential backoff; once the
//!   retry budget is spent the record is handed to the
//!   [`FailureReporter`](crate::report::FailureReporter).

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::join_all;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::engine::WriteOutcome;
use crate::error::{IndexerError, Result};
use crate::manager::IndexManager;
use crate::report::{Failure, FailureSource};
use crate::store::RecordStore;

/// What [`SyncService::enqueue`] did with an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enqueued {
    /// Added to the queue.
    Queued,
    /// Already waiting in the queue.
    Coalesced,
    /// Being processed; it will be processed again afterwards.
    Rerun,
}

/// Counters since the service started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncStats {
    pub processed: u64,
    pub indexed: u64,
    pub removed: u64,
    pub stale: u64,
    pub retries: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    indexed: AtomicU64,
    removed: AtomicU64,
    stale: AtomicU64,
    retries: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn record(&self, outcome: WriteOutcome) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            WriteOutcome::Created | WriteOutcome::Updated => &self.indexed,
            WriteOutcome::Deleted | WriteOutcome::NotFound => &self.removed,
            WriteOutcome::Stale => &self.stale,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SyncStats {
        SyncStats {
            processed: self.processed.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            removed: self.removed.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: HashSet<i64>,
    in_flight: HashSet<i64>,
    dirty: HashSet<i64>,
    closed: bool,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }
}

struct Shared {
    manager: Arc<IndexManager>,
    store: Arc<dyn RecordStore>,
    config: SyncConfig,
    state: Mutex<QueueState>,
    counters: Counters,
    idle: Notify,
}

/// Worker pool keeping the index in sync with the store.
pub struct SyncService {
    shared: Arc<Shared>,
    sender: Mutex<Option<mpsc::UnboundedSender<i64>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SyncService")
            .field("pending", &state.pending.len())
            .field("in_flight", &state.in_flight.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl SyncService {
    /// Spawn the workers on the current tokio runtime.
    pub fn start(
        manager: Arc<IndexManager>,
        store: Arc<dyn RecordStore>,
        config: SyncConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let shared = Arc::new(Shared {
            manager,
            store,
            config,
            state: Mutex::new(QueueState::default()),
            counters: Counters::default(),
            idle: Notify::new(),
        });

        let workers = (0..shared.config.workers.max(1))
            .map(|n| {
                let shared = shared.clone();
                let receiver = receiver.clone();
                tokio::spawn(async move {
                    debug!("sync worker {n} started");
                    loop {
                        let next = receiver.lock().await.recv().await;
                        let Some(id) = next else { break };
                        shared.run(id).await;
                    }
                    debug!("sync worker {n} stopped");
                })
            })
            .collect();

        SyncService {
            shared,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Schedule re-evaluation of record `id`. Never waits on the engine.
    pub fn enqueue(&self, id: i64) -> Result<Enqueued> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(IndexerError::internal("sync service is shut down"));
        }
        if state.in_flight.contains(&id) {
            state.dirty.insert(id);
            return Ok(Enqueued::Rerun);
        }
        if state.pending.contains(&id) {
            return Ok(Enqueued::Coalesced);
        }
        if state.pending.len() >= self.shared.config.queue_capacity {
            return Err(IndexerError::internal(format!(
                "sync queue full ({} records)",
                state.pending.len()
            )));
        }

        let sender = self.sender.lock();
        let sender = sender
            .as_ref()
            .ok_or_else(|| IndexerError::internal("sync service is shut down"))?;
        sender
            .send(id)
            .map_err(|_| IndexerError::internal("sync workers have stopped"))?;
        state.pending.insert(id);
        Ok(Enqueued::Queued)
    }

    pub fn enqueue_many(&self, ids: impl IntoIterator<Item = i64>) -> Result<()> {
        for id in ids {
            self.enqueue(id)?;
        }
        Ok(())
    }

    /// Records waiting to be processed.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    pub fn stats(&self) -> SyncStats {
        self.shared.counters.snapshot()
    }

    /// Wait until nothing is queued or in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.state.lock().is_idle() {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting work, drain the queue and join the workers.
    pub async fn shutdown(&self) {
        self.shared.state.lock().closed = true;
        self.sender.lock().take();

        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for result in join_all(workers).await {
            if let Err(e) = result {
                warn!("sync worker panicked: {e}");
            }
        }
        info!("sync service stopped: {:?}", self.stats());
    }
}

impl Shared {
    /// Process `id`, then again for as long as it was marked dirty meanwhile.
    async fn run(&self, id: i64) {
        {
            let mut state = self.state.lock();
            state.pending.remove(&id);
            state.in_flight.insert(id);
        }

        loop {
            self.process(id).await;

            let again = {
                let mut state = self.state.lock();
                if state.dirty.remove(&id) {
                    true
                } else {
                    state.in_flight.remove(&id);
                    if state.is_idle() {
                        self.idle.notify_waiters();
                    }
                    false
                }
            };
            if !again {
                break;
            }
        }
    }

    async fn process(&self, id: i64) {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let version = self.manager.next_version();
            match self.manager.reconcile(self.store.as_ref(), id, version).await {
                Ok(outcome) => {
                    self.counters.record(outcome);
                    return;
                }
                Err(e) if e.is_retryable() && attempt <= self.config.max_retries => {
                    let delay = self.config.backoff(attempt);
                    warn!("sync of {id} failed (attempt {attempt}), retrying in {delay:?}: {e}");
                    self.counters.retries.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    self.manager
                        .reporter()
                        .report(Failure::new(id, FailureSource::Sync, attempt, &e));
                    return;
                }
            }
        }
    }
}
