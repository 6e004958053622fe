//! Operational failure reporting.
//!
//! Indexing runs off the user-facing write path, so failures are never
//! returned to the code that triggered them. They are handed to a
//! [`FailureReporter`] instead.

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::IndexerError;

/// Where the failing work came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSource {
    /// A queued single-record task.
    Sync,
    /// A bulk rebuild.
    Reindex,
}

/// A record that could not be brought in sync with the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub id: i64,
    pub source: FailureSource,
    /// Attempts made, the first one included.
    pub attempts: u32,
    pub error: String,
    /// True if the error was transient and retries ran out.
    pub retryable: bool,
    pub at: DateTime<Utc>,
}

impl Failure {
    pub fn new(id: i64, source: FailureSource, attempts: u32, err: &IndexerError) -> Self {
        Failure {
            id,
            source,
            attempts,
            error: err.to_string(),
            retryable: err.is_retryable(),
            at: Utc::now(),
        }
    }
}

pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: Failure);
}

/// Logs failures at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn report(&self, failure: Failure) {
        error!(
            "record {} abandoned after {} attempt(s) ({:?}): {}",
            failure.id, failure.attempts, failure.source, failure.error
        );
    }
}

/// Forwards failures to a channel, e.g. an alerting or retry queue consumer.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: mpsc::UnboundedSender<Failure>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Failure>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (ChannelReporter { sender }, receiver)
    }
}

impl FailureReporter for ChannelReporter {
    fn report(&self, failure: Failure) {
        if let Err(e) = self.sender.send(failure) {
            LogReporter.report(e.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_reporter() {
        let (reporter, mut receiver) = ChannelReporter::new();
        reporter.report(Failure::new(
            7,
            FailureSource::Sync,
            3,
            &IndexerError::engine_unavailable("down"),
        ));
        let failure = receiver.try_recv().unwrap();
        assert_eq!(failure.id, 7);
        assert_eq!(failure.attempts, 3);
        assert!(failure.retryable);
        assert!(failure.error.contains("down"));
    }

    #[test]
    fn test_closed_channel_falls_back_to_log() {
        let (reporter, receiver) = ChannelReporter::new();
        drop(receiver);
        reporter.report(Failure::new(
            1,
            FailureSource::Reindex,
            1,
            &IndexerError::extraction(1, "broken"),
        ));
    }
}
