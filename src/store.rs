//! Read-only access to the primary record store.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{IndexerError, Result};
use crate::record::{Association, SourceRecord, Status};

/// A record loaded from the store.
pub type BoxedRecord = Box<dyn SourceRecord>;

/// One record of a scan. A failure to load it does not fail the batch.
pub struct ScanItem {
    pub id: i64,
    pub record: Result<BoxedRecord>,
}

impl std::fmt::Debug for ScanItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanItem")
            .field("id", &self.id)
            .field("loaded", &self.record.is_ok())
            .finish()
    }
}

/// Trait for the primary store, enabling mock testing.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load one record with the given associations eager-loaded.
    /// `Ok(None)` when the record no longer exists.
    async fn fetch(&self, id: i64, associations: &[Association]) -> Result<Option<BoxedRecord>>;

    /// Up to `limit` records with id greater than `after`, in ascending id order.
    async fn scan(
        &self,
        after: Option<i64>,
        limit: usize,
        associations: &[Association],
    ) -> Result<Vec<ScanItem>>;
}

/// In-memory [`RecordStore`] over [`Status`] records.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<i64, Status>>,
    /// Ids whose associations fail to load.
    broken: RwLock<HashSet<i64>>,
    unavailable: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, status: Status) {
        self.records.write().insert(status.id, status);
    }

    /// Modify a stored record in place. Returns false if it does not exist.
    pub fn update(&self, id: i64, f: impl FnOnce(&mut Status)) -> bool {
        match self.records.write().get_mut(&id) {
            Some(status) => {
                f(status);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: i64) -> Option<Status> {
        self.records.write().remove(&id)
    }

    pub fn get(&self, id: i64) -> Option<Status> {
        self.records.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Make every load of `id` fail with a per-record store error.
    pub fn break_record(&self, id: i64) {
        self.broken.write().insert(id);
    }

    pub fn repair_record(&self, id: i64) {
        self.broken.write().remove(&id);
    }

    /// Fail whole requests until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write() = unavailable;
    }

    fn check_available(&self) -> Result<()> {
        if *self.unavailable.read() {
            return Err(IndexerError::store("primary store unavailable"));
        }
        Ok(())
    }

    fn load(&self, status: &Status, associations: &[Association]) -> Result<BoxedRecord> {
        if self.broken.read().contains(&status.id) {
            return Err(IndexerError::extraction(
                status.id,
                "failed to load associations",
            ));
        }
        Ok(Box::new(status.with_only(associations)))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch(&self, id: i64, associations: &[Association]) -> Result<Option<BoxedRecord>> {
        self.check_available()?;
        let records = self.records.read();
        records
            .get(&id)
            .map(|status| self.load(status, associations))
            .transpose()
    }

    async fn scan(
        &self,
        after: Option<i64>,
        limit: usize,
        associations: &[Association],
    ) -> Result<Vec<ScanItem>> {
        self.check_available()?;
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        let records = self.records.read();
        Ok(records
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(id, status)| ScanItem {
                id: *id,
                record: self.load(status, associations),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::REQUIRED_ASSOCIATIONS;
    use chrono::Utc;

    fn store_with(ids: &[i64]) -> MemoryStore {
        let store = MemoryStore::new();
        for id in ids {
            store.insert(Status::new(*id, 1, Utc::now()));
        }
        store
    }

    #[tokio::test]
    async fn test_scan_pages_in_id_order() {
        let store = store_with(&[5, 1, 3, 9, 7]);
        let first: Vec<i64> = store
            .scan(None, 2, REQUIRED_ASSOCIATIONS)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(first, vec![1, 3]);

        let rest: Vec<i64> = store
            .scan(Some(3), 10, REQUIRED_ASSOCIATIONS)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(rest, vec![5, 7, 9]);
    }

    #[tokio::test]
    async fn test_fetch_respects_associations() {
        let store = store_with(&[1]);
        let record = store.fetch(1, &[Association::Tags]).await.unwrap().unwrap();
        assert!(record.tags().is_ok());
        assert!(record.mentions().is_err());
        assert!(store.fetch(2, REQUIRED_ASSOCIATIONS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_broken_record_fails_alone() {
        let store = store_with(&[1, 2, 3]);
        store.break_record(2);
        let items = store.scan(None, 10, REQUIRED_ASSOCIATIONS).await.unwrap();
        let loaded: Vec<bool> = items.iter().map(|item| item.record.is_ok()).collect();
        assert_eq!(loaded, vec![true, false, true]);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = store_with(&[1]);
        store.set_unavailable(true);
        assert!(matches!(
            store.fetch(1, REQUIRED_ASSOCIATIONS).await,
            Err(IndexerError::Store(_))
        ));
    }
}
