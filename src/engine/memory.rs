//! In-process search engine.
//!
//! Behaves like a single Elasticsearch node for the requests the indexer
//! issues: mappings are enforced, the configured analyzers run at index
//! time, external versions are honoured (including after deletes), and
//! writes become searchable only after [`SearchEngine::refresh`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::{BulkItem, BulkOperation, SearchEngine, Version, WriteOutcome};
use crate::analysis::AnalyzerRegistry;
use crate::document::IndexDocument;
use crate::error::{IndexerError, Result};
use crate::schema::{DynamicSettings, FieldMapping, FieldType, IndexSchema, Mapping};

#[derive(Debug, Clone)]
struct StoredDocument {
    document: IndexDocument,
    /// Indexed terms per field path, sub-fields included.
    terms: BTreeMap<String, Vec<String>>,
}

#[derive(Debug)]
struct MemoryIndex {
    number_of_shards: u32,
    settings: DynamicSettings,
    mapping: Mapping,
    live: HashMap<i64, StoredDocument>,
    /// Last accepted version per id; survives deletes.
    versions: HashMap<i64, Version>,
    /// Snapshot taken at the last refresh.
    searchable: HashMap<i64, StoredDocument>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_next: usize,
    unavailable: bool,
}

/// In-memory [`SearchEngine`].
#[derive(Debug)]
pub struct MemoryEngine {
    analyzers: Arc<AnalyzerRegistry>,
    indices: RwLock<HashMap<String, MemoryIndex>>,
    faults: Mutex<Faults>,
    requests: AtomicU64,
}

impl MemoryEngine {
    pub fn new(analyzers: Arc<AnalyzerRegistry>) -> Self {
        MemoryEngine {
            analyzers,
            indices: RwLock::new(HashMap::new()),
            faults: Mutex::new(Faults::default()),
            requests: AtomicU64::new(0),
        }
    }

    /// An engine with the standard analyzers.
    pub fn standard() -> Result<Self> {
        Ok(Self::new(Arc::new(AnalyzerRegistry::standard()?)))
    }

    /// Fail the next `count` requests with [`IndexerError::EngineUnavailable`].
    pub fn fail_next(&self, count: usize) {
        self.faults.lock().fail_next = count;
    }

    /// Fail every request until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.lock().unavailable = unavailable;
    }

    /// Number of requests received, failed ones included.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Realtime get of the latest accepted document.
    pub fn get_document(&self, index: &str, id: i64) -> Option<IndexDocument> {
        let indices = self.indices.read();
        indices
            .get(index)?
            .live
            .get(&id)
            .map(|stored| stored.document.clone())
    }

    /// Last accepted version of `id`, deleted documents included.
    pub fn version_of(&self, index: &str, id: i64) -> Option<Version> {
        self.indices.read().get(index)?.versions.get(&id).copied()
    }

    /// Terms indexed for `id` under `field` (e.g. `text.stemmed`).
    pub fn indexed_terms(&self, index: &str, id: i64, field: &str) -> Option<Vec<String>> {
        let indices = self.indices.read();
        indices.get(index)?.live.get(&id)?.terms.get(field).cloned()
    }

    /// Number of searchable documents.
    pub fn count(&self, index: &str) -> usize {
        self.indices
            .read()
            .get(index)
            .map(|idx| idx.searchable.len())
            .unwrap_or(0)
    }

    pub fn settings(&self, index: &str) -> Option<DynamicSettings> {
        self.indices.read().get(index).map(|idx| idx.settings.clone())
    }

    pub fn number_of_shards(&self, index: &str) -> Option<u32> {
        self.indices.read().get(index).map(|idx| idx.number_of_shards)
    }

    /// Ids of searchable documents containing every term of `query`,
    /// analyzed the way `field` is indexed. Sorted ascending.
    pub fn search(&self, index: &str, field: &str, query: &str) -> Result<Vec<i64>> {
        let indices = self.indices.read();
        let idx = indices
            .get(index)
            .ok_or_else(|| IndexerError::engine(format!("no such index [{index}]")))?;
        let mapping = idx
            .mapping
            .field(field)
            .ok_or_else(|| IndexerError::invalid_argument(format!("no such field [{field}]")))?;

        let wanted = self.query_terms(mapping, query)?;
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<i64> = idx
            .searchable
            .values()
            .filter(|stored| {
                stored
                    .terms
                    .get(field)
                    .is_some_and(|terms| wanted.iter().all(|w| terms.contains(w)))
            })
            .map(|stored| stored.document.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Searchable documents visible to `account_id`.
    pub fn visible_to(&self, index: &str, account_id: i64) -> Vec<i64> {
        let indices = self.indices.read();
        let Some(idx) = indices.get(index) else {
            return Vec::new();
        };
        let mut ids: Vec<i64> = idx
            .searchable
            .values()
            .filter(|stored| stored.document.searchable_by.contains(&account_id))
            .map(|stored| stored.document.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    fn check_available(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock();
        if faults.unavailable {
            return Err(IndexerError::engine_unavailable("connection refused"));
        }
        if faults.fail_next > 0 {
            faults.fail_next -= 1;
            return Err(IndexerError::engine_unavailable("injected failure"));
        }
        Ok(())
    }

    fn check_analyzers(&self, mapping: &Mapping) -> Result<()> {
        for (path, field) in mapping.flatten() {
            if let Some(analyzer) = &field.analyzer
                && !self.analyzers.contains(analyzer)
            {
                return Err(IndexerError::engine(format!(
                    "analyzer [{analyzer}] has not been configured in mappings (field [{path}])"
                )));
            }
        }
        Ok(())
    }

    fn query_terms(&self, mapping: &FieldMapping, query: &str) -> Result<Vec<String>> {
        match (&mapping.field_type, &mapping.analyzer) {
            (FieldType::Text, Some(analyzer)) => self.analyzers.terms(analyzer, query),
            _ => Ok(vec![query.to_string()]),
        }
    }

    /// Check `body` against `mapping` and compute the indexed terms.
    fn index_terms(&self, mapping: &Mapping, body: &Value) -> Result<BTreeMap<String, Vec<String>>> {
        let object = body
            .as_object()
            .ok_or_else(|| IndexerError::engine("mapper_parsing_exception: document is not an object"))?;

        let mut terms = BTreeMap::new();
        for (name, value) in object {
            let field = mapping.properties.get(name).ok_or_else(|| {
                IndexerError::engine(format!(
                    "strict_dynamic_mapping_exception: field [{name}] is not mapped"
                ))
            })?;
            self.field_terms(name, field, value, &mut terms)?;
        }
        Ok(terms)
    }

    fn field_terms(
        &self,
        path: &str,
        field: &FieldMapping,
        value: &Value,
        out: &mut BTreeMap<String, Vec<String>>,
    ) -> Result<()> {
        let values: Vec<&Value> = match value {
            Value::Null => return Ok(()),
            Value::Array(items) => items.iter().filter(|v| !v.is_null()).collect(),
            other => vec![other],
        };

        let mut terms = Vec::new();
        for value in &values {
            terms.extend(self.value_terms(path, field, value)?);
        }
        out.insert(path.to_string(), terms);

        for (name, sub) in &field.fields {
            let sub_path = format!("{path}.{name}");
            let mut sub_terms = Vec::new();
            for value in &values {
                sub_terms.extend(self.value_terms(&sub_path, sub, value)?);
            }
            out.insert(sub_path, sub_terms);
        }
        Ok(())
    }

    fn value_terms(&self, path: &str, field: &FieldMapping, value: &Value) -> Result<Vec<String>> {
        let mismatch = || {
            IndexerError::engine(format!(
                "mapper_parsing_exception: failed to parse field [{path}] of type [{}]",
                field.field_type.as_str()
            ))
        };

        match field.field_type {
            FieldType::Long => value.as_i64().map(|n| vec![n.to_string()]).ok_or_else(mismatch),
            FieldType::Keyword => value
                .as_str()
                .map(|s| vec![s.to_string()])
                .ok_or_else(mismatch),
            FieldType::Date => {
                let text = value.as_str().ok_or_else(mismatch)?;
                let parsed = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%SZ")
                    .map(|dt| dt.and_utc())
                    .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.to_utc()));
                parsed.map_err(|_| mismatch())?;
                Ok(vec![text.to_string()])
            }
            FieldType::Text => {
                let text = value.as_str().ok_or_else(mismatch)?;
                match &field.analyzer {
                    Some(analyzer) => self.analyzers.terms(analyzer, text),
                    None => Ok(text.split_whitespace().map(str::to_lowercase).collect()),
                }
            }
        }
    }

    fn write(&self, index: &str, document: &IndexDocument, version: Version) -> Result<WriteOutcome> {
        let mapping = self
            .indices
            .read()
            .get(index)
            .map(|idx| idx.mapping.clone())
            .ok_or_else(|| IndexerError::engine(format!("no such index [{index}]")))?;
        let terms = self.index_terms(&mapping, &document.to_json())?;

        let mut indices = self.indices.write();
        let idx = indices
            .get_mut(index)
            .ok_or_else(|| IndexerError::engine(format!("no such index [{index}]")))?;

        if idx.versions.get(&document.id).is_some_and(|v| *v >= version) {
            trace!("discarding stale write of {} at version {version}", document.id);
            return Ok(WriteOutcome::Stale);
        }

        idx.versions.insert(document.id, version);
        let previous = idx.live.insert(
            document.id,
            StoredDocument {
                document: document.clone(),
                terms,
            },
        );
        Ok(if previous.is_some() {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Created
        })
    }

    fn remove(&self, index: &str, id: i64, version: Version) -> Result<WriteOutcome> {
        let mut indices = self.indices.write();
        let idx = indices
            .get_mut(index)
            .ok_or_else(|| IndexerError::engine(format!("no such index [{index}]")))?;

        if idx.versions.get(&id).is_some_and(|v| *v >= version) {
            trace!("discarding stale delete of {id} at version {version}");
            return Ok(WriteOutcome::Stale);
        }

        idx.versions.insert(id, version);
        Ok(match idx.live.remove(&id) {
            Some(_) => WriteOutcome::Deleted,
            None => WriteOutcome::NotFound,
        })
    }
}

#[async_trait]
impl SearchEngine for MemoryEngine {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self.indices.read().contains_key(index))
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        self.check_available()?;
        self.check_analyzers(&schema.mapping)?;

        let mut indices = self.indices.write();
        if indices.contains_key(index) {
            return Err(IndexerError::engine(format!(
                "resource_already_exists_exception: index [{index}] already exists"
            )));
        }
        indices.insert(
            index.to_string(),
            MemoryIndex {
                number_of_shards: schema.number_of_shards,
                settings: schema.dynamic.clone(),
                mapping: schema.mapping.clone(),
                live: HashMap::new(),
                versions: HashMap::new(),
                searchable: HashMap::new(),
            },
        );
        debug!("created index {index}");
        Ok(())
    }

    async fn get_mapping(&self, index: &str) -> Result<Mapping> {
        self.check_available()?;
        self.indices
            .read()
            .get(index)
            .map(|idx| idx.mapping.clone())
            .ok_or_else(|| IndexerError::engine(format!("no such index [{index}]")))
    }

    async fn put_mapping(&self, index: &str, mapping: &Mapping) -> Result<()> {
        self.check_available()?;
        self.check_analyzers(mapping)?;

        let mut indices = self.indices.write();
        let idx = indices
            .get_mut(index)
            .ok_or_else(|| IndexerError::engine(format!("no such index [{index}]")))?;
        idx.mapping.merge(mapping)
    }

    async fn put_settings(&self, index: &str, settings: &DynamicSettings) -> Result<()> {
        self.check_available()?;
        let mut indices = self.indices.write();
        let idx = indices
            .get_mut(index)
            .ok_or_else(|| IndexerError::engine(format!("no such index [{index}]")))?;
        idx.settings = settings.clone();
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        document: &IndexDocument,
        version: Version,
    ) -> Result<WriteOutcome> {
        self.check_available()?;
        self.write(index, document, version)
    }

    async fn delete_document(
        &self,
        index: &str,
        id: i64,
        version: Version,
    ) -> Result<WriteOutcome> {
        self.check_available()?;
        self.remove(index, id, version)
    }

    async fn bulk(&self, index: &str, operations: Vec<BulkOperation>) -> Result<Vec<BulkItem>> {
        self.check_available()?;
        if !self.indices.read().contains_key(index) {
            return Err(IndexerError::engine(format!("no such index [{index}]")));
        }

        Ok(operations
            .into_iter()
            .map(|op| {
                let id = op.id();
                let result = match op {
                    BulkOperation::Index { document, version } => {
                        self.write(index, &document, version)
                    }
                    BulkOperation::Delete { id, version } => self.remove(index, id, version),
                };
                BulkItem { id, result }
            })
            .collect())
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        self.check_available()?;
        let mut indices = self.indices.write();
        let idx = indices
            .get_mut(index)
            .ok_or_else(|| IndexerError::engine(format!("no such index [{index}]")))?;
        idx.searchable = idx.live.clone();
        trace!("refreshed {index}: {} documents", idx.searchable.len());
        Ok(())
    }
}
