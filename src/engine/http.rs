//! Elasticsearch / OpenSearch REST client.

use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{BulkItem, BulkOperation, SearchEngine, Version, WriteOutcome};
use crate::document::IndexDocument;
use crate::error::{IndexerError, Result};
use crate::schema::{DynamicSettings, IndexSchema, Mapping};

lazy_static! {
    static ref MAPPER_CONFLICT: Regex = Regex::new(
        r"mapper \[([^\]]+)\] cannot be changed from type \[([^\]]+)\] to \[([^\]]+)\]"
    )
    .unwrap();
}

/// Connection settings for [`HttpEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpEngineConfig {
    /// Base URL, e.g. `http://localhost:9200`.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub timeout_ms: u64,
}

impl Default for HttpEngineConfig {
    fn default() -> Self {
        HttpEngineConfig {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            timeout_ms: 5_000,
        }
    }
}

impl HttpEngineConfig {
    /// Read `ES_HOST`, `ES_PORT`, `ES_USER` and `ES_PASS`.
    pub fn from_env() -> Self {
        let host = std::env::var("ES_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = std::env::var("ES_PORT").unwrap_or_else(|_| "9200".to_string());
        let url = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}:{port}")
        } else {
            format!("http://{host}:{port}")
        };
        HttpEngineConfig {
            url,
            username: std::env::var("ES_USER").ok(),
            password: std::env::var("ES_PASS").ok(),
            ..Default::default()
        }
    }
}

/// [`SearchEngine`] over the Elasticsearch REST API.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: Client,
    config: HttpEngineConfig,
}

impl HttpEngine {
    pub fn new(config: HttpEngineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| IndexerError::invalid_config(format!("failed to build HTTP client: {e}")))?;
        Ok(HttpEngine { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| IndexerError::engine_unavailable(e.to_string()))
    }

    async fn body(response: Response) -> Result<Value> {
        let text = response
            .text()
            .await
            .map_err(|e| IndexerError::engine_unavailable(e.to_string()))?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Turn a non-success response into an error.
    async fn failure(response: Response) -> IndexerError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        classify(status, &text)
    }
}

/// Map an HTTP failure to the error taxonomy.
fn classify(status: StatusCode, body: &str) -> IndexerError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return IndexerError::engine_unavailable(format!("{status}: {body}"));
    }
    if let Some(caps) = MAPPER_CONFLICT.captures(body) {
        return IndexerError::schema_conflict(&caps[1], &caps[2], &caps[3]);
    }
    IndexerError::engine(format!("{status}: {body}"))
}

fn versioned(path: String, version: Version) -> String {
    format!("{path}?version={version}&version_type=external")
}

/// Outcome of one bulk item, `{"index": {"status": 201, "result": "created", ...}}`.
fn bulk_item_outcome(item: &Value) -> Result<WriteOutcome> {
    let (_, body) = item
        .as_object()
        .and_then(|o| o.iter().next())
        .ok_or_else(|| IndexerError::engine("malformed bulk response item"))?;
    let status = body.get("status").and_then(Value::as_u64).unwrap_or(0) as u16;

    match status {
        409 => Ok(WriteOutcome::Stale),
        404 => Ok(WriteOutcome::NotFound),
        200..=299 => match body.get("result").and_then(Value::as_str) {
            Some("created") => Ok(WriteOutcome::Created),
            Some("updated") => Ok(WriteOutcome::Updated),
            Some("deleted") => Ok(WriteOutcome::Deleted),
            Some("not_found") => Ok(WriteOutcome::NotFound),
            other => Err(IndexerError::engine(format!("unexpected bulk result {other:?}"))),
        },
        _ => {
            let reason = body.get("error").map(Value::to_string).unwrap_or_default();
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Err(classify(status, &reason))
        }
    }
}

#[async_trait]
impl SearchEngine for HttpEngine {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        let response = self.send(self.client.head(self.url(index))).await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::failure(response).await),
        }
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<()> {
        let request = self.client.put(self.url(index)).json(&schema.to_json());
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        debug!("created index {index}");
        Ok(())
    }

    async fn get_mapping(&self, index: &str) -> Result<Mapping> {
        let response = self
            .send(self.client.get(self.url(&format!("{index}/_mapping"))))
            .await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        let body = Self::body(response).await?;
        // Keyed by the concrete index name, which differs from `index` for aliases.
        let mappings = body
            .as_object()
            .and_then(|o| o.values().next())
            .and_then(|v| v.get("mappings"))
            .ok_or_else(|| IndexerError::engine("malformed mapping response"))?;
        Mapping::from_json(mappings)
    }

    async fn put_mapping(&self, index: &str, mapping: &Mapping) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("{index}/_mapping")))
            .json(&mapping.to_json());
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        Ok(())
    }

    async fn put_settings(&self, index: &str, settings: &DynamicSettings) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("{index}/_settings")))
            .json(&settings.to_json());
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        document: &IndexDocument,
        version: Version,
    ) -> Result<WriteOutcome> {
        let request = self
            .client
            .put(self.url(&versioned(format!("{index}/_doc/{}", document.id), version)))
            .json(&document.to_json());
        let response = self.send(request).await?;
        match response.status() {
            StatusCode::CREATED => Ok(WriteOutcome::Created),
            StatusCode::OK => Ok(WriteOutcome::Updated),
            StatusCode::CONFLICT => Ok(WriteOutcome::Stale),
            _ => Err(Self::failure(response).await),
        }
    }

    async fn delete_document(
        &self,
        index: &str,
        id: i64,
        version: Version,
    ) -> Result<WriteOutcome> {
        let request = self
            .client
            .delete(self.url(&versioned(format!("{index}/_doc/{id}"), version)));
        let response = self.send(request).await?;
        match response.status() {
            StatusCode::OK => Ok(WriteOutcome::Deleted),
            StatusCode::CONFLICT => Ok(WriteOutcome::Stale),
            StatusCode::NOT_FOUND => {
                let body = Self::body(response).await.unwrap_or(Value::Null);
                if body.get("result").and_then(Value::as_str) == Some("not_found") {
                    Ok(WriteOutcome::NotFound)
                } else {
                    Err(IndexerError::engine(format!("no such index [{index}]")))
                }
            }
            _ => Err(Self::failure(response).await),
        }
    }

    async fn bulk(&self, index: &str, operations: Vec<BulkOperation>) -> Result<Vec<BulkItem>> {
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(operations.len());
        let mut payload = String::new();
        for op in &operations {
            ids.push(op.id());
            let (action, source) = match op {
                BulkOperation::Index { document, version } => (
                    json!({ "index": {
                        "_index": index,
                        "_id": document.id.to_string(),
                        "version": version,
                        "version_type": "external",
                    }}),
                    Some(document.to_json()),
                ),
                BulkOperation::Delete { id, version } => (
                    json!({ "delete": {
                        "_index": index,
                        "_id": id.to_string(),
                        "version": version,
                        "version_type": "external",
                    }}),
                    None,
                ),
            };
            payload.push_str(&action.to_string());
            payload.push('\n');
            if let Some(source) = source {
                payload.push_str(&source.to_string());
                payload.push('\n');
            }
        }

        let request = self
            .client
            .post(self.url("_bulk"))
            .header("content-type", "application/x-ndjson")
            .body(payload);
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let body = Self::body(response).await?;
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| IndexerError::engine("malformed bulk response"))?;
        if items.len() != ids.len() {
            warn!(
                "bulk response has {} items for {} operations",
                items.len(),
                ids.len()
            );
            return Err(IndexerError::engine("bulk response item count mismatch"));
        }

        Ok(ids
            .into_iter()
            .zip(items)
            .map(|(id, item)| BulkItem {
                id,
                result: bulk_item_outcome(item),
            })
            .collect())
    }

    async fn refresh(&self, index: &str) -> Result<()> {
        let response = self
            .send(self.client.post(self.url(&format!("{index}/_refresh"))))
            .await?;
        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert!(classify(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
        assert!(classify(StatusCode::TOO_MANY_REQUESTS, "").is_retryable());
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, "parse error"),
            IndexerError::Engine(_)
        ));

        let body = r#"{"error":{"type":"illegal_argument_exception","reason":"mapper [tags] cannot be changed from type [keyword] to [text]"}}"#;
        match classify(StatusCode::BAD_REQUEST, body) {
            IndexerError::SchemaConflict {
                field,
                existing,
                requested,
            } => {
                assert_eq!(field, "tags");
                assert_eq!(existing, "keyword");
                assert_eq!(requested, "text");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bulk_item_outcome() {
        let created = json!({"index": {"status": 201, "result": "created"}});
        let stale = json!({"index": {"status": 409, "error": {"type": "version_conflict_engine_exception"}}});
        let missing = json!({"delete": {"status": 404, "result": "not_found"}});
        let overloaded = json!({"index": {"status": 429, "error": {"type": "es_rejected_execution_exception"}}});

        assert_eq!(bulk_item_outcome(&created).unwrap(), WriteOutcome::Created);
        assert_eq!(bulk_item_outcome(&stale).unwrap(), WriteOutcome::Stale);
        assert_eq!(bulk_item_outcome(&missing).unwrap(), WriteOutcome::NotFound);
        assert!(bulk_item_outcome(&overloaded).unwrap_err().is_retryable());
    }

    #[test]
    fn test_config_from_host() {
        let engine = HttpEngine::new(HttpEngineConfig {
            url: "http://es:9200/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(engine.url("statuses/_doc/1"), "http://es:9200/statuses/_doc/1");
    }
}
