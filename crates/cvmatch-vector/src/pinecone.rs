//! Pinecone data-plane client (upsert, hybrid query, fetch).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cvmatch_core::config::{IndexSettings, RetrySettings};
use cvmatch_core::resilience::{call_with_retry, Attempt, CircuitBreaker, RetryPolicy};
use cvmatch_core::types::{IndexMatch, IndexQuery, IndexRecord, Meta, SparseVector};
use cvmatch_core::{Error, Result, VectorIndex};

/// Vectors per upsert request.
const UPSERT_BATCH: usize = 100;

#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    host: String,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl PineconeIndex {
    /// `host` is the index data-plane URL, e.g. `https://cvs-abc123.svc.pinecone.io`.
    pub fn new(api_key: &str, host: &str, timeout: Duration, policy: RetryPolicy, breaker: CircuitBreaker) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing Pinecone API key");
        anyhow::ensure!(
            host.starts_with("http://") || host.starts_with("https://"),
            "Pinecone host must be an http(s) URL"
        );
        let mut headers = HeaderMap::new();
        headers.insert("api-key", HeaderValue::from_str(api_key.trim()).context("invalid Pinecone API key")?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Pinecone HTTP client")?;
        Ok(Self { client, host: host.trim_end_matches('/').to_string(), policy, breaker: Arc::new(breaker) })
    }

    /// API key from settings, falling back to `PINECONE_API_KEY`.
    pub fn from_settings(settings: &IndexSettings, retry: &RetrySettings) -> anyhow::Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| std::env::var("PINECONE_API_KEY").ok())
            .unwrap_or_default();
        Self::new(&api_key, &settings.host, Duration::from_secs(settings.timeout_secs), retry.policy(), retry.breaker())
    }

    fn send<T, F>(&self, operation: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        call_with_retry(operation, &self.policy, &self.breaker, || match build().send() {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return match resp.json::<T>() {
                        Ok(parsed) => Attempt::Done(parsed),
                        Err(e) => Attempt::Fatal(format!("invalid response: {e}")),
                    };
                }
                let text = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
                let reason = format!("{status}: {text}");
                if should_retry(status) { Attempt::Retryable(reason) } else { Attempt::Fatal(reason) }
            }
            Err(err) if err.is_timeout() || err.is_connect() || err.is_request() => Attempt::Retryable(err.to_string()),
            Err(err) => Attempt::Fatal(err.to_string()),
        })
        .map_err(Error::IndexUnavailable)
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

impl VectorIndex for PineconeIndex {
    fn upsert(&self, namespace: &str, records: &[IndexRecord]) -> Result<()> {
        let url = format!("{}/vectors/upsert", self.host);
        for batch in records.chunks(UPSERT_BATCH) {
            let body = UpsertRequest { vectors: batch.iter().map(WireVectorRef::from).collect(), namespace };
            let resp: UpsertResponse = self.send("pinecone upsert", || self.client.post(&url).json(&body))?;
            debug!(namespace, upserted = resp.upserted_count, "upserted batch");
        }
        Ok(())
    }

    fn query(&self, namespace: &str, query: &IndexQuery) -> Result<Vec<IndexMatch>> {
        let url = format!("{}/query", self.host);
        let body = QueryRequest {
            namespace,
            top_k: query.top_k,
            vector: &query.dense,
            sparse_vector: query.sparse.as_ref().filter(|s| !s.is_empty()).map(WireSparse::from),
            include_metadata: query.include_metadata,
            include_values: false,
        };
        let resp: QueryResponse = self.send("pinecone query", || self.client.post(&url).json(&body))?;
        Ok(resp
            .matches
            .into_iter()
            .map(|m| IndexMatch { id: m.id, score: m.score, metadata: m.metadata.unwrap_or_default() })
            .collect())
    }

    fn fetch(&self, namespace: &str, ids: &[String]) -> Result<Vec<IndexRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/vectors/fetch", self.host);
        let mut params: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        params.push(("namespace", namespace));
        let mut resp: FetchResponse = self.send("pinecone fetch", || self.client.get(&url).query(&params))?;
        // Response is a map; keep the caller's id order.
        Ok(ids
            .iter()
            .filter_map(|id| resp.vectors.remove(id))
            .map(|v| IndexRecord {
                id: v.id,
                dense: v.values,
                sparse: v.sparse_values,
                metadata: v.metadata.unwrap_or_default(),
            })
            .collect())
    }
}

#[derive(Serialize)]
struct WireSparse<'a> {
    indices: &'a [u32],
    values: &'a [f32],
}

impl<'a> From<&'a SparseVector> for WireSparse<'a> {
    fn from(sparse: &'a SparseVector) -> Self {
        Self { indices: sparse.indices(), values: sparse.values() }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireVectorRef<'a> {
    id: &'a str,
    values: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    sparse_values: Option<WireSparse<'a>>,
    metadata: &'a Meta,
}

impl<'a> From<&'a IndexRecord> for WireVectorRef<'a> {
    fn from(record: &'a IndexRecord) -> Self {
        Self {
            id: &record.id,
            values: &record.dense,
            sparse_values: record.sparse.as_ref().filter(|s| !s.is_empty()).map(WireSparse::from),
            metadata: &record.metadata,
        }
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVectorRef<'a>>,
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    top_k: usize,
    vector: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    sparse_vector: Option<WireSparse<'a>>,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    metadata: Option<Meta>,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, WireVector>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVector {
    id: String,
    #[serde(default)]
    values: Vec<f32>,
    sparse_values: Option<SparseVector>,
    metadata: Option<Meta>,
}
