//! OpenAI-compatible embedding client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cvmatch_core::config::{EmbeddingSettings, RetrySettings};
use cvmatch_core::resilience::{call_with_retry, Attempt, CircuitBreaker, RetryPolicy};
use cvmatch_core::{Embedder, Error, Result};

/// Blocking embeddings client with bounded retries and a circuit breaker.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dim: usize,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        dim: usize,
        timeout: Duration,
        policy: RetryPolicy,
        breaker: CircuitBreaker,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing OpenAI API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&auth).context("invalid OpenAI API key")?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build embedding HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dim,
            policy,
            breaker: Arc::new(breaker),
        })
    }

    /// API key from settings, falling back to `OPENAI_API_KEY`.
    pub fn from_settings(settings: &EmbeddingSettings, retry: &RetrySettings) -> anyhow::Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();
        Self::new(
            &api_key,
            &settings.base_url,
            &settings.model,
            settings.dimensions,
            Duration::from_secs(settings.timeout_secs),
            retry.policy(),
            retry.breaker(),
        )
    }

    fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        if inputs.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::EmbeddingUnavailable("cannot embed empty text".into()));
        }
        let body = EmbeddingRequest { model: &self.model, input: inputs };
        let mut parsed: EmbeddingResponse = call_with_retry("embeddings", &self.policy, &self.breaker, || {
            match self.client.post(&self.endpoint).json(&body).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return match resp.json::<EmbeddingResponse>() {
                            Ok(parsed) => Attempt::Done(parsed),
                            Err(e) => Attempt::Fatal(format!("invalid embedding response: {e}")),
                        };
                    }
                    let text = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
                    let reason = format!("{status}: {text}");
                    if should_retry(status) { Attempt::Retryable(reason) } else { Attempt::Fatal(reason) }
                }
                Err(err) if is_retryable_error(&err) => Attempt::Retryable(err.to_string()),
                Err(err) => Attempt::Fatal(err.to_string()),
            }
        })
        .map_err(Error::EmbeddingUnavailable)?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != inputs.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "service returned {} embeddings for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }
        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|entry| entry.embedding).collect();
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(Error::EmbeddingUnavailable(format!("expected {} dimensions, got {}", self.dim, bad.len())));
        }
        debug!(count = vectors.len(), "embedded batch");
        Ok(vectors)
    }
}

impl Embedder for OpenAiEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text])?
            .pop()
            .ok_or_else(|| Error::EmbeddingUnavailable("empty embedding response".into()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        self.request(&inputs)
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request()
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    #[serde(borrow)]
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
