//! OpenAI-compatible chat-completions client.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use cvmatch_core::config::{CompletionSettings, RetrySettings};
use cvmatch_core::resilience::{call_with_retry, Attempt, CircuitBreaker, RetryPolicy};
use cvmatch_core::types::CompletionRequest;
use cvmatch_core::{CompletionProvider, Error, Result};

pub struct OpenAiCompletion {
    client: Client,
    endpoint: String,
    model: String,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
}

impl OpenAiCompletion {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        timeout: Duration,
        policy: RetryPolicy,
        breaker: CircuitBreaker,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing OpenAI API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing completion model name");
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&auth).context("invalid OpenAI API key")?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build completion HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_string(),
            policy,
            breaker: Arc::new(breaker),
        })
    }

    /// API key from settings, falling back to `OPENAI_API_KEY`.
    pub fn from_settings(settings: &CompletionSettings, retry: &RetrySettings) -> anyhow::Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_default();
        Self::new(
            &api_key,
            &settings.base_url,
            &settings.model,
            Duration::from_secs(settings.timeout_secs),
            retry.policy(),
            retry.breaker(),
        )
    }
}

impl CompletionProvider for OpenAiCompletion {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            top_p: 1.0,
            max_tokens: request.max_tokens,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
        };
        let parsed: ChatResponse = call_with_retry("chat completion", &self.policy, &self.breaker, || {
            match self.client.post(&self.endpoint).json(&body).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return match resp.json::<ChatResponse>() {
                            Ok(parsed) => Attempt::Done(parsed),
                            Err(e) => Attempt::Fatal(format!("invalid completion response: {e}")),
                        };
                    }
                    let text = resp.text().unwrap_or_else(|_| "<body unavailable>".to_string());
                    let reason = format!("{status}: {text}");
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        Attempt::Retryable(reason)
                    } else {
                        Attempt::Fatal(reason)
                    }
                }
                Err(err) if err.is_timeout() || err.is_connect() || err.is_request() => Attempt::Retryable(err.to_string()),
                Err(err) => Attempt::Fatal(err.to_string()),
            }
        })
        .map_err(Error::CompletionUnavailable)?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::CompletionUnavailable("response had no choices".into()))?;
        debug!(chars = answer.len(), "completion received");
        Ok(answer)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    top_p: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}
