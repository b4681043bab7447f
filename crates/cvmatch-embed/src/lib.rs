//! cvmatch-embed
//!
//! Dense embedders: an OpenAI-compatible HTTP client for real runs and a
//! deterministic hashing embedder for tests and offline development.

mod fake;
mod openai;

use std::sync::Arc;
use tracing::info;

use cvmatch_core::config::{EmbeddingProvider, EmbeddingSettings, RetrySettings};
use cvmatch_core::Embedder;

pub use fake::FakeEmbedder;
pub use openai::OpenAiEmbedder;

/// Builds the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// hashing embedder regardless of the configured provider.
pub fn get_default_embedder(settings: &EmbeddingSettings, retry: &RetrySettings) -> anyhow::Result<Arc<dyn Embedder>> {
    let force_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if force_fake || settings.provider == EmbeddingProvider::Fake {
        info!(dim = settings.dimensions, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.dimensions)));
    }
    info!(model = %settings.model, "using OpenAI-compatible embedder");
    Ok(Arc::new(OpenAiEmbedder::from_settings(settings, retry)?))
}
