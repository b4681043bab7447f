//! cvmatch-hybrid
//!
//! The matching pipeline: hybrid query weighting, validation, ranking,
//! ingestion, lookup by id and single-candidate question answering.

pub mod combine;
pub mod ingest;
pub mod qa;
pub mod ranker;
pub mod validate;

use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

use cvmatch_core::config::{RetrySettings, Settings, SparseSettings};
use cvmatch_core::{CompletionProvider, Embedder, Error, Result, VectorIndex};
use cvmatch_text::CorpusStats;

pub use combine::hybrid_combine;
pub use ingest::{IngestOutcome, Ingestor};
pub use qa::QuestionAnswerer;
pub use ranker::{RankReport, Ranker};
pub use validate::{validate_cv, ValidationPolicy};

/// Corpus statistics shared between ingestion and query encoding.
pub type SharedStats = Arc<RwLock<CorpusStats>>;

/// The three external services every pipeline stage talks to.
#[derive(Clone)]
pub struct Services {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
    pub completion: Arc<dyn CompletionProvider>,
}

impl Services {
    /// Clients for the configured providers.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let retry: &RetrySettings = &settings.retry;
        Ok(Self {
            embedder: cvmatch_embed::get_default_embedder(&settings.embedding, retry)?,
            index: cvmatch_vector::open_index(&settings.index, retry)?,
            completion: Arc::new(cvmatch_extract::OpenAiCompletion::from_settings(&settings.completion, retry)?),
        })
    }
}

/// Stats from `sparse.stats_path` when set and present, otherwise empty.
pub fn load_corpus_stats(settings: &SparseSettings) -> anyhow::Result<SharedStats> {
    let stats = match &settings.stats_path {
        Some(path) => CorpusStats::load(&cvmatch_core::config::expand_path(path))?,
        None => CorpusStats::new(),
    };
    Ok(Arc::new(RwLock::new(stats)))
}

/// Stored full text of one candidate.
pub fn fetch_by_id(index: &dyn VectorIndex, namespace: &str, id: &str) -> Result<String> {
    let records = index.fetch(namespace, &[id.to_string()])?;
    records
        .into_iter()
        .find(|r| r.id == id)
        .and_then(|r| r.metadata.get("text").and_then(Value::as_str).map(str::to_string))
        .ok_or_else(|| Error::NotFound(format!("candidate {id}")))
}
