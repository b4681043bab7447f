//! Question answering over one candidate through a throwaway index.

use std::sync::Arc;
use tracing::debug;

use cvmatch_core::config::Settings;
use cvmatch_core::data_processor::{ChunkingConfig, DataProcessor};
use cvmatch_core::types::{CompletionRequest, IndexQuery, IndexRecord, Meta};
use cvmatch_core::{CompletionProvider, Embedder, Result, VectorIndex};
use cvmatch_extract::{prompts, CompletionParams};
use cvmatch_text::Segmenter;
use cvmatch_vector::InMemoryIndex;

use crate::{fetch_by_id, Services};

/// Chunks retrieved as context for each question.
const CONTEXT_CHUNKS: usize = 2;
const CHUNK_NAMESPACE: &str = "chunks";

pub struct QuestionAnswerer {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    completion: Arc<dyn CompletionProvider>,
    segmenter: Segmenter,
    processor: DataProcessor,
    namespace: String,
    params: CompletionParams,
}

impl QuestionAnswerer {
    pub fn new(services: &Services, settings: &Settings) -> Self {
        Self {
            embedder: services.embedder.clone(),
            index: services.index.clone(),
            completion: services.completion.clone(),
            segmenter: Segmenter::from_settings(&settings.segmenter),
            processor: DataProcessor::with_chunking(ChunkingConfig::default()),
            namespace: settings.index.cv_namespace.clone(),
            params: CompletionParams { temperature: settings.completion.temperature, max_tokens: settings.completion.max_tokens },
        }
    }

    /// Answers `question` from the stored text of candidate `id`.
    /// Fails with `NotFound` when the candidate is not indexed.
    pub fn answer_question(&self, id: &str, question: &str) -> Result<String> {
        let text = fetch_by_id(self.index.as_ref(), &self.namespace, id)?;
        let chunks = self.chunks(&text);

        let scratch = InMemoryIndex::new();
        let mut records = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let mut metadata = Meta::new();
            metadata.insert("text".into(), chunk.clone().into());
            records.push(IndexRecord { id: format!("chunk-{i:04}"), dense: self.embedder.embed(chunk)?, sparse: None, metadata });
        }
        scratch.upsert(CHUNK_NAMESPACE, &records)?;

        let hits = scratch.query(
            CHUNK_NAMESPACE,
            &IndexQuery { dense: self.embedder.embed(question)?, sparse: None, top_k: CONTEXT_CHUNKS, include_metadata: true },
        )?;
        let excerpts: Vec<String> = hits
            .iter()
            .filter_map(|h| h.metadata.get("text").and_then(|v| v.as_str()).map(str::to_string))
            .collect();
        debug!(%id, chunks = chunks.len(), used = excerpts.len(), "answering question");

        self.completion.complete(&CompletionRequest {
            system: prompts::QA_SYSTEM.to_string(),
            prompt: prompts::qa_prompt(question, &excerpts),
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        })
    }

    /// Section-aware chunks: each section is windowed separately and
    /// prefixed with its name.
    fn chunks(&self, text: &str) -> Vec<String> {
        self.segmenter
            .segment(text)
            .iter()
            .flat_map(|(section, body)| {
                self.processor.chunk_text(body).into_iter().map(move |chunk| format!("{section}: {chunk}"))
            })
            .collect()
    }
}
