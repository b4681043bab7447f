//! Few-shot refinement of a job description before condition extraction.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use cvmatch_core::normalize::normalize_text;
use cvmatch_core::types::{CompletionRequest, FewShotExample, IndexQuery, IndexRecord, Meta};
use cvmatch_core::{CompletionProvider, Embedder, Result, VectorIndex};

use crate::cache::ExtractionCache;
use crate::{prompts, CompletionParams, Extraction};

const INSTRUCTIONS_ID: &str = "instructions";

/// Rewrites a free-text hiring request in the shape of stored examples,
/// retrieved from the examples namespace by dense similarity.
pub struct PromptRefiner {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    completion: Arc<dyn CompletionProvider>,
    namespace: String,
    top_k: usize,
    cache: ExtractionCache<String>,
    params: CompletionParams,
}

impl PromptRefiner {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        completion: Arc<dyn CompletionProvider>,
        namespace: impl Into<String>,
        top_k: usize,
        cache_capacity: usize,
        params: CompletionParams,
    ) -> Self {
        Self {
            embedder,
            index,
            completion,
            namespace: namespace.into(),
            top_k,
            cache: ExtractionCache::new(cache_capacity),
            params,
        }
    }

    /// Examples and instruction text closest to `description`.
    pub fn retrieve(&self, description: &str) -> Result<(Vec<FewShotExample>, String)> {
        let dense = self.embedder.embed(description)?;
        let matches = self.index.query(
            &self.namespace,
            &IndexQuery { dense, sparse: None, top_k: self.top_k, include_metadata: true },
        )?;
        let mut examples = Vec::new();
        let mut instructions = String::new();
        for m in matches {
            match m.metadata.get("type").and_then(Value::as_str) {
                Some("example") => examples.push(FewShotExample {
                    job_description: meta_str(&m.metadata, "job_description"),
                    mandatory_keywords: m
                        .metadata
                        .get("mandatory_keywords")
                        .and_then(Value::as_array)
                        .map(|list| list.iter().filter_map(Value::as_str).map(str::to_string).collect())
                        .unwrap_or_default(),
                }),
                Some("instruction") => instructions = meta_str(&m.metadata, "content"),
                _ => {}
            }
        }
        debug!(examples = examples.len(), has_instructions = !instructions.is_empty(), "retrieved few-shot context");
        Ok((examples, instructions))
    }

    /// Refined description, or the raw one when nothing relevant is stored.
    /// Any failure degrades to the raw description.
    pub fn refine(&self, description: &str) -> Extraction<String> {
        match self.try_refine(description) {
            Ok(refined) => Extraction::Parsed(refined),
            Err(cause) => {
                warn!(error = %cause, "prompt refinement failed; using raw description");
                Extraction::Degraded { record: description.to_string(), cause }
            }
        }
    }

    pub fn try_refine(&self, description: &str) -> Result<String> {
        let (examples, instructions) = self.retrieve(description)?;
        if examples.is_empty() && instructions.trim().is_empty() {
            return Ok(description.to_string());
        }
        let normalized = normalize_text(description);
        let key = cache_key(&normalized, &examples, &instructions);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let reply = self.completion.complete(&CompletionRequest {
            system: prompts::REFINE_SYSTEM.to_string(),
            prompt: prompts::refine_prompt(&normalized, &examples, &instructions),
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        })?;
        let refined = normalize_text(&reply);
        self.cache.insert(key, refined.clone());
        Ok(refined)
    }

    /// Stores the few-shot corpus: one record per example, keyed by position,
    /// plus one instruction record when `instructions` is non-blank.
    pub fn seed_examples(&self, examples: &[FewShotExample], instructions: &str) -> Result<usize> {
        let mut records = Vec::with_capacity(examples.len() + 1);
        for (i, example) in examples.iter().enumerate() {
            let mut metadata = Meta::new();
            metadata.insert("type".into(), "example".into());
            metadata.insert("job_description".into(), example.job_description.clone().into());
            metadata.insert("mandatory_keywords".into(), example.mandatory_keywords.clone().into());
            records.push(IndexRecord {
                id: format!("example_{}", i + 1),
                dense: self.embedder.embed(&example.job_description)?,
                sparse: None,
                metadata,
            });
        }
        if !instructions.trim().is_empty() {
            let mut metadata = Meta::new();
            metadata.insert("type".into(), "instruction".into());
            metadata.insert("content".into(), instructions.trim().into());
            records.push(IndexRecord {
                id: INSTRUCTIONS_ID.to_string(),
                dense: self.embedder.embed(instructions)?,
                sparse: None,
                metadata,
            });
        }
        self.index.upsert(&self.namespace, &records)?;
        info!(count = records.len(), namespace = %self.namespace, "seeded few-shot examples");
        Ok(records.len())
    }
}

fn meta_str(metadata: &Meta, key: &str) -> String {
    metadata.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

/// Input plus every example and the instructions, so a changed few-shot
/// corpus never serves a stale refinement.
fn cache_key(normalized: &str, examples: &[FewShotExample], instructions: &str) -> String {
    let mut key = String::from(normalized);
    for example in examples {
        key.push('\u{1f}');
        key.push_str(&example.job_description);
        key.push('\u{1e}');
        key.push_str(&example.mandatory_keywords.join("\u{1d}"));
    }
    key.push('\u{1f}');
    key.push_str(instructions);
    key
}
