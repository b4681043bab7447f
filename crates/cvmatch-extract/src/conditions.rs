use std::sync::Arc;
use tracing::{debug, warn};

use cvmatch_core::normalize::normalize_text;
use cvmatch_core::types::{CompletionRequest, MandatoryConditions};
use cvmatch_core::{CompletionProvider, Error, Result};

use crate::cache::ExtractionCache;
use crate::parse::{parse_object, RawConditions};
use crate::{prompts, CompletionParams, Extraction};

/// Pulls must-have requirements out of a job description.
///
/// Successful extractions are cached by normalized text; failures are not,
/// so a later call retries the service.
pub struct ConditionExtractor {
    completion: Arc<dyn CompletionProvider>,
    cache: ExtractionCache<MandatoryConditions>,
    params: CompletionParams,
}

impl ConditionExtractor {
    pub fn new(completion: Arc<dyn CompletionProvider>, cache_capacity: usize, params: CompletionParams) -> Self {
        Self { completion, cache: ExtractionCache::new(cache_capacity), params }
    }

    /// Never fails: service or parse errors yield a degraded empty record.
    pub fn extract(&self, job_description: &str) -> Extraction<MandatoryConditions> {
        match self.try_extract(job_description) {
            Ok(conditions) => Extraction::Parsed(conditions),
            Err(cause) => {
                warn!(error = %cause, "condition extraction degraded to empty conditions");
                Extraction::Degraded { record: MandatoryConditions::default(), cause }
            }
        }
    }

    /// Conditions plus the flattened keyword list used for the lexical query.
    pub fn extract_with_keywords(&self, job_description: &str) -> (Extraction<MandatoryConditions>, Vec<String>) {
        let extraction = self.extract(job_description);
        let keywords = extraction.record().keywords();
        (extraction, keywords)
    }

    pub fn try_extract(&self, job_description: &str) -> Result<MandatoryConditions> {
        let key = normalize_text(job_description);
        if key.is_empty() {
            return Err(Error::ExtractionParse("empty job description".into()));
        }
        if let Some(hit) = self.cache.get(&key) {
            debug!("condition cache hit");
            return Ok(hit);
        }
        let reply = self.completion.complete(&CompletionRequest {
            system: prompts::CONDITIONS_SYSTEM.to_string(),
            prompt: prompts::conditions_prompt(job_description),
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        })?;
        let conditions: MandatoryConditions = parse_object::<RawConditions>(&reply)?.into();
        debug!(?conditions, "extracted mandatory conditions");
        self.cache.insert(key, conditions.clone());
        Ok(conditions)
    }

    pub fn cache(&self) -> &ExtractionCache<MandatoryConditions> {
        &self.cache
    }
}
