use std::sync::Arc;
use tracing::{debug, warn};

use cvmatch_core::normalize::normalize_text;
use cvmatch_core::types::{CompletionRequest, ExtractedCvInfo};
use cvmatch_core::{CompletionProvider, Error, Result};

use crate::cache::ExtractionCache;
use crate::parse::{parse_object, RawCvInfo};
use crate::{prompts, CompletionParams, Extraction};

/// Extracts title, years, skills, certifications and tools from résumé text.
/// Shares one cache across every ranking request that holds this extractor.
pub struct CvExtractor {
    completion: Arc<dyn CompletionProvider>,
    cache: ExtractionCache<ExtractedCvInfo>,
    params: CompletionParams,
}

impl CvExtractor {
    pub fn new(completion: Arc<dyn CompletionProvider>, cache_capacity: usize, params: CompletionParams) -> Self {
        Self { completion, cache: ExtractionCache::new(cache_capacity), params }
    }

    pub fn extract(&self, cv_text: &str) -> Extraction<ExtractedCvInfo> {
        match self.try_extract(cv_text) {
            Ok(info) => Extraction::Parsed(info),
            Err(cause) => {
                warn!(error = %cause, "cv extraction degraded to empty record");
                Extraction::Degraded { record: ExtractedCvInfo::default(), cause }
            }
        }
    }

    pub fn try_extract(&self, cv_text: &str) -> Result<ExtractedCvInfo> {
        let key = normalize_text(cv_text);
        if key.is_empty() {
            return Err(Error::ExtractionParse("empty cv text".into()));
        }
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let reply = self.completion.complete(&CompletionRequest {
            system: prompts::CV_SYSTEM.to_string(),
            prompt: prompts::cv_prompt(cv_text),
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        })?;
        let info: ExtractedCvInfo = parse_object::<RawCvInfo>(&reply)?.into();
        debug!(title = %info.job_title, years = info.years_of_experience, skills = info.skills.len(), "extracted cv attributes");
        self.cache.insert(key, info.clone());
        Ok(info)
    }

    pub fn cache(&self) -> &ExtractionCache<ExtractedCvInfo> {
        &self.cache
    }
}
