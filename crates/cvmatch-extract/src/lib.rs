//! cvmatch-extract
//!
//! Turns unstructured job descriptions and résumés into typed records with
//! a text-completion service. Responses are parsed strictly; anything that
//! fails comes back as a degraded default record carrying its cause, so the
//! ranker can keep going without mistaking a fallback for a real extraction.

pub mod cache;
pub mod client;
pub mod conditions;
pub mod cv;
mod parse;
pub mod prompts;
pub mod refine;
pub mod testing;

use cvmatch_core::config::CompletionSettings;
use cvmatch_core::Error;

pub use cache::{CacheStats, ExtractionCache};
pub use client::OpenAiCompletion;
pub use conditions::ConditionExtractor;
pub use cv::CvExtractor;
pub use refine::PromptRefiner;

/// Result of one extraction attempt.
#[derive(Debug, Clone)]
pub enum Extraction<T> {
    Parsed(T),
    /// The service failed or its response did not parse; `record` is the
    /// empty default.
    Degraded { record: T, cause: Error },
}

impl<T> Extraction<T> {
    pub fn record(&self) -> &T {
        match self {
            Extraction::Parsed(record) | Extraction::Degraded { record, .. } => record,
        }
    }

    pub fn into_record(self) -> T {
        match self {
            Extraction::Parsed(record) | Extraction::Degraded { record, .. } => record,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Extraction::Degraded { .. })
    }

    pub fn cause(&self) -> Option<&Error> {
        match self {
            Extraction::Parsed(_) => None,
            Extraction::Degraded { cause, .. } => Some(cause),
        }
    }
}

/// Sampling parameters sent with every extraction call. Extraction is
/// deterministic, so [`CompletionParams::from_settings`] always yields
/// temperature 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self { temperature: 0.0, max_tokens: 300 }
    }
}

impl CompletionParams {
    pub fn from_settings(settings: &CompletionSettings) -> Self {
        Self { temperature: 0.0, max_tokens: settings.max_tokens }
    }
}
