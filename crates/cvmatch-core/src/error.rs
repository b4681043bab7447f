use thiserror::Error;

/// Failure taxonomy shared by every stage of the pipeline.
///
/// Query-path failures (`EmbeddingUnavailable`, `IndexUnavailable`) abort a
/// ranking request. Extraction failures are absorbed into degraded records
/// by the extractors and only surface here when a caller asks for them.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Completion service unavailable: {0}")]
    CompletionUnavailable(String),

    #[error("Could not parse extraction response: {0}")]
    ExtractionParse(String),

    #[error("Hybrid weight must be within [0, 1], got {0}")]
    InvalidWeight(f32),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid sparse vector: {0}")]
    InvalidSparseVector(String),

    #[error("Request deadline exceeded during {0}")]
    DeadlineExceeded(&'static str),

    #[error("Request cancelled during {0}")]
    Cancelled(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
