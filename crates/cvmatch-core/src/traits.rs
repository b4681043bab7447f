use crate::error::Result;
use crate::types::{CompletionRequest, DenseVector, IndexMatch, IndexQuery, IndexRecord};

/// Text -> fixed-length dense vector.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    /// Fails with `EmbeddingUnavailable`; callers must not fall back to a
    /// degraded vector.
    fn embed(&self, text: &str) -> Result<DenseVector>;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<DenseVector>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Text-completion service, used deterministically (temperature 0) for extraction.
pub trait CompletionProvider: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// External vector index partitioned by namespace.
pub trait VectorIndex: Send + Sync {
    fn upsert(&self, namespace: &str, records: &[IndexRecord]) -> Result<()>;
    /// Ordered best first. An empty result is a normal outcome.
    fn query(&self, namespace: &str, query: &IndexQuery) -> Result<Vec<IndexMatch>>;
    /// Records for the ids that exist; missing ids are simply absent.
    fn fetch(&self, namespace: &str, ids: &[String]) -> Result<Vec<IndexRecord>>;
}
