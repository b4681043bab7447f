//! cvmatch-vector
//!
//! Vector index clients: a Pinecone-compatible HTTP client for the hosted
//! index and an in-memory index for tests, local runs and ephemeral
//! single-document question answering.

mod memory;
mod pinecone;

use std::sync::Arc;
use tracing::info;

use cvmatch_core::config::{IndexProvider, IndexSettings, RetrySettings};
use cvmatch_core::VectorIndex;

pub use memory::InMemoryIndex;
pub use pinecone::PineconeIndex;

pub fn open_index(settings: &IndexSettings, retry: &RetrySettings) -> anyhow::Result<Arc<dyn VectorIndex>> {
    match settings.provider {
        IndexProvider::Memory => {
            info!("using in-memory vector index");
            Ok(Arc::new(InMemoryIndex::new()))
        }
        IndexProvider::Pinecone => {
            info!(host = %settings.host, "using Pinecone index");
            Ok(Arc::new(PineconeIndex::from_settings(settings, retry)?))
        }
    }
}
