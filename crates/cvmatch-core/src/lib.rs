//! Shared building blocks for the candidate matching pipeline: domain types,
//! the error taxonomy, service traits and configuration.

pub mod config;
pub mod context;
pub mod data_processor;
pub mod error;
pub mod normalize;
pub mod resilience;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{CompletionProvider, Embedder, VectorIndex};
