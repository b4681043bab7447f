//! cvmatch-text
//!
//! Text-side processing for the matching pipeline: fuzzy section
//! segmentation of résumés and BM25 lexical sparse vectors.

pub mod fuzzy;
pub mod segment;
pub mod sparse;

pub use segment::Segmenter;
pub use sparse::{Bm25Params, CorpusStats, SparseEncoder};
