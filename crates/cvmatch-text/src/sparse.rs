//! BM25 lexical sparse vectors.
//!
//! Terms are lower-cased whitespace tokens. Each term maps to a fixed 32-bit
//! index (xxHash64 of the token, truncated), so vectors computed in different
//! calls share one index space. What differs between modes is where the IDF
//! statistics come from:
//!
//! - [`SparseEncoder::encode_batch`] recomputes them over the given batch
//!   only. Vectors from different batches are not comparable by weight, and
//!   a singleton batch gives every term the same IDF.
//! - [`SparseEncoder::encode_document`] / [`SparseEncoder::encode_query`] use
//!   a persistent [`CorpusStats`] table updated as documents are ingested.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::hash::Hasher;
use std::path::Path;
use twox_hash::XxHash64;

use cvmatch_core::config::SparseSettings;
use cvmatch_core::types::SparseVector;

pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Stable index of a token in the sparse space.
pub fn term_index(term: &str) -> u32 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(term.as_bytes());
    hasher.finish() as u32
}

/// Smoothed BM25 inverse document frequency; positive for any `df <= n`.
fn idf(n: f32, df: f32) -> f32 {
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Corpus-wide term statistics, updated incrementally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    doc_count: usize,
    total_len: usize,
    doc_freqs: BTreeMap<String, usize>,
}

impl CorpusStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> Self {
        let mut stats = Self::new();
        for text in texts {
            stats.add_document(&tokenize(text.as_ref()));
        }
        stats
    }

    pub fn add_document(&mut self, tokens: &[String]) {
        self.doc_count += 1;
        self.total_len += tokens.len();
        let unique: BTreeSet<&String> = tokens.iter().collect();
        for term in unique {
            *self.doc_freqs.entry(term.clone()).or_insert(0) += 1;
        }
    }

    pub fn doc_count(&self) -> usize {
        self.doc_count
    }

    pub fn doc_freq(&self, term: &str) -> usize {
        self.doc_freqs.get(term).copied().unwrap_or(0)
    }

    pub fn idf(&self, term: &str) -> f32 {
        idf(self.doc_count as f32, self.doc_freq(term) as f32)
    }

    pub fn avg_doc_len(&self) -> f32 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.total_len as f32 / self.doc_count as f32
        }
    }

    /// Missing file means an empty corpus.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path).with_context(|| format!("reading corpus stats {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing corpus stats {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(self)?;
        fs::write(path, raw).with_context(|| format!("writing corpus stats {}", path.display()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SparseEncoder {
    params: Bm25Params,
}

impl SparseEncoder {
    pub fn new(params: Bm25Params) -> Self {
        Self { params }
    }

    pub fn from_settings(settings: &SparseSettings) -> Self {
        Self::new(Bm25Params { k1: settings.k1, b: settings.b })
    }

    /// One vector per input text, in input order, with IDF and average length
    /// taken from this batch alone.
    pub fn encode_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<SparseVector> {
        let stats = CorpusStats::from_texts(texts);
        texts.iter().map(|t| self.encode_document(t.as_ref(), &stats)).collect()
    }

    /// Document-side BM25 weights against `stats`.
    pub fn encode_document(&self, text: &str, stats: &CorpusStats) -> SparseVector {
        self.weigh_document(&tokenize(text), stats.avg_doc_len(), |term| stats.idf(term))
    }

    /// Document-side weights for a document not yet counted in `stats`, as if
    /// it had been added. `stats` is left untouched, so the caller can commit
    /// the document only once it is stored.
    pub fn encode_new_document(&self, text: &str, stats: &CorpusStats) -> SparseVector {
        let tokens = tokenize(text);
        let n = stats.doc_count as f32 + 1.0;
        let avg = (stats.total_len + tokens.len()) as f32 / n;
        self.weigh_document(&tokens, avg, |term| idf(n, stats.doc_freq(term) as f32 + 1.0))
    }

    fn weigh_document(&self, tokens: &[String], avg: f32, idf_of: impl Fn(&str) -> f32) -> SparseVector {
        let doc_len = tokens.len() as f32;
        let length_norm = if avg > 0.0 { doc_len / avg } else { 1.0 };
        let Bm25Params { k1, b } = self.params;
        let norm = k1 * (1.0 - b + b * length_norm);
        SparseVector::from_pairs(term_frequencies(tokens).into_iter().map(|(term, tf)| {
            let weight = idf_of(&term) * (tf * (k1 + 1.0)) / (tf + norm);
            (term_index(&term), weight)
        }))
    }

    /// Query-side weights: IDF times saturated term frequency, no length
    /// normalization.
    pub fn encode_query(&self, text: &str, stats: &CorpusStats) -> SparseVector {
        let k1 = self.params.k1;
        SparseVector::from_pairs(term_frequencies(&tokenize(text)).into_iter().map(|(term, tf)| {
            let weight = stats.idf(&term) * (tf * (k1 + 1.0)) / (tf + k1);
            (term_index(&term), weight)
        }))
    }
}

fn term_frequencies(tokens: &[String]) -> BTreeMap<String, f32> {
    let mut tf = BTreeMap::new();
    for token in tokens {
        *tf.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    tf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_is_positive_for_singleton_corpus() {
        let stats = CorpusStats::from_texts(&["python django"]);
        assert!(stats.idf("python") > 0.0);
        assert!(stats.idf("unseen") > stats.idf("python"));
    }

    #[test]
    fn stats_track_lengths_and_freqs() {
        let stats = CorpusStats::from_texts(&["a b b", "b c"]);
        assert_eq!(stats.doc_count(), 2);
        assert_eq!(stats.doc_freq("b"), 2);
        assert_eq!(stats.doc_freq("a"), 1);
        assert!((stats.avg_doc_len() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn term_index_is_stable() {
        assert_eq!(term_index("python"), term_index("python"));
        assert_ne!(term_index("python"), term_index("django"));
    }

    #[test]
    fn tokens_are_lowercased() {
        assert_eq!(tokenize("Python  DJANGO\tsql"), vec!["python", "django", "sql"]);
    }
}
