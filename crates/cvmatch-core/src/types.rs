//! Domain types shared by the segmenter, extractors, index clients and ranker.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Error, Result};

pub type DocId = String;
pub type Meta = serde_json::Map<String, serde_json::Value>;
pub type DenseVector = Vec<f32>;

/// Ordered `section name -> text` mapping produced by the segmenter.
pub type Sections = IndexMap<String, String>;

/// Section that collects text before any heading is recognised.
pub const GENERAL_SECTION: &str = "General";

/// A candidate document as ingested.
///
/// - `id`: stable identity (file stem or external id, whitespace-normalized on ingest)
/// - `raw_text`: the full extracted text
/// - `sections`: recomputed whenever the document is re-segmented
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub raw_text: String,
    #[serde(default)]
    pub sections: Sections,
}

impl Document {
    pub fn new(id: impl Into<DocId>, raw_text: impl Into<String>) -> Self {
        Self { id: id.into(), raw_text: raw_text.into(), sections: Sections::new() }
    }

    pub fn with_sections(mut self, sections: Sections) -> Self {
        self.sections = sections;
        self
    }
}

/// Lexical term-weight vector.
///
/// `indices` are strictly ascending and the same length as `values`. The
/// constructors enforce this, and so does deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSparseVector")]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct RawSparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl TryFrom<RawSparseVector> for SparseVector {
    type Error = Error;

    fn try_from(raw: RawSparseVector) -> Result<Self> {
        Self::new(raw.indices, raw.values)
    }
}

impl SparseVector {
    /// Validating constructor.
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(Error::InvalidSparseVector(format!(
                "{} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        if indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidSparseVector("indices must be strictly ascending".into()));
        }
        Ok(Self { indices, values })
    }

    /// Builds a vector from unordered `(index, value)` pairs. Duplicate
    /// indices are summed and zero weights dropped.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u32, f32)>,
    {
        let mut merged = std::collections::BTreeMap::<u32, f32>::new();
        for (idx, value) in pairs {
            *merged.entry(idx).or_insert(0.0) += value;
        }
        let (indices, values): (Vec<u32>, Vec<f32>) = merged.into_iter().filter(|(_, v)| *v != 0.0).unzip();
        Self { indices, values }
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Same indices, every value multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self { indices: self.indices.clone(), values: self.values.iter().map(|v| v * factor).collect() }
    }

    /// Dot product over the shared indices (merge walk).
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j, mut acc) = (0usize, 0usize, 0f32);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }
}

/// Must-have requirements extracted once per job description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MandatoryConditions {
    pub job_title: String,
    pub years_of_experience: Option<u32>,
    pub skills: BTreeSet<String>,
    pub certifications: BTreeSet<String>,
    pub tools: BTreeSet<String>,
}

impl MandatoryConditions {
    /// Flattened keyword list for the lexical query: title, years, skills,
    /// certifications, tools. Blank entries are dropped.
    pub fn keywords(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.push(self.job_title.clone());
        if let Some(years) = self.years_of_experience {
            out.push(years.to_string());
        }
        out.extend(self.skills.iter().cloned());
        out.extend(self.certifications.iter().cloned());
        out.extend(self.tools.iter().cloned());
        out.retain(|k| !k.trim().is_empty());
        out
    }
}

/// Attributes extracted from a candidate document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCvInfo {
    pub job_title: String,
    pub years_of_experience: u32,
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub certifications: BTreeSet<String>,
    #[serde(default)]
    pub tools: BTreeSet<String>,
}

/// How the validator compares job titles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleMatch {
    /// The candidate's normalized title contains the required title.
    #[default]
    Substring,
    /// The required title equals one of the candidate's listed titles.
    SetMembership,
}

/// One ranked candidate. Ephemeral, built per ranking request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate_id: DocId,
    pub similarity_score: f32,
    pub metadata: Meta,
    pub extracted_info: ExtractedCvInfo,
    pub valid: bool,
    /// The extractor fell back to a default record for this candidate.
    pub extraction_degraded: bool,
}

/// A record as stored in the external vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: DocId,
    pub dense: DenseVector,
    pub sparse: Option<SparseVector>,
    pub metadata: Meta,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub dense: DenseVector,
    pub sparse: Option<SparseVector>,
    pub top_k: usize,
    pub include_metadata: bool,
}

/// A single hit returned by the index, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMatch {
    pub id: DocId,
    pub score: f32,
    #[serde(default)]
    pub metadata: Meta,
}

/// Input to a text-completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Few-shot example stored in the examples namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FewShotExample {
    pub job_description: String,
    pub mandatory_keywords: Vec<String>,
}
