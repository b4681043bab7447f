//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_RANKING__ALPHA=0.5`). The typed
//! [`Settings`] tree is extracted from the merged figment; every field has a
//! default so an empty configuration is valid.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::resilience::{CircuitBreaker, RetryPolicy};
use crate::types::TitleMatch;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Wraps an already-assembled figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment };
        config.validate_for_env("custom")?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        match env {
            "prod" | "production" => {
                anyhow::ensure!(
                    settings.embedding.provider != EmbeddingProvider::Fake,
                    "fake embeddings are not allowed in production"
                );
                anyhow::ensure!(
                    settings.index.provider != IndexProvider::Memory,
                    "the in-memory index is not allowed in production"
                );
            }
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub embedding: EmbeddingSettings,
    pub completion: CompletionSettings,
    pub index: IndexSettings,
    pub ranking: RankingSettings,
    pub validation: ValidationSettings,
    pub segmenter: SegmenterSettings,
    pub sparse: SparseSettings,
    pub cache: CacheSettings,
    pub retry: RetrySettings,
    pub data: DataSettings,
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.ranking.alpha),
            "ranking.alpha must be within [0, 1], got {}",
            self.ranking.alpha
        );
        anyhow::ensure!(self.ranking.top_k > 0, "ranking.top_k must be positive");
        anyhow::ensure!(self.ranking.workers > 0, "ranking.workers must be positive");
        anyhow::ensure!(self.segmenter.threshold <= 100, "segmenter.threshold is a 0-100 score");
        anyhow::ensure!(self.embedding.dimensions > 0, "embedding.dimensions must be positive");
        anyhow::ensure!(self.cache.capacity > 0, "cache.capacity must be positive");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "fake")]
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub base_url: String,
    pub model: String,
    pub dimensions: usize,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub base_url: String,
    pub model: String,
    pub max_tokens: usize,
    /// Used for question answering only; extraction always runs at 0.
    pub temperature: f32,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 300,
            temperature: 0.0,
            api_key: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexProvider {
    Pinecone,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub provider: IndexProvider,
    /// Data-plane host of the index, e.g. `https://database-abc123.svc.pinecone.io`.
    pub host: String,
    pub api_key: Option<String>,
    pub cv_namespace: String,
    pub examples_namespace: String,
    pub timeout_secs: u64,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            provider: IndexProvider::Pinecone,
            host: String::new(),
            api_key: None,
            cv_namespace: "cvs-info".to_string(),
            examples_namespace: "examples_and_instructions".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    /// Dense weight of the hybrid query; `1 - alpha` goes to the sparse side.
    pub alpha: f32,
    pub top_k: usize,
    /// Concurrent per-candidate extractions.
    pub workers: usize,
    pub request_timeout_secs: u64,
    /// Refine the job description with few-shot examples before extraction.
    pub refine: bool,
    pub examples_top_k: usize,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self { alpha: 0.20, top_k: 10, workers: 4, request_timeout_secs: 120, refine: true, examples_top_k: 5 }
    }
}

impl RankingSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub title_match: TitleMatch,
    pub check_certifications: bool,
    pub check_tools: bool,
    /// Exclude candidates whose attributes could not be extracted.
    pub reject_degraded: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self { title_match: TitleMatch::Substring, check_certifications: true, check_tools: true, reject_degraded: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterSettings {
    /// A unit must score above this 0-100 similarity to count as a heading.
    pub threshold: u8,
    pub sections: IndexMap<String, Vec<String>>,
}

impl Default for SegmenterSettings {
    fn default() -> Self {
        let table: [(&str, &[&str]); 9] = [
            ("Personal Information", &["personal information", "contact", "about me"]),
            ("Summary", &["summary", "overview", "objective"]),
            ("Skills", &["skills", "technical skills", "soft skills"]),
            ("Work Experience", &["work experience", "experience", "employment history"]),
            ("Education", &["education", "academic background", "qualifications"]),
            ("Certifications", &["certifications", "training", "courses"]),
            ("Languages", &["languages", "language proficiency"]),
            ("References", &["references", "referees"]),
            ("Interests", &["interests", "hobbies", "extracurricular activities"]),
        ];
        let sections = table
            .iter()
            .map(|(name, synonyms)| (name.to_string(), synonyms.iter().map(|s| s.to_string()).collect()))
            .collect();
        Self { threshold: 80, sections }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SparseSettings {
    pub k1: f32,
    pub b: f32,
    /// JSON file holding corpus-wide term statistics between runs.
    pub stats_path: Option<String>,
}

impl Default for SparseSettings {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75, stats_path: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub breaker_threshold: usize,
    pub breaker_cooldown_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 500, breaker_threshold: 5, breaker_cooldown_secs: 30 }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy { max_attempts: self.max_attempts, base_delay: Duration::from_millis(self.base_delay_ms), ..RetryPolicy::default() }
    }

    pub fn breaker(&self) -> CircuitBreaker {
        CircuitBreaker::new(self.breaker_threshold, Duration::from_secs(self.breaker_cooldown_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory of extracted résumé text (`.txt` / `.md`).
    pub cv_text_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { cv_text_dir: "../dev_data/cvs".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

