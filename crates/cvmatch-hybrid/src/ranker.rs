//! Job description in, validated candidates out.

use rayon::prelude::*;
use rayon::ThreadPool;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use cvmatch_core::config::Settings;
use cvmatch_core::context::RequestContext;
use cvmatch_core::types::{IndexMatch, IndexQuery, MandatoryConditions, MatchResult};
use cvmatch_core::{Embedder, Result, VectorIndex};
use cvmatch_extract::{CompletionParams, ConditionExtractor, CvExtractor, Extraction, PromptRefiner};
use cvmatch_text::SparseEncoder;

use crate::combine::hybrid_combine;
use crate::validate::ValidationPolicy;
use crate::{Services, SharedStats};

/// Everything one ranking request produced, including rejected candidates.
#[derive(Debug, Clone)]
pub struct RankReport {
    /// Description actually used for extraction and the dense query.
    pub refined_description: String,
    pub conditions: Extraction<MandatoryConditions>,
    pub keywords: Vec<String>,
    /// Every retrieved candidate, in retrieval order.
    pub evaluated: Vec<MatchResult>,
    /// Valid candidates, best first; ties keep retrieval order.
    pub results: Vec<MatchResult>,
}

pub struct Ranker {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    refiner: Option<PromptRefiner>,
    conditions: ConditionExtractor,
    cv: CvExtractor,
    encoder: SparseEncoder,
    stats: SharedStats,
    policy: ValidationPolicy,
    namespace: String,
    alpha: f32,
    top_k: usize,
    reject_degraded: bool,
    request_timeout: Duration,
    pool: ThreadPool,
}

impl Ranker {
    pub fn new(services: &Services, settings: &Settings, stats: SharedStats) -> anyhow::Result<Self> {
        settings.validate()?;
        let params = CompletionParams::from_settings(&settings.completion);
        let capacity = settings.cache.capacity;
        let refiner = settings.ranking.refine.then(|| {
            PromptRefiner::new(
                services.embedder.clone(),
                services.index.clone(),
                services.completion.clone(),
                settings.index.examples_namespace.clone(),
                settings.ranking.examples_top_k,
                capacity,
                params,
            )
        });
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.ranking.workers)
            .thread_name(|i| format!("cvmatch-extract-{i}"))
            .build()?;
        Ok(Self {
            embedder: services.embedder.clone(),
            index: services.index.clone(),
            refiner,
            conditions: ConditionExtractor::new(services.completion.clone(), capacity, params),
            cv: CvExtractor::new(services.completion.clone(), capacity, params),
            encoder: SparseEncoder::from_settings(&settings.sparse),
            stats,
            policy: ValidationPolicy::from_settings(&settings.validation),
            namespace: settings.index.cv_namespace.clone(),
            alpha: settings.ranking.alpha,
            top_k: settings.ranking.top_k,
            reject_degraded: settings.validation.reject_degraded,
            request_timeout: settings.ranking.request_timeout(),
            pool,
        })
    }

    /// Valid candidates, most similar first, under the configured deadline.
    /// An empty list means nothing matched; service failures are errors.
    pub fn rank(&self, job_description: &str) -> Result<Vec<MatchResult>> {
        let ctx = RequestContext::with_timeout(self.request_timeout);
        Ok(self.rank_with_context(job_description, &ctx)?.results)
    }

    pub fn rank_with_context(&self, job_description: &str, ctx: &RequestContext) -> Result<RankReport> {
        ctx.check("refine")?;
        let refined_description = match &self.refiner {
            Some(refiner) => refiner.refine(job_description).into_record(),
            None => job_description.to_string(),
        };

        ctx.check("extract conditions")?;
        let (conditions, keywords) = self.conditions.extract_with_keywords(&refined_description);
        if conditions.is_degraded() {
            warn!("ranking with empty mandatory conditions");
        }

        ctx.check("embed")?;
        let dense = self.embedder.embed(&refined_description)?;
        let sparse = self.encoder.encode_query(&keywords.join(" "), &self.stats.read());
        let (dense, sparse) = hybrid_combine(&dense, &sparse, self.alpha)?;

        ctx.check("query")?;
        let query = IndexQuery {
            dense,
            sparse: (!sparse.is_empty()).then_some(sparse),
            top_k: self.top_k,
            include_metadata: true,
        };
        let matches = self.index.query(&self.namespace, &query)?;
        debug!(count = matches.len(), "retrieved candidates");

        let record = conditions.record();
        let evaluated: Vec<MatchResult> = self.pool.install(|| {
            matches.par_iter().map(|m| self.evaluate(m, record, ctx)).collect::<Result<Vec<_>>>()
        })?;

        let mut results: Vec<MatchResult> = evaluated.iter().filter(|r| r.valid).cloned().collect();
        results.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        info!(retrieved = evaluated.len(), valid = results.len(), "ranking finished");

        Ok(RankReport { refined_description, conditions, keywords, evaluated, results })
    }

    fn evaluate(&self, m: &IndexMatch, conditions: &MandatoryConditions, ctx: &RequestContext) -> Result<MatchResult> {
        ctx.check("validate")?;
        let text = m.metadata.get("text").and_then(Value::as_str).unwrap_or_default();
        let extraction = self.cv.extract(text);
        let degraded = extraction.is_degraded();
        let extracted_info = extraction.into_record();
        let valid = !(degraded && self.reject_degraded) && self.policy.validate(&extracted_info, conditions);
        debug!(id = %m.id, score = m.score, valid, degraded, "evaluated candidate");
        Ok(MatchResult {
            candidate_id: m.id.clone(),
            similarity_score: m.score,
            metadata: m.metadata.clone(),
            extracted_info,
            valid,
            extraction_degraded: degraded,
        })
    }

    pub fn condition_extractor(&self) -> &ConditionExtractor {
        &self.conditions
    }

    pub fn cv_extractor(&self) -> &CvExtractor {
        &self.cv
    }
}
