//! Candidate ingestion: segment, embed, weight, upsert.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use cvmatch_core::config::Settings;
use cvmatch_core::normalize::normalize_doc_id;
use cvmatch_core::types::{Document, IndexRecord, Meta};
use cvmatch_core::{Embedder, Error, Result, VectorIndex};
use cvmatch_text::sparse::tokenize;
use cvmatch_text::{Segmenter, SparseEncoder};

use crate::{Services, SharedStats};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested(String),
    /// A record with this id is already in the index; nothing was written.
    Skipped(String),
    /// No text to index.
    Blank(String),
    Failed { id: String, reason: String },
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    segmenter: Segmenter,
    encoder: SparseEncoder,
    stats: SharedStats,
    namespace: String,
    stats_path: Option<PathBuf>,
}

impl Ingestor {
    pub fn new(services: &Services, settings: &Settings, stats: SharedStats) -> Self {
        Self {
            embedder: services.embedder.clone(),
            index: services.index.clone(),
            segmenter: Segmenter::from_settings(&settings.segmenter),
            encoder: SparseEncoder::from_settings(&settings.sparse),
            stats,
            namespace: settings.index.cv_namespace.clone(),
            stats_path: settings.sparse.stats_path.as_ref().map(cvmatch_core::config::expand_path),
        }
    }

    pub fn ingest(&self, document: Document) -> Result<IngestOutcome> {
        let id = normalize_doc_id(&document.id);
        if id.is_empty() {
            return Err(Error::InvalidConfig("document id is empty".into()));
        }
        if !self.index.fetch(&self.namespace, &[id.clone()])?.is_empty() {
            debug!(%id, "already indexed; skipping");
            return Ok(IngestOutcome::Skipped(id));
        }
        if document.raw_text.trim().is_empty() {
            warn!(%id, "document has no text; skipping");
            return Ok(IngestOutcome::Blank(id));
        }

        let source = document.id.clone();
        let document = self.segmenter.segment_document(document);
        let dense = self.embedder.embed(&document.raw_text)?;

        let sparse = self.encoder.encode_new_document(&document.raw_text, &self.stats.read());

        let mut metadata = Meta::new();
        metadata.insert("text".into(), document.raw_text.clone().into());
        // Index metadata only holds flat values, so sections travel as a JSON string.
        let sections = serde_json::to_string(&document.sections).unwrap_or_default();
        metadata.insert("sections".into(), sections.into());
        metadata.insert("source".into(), source.into());

        let record = IndexRecord { id: id.clone(), dense, sparse: Some(sparse), metadata };
        self.index.upsert(&self.namespace, &[record])?;
        self.stats.write().add_document(&tokenize(&document.raw_text));
        info!(%id, sections = document.sections.len(), "ingested candidate");
        Ok(IngestOutcome::Ingested(id))
    }

    /// Ingests every document, reporting each outcome through `on_done`.
    /// A failing document is recorded as [`IngestOutcome::Failed`] and the
    /// rest of the batch still runs.
    pub fn ingest_all<F>(&self, documents: Vec<Document>, mut on_done: F) -> Vec<IngestOutcome>
    where
        F: FnMut(&IngestOutcome),
    {
        let mut outcomes = Vec::with_capacity(documents.len());
        for document in documents {
            let id = normalize_doc_id(&document.id);
            let outcome = self.ingest(document).unwrap_or_else(|e| {
                warn!(%id, error = %e, "ingest failed");
                IngestOutcome::Failed { id, reason: e.to_string() }
            });
            on_done(&outcome);
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Writes corpus statistics to `sparse.stats_path`, if configured.
    pub fn save_stats(&self) -> anyhow::Result<()> {
        if let Some(path) = &self.stats_path {
            self.stats.read().save(path)?;
            info!(path = %path.display(), "saved corpus statistics");
        }
        Ok(())
    }
}
