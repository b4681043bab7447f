use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::Document;

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub words_per_chunk: usize,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { words_per_chunk: 300, overlap_percent: 0.2 }
    }
}

/// Loads extracted résumé text from disk and splits long text into
/// overlapping word windows.
#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_chunking(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    /// Every `.txt` / `.md` file under `data_dir`, sorted by path. The file
    /// stem becomes the document id; sections are left for the segmenter.
    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        self.load_files(self.list_text_files(data_dir), data_dir)
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Document>> {
        let mut files = self.list_text_files(data_dir);
        if files.len() > limit {
            files.truncate(limit);
            info!(limit, "limited document loading");
        }
        self.load_files(files, data_dir)
    }

    fn load_files(&self, files: Vec<PathBuf>, data_dir: &Path) -> Result<Vec<Document>> {
        if files.is_empty() {
            info!(dir = %data_dir.display(), "no .txt or .md files found");
            return Ok(vec![]);
        }
        let mut documents = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            debug!(file = %file_path.display(), "loading {}/{}", file_index + 1, files.len());
            let content = self.read_file_content(file_path)?;
            documents.push(Document::new(self.extract_doc_id(file_path), content));
        }
        info!(count = documents.len(), dir = %data_dir.display(), "loaded documents");
        Ok(documents)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => {
                let bytes = fs::read(file_path).with_context(|| format!("reading {}", file_path.display()))?;
                Ok(String::from_utf8_lossy(&bytes).to_string())
            }
        }
    }

    fn extract_doc_id(&self, file_path: &Path) -> String {
        file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.to_string_lossy().to_string())
    }

    /// Overlapping windows of `words_per_chunk` words; short text is one chunk.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return vec![];
        }
        let words_per_chunk = self.chunking_config.words_per_chunk.max(1);
        let overlap_words = ((words_per_chunk as f32 * self.chunking_config.overlap_percent) as usize).min(words_per_chunk - 1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start = end - overlap_words;
        }
        chunks
    }

    fn list_text_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if matches!(path.extension().and_then(|s| s.to_str()), Some("txt") | Some("md")) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        files
    }
}
