//! JSON-file corpus provider.
//!
//! The corpus file is produced by an external embedding step. Two layouts
//! are accepted: a bare array of chunks, or an object recording the
//! embedding model next to the chunks.
//!
//! ```json
//! {
//!   "model": "all-MiniLM-L6-v2",
//!   "chunks": [
//!     { "id": "post-1_chunk_0", "text": "...", "embedding": [0.1, 0.2],
//!       "metadata": { "author": "Jane", "date": "2024-03-01" } }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use postsmith_core::corpus::{validate_corpus, CorpusProvider};
use postsmith_core::models::Chunk;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Parsed contents of a corpus file.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusFile {
    /// Embedding model name, when recorded.
    pub model: Option<String>,
    pub chunks: Vec<Chunk>,
    /// Shared embedding dimensionality; `None` for an empty corpus.
    pub dims: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCorpus {
    Bare(Vec<Chunk>),
    Indexed {
        #[serde(default)]
        model: Option<String>,
        chunks: Vec<Chunk>,
    },
}

/// Reads chunks from a JSON file on every call.
#[derive(Debug, Clone)]
pub struct JsonCorpus {
    path: PathBuf,
}

impl JsonCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the file, keeping the model name.
    pub async fn read(&self) -> Result<CorpusFile> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read corpus file: {}", self.path.display()))?;
        let raw: RawCorpus = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse corpus file: {}", self.path.display()))?;

        let (model, chunks) = match raw {
            RawCorpus::Bare(chunks) => (None, chunks),
            RawCorpus::Indexed { model, chunks } => (model, chunks),
        };

        let dims = validate_corpus(&chunks)
            .with_context(|| format!("Invalid corpus file: {}", self.path.display()))?;
        for chunk in chunks.iter().filter(|c| c.text.trim().is_empty()) {
            warn!(chunk_id = %chunk.id, "chunk has no text");
        }

        info!(
            path = %self.path.display(),
            chunks = chunks.len(),
            dims = dims.unwrap_or(0),
            "loaded corpus"
        );
        Ok(CorpusFile {
            model,
            chunks,
            dims,
        })
    }
}

#[async_trait]
impl CorpusProvider for JsonCorpus {
    fn name(&self) -> &str {
        "json"
    }

    async fn chunks(&self) -> Result<Vec<Chunk>> {
        Ok(self.read().await?.chunks)
    }
}
