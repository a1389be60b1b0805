//! In-memory [`CorpusProvider`] for tests and embedding callers.
//!
//! Holds chunks in a `Vec` behind `std::sync::RwLock`, preserving
//! insertion order so ranking ties stay deterministic.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::Chunk;

use super::{validate_corpus, CorpusProvider};

/// In-memory corpus keyed by chunk id.
#[derive(Debug)]
pub struct InMemoryCorpus {
    name: String,
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryCorpus {
    pub fn new() -> Self {
        Self {
            name: "memory".to_string(),
            chunks: RwLock::new(Vec::new()),
        }
    }

    /// Build a corpus from pre-embedded chunks, rejecting duplicate ids
    /// and mixed dimensionality.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Result<Self> {
        validate_corpus(&chunks)?;
        Ok(Self {
            name: "memory".to_string(),
            chunks: RwLock::new(chunks),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Insert a chunk, replacing any chunk with the same id in place.
    pub fn upsert(&self, chunk: Chunk) -> Result<()> {
        let mut chunks = self.chunks.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(expected) = chunks.iter().find(|c| c.id != chunk.id).map(Chunk::dims) {
            let found = chunk.dims();
            if found != expected {
                return Err(Error::DimensionMismatch {
                    chunk_id: chunk.id,
                    expected,
                    found,
                });
            }
        }
        match chunks.iter_mut().find(|c| c.id == chunk.id) {
            Some(slot) => *slot = chunk,
            None => chunks.push(chunk),
        }
        Ok(())
    }

    /// Remove a chunk by id. Returns whether it was present.
    pub fn remove(&self, id: &str) -> bool {
        let mut chunks = self.chunks.write().unwrap_or_else(PoisonError::into_inner);
        let before = chunks.len();
        chunks.retain(|c| c.id != id);
        chunks.len() != before
    }

    pub fn len(&self) -> usize {
        self.chunks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCorpus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CorpusProvider for InMemoryCorpus {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chunks(&self) -> anyhow::Result<Vec<Chunk>> {
        Ok(self
            .chunks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn chunks_by_id(&self, ids: &[String]) -> anyhow::Result<Vec<Chunk>> {
        let chunks = self.chunks.read().unwrap_or_else(PoisonError::into_inner);
        Ok(ids
            .iter()
            .filter_map(|id| chunks.iter().find(|c| &c.id == id).cloned())
            .collect())
    }
}
