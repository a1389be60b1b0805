//! Core data models shared by the selector and the overlap detector.
//!
//! Chunks arrive already embedded; nothing in this crate produces or
//! mutates them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An embedded unit of a person's past writing, used as retrieval context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk identifier (e.g. `post-7_chunk_2`).
    pub id: String,
    /// The chunk's text as written.
    pub text: String,
    /// Fixed-length embedding vector.
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// Optional provenance attached to a [`Chunk`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Identifier of the post this chunk was cut from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Chunk {
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            embedding,
            metadata: ChunkMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Embedding dimensionality.
    pub fn dims(&self) -> usize {
        self.embedding.len()
    }

    /// Whitespace-separated words of the chunk text.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }
}

/// A chunk paired with its relevance to a query.
///
/// Returned by every selection operation in descending order of
/// importance. The chunk is an owned copy; the selector keeps nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Similarity between the query and the chunk under the selector's metric.
    pub score: f32,
    /// MMR objective at the moment this chunk was picked (MMR selection only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mmr_score: Option<f32>,
    /// Position of the chunk in the input corpus.
    pub corpus_index: usize,
}
