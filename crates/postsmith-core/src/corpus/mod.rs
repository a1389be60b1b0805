//! Corpus abstraction for postsmith.
//!
//! The [`CorpusProvider`] trait is the seam between the pure selection
//! logic and whatever holds the embedded chunks (a JSON file, an
//! in-memory list, an external vector database). The core never keeps
//! an index of its own: every retrieval asks the provider for the corpus
//! and passes it explicitly to the selector.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Chunk, ScoredChunk};
use crate::select::{SelectParams, SimilaritySelector};

/// Source of embedded chunks for retrieval.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`name`](CorpusProvider::name) | Label used in logs and CLI output |
/// | [`chunks`](CorpusProvider::chunks) | The full corpus, in a stable order |
/// | [`chunks_by_id`](CorpusProvider::chunks_by_id) | A subset by identifier |
#[async_trait]
pub trait CorpusProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Return every chunk. Order must be stable across calls since ranking
    /// ties are broken by corpus position.
    async fn chunks(&self) -> anyhow::Result<Vec<Chunk>>;

    /// Return the chunks whose ids appear in `ids`, in request order.
    /// Unknown ids are skipped.
    async fn chunks_by_id(&self, ids: &[String]) -> anyhow::Result<Vec<Chunk>> {
        let all = self.chunks().await?;
        Ok(ids
            .iter()
            .filter_map(|id| all.iter().find(|c| &c.id == id).cloned())
            .collect())
    }
}

/// Fetch the corpus from `provider` and select from it.
///
/// This is the entry point frontends delegate to. Parameters are checked
/// before the provider is consulted.
pub async fn retrieve<P>(
    provider: &P,
    selector: &SimilaritySelector,
    query: &[f32],
    params: &SelectParams,
) -> Result<Vec<ScoredChunk>>
where
    P: CorpusProvider + ?Sized,
{
    params.validate()?;
    let corpus = provider.chunks().await?;
    debug!(
        provider = provider.name(),
        chunks = corpus.len(),
        top_k = params.top_k,
        fetch_k = params.fetch_k,
        use_mmr = params.use_mmr,
        "retrieving"
    );
    selector.select(query, &corpus, params)
}

/// Check that chunk ids are unique and all embeddings share one length.
///
/// Returns the shared dimensionality, or `None` for an empty corpus.
pub fn validate_corpus(chunks: &[Chunk]) -> Result<Option<usize>> {
    let Some(first) = chunks.first() else {
        return Ok(None);
    };
    let dims = first.dims();
    if dims == 0 {
        return Err(Error::invalid(format!(
            "chunk '{}' has an empty embedding",
            first.id
        )));
    }

    let mut seen = HashSet::with_capacity(chunks.len());
    for chunk in chunks {
        if !seen.insert(chunk.id.as_str()) {
            return Err(Error::invalid(format!("duplicate chunk id '{}'", chunk.id)));
        }
        if chunk.dims() != dims {
            return Err(Error::DimensionMismatch {
                chunk_id: chunk.id.clone(),
                expected: dims,
                found: chunk.dims(),
            });
        }
    }
    Ok(Some(dims))
}
