//! Similarity ranking and diversity-aware selection.
//!
//! The [`SimilaritySelector`] ranks a corpus of embedded chunks against a
//! query vector and optionally re-ranks the top of that ranking with
//! Maximal Marginal Relevance so a repetitive corpus does not fill the
//! generation prompt with near-identical examples.
//!
//! # MMR
//!
//! Starting from the similarity ranking, chunks are picked greedily:
//!
//! ```text
//! mmr(c) = λ × rel(c, query) − (1 − λ) × max_{s ∈ selected} sim(c, s)
//! ```
//!
//! The redundancy term is `0` while nothing is selected, so the first pick
//! is always the most relevant chunk. Ties go to the better relevance rank,
//! then to the earlier corpus position.
//!
//! # Determinism
//!
//! Ranking uses a stable sort, so equal scores keep corpus order and two
//! calls with identical inputs return identical output.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Chunk, ScoredChunk};
use crate::similarity::{ensure_finite, Metric};

/// Default number of candidates considered before MMR re-ranking.
pub const DEFAULT_FETCH_K: usize = 20;

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectParams {
    /// Number of chunks to return.
    pub top_k: usize,
    /// Relevance/diversity balance: `1.0` = pure relevance, `0.0` = pure diversity.
    pub lambda_mult: f32,
    /// Size of the relevance-ranked pool MMR draws from (`>= top_k`).
    pub fetch_k: usize,
    /// When false, return the plain top-`top_k` ranking.
    pub use_mmr: bool,
}

impl Default for SelectParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            lambda_mult: 0.5,
            fetch_k: DEFAULT_FETCH_K,
            use_mmr: true,
        }
    }
}

impl SelectParams {
    pub fn validate(&self) -> Result<()> {
        validate_k(self.top_k)?;
        validate_lambda(self.lambda_mult)?;
        if self.fetch_k < self.top_k {
            return Err(Error::invalid(format!(
                "fetch_k ({}) must be >= top_k ({})",
                self.fetch_k, self.top_k
            )));
        }
        Ok(())
    }
}

/// Ranks chunks by similarity to a query and selects diverse subsets.
///
/// The selector is a plain value holding only its [`Metric`]; it keeps no
/// state between calls and is safe to share across threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimilaritySelector {
    metric: Metric,
}

impl SimilaritySelector {
    pub fn new(metric: Metric) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Score every chunk against `query`, most similar first.
    ///
    /// Returns the full corpus (a permutation of it), not truncated. An
    /// empty corpus yields an empty ranking.
    pub fn rank_by_similarity(&self, query: &[f32], corpus: &[Chunk]) -> Result<Vec<ScoredChunk>> {
        let ranked = self.rank_indices(query, corpus)?;
        Ok(ranked
            .into_iter()
            .map(|(idx, score)| scored(corpus, idx, score, None))
            .collect())
    }

    /// The `k` most similar chunks (all of them when `k` exceeds the corpus).
    pub fn top_k(&self, query: &[f32], corpus: &[Chunk], k: usize) -> Result<Vec<ScoredChunk>> {
        validate_k(k)?;
        let mut ranked = self.rank_indices(query, corpus)?;
        ranked.truncate(k);
        Ok(ranked
            .into_iter()
            .map(|(idx, score)| scored(corpus, idx, score, None))
            .collect())
    }

    /// Greedy MMR selection of `min(k, N)` distinct chunks over the whole corpus.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] when `k < 1` or `lambda_mult` is
    ///   outside `[0, 1]`.
    /// - [`Error::DimensionMismatch`] when any embedding length differs
    ///   from the query's.
    pub fn select_with_mmr(
        &self,
        query: &[f32],
        corpus: &[Chunk],
        k: usize,
        lambda_mult: f32,
    ) -> Result<Vec<ScoredChunk>> {
        validate_k(k)?;
        validate_lambda(lambda_mult)?;
        let ranked = self.rank_indices(query, corpus)?;
        Ok(self.mmr(corpus, &ranked, k, lambda_mult))
    }

    /// Select according to [`SelectParams`]: rank, keep the `fetch_k` most
    /// relevant candidates, then MMR (or plain truncation) down to `top_k`.
    pub fn select(
        &self,
        query: &[f32],
        corpus: &[Chunk],
        params: &SelectParams,
    ) -> Result<Vec<ScoredChunk>> {
        params.validate()?;
        let mut ranked = self.rank_indices(query, corpus)?;
        ranked.truncate(params.fetch_k);

        if params.use_mmr {
            Ok(self.mmr(corpus, &ranked, params.top_k, params.lambda_mult))
        } else {
            ranked.truncate(params.top_k);
            Ok(ranked
                .into_iter()
                .map(|(idx, score)| scored(corpus, idx, score, None))
                .collect())
        }
    }

    /// Validate inputs and return `(corpus_index, score)` sorted by score desc.
    fn rank_indices(&self, query: &[f32], corpus: &[Chunk]) -> Result<Vec<(usize, f32)>> {
        if corpus.is_empty() {
            return Ok(Vec::new());
        }
        ensure_finite("query vector", query)?;

        let mut ranked = Vec::with_capacity(corpus.len());
        for (idx, chunk) in corpus.iter().enumerate() {
            if chunk.embedding.len() != query.len() {
                return Err(Error::DimensionMismatch {
                    chunk_id: chunk.id.clone(),
                    expected: query.len(),
                    found: chunk.embedding.len(),
                });
            }
            if chunk.embedding.iter().any(|x| !x.is_finite()) {
                return Err(Error::invalid(format!(
                    "embedding of chunk '{}' has a non-finite component",
                    chunk.id
                )));
            }
            ranked.push((idx, self.metric.score(query, &chunk.embedding)));
        }

        // Stable: equal scores keep corpus order.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(ranked)
    }

    /// Greedy MMR over an already-ranked candidate pool.
    fn mmr(
        &self,
        corpus: &[Chunk],
        ranked: &[(usize, f32)],
        k: usize,
        lambda_mult: f32,
    ) -> Vec<ScoredChunk> {
        let k = k.min(ranked.len());
        debug!(
            candidates = ranked.len(),
            k,
            lambda_mult,
            metric = %self.metric,
            "mmr selection"
        );

        // Positions into `ranked`, kept in relevance order so the first
        // maximum found is also the best-ranked one.
        let mut remaining: Vec<usize> = (0..ranked.len()).collect();
        let mut redundancy: Vec<Option<f32>> = vec![None; ranked.len()];
        let mut selected = Vec::with_capacity(k);

        while selected.len() < k {
            let mut best: Option<(usize, f32)> = None;
            for (slot, &pos) in remaining.iter().enumerate() {
                let relevance = ranked[pos].1;
                let max_sim = redundancy[pos].unwrap_or(0.0);
                let mmr = lambda_mult * relevance - (1.0 - lambda_mult) * max_sim;
                if best.map_or(true, |(_, top)| mmr > top) {
                    best = Some((slot, mmr));
                }
            }
            let Some((slot, mmr)) = best else {
                break;
            };

            let pos = remaining.remove(slot);
            let (idx, relevance) = ranked[pos];
            let picked = &corpus[idx].embedding;
            for &other in &remaining {
                let sim = self.metric.score(&corpus[ranked[other].0].embedding, picked);
                redundancy[other] = Some(redundancy[other].map_or(sim, |m| m.max(sim)));
            }

            debug!(chunk_id = %corpus[idx].id, relevance, mmr, "mmr pick");
            selected.push(scored(corpus, idx, relevance, Some(mmr)));
        }

        selected
    }
}

/// Rank `corpus` against `query` by cosine similarity.
///
/// See [`SimilaritySelector::rank_by_similarity`].
pub fn rank_by_similarity(query: &[f32], corpus: &[Chunk]) -> Result<Vec<ScoredChunk>> {
    SimilaritySelector::default().rank_by_similarity(query, corpus)
}

/// Cosine-similarity MMR selection.
///
/// See [`SimilaritySelector::select_with_mmr`].
pub fn select_with_mmr(
    query: &[f32],
    corpus: &[Chunk],
    k: usize,
    lambda_mult: f32,
) -> Result<Vec<ScoredChunk>> {
    SimilaritySelector::default().select_with_mmr(query, corpus, k, lambda_mult)
}

/// Ratio of distinct words to total words across the selected texts.
///
/// Higher means the selection repeats itself less. Returns `0.0` when the
/// selection has no words.
pub fn lexical_diversity(selected: &[ScoredChunk]) -> f64 {
    let mut total = 0usize;
    let mut unique = HashSet::new();
    for sc in selected {
        for word in sc.chunk.words() {
            total += 1;
            unique.insert(word);
        }
    }
    if total == 0 {
        return 0.0;
    }
    unique.len() as f64 / total as f64
}

fn scored(corpus: &[Chunk], idx: usize, score: f32, mmr_score: Option<f32>) -> ScoredChunk {
    ScoredChunk {
        chunk: corpus[idx].clone(),
        score,
        mmr_score,
        corpus_index: idx,
    }
}

fn validate_k(k: usize) -> Result<()> {
    if k < 1 {
        return Err(Error::invalid("k must be >= 1"));
    }
    Ok(())
}

fn validate_lambda(lambda_mult: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&lambda_mult) {
        return Err(Error::invalid(format!(
            "lambda_mult must be in [0.0, 1.0], got {}",
            lambda_mult
        )));
    }
    Ok(())
}
