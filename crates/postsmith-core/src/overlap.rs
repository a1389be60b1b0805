//! Verbatim overlap detection between generated text and its sources.
//!
//! A generated post is flagged when it reproduces a run of at least
//! `threshold` consecutive words from any source chunk. Comparison is on
//! normalized words (lowercased, non-alphanumeric characters removed) so
//! casing and punctuation edits do not hide a copy; reported spans quote
//! the generated text as written.
//!
//! # Run finding
//!
//! Every maximal common word run (one that cannot be extended on either
//! side) of at least `threshold` words is reported, for every source. A
//! passage copied twice, or two copied passages that share words at their
//! seam, yield separate spans that may overlap in the generated text.
//!
//! # Example
//!
//! ```rust
//! use postsmith_core::overlap::{detect_overlap, OverlapSource};
//!
//! let source = "ship small ship often and tell people what you learned";
//! let generated = "My rule: ship small, ship often and tell people what you learned!";
//! let verdict = detect_overlap(generated, &[OverlapSource::new("post-1", source)], 8).unwrap();
//! assert!(verdict.exceeds_threshold);
//! assert_eq!(verdict.spans[0].source_id, "post-1");
//! assert_eq!(verdict.spans[0].word_count, 10);
//! ```

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Chunk;

/// Minimum run of consecutive shared words treated as copying.
pub const DEFAULT_THRESHOLD: usize = 25;

/// Characters of a matched run quoted by [`OverlapVerdict::explain`].
const QUOTE_CHARS: usize = 100;

/// A source text the generated text is screened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapSource<'a> {
    pub id: &'a str,
    pub text: &'a str,
}

impl<'a> OverlapSource<'a> {
    pub fn new(id: &'a str, text: &'a str) -> Self {
        Self { id, text }
    }
}

impl<'a> From<&'a Chunk> for OverlapSource<'a> {
    fn from(chunk: &'a Chunk) -> Self {
        Self {
            id: &chunk.id,
            text: &chunk.text,
        }
    }
}

/// A run of words shared verbatim by the generated text and one source.
///
/// Indices count whitespace-separated words; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapSpan {
    pub source_id: String,
    /// First word of the run in the generated text.
    pub start: usize,
    /// One past the last word of the run in the generated text.
    pub end: usize,
    /// Number of matching normalized words.
    pub word_count: usize,
    pub source_start: usize,
    pub source_end: usize,
    /// The run as it appears in the generated text.
    pub text: String,
}

/// Outcome of screening one generated text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapVerdict {
    /// Every maximal run at or above the threshold, grouped by source in
    /// input order, then by position in the generated text.
    pub spans: Vec<OverlapSpan>,
    pub exceeds_threshold: bool,
    pub threshold: usize,
    /// Longest shared run against any source, even when below threshold.
    pub longest_run: usize,
    /// Source holding the longest run, if any word was shared at all.
    pub most_similar_source: Option<String>,
    /// `2·M / T` over normalized words against the most similar source.
    pub similarity_ratio: f64,
}

impl OverlapVerdict {
    fn clean(threshold: usize) -> Self {
        Self {
            spans: Vec::new(),
            exceeds_threshold: false,
            threshold,
            longest_run: 0,
            most_similar_source: None,
            similarity_ratio: 0.0,
        }
    }

    /// Ids of sources with at least one offending span, first-seen order.
    pub fn offending_sources(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for span in &self.spans {
            if !ids.contains(&span.source_id.as_str()) {
                ids.push(&span.source_id);
            }
        }
        ids
    }

    /// Human-readable report of the verdict.
    pub fn explain(&self) -> String {
        let mut out = String::new();
        if self.exceeds_threshold {
            out.push_str("OVERLAP DETECTED\n\n");
            out.push_str(&format!(
                "Found {} instance(s) of verbatim copying:\n\n",
                self.spans.len()
            ));
            for (i, span) in self.spans.iter().enumerate() {
                out.push_str(&format!(
                    "{}. {} consecutive words matched from '{}' (words {}..{}):\n   \"{}\"\n\n",
                    i + 1,
                    span.word_count,
                    span.source_id,
                    span.start,
                    span.end,
                    quote(&span.text)
                ));
            }
        } else {
            out.push_str("NO OVERLAP DETECTED\n\n");
            out.push_str(&format!("Longest common run: {} words\n", self.longest_run));
        }
        out.push_str(&format!(
            "Similarity ratio: {:.1}%\n",
            self.similarity_ratio * 100.0
        ));
        out.push_str(&format!(
            "Threshold: {} consecutive words",
            self.threshold
        ));
        out
    }
}

/// Screens generated text against source texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapDetector {
    threshold: usize,
}

impl Default for OverlapDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl OverlapDetector {
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] when `threshold < 1`.
    pub fn new(threshold: usize) -> Result<Self> {
        if threshold < 1 {
            return Err(Error::invalid("threshold must be >= 1"));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn check(&self, generated: &str, sources: &[OverlapSource<'_>]) -> OverlapVerdict {
        let draft = Tokens::new(generated);
        let mut verdict = OverlapVerdict::clean(self.threshold);
        if draft.is_empty() || sources.is_empty() {
            return verdict;
        }

        let mut closest: Option<Tokens<'_>> = None;
        for source in sources {
            let src = Tokens::new(source.text);
            let (longest, runs) = scan(&draft.norm, &src.norm, self.threshold);
            debug!(
                source_id = source.id,
                longest,
                runs = runs.len(),
                "overlap scan"
            );

            for (i, j, len) in runs {
                let (start, end) = draft.original_range(i, len);
                let (source_start, source_end) = src.original_range(j, len);
                verdict.spans.push(OverlapSpan {
                    source_id: source.id.to_string(),
                    start,
                    end,
                    word_count: len,
                    source_start,
                    source_end,
                    text: draft.words[start..end].join(" "),
                });
            }

            if longest > verdict.longest_run {
                verdict.longest_run = longest;
                verdict.most_similar_source = Some(source.id.to_string());
                closest = Some(src);
            }
        }

        if let Some(src) = closest {
            verdict.similarity_ratio = round_to(ratio(&draft.norm, &src.norm), 3);
        }
        verdict.exceeds_threshold = verdict
            .spans
            .iter()
            .any(|s| s.word_count >= self.threshold);
        verdict
    }

    /// Screen against chunks, identifying spans by chunk id.
    pub fn check_chunks(&self, generated: &str, chunks: &[Chunk]) -> OverlapVerdict {
        let sources: Vec<OverlapSource<'_>> = chunks.iter().map(OverlapSource::from).collect();
        self.check(generated, &sources)
    }

    /// Screen several generated texts, each against its own sources.
    pub fn check_batch<'a, I>(&self, posts: I) -> Vec<OverlapVerdict>
    where
        I: IntoIterator<Item = (&'a str, &'a [OverlapSource<'a>])>,
    {
        posts
            .into_iter()
            .enumerate()
            .map(|(i, (generated, sources))| {
                debug!(post = i, sources = sources.len(), "batch overlap check");
                self.check(generated, sources)
            })
            .collect()
    }
}

/// Screen `generated` against `sources` with the given run threshold.
///
/// See [`OverlapDetector::check`].
pub fn detect_overlap(
    generated: &str,
    sources: &[OverlapSource<'_>],
    threshold: usize,
) -> Result<OverlapVerdict> {
    Ok(OverlapDetector::new(threshold)?.check(generated, sources))
}

/// Aggregate figures over a batch of verdicts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverlapStats {
    pub total_checks: usize,
    pub flagged_count: usize,
    /// Percentage of checks flagged, two decimals.
    pub flagged_rate: f64,
    /// Mean similarity ratio, three decimals.
    pub average_similarity: f64,
    pub max_word_overlap: usize,
}

impl OverlapStats {
    pub fn summarize(verdicts: &[OverlapVerdict]) -> Self {
        let total = verdicts.len();
        if total == 0 {
            return Self::default();
        }
        let flagged = verdicts.iter().filter(|v| v.exceeds_threshold).count();
        let ratio_sum: f64 = verdicts.iter().map(|v| v.similarity_ratio).sum();
        Self {
            total_checks: total,
            flagged_count: flagged,
            flagged_rate: round_to(flagged as f64 / total as f64 * 100.0, 2),
            average_similarity: round_to(ratio_sum / total as f64, 3),
            max_word_overlap: verdicts.iter().map(|v| v.longest_run).max().unwrap_or(0),
        }
    }
}

/// Words of a text plus their normalized forms.
///
/// Words that normalize to nothing (pure punctuation, emoji) are skipped;
/// `pos` maps each normalized token back to its original word index.
struct Tokens<'a> {
    words: Vec<&'a str>,
    norm: Vec<String>,
    pos: Vec<usize>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut norm = Vec::with_capacity(words.len());
        let mut pos = Vec::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            let n = normalize_word(word);
            if !n.is_empty() {
                norm.push(n);
                pos.push(i);
            }
        }
        Self { words, norm, pos }
    }

    fn is_empty(&self) -> bool {
        self.norm.is_empty()
    }

    /// Original word range covered by `len` normalized tokens from `i`.
    fn original_range(&self, i: usize, len: usize) -> (usize, usize) {
        (self.pos[i], self.pos[i + len - 1] + 1)
    }
}

fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
///
/// Ties go to the run ending earliest in `a`, then in `b`. `len` is `0`
/// when nothing matches.
fn longest_match(
    a: &[String],
    alo: usize,
    ahi: usize,
    b: &[String],
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    if alo >= ahi || blo >= bhi {
        return best;
    }
    let width = bhi - blo + 1;
    let mut prev = vec![0usize; width];
    let mut cur = vec![0usize; width];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo + 1;
            cur[k] = if a[i] == b[j] { prev[k - 1] + 1 } else { 0 };
            if cur[k] > best.2 {
                best = (i + 1 - cur[k], j + 1 - cur[k], cur[k]);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    best
}

/// Longest common run against `src` and every maximal run `>= threshold`,
/// as `(draft_start, src_start, len)` ordered by draft then source position.
///
/// A run is maximal when it cannot be extended on either side. Runs from
/// different diagonals may overlap in `draft`.
fn scan(draft: &[String], src: &[String], threshold: usize) -> (usize, Vec<(usize, usize, usize)>) {
    let (n, m) = (draft.len(), src.len());
    let mut longest = 0;
    let mut runs = Vec::new();
    if n == 0 || m == 0 {
        return (longest, runs);
    }

    // prev[j + 1] / cur[j + 1]: length of the common run ending at (i, j).
    let mut prev = vec![0usize; m + 1];
    let mut cur = vec![0usize; m + 1];
    for i in 0..n {
        for j in 0..m {
            let len = if draft[i] == src[j] { prev[j] + 1 } else { 0 };
            cur[j + 1] = len;
            if len == 0 {
                continue;
            }
            longest = longest.max(len);
            let extends = i + 1 < n && j + 1 < m && draft[i + 1] == src[j + 1];
            if !extends && len >= threshold {
                runs.push((i + 1 - len, j + 1 - len, len));
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    runs.sort_unstable();
    (longest, runs)
}

/// Sequence-matcher style similarity: `2·M / T`, where `M` counts words in
/// non-crossing matching blocks.
fn ratio(a: &[String], b: &[String]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    let mut matched = 0usize;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, alo, ahi, b, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        pending.push((alo, i, blo, j));
        pending.push((i + k, ahi, j + k, bhi));
    }
    2.0 * matched as f64 / total as f64
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn quote(text: &str) -> String {
    if text.chars().count() > QUOTE_CHARS {
        let head: String = text.chars().take(QUOTE_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
