//! Corpus statistics.
//!
//! A quick summary of what the corpus file holds: chunk and post counts,
//! embedding dimensionality, word totals, authors, and the date range of
//! the source posts. Used by `psmith stats` to confirm an embedding export
//! looks sane before selecting from it.

use anyhow::Result;
use chrono::NaiveDate;
use postsmith_core::models::Chunk;
use std::collections::{BTreeMap, HashSet};

use crate::config::Config;
use crate::corpus::JsonCorpus;

/// Aggregate figures over a set of chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSummary {
    pub chunks: usize,
    pub posts: usize,
    pub total_words: usize,
    /// Chunk count per author; unattributed chunks are not listed.
    pub authors: BTreeMap<String, usize>,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

impl CorpusSummary {
    /// Chunks without a `post_id` count as their own post.
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let mut posts = HashSet::new();
        let mut authors = BTreeMap::new();
        let mut total_words = 0;
        let mut earliest: Option<NaiveDate> = None;
        let mut latest: Option<NaiveDate> = None;

        for chunk in chunks {
            total_words += chunk.word_count();
            posts.insert(chunk.metadata.post_id.as_deref().unwrap_or(chunk.id.as_str()));
            if let Some(ref author) = chunk.metadata.author {
                *authors.entry(author.clone()).or_insert(0) += 1;
            }
            if let Some(date) = chunk.metadata.date {
                earliest = Some(earliest.map_or(date, |d| d.min(date)));
                latest = Some(latest.map_or(date, |d| d.max(date)));
            }
        }

        Self {
            chunks: chunks.len(),
            posts: posts.len(),
            total_words,
            authors,
            earliest,
            latest,
        }
    }
}

/// Run the stats command: read the corpus and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let provider = JsonCorpus::new(&config.corpus.path);
    let file = provider.read().await?;
    let summary = CorpusSummary::from_chunks(&file.chunks);

    let size = tokio::fs::metadata(provider.path())
        .await
        .map(|m| m.len())
        .unwrap_or(0);

    println!("postsmith - Corpus Stats");
    println!("========================");
    println!();
    println!("  Corpus:      {}", provider.path().display());
    println!("  Size:        {}", format_bytes(size));
    println!(
        "  Model:       {}",
        file.model.as_deref().unwrap_or("(not recorded)")
    );
    println!();
    println!("  Chunks:      {}", summary.chunks);
    println!("  Posts:       {}", summary.posts);
    println!(
        "  Dimensions:  {}",
        file.dims.map_or_else(|| "-".to_string(), |d| d.to_string())
    );
    println!("  Words:       {}", summary.total_words);
    if summary.chunks > 0 {
        println!(
            "  Avg words:   {:.1}",
            summary.total_words as f64 / summary.chunks as f64
        );
    }
    if let (Some(first), Some(last)) = (summary.earliest, summary.latest) {
        println!(
            "  Dates:       {} .. {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        );
    }

    if !summary.authors.is_empty() {
        println!();
        println!("  By author:");
        println!("  {:<32} {:>8}", "AUTHOR", "CHUNKS");
        println!("  {}", "-".repeat(41));
        for (author, count) in &summary.authors {
            println!("  {:<32} {:>8}", author, count);
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
