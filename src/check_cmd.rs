//! `psmith check`: screen generated posts for verbatim copying.
//!
//! Each generated file is compared against the whole corpus, or against
//! the chunks named with `--source` (typically the ones that were used as
//! prompt context). The command reports whether any file was flagged so
//! `main` can exit non-zero and a wrapper script can regenerate.

use anyhow::{bail, Context, Result};
use postsmith_core::corpus::CorpusProvider;
use postsmith_core::models::Chunk;
use postsmith_core::overlap::{OverlapDetector, OverlapSource, OverlapStats, OverlapVerdict};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::config::{self, Config};
use crate::corpus::JsonCorpus;

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Restrict screening to these chunk ids.
    pub sources: Vec<String>,
    /// Override `[overlap].threshold`.
    pub threshold: Option<usize>,
    pub json: bool,
}

#[derive(Serialize)]
struct CheckEntry<'a> {
    path: String,
    #[serde(flatten)]
    verdict: &'a OverlapVerdict,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    checks: Vec<CheckEntry<'a>>,
    stats: OverlapStats,
}

/// Run the check. Returns `true` when any generated text was flagged.
pub async fn run_check(config: &Config, generated: &[PathBuf], opts: &CheckOptions) -> Result<bool> {
    if generated.is_empty() {
        bail!("No generated text given");
    }
    let threshold = opts.threshold.unwrap_or(config.overlap.threshold);
    config::validate_threshold(threshold)?;
    let detector = OverlapDetector::new(threshold)?;

    let provider = JsonCorpus::new(&config.corpus.path);
    let chunks = load_sources(&provider, &opts.sources).await?;
    let sources: Vec<OverlapSource<'_>> = chunks.iter().map(OverlapSource::from).collect();

    let mut texts = Vec::with_capacity(generated.len());
    for path in generated {
        texts.push(read_generated(path).await?);
    }

    let verdicts = detector.check_batch(texts.iter().map(|t| (t.as_str(), &sources[..])));
    let stats = OverlapStats::summarize(&verdicts);
    info!(
        checks = stats.total_checks,
        flagged = stats.flagged_count,
        threshold = detector.threshold(),
        "overlap check finished"
    );

    if opts.json {
        let report = CheckReport {
            checks: generated
                .iter()
                .zip(&verdicts)
                .map(|(path, verdict)| CheckEntry {
                    path: path.display().to_string(),
                    verdict,
                })
                .collect(),
            stats: stats.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (path, verdict) in generated.iter().zip(&verdicts) {
            if generated.len() > 1 {
                println!("== {} ==", path.display());
            }
            println!("{}", verdict.explain());
            println!();
        }
        if generated.len() > 1 {
            print_stats(&stats);
        }
    }

    Ok(stats.flagged_count > 0)
}

async fn load_sources<P: CorpusProvider + ?Sized>(provider: &P, ids: &[String]) -> Result<Vec<Chunk>> {
    if ids.is_empty() {
        return provider.chunks().await;
    }
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }
    let chunks = provider.chunks_by_id(&unique).await?;
    let missing: Vec<&str> = unique
        .iter()
        .filter(|id| !chunks.iter().any(|c| &c.id == *id))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        bail!("Unknown source chunk id(s): {}", missing.join(", "));
    }
    Ok(chunks)
}

async fn read_generated(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read generated text from stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read generated text: {}", path.display()))
}

fn print_stats(stats: &OverlapStats) {
    println!("Summary");
    println!("=======");
    println!("  Checks:              {}", stats.total_checks);
    println!(
        "  Flagged:             {} ({:.2}%)",
        stats.flagged_count, stats.flagged_rate
    );
    println!("  Average similarity:  {:.3}", stats.average_similarity);
    println!("  Max word overlap:    {}", stats.max_word_overlap);
}
