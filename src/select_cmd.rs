//! `psmith rank` and `psmith select`.
//!
//! Both commands read the corpus through [`JsonCorpus`] and take the query
//! embedding either as a file (JSON array or comma/whitespace separated
//! numbers) or inline as comma-separated numbers.

use anyhow::{bail, Context, Result};
use postsmith_core::corpus::{retrieve, CorpusProvider};
use postsmith_core::models::ScoredChunk;
use postsmith_core::select::{lexical_diversity, SelectParams, SimilaritySelector};
use serde::Serialize;
use std::path::Path;

use crate::config::{self, Config};
use crate::corpus::JsonCorpus;

/// Maximum characters of chunk text shown per result.
const EXCERPT_CHARS: usize = 160;

/// Command-line overrides for the `[retrieval]` table.
#[derive(Debug, Clone, Default)]
pub struct SelectOverrides {
    pub k: Option<usize>,
    pub lambda: Option<f32>,
    pub fetch_k: Option<usize>,
    pub no_mmr: bool,
}

impl SelectOverrides {
    /// Merge into the configured parameters. Without an explicit
    /// `--fetch-k`, the pool grows to at least `k`.
    pub fn apply(&self, base: SelectParams) -> SelectParams {
        let top_k = self.k.unwrap_or(base.top_k);
        SelectParams {
            top_k,
            lambda_mult: self.lambda.unwrap_or(base.lambda_mult),
            fetch_k: self.fetch_k.unwrap_or(base.fetch_k.max(top_k)),
            use_mmr: base.use_mmr && !self.no_mmr,
        }
    }
}

#[derive(Serialize)]
struct SelectReport<'a> {
    params: ParamsReport,
    results: &'a [ScoredChunk],
    lexical_diversity: f64,
}

#[derive(Serialize)]
struct ParamsReport {
    top_k: usize,
    lambda_mult: f32,
    fetch_k: usize,
    use_mmr: bool,
    metric: String,
}

/// Parse a query vector from a file path or an inline list.
pub async fn load_query(arg: &str) -> Result<Vec<f32>> {
    let path = Path::new(arg);
    let text = if tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read query file: {}", path.display()))?
    } else {
        arg.to_string()
    };
    parse_vector(&text)
}

fn parse_vector(text: &str) -> Result<Vec<f32>> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse query vector as JSON");
    }
    let values = trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f32>()
                .with_context(|| format!("Invalid number in query vector: '{}'", s))
        })
        .collect::<Result<Vec<f32>>>()?;
    if values.is_empty() {
        bail!("Query vector is empty");
    }
    Ok(values)
}

/// Print the full similarity ranking (or its first `limit` entries).
pub async fn run_rank(config: &Config, query: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let query = load_query(query).await?;
    let provider = JsonCorpus::new(&config.corpus.path);
    let corpus = provider.chunks().await?;

    let selector = SimilaritySelector::new(config.retrieval.metric);
    let mut ranked = selector.rank_by_similarity(&query, &corpus)?;
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }
    if ranked.is_empty() {
        println!("No results.");
        return Ok(());
    }
    println!(
        "Ranked {} of {} chunks (metric={})",
        ranked.len(),
        corpus.len(),
        selector.metric()
    );
    println!();
    print_results(&ranked);
    Ok(())
}

/// Retrieve a diverse context set and print it with its lexical diversity.
pub async fn run_select(
    config: &Config,
    query: &str,
    overrides: &SelectOverrides,
    json: bool,
) -> Result<()> {
    let params = overrides.apply(config.retrieval.params());
    config::validate_retrieval(&params)?;
    let query = load_query(query).await?;
    let provider = JsonCorpus::new(&config.corpus.path);
    let selector = SimilaritySelector::new(config.retrieval.metric);

    let selected = retrieve(&provider, &selector, &query, &params).await?;
    let diversity = lexical_diversity(&selected);

    if json {
        let report = SelectReport {
            params: ParamsReport {
                top_k: params.top_k,
                lambda_mult: params.lambda_mult,
                fetch_k: params.fetch_k,
                use_mmr: params.use_mmr,
                metric: selector.metric().to_string(),
            },
            results: &selected,
            lexical_diversity: diversity,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if selected.is_empty() {
        println!("No results.");
        return Ok(());
    }
    let mode = if params.use_mmr {
        format!("mmr, lambda={:.2}, fetch_k={}", params.lambda_mult, params.fetch_k)
    } else {
        "top-k".to_string()
    };
    println!(
        "Selected {} chunks ({}, metric={})",
        selected.len(),
        mode,
        selector.metric()
    );
    println!();
    print_results(&selected);
    println!("Lexical diversity: {:.3}", diversity);
    Ok(())
}

fn print_results(results: &[ScoredChunk]) {
    for (i, sc) in results.iter().enumerate() {
        match sc.mmr_score {
            Some(mmr) => println!("{}. [{:.4}] {} (mmr {:.4})", i + 1, sc.score, sc.chunk.id, mmr),
            None => println!("{}. [{:.4}] {}", i + 1, sc.score, sc.chunk.id),
        }
        let meta = &sc.chunk.metadata;
        if let Some(ref author) = meta.author {
            println!("    author: {}", author);
        }
        if let Some(date) = meta.date {
            println!("    date: {}", date.format("%Y-%m-%d"));
        }
        if let Some(ref link) = meta.link {
            println!("    link: {}", link);
        }
        println!("    excerpt: \"{}\"", excerpt(&sc.chunk.text));
        println!();
    }
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > EXCERPT_CHARS {
        let head: String = flat.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", head)
    } else {
        flat
    }
}
