//! TOML configuration for the `psmith` CLI.
//!
//! ```toml
//! [corpus]
//! path = "data/corpus.json"
//!
//! [retrieval]
//! top_k = 5
//! lambda_mult = 0.5
//! fetch_k = 20
//! use_mmr = true
//! metric = "cosine"
//!
//! [overlap]
//! threshold = 25
//! ```
//!
//! Only `[corpus]` is required; the other tables fall back to defaults.

use anyhow::{Context, Result};
use postsmith_core::overlap::DEFAULT_THRESHOLD;
use postsmith_core::select::{SelectParams, DEFAULT_FETCH_K};
use postsmith_core::similarity::Metric;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub overlap: OverlapConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// JSON file holding the pre-embedded chunks.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_lambda_mult")]
    pub lambda_mult: f32,
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
    #[serde(default = "default_use_mmr")]
    pub use_mmr: bool,
    #[serde(default)]
    pub metric: Metric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            lambda_mult: default_lambda_mult(),
            fetch_k: default_fetch_k(),
            use_mmr: default_use_mmr(),
            metric: Metric::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn params(&self) -> SelectParams {
        SelectParams {
            top_k: self.top_k,
            lambda_mult: self.lambda_mult,
            fetch_k: self.fetch_k,
            use_mmr: self.use_mmr,
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_lambda_mult() -> f32 {
    0.5
}
fn default_fetch_k() -> usize {
    DEFAULT_FETCH_K
}
fn default_use_mmr() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlapConfig {
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> usize {
    DEFAULT_THRESHOLD
}

impl Config {
    /// Defaults used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            corpus: CorpusConfig {
                path: PathBuf::from("data/corpus.json"),
            },
            retrieval: RetrievalConfig::default(),
            overlap: OverlapConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Check value ranges of a loaded config.
pub fn validate(config: &Config) -> Result<()> {
    validate_retrieval(&config.retrieval.params())?;
    validate_threshold(config.overlap.threshold)
}

/// Check retrieval parameters, including ones merged from CLI flags.
pub fn validate_retrieval(params: &SelectParams) -> Result<()> {
    if params.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(0.0..=1.0).contains(&params.lambda_mult) {
        anyhow::bail!("retrieval.lambda_mult must be in [0.0, 1.0]");
    }
    if params.fetch_k < params.top_k {
        anyhow::bail!(
            "retrieval.fetch_k ({}) must be >= retrieval.top_k ({})",
            params.fetch_k,
            params.top_k
        );
    }
    Ok(())
}

pub fn validate_threshold(threshold: usize) -> Result<()> {
    if threshold < 1 {
        anyhow::bail!("overlap.threshold must be >= 1");
    }
    Ok(())
}
