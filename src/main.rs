//! # postsmith CLI (`psmith`)
//!
//! Select style context from an embedded corpus and screen generated
//! drafts for verbatim copying.
//!
//! ## Usage
//!
//! ```bash
//! psmith --config ./config/psmith.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `psmith rank` | Rank every chunk by similarity to a query vector |
//! | `psmith select` | Pick a relevant, diverse context set with MMR |
//! | `psmith check <file>...` | Screen generated text for copied runs |
//! | `psmith stats` | Summarize the corpus file |
//!
//! Log verbosity follows `RUST_LOG` (e.g. `RUST_LOG=postsmith_core=debug`);
//! logs go to stderr so results on stdout stay pipeable.

use clap::{Parser, Subcommand};
use postsmith::config::{self, Config};
use postsmith::{check_cmd, select_cmd, stats};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// postsmith CLI: context selection and overlap screening for generated posts.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/psmith.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "psmith",
    about = "postsmith: context selection and overlap screening for generated posts",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/psmith.toml`. Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/psmith.toml")]
    config: PathBuf,

    /// Corpus JSON file, overriding `[corpus].path`.
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Rank every chunk by similarity to the query.
    ///
    /// Prints the full ranking, most similar first. Equal scores keep
    /// corpus order.
    Rank {
        /// Query embedding: a file (JSON array or separated numbers) or an
        /// inline comma-separated list.
        #[arg(long)]
        query: String,

        /// Show only the first N results.
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Select a relevant and diverse set of chunks.
    ///
    /// Ranks the corpus, keeps the `fetch_k` best candidates, then applies
    /// Maximal Marginal Relevance to pick `k` of them.
    Select {
        /// Query embedding: a file or an inline comma-separated list.
        #[arg(long)]
        query: String,

        /// Number of chunks to select.
        #[arg(long)]
        k: Option<usize>,

        /// Relevance/diversity balance in [0, 1]; 1 = relevance only.
        #[arg(long)]
        lambda: Option<f32>,

        /// Candidate pool size before MMR.
        #[arg(long)]
        fetch_k: Option<usize>,

        /// Plain top-k, no diversity re-ranking.
        #[arg(long)]
        no_mmr: bool,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Screen generated text for verbatim runs copied from the corpus.
    ///
    /// Exits with status 2 when any file exceeds the threshold.
    Check {
        /// Generated text files (`-` reads stdin).
        #[arg(required = true)]
        generated: Vec<PathBuf>,

        /// Compare only against these chunk ids (repeatable).
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Minimum run of consecutive words that counts as copying.
        #[arg(long)]
        threshold: Option<usize>,

        /// Print the verdicts as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show corpus statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        info!(path = %cli.config.display(), "no config file, using defaults");
        Config::minimal()
    };
    if let Some(corpus) = cli.corpus {
        cfg.corpus.path = corpus;
    }

    match cli.command {
        Commands::Rank { query, limit, json } => {
            select_cmd::run_rank(&cfg, &query, limit, json).await?;
        }
        Commands::Select {
            query,
            k,
            lambda,
            fetch_k,
            no_mmr,
            json,
        } => {
            let overrides = select_cmd::SelectOverrides {
                k,
                lambda,
                fetch_k,
                no_mmr,
            };
            select_cmd::run_select(&cfg, &query, &overrides, json).await?;
        }
        Commands::Check {
            generated,
            sources,
            threshold,
            json,
        } => {
            let opts = check_cmd::CheckOptions {
                sources,
                threshold,
                json,
            };
            if check_cmd::run_check(&cfg, &generated, &opts).await? {
                std::process::exit(2);
            }
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
