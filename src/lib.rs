//! # postsmith
//!
//! Context selection and overlap screening for persona-style post
//! generation.
//!
//! postsmith sits on both sides of a generation call. Before it, the
//! selector picks a small, diverse set of a person's past writing to use as
//! style context. After it, the overlap detector screens the draft for long
//! verbatim runs copied from that context.
//!
//! ```text
//! ┌─────────────┐   ┌────────────────────┐   ┌────────────┐   ┌─────────────────┐
//! │ corpus.json │──▶│ SimilaritySelector │──▶│ generation │──▶│ OverlapDetector │
//! │ (embedded)  │   │    rank + MMR      │   │ (external) │   │     verdict     │
//! └─────────────┘   └────────────────────┘   └────────────┘   └─────────────────┘
//! ```
//!
//! Embedding and generation happen elsewhere; the corpus arrives as JSON
//! with vectors attached, and generated drafts arrive as text files.
//!
//! ## Quick Start
//!
//! ```bash
//! psmith stats
//! psmith select --query query.json --k 5 --lambda 0.5
//! psmith check draft.txt --source post-3_chunk_0 --source post-9_chunk_1
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`corpus`] | JSON-file corpus provider |
//! | [`select_cmd`] | Ranking and MMR selection commands |
//! | [`check_cmd`] | Overlap screening command |
//! | [`stats`] | Corpus statistics |
//!
//! The algorithms themselves live in the `postsmith-core` crate.

pub mod check_cmd;
pub mod config;
pub mod corpus;
pub mod select_cmd;
pub mod stats;
