//! # postsmith core
//!
//! Pure retrieval and screening logic for postsmith: chunk models,
//! similarity ranking with Maximal Marginal Relevance re-ranking, the
//! corpus provider abstraction, and verbatim overlap detection.
//!
//! This crate performs no file, network, or database I/O. Callers embed
//! their corpus and query elsewhere and hand the vectors in; callers
//! generate text elsewhere and hand it to [`overlap`] for screening.
//!
//! ```rust
//! use postsmith_core::models::Chunk;
//! use postsmith_core::select::select_with_mmr;
//!
//! let corpus = vec![
//!     Chunk::new("a", "Shipping beats perfect.", vec![1.0, 0.0]),
//!     Chunk::new("b", "Hire for slope, not intercept.", vec![0.0, 1.0]),
//! ];
//! let picked = select_with_mmr(&[1.0, 0.1], &corpus, 1, 0.5).unwrap();
//! assert_eq!(picked[0].chunk.id, "a");
//! ```

pub mod corpus;
pub mod error;
pub mod models;
pub mod overlap;
pub mod select;
pub mod similarity;

pub use error::{Error, Result};
