//! Vector similarity metrics.
//!
//! Both metrics are "higher is closer": cosine similarity directly, and
//! Euclidean distance through its negated square. A selector uses one
//! metric for both query relevance and chunk-to-chunk redundancy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Similarity metric used to compare embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Dot product over the product of magnitudes, in `[-1.0, 1.0]`.
    #[default]
    Cosine,
    /// Negative squared Euclidean distance, in `(-inf, 0.0]`.
    L2,
}

impl Metric {
    /// Score two vectors of equal length. Higher means closer.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_similarity(a, b),
            Metric::L2 => -squared_l2(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Cosine => f.write_str("cosine"),
            Metric::L2 => f.write_str("l2"),
        }
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "l2" | "euclidean" => Ok(Metric::L2),
            other => Err(Error::invalid(format!(
                "unknown similarity metric '{}'; use cosine or l2",
                other
            ))),
        }
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-magnitude vector. Sums are accumulated in `f64` so large finite
/// components do not overflow.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Squared Euclidean distance, accumulated in `f64`. Callers guarantee
/// equal lengths.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>() as f32
}

/// Reject vectors with NaN or infinite components.
pub(crate) fn ensure_finite(what: &str, v: &[f32]) -> Result<()> {
    if let Some(pos) = v.iter().position(|x| !x.is_finite()) {
        return Err(Error::invalid(format!(
            "{} has a non-finite component at position {}",
            what, pos
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_cosine_large_components_do_not_overflow() {
        let query = [1e20, 0.0];
        let near = cosine_similarity(&query, &[1.0, 0.0]);
        let far = cosine_similarity(&query, &[-1e20, 0.0]);
        assert!((near - 1.0).abs() < 1e-6, "near = {}", near);
        assert!((far + 1.0).abs() < 1e-6, "far = {}", far);
    }

    #[test]
    fn test_l2_score_is_negated_square() {
        let s = Metric::L2.score(&[1.0, 2.0], &[4.0, 6.0]);
        assert!((s + 25.0).abs() < 1e-6);
        assert_eq!(Metric::L2.score(&[3.0, 3.0], &[3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_metric_parse_and_display() {
        assert_eq!("cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!("L2".parse::<Metric>().unwrap(), Metric::L2);
        assert_eq!("euclidean".parse::<Metric>().unwrap(), Metric::L2);
        assert!(matches!(
            "dot".parse::<Metric>(),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(Metric::L2.to_string(), "l2");
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite("query", &[0.0, 1.0]).is_ok());
        assert!(ensure_finite("query", &[0.0, f32::NAN]).is_err());
        assert!(ensure_finite("query", &[f32::INFINITY]).is_err());
    }
}
