use thiserror::Error;

/// Failures surfaced by the selector, the overlap detector, and corpus
/// providers.
///
/// Every variant is raised before any output is produced; there is no
/// partial result to recover.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument is outside its accepted range (`k`, `lambda_mult`,
    /// `fetch_k`, `threshold`, or a malformed vector).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A chunk embedding disagrees with the query vector's length.
    #[error("Dimension mismatch for chunk '{chunk_id}': expected {expected}, found {found}")]
    DimensionMismatch {
        chunk_id: String,
        expected: usize,
        found: usize,
    },

    /// The corpus provider failed to yield chunks.
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }
}
