//! Error types for spatial refinement.

use thiserror::Error;

/// Convenience result alias used across the crate.
pub type Result<T> = std::result::Result<T, FilterError>;

/// Fatal errors for a single filter construction or evaluation.
///
/// These propagate to the caller; no retries are attempted inside the filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Invalid construction input or operator configuration.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The text engine failed while running the query or reading a stored field.
    #[error("search engine failure: {0}")]
    Search(String),

    /// The feature store failed during the batched geometry fetch.
    #[error("feature store failure: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Recoverable failure while evaluating the spatial predicate against a
/// single feature geometry.
///
/// Never escapes the refinement loop: the offending feature counts as a
/// non-match and evaluation continues with the remaining candidates.
#[derive(Debug, Clone, Error)]
#[error("topology error: {message}")]
pub struct TopologyError {
    /// What went wrong during evaluation.
    pub message: String,
    /// Rendering of the offending geometry, for debug logging.
    pub geometry: String,
}
