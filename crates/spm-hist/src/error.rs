//! Error types for the histogram model.

use thiserror::Error;

/// Error type for histogram operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistogramError {
    /// Rejected argument (empty sample, trim fraction outside `[0, 1]`,
    /// non-positive bin width or count, disallowed type).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation requested before the model has all its inputs.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// Distribution fit failed.
    #[error("fit failed: {0}")]
    Fit(String),
}

/// Result type for histogram operations.
pub type HistogramResult<T> = Result<T, HistogramError>;
