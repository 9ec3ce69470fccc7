//! Error types for numeric routines.

use thiserror::Error;

/// Error type for numeric routines.
#[derive(Error, Debug)]
pub enum MathError {
    /// Not enough data points for the requested computation.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A decomposition or solve did not produce a result.
    #[error("decomposition failed: {0}")]
    DecompositionFailed(String),
}

/// Result type for numeric routines.
pub type MathResult<T> = Result<T, MathError>;
