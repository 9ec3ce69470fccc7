//! Error types for image operations.

use thiserror::Error;

/// Error type for image operations.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Invalid dimensions specified.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Buffers have incompatible sizes.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A worker task of the concurrent filter failed.
    #[error("filter task failed: {0}")]
    TaskFailed(String),

    /// Data model error.
    #[error(transparent)]
    Core(#[from] spm_core::Error),

    /// Numeric routine error.
    #[error(transparent)]
    Math(#[from] spm_math::MathError),
}

/// Result type for image operations.
pub type OpsResult<T> = Result<T, OpsError>;

/// Checks that `len` matches a `rows x cols` buffer.
pub(crate) fn check_buffer(len: usize, rows: usize, cols: usize) -> OpsResult<()> {
    if rows == 0 || cols == 0 {
        return Err(OpsError::InvalidDimensions(
            "rows and columns must be > 0".into(),
        ));
    }
    let expected = rows
        .checked_mul(cols)
        .ok_or_else(|| OpsError::InvalidDimensions("image dimensions overflow".into()))?;
    if len != expected {
        return Err(OpsError::InvalidDimensions(format!(
            "expected {} values, got {}",
            expected, len
        )));
    }
    Ok(())
}
