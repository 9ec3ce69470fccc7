//! Error types for spm-core data structures.
//!
//! All constructors of the data model validate their inputs eagerly and
//! report failures through [`Error`]. Nothing is silently corrected.
//!
//! # Usage
//!
//! ```rust
//! use spm_core::{Error, Result};
//!
//! fn check_increment(increment: f64) -> Result<()> {
//!     if !(increment > 0.0) {
//!         return Err(Error::invalid_argument(format!("increment must be > 0, got {increment}")));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_increment(0.5).is_ok());
//! assert!(check_increment(-1.0).is_err());
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation
//!
//! # Used By
//!
//! - [`crate::grid::Grid2D`] - Grid validation
//! - [`crate::channel`] - Channel data validation
//! - `spm-ops` - Wrapped into `OpsError`

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the grid and channel data model.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid grid or matrix dimensions.
    ///
    /// Returned when a row or column count is zero, or when a value buffer
    /// does not match the grid it is attached to.
    #[error("invalid dimensions: {rows}x{columns} ({reason})")]
    InvalidDimensions {
        /// Requested row count
        rows: usize,
        /// Requested column count
        columns: usize,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// Two data sets that must agree in size do not.
    #[error("dimension mismatch: {a_rows}x{a_columns} vs {b_rows}x{b_columns}")]
    DimensionMismatch {
        /// First data set rows
        a_rows: usize,
        /// First data set columns
        a_columns: usize,
        /// Second data set rows
        b_rows: usize,
        /// Second data set columns
        b_columns: usize,
    },

    /// Argument outside its legal domain (non-positive increment, empty
    /// coordinate arrays, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(rows: usize, columns: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            rows,
            columns,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::DimensionMismatch`] error from `(rows, columns)` pairs.
    #[inline]
    pub fn dimension_mismatch(a: (usize, usize), b: (usize, usize)) -> Self {
        Self::DimensionMismatch {
            a_rows: a.0,
            a_columns: a.1,
            b_rows: b.0,
            b_columns: b.1,
        }
    }

    /// Creates an [`Error::InvalidArgument`] error.
    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Returns `true` if this is a dimension-related error.
    #[inline]
    pub fn is_dimension_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDimensions { .. } | Self::DimensionMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_dimensions() {
        let err = Error::invalid_dimensions(0, 12, "row count must be > 0");
        let msg = err.to_string();
        assert!(msg.contains("0x12"));
        assert!(msg.contains("row count"));
        assert!(err.is_dimension_error());
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = Error::dimension_mismatch((4, 5), (6, 7));
        let msg = err.to_string();
        assert!(msg.contains("4x5"));
        assert!(msg.contains("6x7"));
    }

    #[test]
    fn test_invalid_argument() {
        let err = Error::invalid_argument("empty coordinates");
        assert!(!err.is_dimension_error());
        assert!(err.to_string().contains("empty coordinates"));
    }
}
