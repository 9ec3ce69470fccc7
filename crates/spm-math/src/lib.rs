//! # spm-math
//!
//! Numeric routines for AFM image processing.
//!
//! - [`svd`] - Singular value decomposition and numeric rank
//! - [`stats`] - Descriptive statistics and location measures
//! - [`regression`] - Polynomial L2/L1 fits used for line correction
//! - [`InterpolationMethod2D`] - Grid interpolation and scattered gridding
//!
//! # Usage
//!
//! ```rust
//! use spm_math::{RegressionStrategy, fit_polynomial, stats};
//!
//! let x = [0.0, 1.0, 2.0, 3.0];
//! let y = [1.0, 3.0, 5.0, 7.0];
//! let line = fit_polynomial(&x, &y, 1, RegressionStrategy::LeastSquares).unwrap();
//! assert!((line.value(4.0) - 9.0).abs() < 1e-9);
//! assert_eq!(stats::median(&y), 4.0);
//! ```
//!
//! # Dependencies
//!
//! - [`nalgebra`] - SVD and least-squares solves
//! - `spm-core` - [`Interpolation2D`](spm_core::Interpolation2D) seam and channel types
//!
//! # Used By
//!
//! - `spm-ops` - Kernel separability, line correction, interpolation
//! - `spm-hist` - Bin width rules and trimming

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod interp;
pub mod regression;
pub mod stats;
pub mod svd;

pub use error::{MathError, MathResult};
pub use interp::InterpolationMethod2D;
pub use regression::{Polynomial, RegressionStrategy, fit_polynomial};
pub use stats::LocationMeasure;
pub use svd::{MatrixDecomposition, NalgebraSvd, SvdResult, numeric_rank};
