//! # spm-ops
//!
//! Image transformations for AFM channel data.
//!
//! Every transformation is a small parameter object implementing
//! [`GridTransform`] and, where it makes sense for scattered points too,
//! [`Channel2DTransform`]. Inputs are never modified.
//!
//! # Modules
//!
//! - [`kernel`] - Convolution kernels and SVD-based separation
//! - [`convolve`] - Direct, two-pass and auto-selecting convolution
//! - [`concurrent`] - Row-partitioned parallel per-cell filtering
//! - [`filters`] - Median, gradient and kernel filters
//! - [`geometry`] - Flips, transpose, quarter turns, arbitrary rotation
//! - [`resize`] - Regridding to new dimensions
//! - [`arithmetic`] - Image/constant arithmetic and surface functions
//! - [`fix_minimum`] - Level shift pinning the minimum
//! - [`flood_fill`] / [`contour`] - Region growing and boundary tracing
//! - [`line_correction`] - Scan-line fitting and matching
//!
//! # Example
//!
//! ```rust
//! use spm_core::{Grid2D, GridChannel2DData, Quantity};
//! use spm_ops::{GridTransform, Kernel2D, KernelTransformation};
//!
//! let grid = Grid2D::new(16, 16, 0.0, 0.0, 0.1, 0.1).unwrap();
//! let ch = GridChannel2DData::filled(grid, 3.0, Quantity::height());
//! let smooth = KernelTransformation::new(Kernel2D::gaussian(1.0, 1.0, 2).unwrap());
//! let out = smooth.transform_grid(&ch).unwrap();
//! assert!((out.value(8, 8) - 3.0).abs() < 1e-12);
//! ```
//!
//! # Features
//!
//! - `parallel` (default) - run the concurrent filter on a rayon pool
//!
//! # Dependencies
//!
//! - `spm-core` - Channel data model and ROI iteration
//! - `spm-math` - SVD, regression, statistics, interpolation
//! - `rayon` - Worker pool for [`concurrent::ConcurrentFilter`]

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod arithmetic;
pub mod concurrent;
pub mod contour;
pub mod convolve;
pub mod filters;
pub mod fix_minimum;
pub mod flood_fill;
pub mod geometry;
pub mod kernel;
pub mod line_correction;
pub mod resize;
pub mod transform;

pub use error::{OpsError, OpsResult};
pub use concurrent::{ConcurrencyConfig, ConcurrentFilter, PixelFilter};
pub use convolve::{Convolution, KernelConvolution, KernelTransformation};
pub use kernel::Kernel2D;
pub use line_correction::{LineDirection, LineFitCorrection, LineMatchingCorrection};
pub use transform::{Channel2DTransform, GridTransform, GriddedTransform, ScatteredTransform};
