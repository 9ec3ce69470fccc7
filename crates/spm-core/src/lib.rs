//! # spm-core
//!
//! Core types for AFM image processing.
//!
//! This crate provides the data model shared by every other spm-rs crate:
//!
//! - [`Grid2D`] - Regular sampling lattice with origin, spacing and units
//! - [`GridChannel2DData`], [`ScatteredChannel2DData`], [`Channel2D`] - Channel data
//! - [`Quantity`], [`Unit`] - Physical quantities and unit conversion
//! - [`Roi`], [`RoiPosition`], [`GridPointRecipient`] - Masked point iteration
//! - [`Interpolation2D`] - Interpolation seam implemented in `spm-math`
//!
//! ## Crate Structure
//!
//! ```text
//! spm-core (this crate)
//!    ^
//!    |
//!    +-- spm-math (SVD, statistics, regression, interpolation)
//!    +-- spm-ops (convolution, transforms, flood fill, line correction)
//!    +-- spm-hist (histogram binning model)
//! ```
//!
//! ## Design
//!
//! Channels are immutable values. A transformation takes a channel by
//! reference and returns a new one; nothing is modified in place.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channel;
pub mod error;
pub mod grid;
pub mod interpolation;
pub mod quantity;
pub mod roi;

pub use channel::{Channel2D, GridChannel2DData, GriddingConfig, PointDomain, ScatteredChannel2DData};
pub use error::{Error, Result};
pub use grid::Grid2D;
pub use interpolation::Interpolation2D;
pub use quantity::{Dimension, Quantity, Unit, convert_or_raw};
pub use roi::{GridMask, GridPointRecipient, PointCounter, Roi, RoiPosition};

/// Prelude module for convenient imports.
///
/// # Usage
///
/// ```
/// use spm_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::channel::{Channel2D, GridChannel2DData, ScatteredChannel2DData};
    pub use crate::error::{Error, Result};
    pub use crate::grid::Grid2D;
    pub use crate::interpolation::Interpolation2D;
    pub use crate::quantity::{Quantity, Unit};
    pub use crate::roi::{GridMask, GridPointRecipient, Roi, RoiPosition};
}
