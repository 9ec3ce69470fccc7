//! # spm-hist
//!
//! Histogram binning model for AFM samples.
//!
//! A [`HistogramSampleModel`] holds one named sample together with its
//! binning settings. User edits keep bin count, bin width and range
//! consistent according to the active [`BinningMethod`], and every edit
//! reports its consequences as [`HistogramModelEvent`]s.
//!
//! # Modules
//!
//! - [`binning`] - Binning policies and the width/count arithmetic
//! - [`dataset`] - Bins and their plotted values
//! - [`fit`] - Normal, log-normal and Laplace fits with overlay curves
//! - [`model`] - The editable model with trimming, undo and listeners
//!
//! # Example
//!
//! ```rust
//! use spm_hist::{BinningMethod, HistogramSampleModel, HistogramType};
//!
//! let sample = [0.8, 1.1, 1.3, 1.2, 0.9, 1.0, 1.4, 1.05];
//! let mut model = HistogramSampleModel::new("roughness", &sample).unwrap();
//! model.specify_binning_method(BinningMethod::SquareRoot);
//! model.specify_histogram_type(HistogramType::Probability).unwrap();
//!
//! let histogram = model.histogram_dataset().unwrap();
//! let total: f64 = histogram.bins().iter().map(|b| b.y).sum();
//! assert!((total - 1.0).abs() < 1e-12);
//! ```
//!
//! # Dependencies
//!
//! - `spm-math` - Sorting, trimming, quartiles
//! - `statrs` - Distributions for the fit overlay
//!
//! # Used By
//!
//! - `spm-cli` - `spm hist` report

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod binning;
pub mod dataset;
pub mod fit;
pub mod model;

pub use binning::BinningMethod;
pub use dataset::{DistributionType, HistogramBin, HistogramDataset, HistogramType};
pub use error::{HistogramError, HistogramResult};
pub use fit::{FitType, FittedDistribution};
pub use model::{HistogramModelEvent, HistogramSampleModel, ListenerId, SpecifiedBinParameter};
