//! Distribution fits for the histogram overlay.
//!
//! Parameters are estimated in closed form from the retained sample:
//!
//! - Normal: sample mean and standard deviation
//! - Log-normal: mean and standard deviation of `ln x` (positive data only)
//! - Laplace: median and mean absolute deviation from it
//!
//! The overlay curve is scaled so that it sits on top of the histogram for
//! the chosen [`HistogramType`].

use serde::{Deserialize, Serialize};
use spm_math::stats;
use statrs::distribution::{Continuous, ContinuousCDF, Laplace, LogNormal, Normal};
use tracing::debug;

use crate::dataset::{DistributionType, HistogramType};
use crate::error::{HistogramError, HistogramResult};

/// Number of points sampled along the fit curve.
pub const FIT_CURVE_POINTS: usize = 300;

/// Family of the fitted distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FitType {
    /// Gaussian.
    #[default]
    Normal,
    /// Log-normal.
    LogNormal,
    /// Double exponential.
    Laplace,
}

impl FitType {
    /// All fit types, in display order.
    pub const ALL: [FitType; 3] = [FitType::Normal, FitType::LogNormal, FitType::Laplace];

    /// Whether the family needs strictly positive data.
    pub fn requires_positive_values(&self) -> bool {
        matches!(self, FitType::LogNormal)
    }
}

/// A fitted distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FittedDistribution {
    /// Gaussian fit.
    Normal(Normal),
    /// Log-normal fit.
    LogNormal(LogNormal),
    /// Laplace fit.
    Laplace(Laplace),
}

fn fit_error(e: impl std::fmt::Display) -> HistogramError {
    HistogramError::Fit(e.to_string())
}

impl FittedDistribution {
    /// Fits `fit_type` to `sample`.
    pub fn fit(fit_type: FitType, sample: &[f64]) -> HistogramResult<Self> {
        if sample.is_empty() {
            return Err(HistogramError::Fit("empty sample".into()));
        }
        let fitted = match fit_type {
            FitType::Normal => {
                let d = Normal::new(stats::mean(sample), stats::standard_deviation(sample)).map_err(fit_error)?;
                FittedDistribution::Normal(d)
            }
            FitType::LogNormal => {
                if sample.iter().any(|&v| v <= 0.0) {
                    return Err(HistogramError::Fit("log-normal fit needs positive values".into()));
                }
                let logs: Vec<f64> = sample.iter().map(|v| v.ln()).collect();
                let d = LogNormal::new(stats::mean(&logs), stats::standard_deviation(&logs)).map_err(fit_error)?;
                FittedDistribution::LogNormal(d)
            }
            FitType::Laplace => {
                let location = stats::median(sample);
                let scale = stats::mean(&sample.iter().map(|v| (v - location).abs()).collect::<Vec<_>>());
                FittedDistribution::Laplace(Laplace::new(location, scale).map_err(fit_error)?)
            }
        };
        debug!(?fitted, "Fitted distribution");
        Ok(fitted)
    }

    /// Family of this fit.
    pub fn fit_type(&self) -> FitType {
        match self {
            FittedDistribution::Normal(_) => FitType::Normal,
            FittedDistribution::LogNormal(_) => FitType::LogNormal,
            FittedDistribution::Laplace(_) => FitType::Laplace,
        }
    }

    /// Probability density at `x`.
    pub fn density(&self, x: f64) -> f64 {
        match self {
            FittedDistribution::Normal(d) => d.pdf(x),
            FittedDistribution::LogNormal(d) => d.pdf(x),
            FittedDistribution::Laplace(d) => d.pdf(x),
        }
    }

    /// Cumulative probability at `x`.
    pub fn cumulative(&self, x: f64) -> f64 {
        match self {
            FittedDistribution::Normal(d) => d.cdf(x),
            FittedDistribution::LogNormal(d) => d.cdf(x),
            FittedDistribution::Laplace(d) => d.cdf(x),
        }
    }

    /// Curve value at `x` on the scale of a histogram of `count` values
    /// with bins of `width`.
    pub fn scaled_value(
        &self,
        x: f64,
        histogram_type: HistogramType,
        distribution_type: DistributionType,
        count: usize,
        width: f64,
    ) -> f64 {
        let n = count as f64;
        match distribution_type {
            DistributionType::Ordinary => {
                let d = self.density(x);
                match histogram_type {
                    HistogramType::Count => d * n * width,
                    HistogramType::Probability => d * width,
                    HistogramType::ProbabilityDensity => d,
                    HistogramType::LogCount => (d * n * width).log10(),
                }
            }
            DistributionType::Cumulative => {
                let c = self.cumulative(x);
                match histogram_type {
                    HistogramType::Count => c * n,
                    HistogramType::Probability | HistogramType::ProbabilityDensity => c,
                    HistogramType::LogCount => (c * n).log10(),
                }
            }
        }
    }

    /// [`FIT_CURVE_POINTS`] evenly spaced `(x, y)` points over `[from, to]`.
    pub fn curve(
        &self,
        from: f64,
        to: f64,
        histogram_type: HistogramType,
        distribution_type: DistributionType,
        count: usize,
        width: f64,
    ) -> Vec<(f64, f64)> {
        let step = (to - from) / (FIT_CURVE_POINTS - 1) as f64;
        (0..FIT_CURVE_POINTS)
            .map(|i| {
                let x = if i + 1 == FIT_CURVE_POINTS { to } else { from + i as f64 * step };
                (x, self.scaled_value(x, histogram_type, distribution_type, count, width))
            })
            .collect()
    }
}
