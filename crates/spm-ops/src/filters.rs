//! Predefined per-cell filters.
//!
//! - [`MedianFilter`] - Median of a square window (in-bounds cells only)
//! - [`GradientMagnitudeFilter`] - Sobel gradient magnitude
//! - [`ConvolutionFilter`] - Any [`Kernel2D`] evaluated cell by cell
//!
//! [`FilterTransformation`] runs a filter through the [`ConcurrentFilter`]
//! and exposes it as a [`GridTransform`].

use spm_core::{GridChannel2DData, Roi, RoiPosition};
use tracing::trace;

use crate::concurrent::{ConcurrencyConfig, ConcurrentFilter, PixelFilter};
use crate::error::OpsResult;
use crate::kernel::Kernel2D;
use crate::transform::GridTransform;

/// Median over a `(2 * radius + 1)²` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MedianFilter {
    radius: usize,
}

impl MedianFilter {
    /// Median filter with the given window radius.
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    /// Window radius.
    pub fn radius(&self) -> usize {
        self.radius
    }
}

impl PixelFilter for MedianFilter {
    fn filter(&self, row: usize, col: usize, src: &[f64], rows: usize, cols: usize) -> OpsResult<f64> {
        let r0 = row.saturating_sub(self.radius);
        let r1 = (row + self.radius + 1).min(rows);
        let c0 = col.saturating_sub(self.radius);
        let c1 = (col + self.radius + 1).min(cols);
        let mut window: Vec<f64> = Vec::with_capacity((r1 - r0) * (c1 - c0));
        for r in r0..r1 {
            window.extend(src[r * cols + c0..r * cols + c1].iter().copied().filter(|v| !v.is_nan()));
        }
        if window.is_empty() {
            return Ok(f64::NAN);
        }
        window.sort_by(f64::total_cmp);
        let mid = window.len() / 2;
        Ok(if window.len() % 2 == 1 {
            window[mid]
        } else {
            0.5 * (window[mid - 1] + window[mid])
        })
    }
}

/// Magnitude of the Sobel gradient, in value units per cell.
#[derive(Debug, Clone)]
pub struct GradientMagnitudeFilter {
    gx: Kernel2D,
    gy: Kernel2D,
}

impl Default for GradientMagnitudeFilter {
    fn default() -> Self {
        Self {
            gx: Kernel2D::sobel_x(),
            gy: Kernel2D::sobel_y(),
        }
    }
}

impl PixelFilter for GradientMagnitudeFilter {
    fn filter(&self, row: usize, col: usize, src: &[f64], rows: usize, cols: usize) -> OpsResult<f64> {
        let gx = self.gx.convolve_at(row, col, src, rows, cols) / 8.0;
        let gy = self.gy.convolve_at(row, col, src, rows, cols) / 8.0;
        Ok(gx.hypot(gy))
    }
}

/// Kernel convolution evaluated per cell.
#[derive(Debug, Clone)]
pub struct ConvolutionFilter {
    kernel: Kernel2D,
}

impl ConvolutionFilter {
    /// Filter convolving with `kernel`.
    pub fn new(kernel: Kernel2D) -> Self {
        Self { kernel }
    }
}

impl PixelFilter for ConvolutionFilter {
    fn filter(&self, row: usize, col: usize, src: &[f64], rows: usize, cols: usize) -> OpsResult<f64> {
        Ok(self.kernel.convolve_at(row, col, src, rows, cols))
    }
}

/// Any [`PixelFilter`] as a grid transform, run concurrently.
#[derive(Debug, Clone)]
pub struct FilterTransformation<F> {
    filter: F,
    runner: ConcurrentFilter,
}

impl<F: PixelFilter> FilterTransformation<F> {
    /// Wraps `filter` with default concurrency.
    pub fn new(filter: F) -> Self {
        Self::with_concurrency(filter, ConcurrencyConfig::default())
    }

    /// Wraps `filter` with explicit concurrency settings.
    pub fn with_concurrency(filter: F, config: ConcurrencyConfig) -> Self {
        Self {
            filter,
            runner: ConcurrentFilter::new(config),
        }
    }
}

impl<F: PixelFilter> GridTransform for FilterTransformation<F> {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        trace!(rows = channel.row_count(), cols = channel.column_count(), "filter transformation");
        let values = self
            .runner
            .apply(&self.filter, channel.values(), channel.row_count(), channel.column_count())?;
        Ok(channel.with_values(values)?)
    }

    fn transform_grid_in_roi(
        &self,
        channel: &GridChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<GridChannel2DData> {
        if position == RoiPosition::Everything {
            return self.transform_grid(channel);
        }
        let mask = roi.mask(channel.grid(), position);
        let values = self.runner.apply_masked(
            &self.filter,
            channel.values(),
            channel.row_count(),
            channel.column_count(),
            &mask,
        )?;
        Ok(channel.with_values(values)?)
    }
}
