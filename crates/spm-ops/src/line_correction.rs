//! Line-wise artifact removal.
//!
//! Scan lines (rows or columns of the grid) often carry their own offset or
//! tilt. Two corrections are provided:
//!
//! - [`LineFitCorrection`] - fits a polynomial to each line and subtracts it
//! - [`LineMatchingCorrection`] - shifts each line so its location (median,
//!   mean, trimmed mean) matches the location of all line locations
//!
//! A line contributes only when it has at least
//! `minimal_line_length_fraction * line_length` usable points (non-NaN and,
//! with a ROI, matching it). Lines without a fit receive a correction
//! interpolated linearly between the nearest fitted lines; before the first
//! and after the last fitted line the nearest one is copied. When no line can
//! be fitted the channel is returned unchanged.
//!
//! The ROI only selects the points used for fitting; the correction is
//! applied to whole lines.
//!
//! # Example
//!
//! ```rust
//! use spm_core::{Grid2D, GridChannel2DData, Quantity};
//! use spm_ops::line_correction::LineMatchingCorrection;
//! use spm_ops::transform::GridTransform;
//!
//! let grid = Grid2D::new(3, 2, 0.0, 0.0, 1.0, 1.0).unwrap();
//! let ch = GridChannel2DData::new(grid, vec![0.0, 0.0, 5.0, 5.0, 1.0, 1.0], Quantity::height()).unwrap();
//! let matched = LineMatchingCorrection::default().transform_grid(&ch).unwrap();
//! assert_eq!(matched.values(), &[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
//! ```

use serde::{Deserialize, Serialize};
use spm_core::{GridChannel2DData, GridMask, Roi, RoiPosition};
use spm_math::{LocationMeasure, RegressionStrategy, fit_polynomial};
use tracing::{debug, trace, warn};

use crate::error::{OpsError, OpsResult};
use crate::transform::GridTransform;

/// Orientation of the scan lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineDirection {
    /// Each row is a line (fast scan along x).
    #[default]
    Rows,
    /// Each column is a line (fast scan along y).
    Columns,
}

/// One scan line: positions along the line, values and usable flags.
struct Line {
    positions: Vec<f64>,
    values: Vec<f64>,
    usable: Vec<bool>,
}

impl Line {
    fn usable_count(&self) -> usize {
        self.usable.iter().filter(|&&u| u).count()
    }

    fn usable_points(&self) -> (Vec<f64>, Vec<f64>) {
        self.positions
            .iter()
            .zip(&self.values)
            .zip(&self.usable)
            .filter(|&(_, &u)| u)
            .map(|((&p, &v), _)| (p, v))
            .unzip()
    }

    fn has_enough_points(&self, fraction: f64) -> bool {
        self.usable_count() as f64 >= fraction * self.values.len() as f64
    }
}

fn extract_lines(channel: &GridChannel2DData, direction: LineDirection, mask: Option<&GridMask>) -> Vec<Line> {
    let grid = channel.grid();
    let (count, length) = match direction {
        LineDirection::Rows => (channel.row_count(), channel.column_count()),
        LineDirection::Columns => (channel.column_count(), channel.row_count()),
    };
    (0..count)
        .map(|k| {
            let cell = |j: usize| match direction {
                LineDirection::Rows => (k, j),
                LineDirection::Columns => (j, k),
            };
            let positions = (0..length)
                .map(|j| match direction {
                    LineDirection::Rows => grid.x(j),
                    LineDirection::Columns => grid.y(j),
                })
                .collect();
            let values: Vec<f64> = (0..length)
                .map(|j| {
                    let (r, c) = cell(j);
                    channel.value(r, c)
                })
                .collect();
            let usable = (0..length)
                .map(|j| {
                    let (r, c) = cell(j);
                    !values[j].is_nan() && mask.is_none_or(|m| m.contains(r, c))
                })
                .collect();
            Line {
                positions,
                values,
                usable,
            }
        })
        .collect()
}

/// Writes `corrected(k, j, value)` for every cell of every line.
fn write_lines(
    channel: &GridChannel2DData,
    direction: LineDirection,
    corrected: impl Fn(usize, usize, f64) -> f64,
) -> OpsResult<GridChannel2DData> {
    let cols = channel.column_count();
    let values = channel
        .values()
        .iter()
        .enumerate()
        .map(|(i, &v)| match direction {
            LineDirection::Rows => corrected(i / cols, i % cols, v),
            LineDirection::Columns => corrected(i % cols, i / cols, v),
        })
        .collect();
    Ok(channel.with_values(values)?)
}

/// Replaces missing entries by linear interpolation between the nearest
/// present neighbours; edges copy the nearest present entry.
///
/// Returns `None` when every entry is missing.
fn fill_missing<T: Clone>(entries: Vec<Option<T>>, lerp: impl Fn(&T, &T, f64) -> T) -> Option<Vec<T>> {
    let present: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.as_ref().map(|_| i))
        .collect();
    let (&first, &last) = (present.first()?, present.last()?);

    let mut out: Vec<T> = Vec::with_capacity(entries.len());
    let mut next = 0;
    for (i, entry) in entries.iter().enumerate() {
        if let Some(e) = entry {
            out.push(e.clone());
            next += 1;
            continue;
        }
        let value = if i < first {
            entries[first].clone()
        } else if i > last {
            entries[last].clone()
        } else {
            let (lo, hi) = (present[next - 1], present[next]);
            let t = (i - lo) as f64 / (hi - lo) as f64;
            match (&entries[lo], &entries[hi]) {
                (Some(a), Some(b)) => Some(lerp(a, b, t)),
                _ => None,
            }
        };
        out.push(value?);
    }
    Some(out)
}

fn check_fraction(fraction: f64) -> OpsResult<()> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(OpsError::InvalidParameter(format!(
            "minimal line length fraction must be in [0, 1], got {fraction}"
        )));
    }
    Ok(())
}

fn fitting_mask(channel: &GridChannel2DData, roi: &Roi, position: RoiPosition) -> Option<GridMask> {
    (position != RoiPosition::Everything).then(|| roi.mask(channel.grid(), position))
}

/// Subtracts a per-line polynomial fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineFitCorrection {
    /// Polynomial degree (0 removes offsets, 1 removes tilt).
    pub degree: usize,
    /// Regression loss.
    pub strategy: RegressionStrategy,
    /// Line orientation.
    pub direction: LineDirection,
    /// Minimum usable share of a line for it to be fitted.
    pub minimal_line_length_fraction: f64,
}

impl Default for LineFitCorrection {
    fn default() -> Self {
        Self {
            degree: 1,
            strategy: RegressionStrategy::default(),
            direction: LineDirection::default(),
            minimal_line_length_fraction: 0.0,
        }
    }
}

impl LineFitCorrection {
    /// Least-squares fit of `degree` along rows.
    pub fn new(degree: usize) -> Self {
        Self {
            degree,
            ..Self::default()
        }
    }

    /// Sets the regression loss.
    pub fn with_strategy(mut self, strategy: RegressionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the line orientation.
    pub fn with_direction(mut self, direction: LineDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the minimum usable share of a line.
    pub fn with_minimal_line_length_fraction(mut self, fraction: f64) -> Self {
        self.minimal_line_length_fraction = fraction;
        self
    }

    fn correct(&self, channel: &GridChannel2DData, mask: Option<&GridMask>) -> OpsResult<GridChannel2DData> {
        check_fraction(self.minimal_line_length_fraction)?;
        let lines = extract_lines(channel, self.direction, mask);
        trace!(lines = lines.len(), degree = self.degree, direction = ?self.direction, "line fit correction");

        let mut skipped = 0usize;
        let profiles: Vec<Option<Vec<f64>>> = lines
            .iter()
            .map(|line| {
                if !line.has_enough_points(self.minimal_line_length_fraction) || line.usable_count() <= self.degree {
                    skipped += 1;
                    return None;
                }
                let (x, y) = line.usable_points();
                match fit_polynomial(&x, &y, self.degree, self.strategy) {
                    Ok(poly) => Some(line.positions.iter().map(|&p| poly.value(p)).collect()),
                    Err(e) => {
                        debug!(error = %e, "Line fit failed");
                        skipped += 1;
                        None
                    }
                }
            })
            .collect();
        if skipped > 0 {
            warn!(skipped, total = lines.len(), "Lines without enough data for a fit, interpolating");
        }

        let Some(profiles) = fill_missing(profiles, |a: &Vec<f64>, b: &Vec<f64>, t| {
            a.iter().zip(b).map(|(u, v)| u + (v - u) * t).collect()
        }) else {
            debug!("No line could be fitted, leaving channel unchanged");
            return Ok(channel.clone());
        };
        write_lines(channel, self.direction, |k, j, v| v - profiles[k][j])
    }
}

impl GridTransform for LineFitCorrection {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        self.correct(channel, None)
    }

    fn transform_grid_in_roi(
        &self,
        channel: &GridChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<GridChannel2DData> {
        self.correct(channel, fitting_mask(channel, roi, position).as_ref())
    }
}

/// Shifts lines onto a common level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LineMatchingCorrection {
    /// Location measure applied per line and across lines.
    pub location: LocationMeasure,
    /// Line orientation.
    pub direction: LineDirection,
    /// Minimum usable share of a line for its location to count.
    pub minimal_line_length_fraction: f64,
}

impl LineMatchingCorrection {
    /// Matching with the given location measure along rows.
    pub fn new(location: LocationMeasure) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    /// Sets the line orientation.
    pub fn with_direction(mut self, direction: LineDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the minimum usable share of a line.
    pub fn with_minimal_line_length_fraction(mut self, fraction: f64) -> Self {
        self.minimal_line_length_fraction = fraction;
        self
    }

    fn correct(&self, channel: &GridChannel2DData, mask: Option<&GridMask>) -> OpsResult<GridChannel2DData> {
        check_fraction(self.minimal_line_length_fraction)?;
        let lines = extract_lines(channel, self.direction, mask);
        trace!(
            lines = lines.len(),
            location = ?self.location,
            direction = ?self.direction,
            "line matching correction"
        );

        let locations: Vec<Option<f64>> = lines
            .iter()
            .map(|line| {
                if line.usable_count() == 0 || !line.has_enough_points(self.minimal_line_length_fraction) {
                    return None;
                }
                let (_, values) = line.usable_points();
                Some(self.location.evaluate(&values)).filter(|l| !l.is_nan())
            })
            .collect();

        let valid: Vec<f64> = locations.iter().flatten().copied().collect();
        let overall = self.location.evaluate(&valid);
        let Some(locations) = fill_missing(locations, |a: &f64, b: &f64, t| a + (b - a) * t) else {
            debug!("No line has a location, leaving channel unchanged");
            return Ok(channel.clone());
        };
        debug!(overall, lines = valid.len(), "Matching lines to common location");
        write_lines(channel, self.direction, |k, _, v| v - locations[k] + overall)
    }
}

impl GridTransform for LineMatchingCorrection {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        self.correct(channel, None)
    }

    fn transform_grid_in_roi(
        &self,
        channel: &GridChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<GridChannel2DData> {
        self.correct(channel, fitting_mask(channel, roi, position).as_ref())
    }
}
