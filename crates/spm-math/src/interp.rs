//! Interpolation of grid channels and gridding of scattered points.
//!
//! [`InterpolationMethod2D`] implements the [`Interpolation2D`] seam from
//! `spm-core`:
//!
//! - [`InterpolationMethod2D::Nearest`] - value of the closest cell
//! - [`InterpolationMethod2D::Bilinear`] - linear in x and y
//! - [`InterpolationMethod2D::Bicubic`] - Catmull-Rom cubic, passes through samples
//!
//! Positions are mapped into fractional index space first. Anything outside
//! `[0, count - 1]` (up to a small tolerance) is out of the domain and yields
//! `NaN`. Scattered data is gridded by inverse-distance weighting regardless
//! of the method.
//!
//! # Example
//!
//! ```rust
//! use spm_core::{Grid2D, GridChannel2DData, Interpolation2D, Quantity};
//! use spm_math::InterpolationMethod2D;
//!
//! let grid = Grid2D::new(2, 2, 0.0, 0.0, 1.0, 1.0).unwrap();
//! let ch = GridChannel2DData::new(grid, vec![0.0, 1.0, 2.0, 3.0], Quantity::height()).unwrap();
//! assert_eq!(InterpolationMethod2D::Bilinear.value_at(&ch, 0.5, 0.5), 1.5);
//! assert!(InterpolationMethod2D::Bilinear.value_at(&ch, 2.0, 0.5).is_nan());
//! ```

use serde::{Deserialize, Serialize};
use spm_core::{Grid2D, GridChannel2DData, Interpolation2D, Result, ScatteredChannel2DData};
use tracing::trace;

/// Index-space slack accepted at the domain edges.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Squared distance below which a scattered sample is an exact hit.
const EXACT_HIT: f64 = 1e-24;

/// Interpolation method for grid channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InterpolationMethod2D {
    /// Closest cell.
    Nearest,
    /// Bilinear.
    #[default]
    Bilinear,
    /// Catmull-Rom bicubic.
    Bicubic,
}

impl InterpolationMethod2D {
    /// Number of neighbours used along each axis.
    pub fn support(&self) -> usize {
        match self {
            Self::Nearest => 1,
            Self::Bilinear => 2,
            Self::Bicubic => 4,
        }
    }
}

/// Catmull-Rom (Keys, a = -0.5) weight function.
#[inline]
fn cubic_weight(x: f64) -> f64 {
    const A: f64 = -0.5;
    let ax = x.abs();
    if ax <= 1.0 {
        ((A + 2.0) * ax - (A + 3.0)) * ax * ax + 1.0
    } else if ax < 2.0 {
        ((A * ax - 5.0 * A) * ax + 8.0 * A) * ax - 4.0 * A
    } else {
        0.0
    }
}

/// Maps a fractional position into `[0, count - 1]`, or `None` outside.
#[inline]
fn clamp_position(position: f64, count: usize) -> Option<f64> {
    let last = (count - 1) as f64;
    if position.is_nan() || position < -EDGE_TOLERANCE || position > last + EDGE_TOLERANCE {
        None
    } else {
        Some(position.clamp(0.0, last))
    }
}

/// Splits a clamped position into a base index and fraction so that
/// `base + 1` is still valid when `count >= 2`.
#[inline]
fn split(position: f64, count: usize) -> (usize, f64) {
    if count < 2 {
        return (0, 0.0);
    }
    let base = (position.floor() as usize).min(count - 2);
    (base, position - base as f64)
}

impl Interpolation2D for InterpolationMethod2D {
    fn value_at(&self, channel: &GridChannel2DData, x: f64, y: f64) -> f64 {
        let grid = channel.grid();
        let rows = grid.row_count();
        let cols = grid.column_count();
        let (Some(r), Some(c)) = (
            clamp_position(grid.row_position(y), rows),
            clamp_position(grid.column_position(x), cols),
        ) else {
            return f64::NAN;
        };

        match self {
            Self::Nearest => channel.value(r.round() as usize, c.round() as usize),
            Self::Bilinear => {
                let (r0, fr) = split(r, rows);
                let (c0, fc) = split(c, cols);
                let r1 = (r0 + 1).min(rows - 1);
                let c1 = (c0 + 1).min(cols - 1);
                let top = channel.value(r0, c0) * (1.0 - fc) + channel.value(r0, c1) * fc;
                let bottom = channel.value(r1, c0) * (1.0 - fc) + channel.value(r1, c1) * fc;
                top * (1.0 - fr) + bottom * fr
            }
            Self::Bicubic => {
                let (r0, fr) = split(r, rows);
                let (c0, fc) = split(c, cols);
                let mut sum = 0.0;
                for i in -1isize..=2 {
                    let wr = cubic_weight(fr - i as f64);
                    if wr == 0.0 {
                        continue;
                    }
                    let row = (r0 as isize + i).clamp(0, rows as isize - 1) as usize;
                    for j in -1isize..=2 {
                        let wc = cubic_weight(fc - j as f64);
                        if wc == 0.0 {
                            continue;
                        }
                        let col = (c0 as isize + j).clamp(0, cols as isize - 1) as usize;
                        sum += wr * wc * channel.value(row, col);
                    }
                }
                sum
            }
        }
    }

    fn grid_scattered(&self, channel: &ScatteredChannel2DData, grid: &Grid2D) -> Result<GridChannel2DData> {
        trace!(
            points = channel.point_count(),
            rows = grid.row_count(),
            cols = grid.column_count(),
            "grid_scattered"
        );
        let xs = channel.x_coordinates();
        let ys = channel.y_coordinates();
        let zs = channel.z_coordinates();

        let mut values = Vec::with_capacity(grid.item_count());
        for row in 0..grid.row_count() {
            let y = grid.y(row);
            for col in 0..grid.column_count() {
                values.push(inverse_distance(xs, ys, zs, grid.x(col), y));
            }
        }
        GridChannel2DData::new(grid.clone(), values, channel.z_quantity().clone())
    }
}

/// Inverse-distance-weighted (power 2) value at `(x, y)`.
fn inverse_distance(xs: &[f64], ys: &[f64], zs: &[f64], x: f64, y: f64) -> f64 {
    let mut weight_sum = 0.0;
    let mut value_sum = 0.0;
    for ((&px, &py), &pz) in xs.iter().zip(ys).zip(zs) {
        if pz.is_nan() {
            continue;
        }
        let d2 = (px - x) * (px - x) + (py - y) * (py - y);
        if d2 < EXACT_HIT {
            return pz;
        }
        let w = 1.0 / d2;
        weight_sum += w;
        value_sum += w * pz;
    }
    if weight_sum > 0.0 { value_sum / weight_sum } else { f64::NAN }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use spm_core::Quantity;

    fn plane() -> GridChannel2DData {
        // z = 2x + 3y on a 4x5 grid with spacing 0.5
        let grid = Grid2D::new(4, 5, 1.0, -1.0, 0.5, 0.5).unwrap();
        let values = (0..4)
            .flat_map(|r| (0..5).map(move |c| 2.0 * (1.0 + c as f64 * 0.5) + 3.0 * (-1.0 + r as f64 * 0.5)))
            .collect();
        GridChannel2DData::new(grid, values, Quantity::height()).unwrap()
    }

    #[test]
    fn test_bilinear_exact_on_plane() {
        let ch = plane();
        for &(x, y) in &[(1.0, -1.0), (1.3, -0.2), (3.0, 0.5), (2.25, 0.1)] {
            assert_relative_eq!(
                InterpolationMethod2D::Bilinear.value_at(&ch, x, y),
                2.0 * x + 3.0 * y,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_bicubic_reproduces_samples_and_planes() {
        let ch = plane();
        assert_relative_eq!(InterpolationMethod2D::Bicubic.value_at(&ch, 1.5, -0.5), ch.value(1, 1), epsilon = 1e-12);
        assert_relative_eq!(
            InterpolationMethod2D::Bicubic.value_at(&ch, 1.7, -0.3),
            2.0 * 1.7 + 3.0 * -0.3,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_nearest() {
        let ch = plane();
        assert_eq!(InterpolationMethod2D::Nearest.value_at(&ch, 1.2, -0.9), ch.value(0, 0));
        assert_eq!(InterpolationMethod2D::Nearest.value_at(&ch, 1.3, -0.7), ch.value(1, 1));
    }

    #[test]
    fn test_out_of_domain_is_nan() {
        let ch = plane();
        for method in [
            InterpolationMethod2D::Nearest,
            InterpolationMethod2D::Bilinear,
            InterpolationMethod2D::Bicubic,
        ] {
            assert!(method.value_at(&ch, 0.9, 0.0).is_nan());
            assert!(method.value_at(&ch, 2.0, 0.6).is_nan());
            assert!(!method.value_at(&ch, 3.0, 0.5).is_nan());
        }
    }

    #[test]
    fn test_gridded_same_extent() {
        let ch = plane();
        let dense = InterpolationMethod2D::Bilinear.gridded(&ch, 7, 9).unwrap();
        assert_eq!(dense.row_count(), 7);
        assert_eq!(dense.column_count(), 9);
        assert_relative_eq!(dense.value(6, 8), ch.value(3, 4), epsilon = 1e-9);
    }

    #[test]
    fn test_idw_exact_hits() {
        let s = ScatteredChannel2DData::new(vec![0.0, 1.0, 0.0, 1.0], vec![0.0, 0.0, 1.0, 1.0], vec![1.0, 2.0, 3.0, 4.0])
            .unwrap();
        let grid = Grid2D::new(3, 3, 0.0, 0.0, 0.5, 0.5).unwrap();
        let g = InterpolationMethod2D::Nearest.grid_scattered(&s, &grid).unwrap();
        assert_eq!(g.value(0, 0), 1.0);
        assert_eq!(g.value(2, 2), 4.0);
        assert_relative_eq!(g.value(1, 1), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_single_row_grid() {
        let grid = Grid2D::new(1, 3, 0.0, 0.0, 1.0, 1.0).unwrap();
        let ch = GridChannel2DData::new(grid, vec![0.0, 10.0, 20.0], Quantity::height()).unwrap();
        assert_relative_eq!(InterpolationMethod2D::Bilinear.value_at(&ch, 1.5, 0.0), 15.0);
        assert!(InterpolationMethod2D::Bilinear.value_at(&ch, 1.5, 0.5).is_nan());
    }
}
