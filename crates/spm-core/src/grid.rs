//! Regular rectangular sampling lattice.
//!
//! A [`Grid2D`] maps integer cell indices to physical coordinates:
//!
//! ```text
//! x(col) = origin_x + col * increment_x
//! y(row) = origin_y + row * increment_y
//! ```
//!
//! Rows advance along y and columns along x. Data matrices attached to a
//! grid are stored row-major (`index = row * column_count + col`).
//!
//! Grids are immutable: changing the density, transposing, or moving the
//! origin produces a new grid.

use crate::error::{Error, Result};
use crate::quantity::Quantity;

/// A regular 2D sampling lattice with origin, per-axis spacing and units.
///
/// # Invariants
///
/// - `row_count >= 1` and `column_count >= 1`
/// - increments are finite and `> 0`
/// - origin is finite
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2D {
    row_count: usize,
    column_count: usize,
    origin_x: f64,
    origin_y: f64,
    increment_x: f64,
    increment_y: f64,
    x_quantity: Quantity,
    y_quantity: Quantity,
}

impl Grid2D {
    /// Creates a grid with the default lateral quantities (micrometres).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] for zero counts and
    /// [`Error::InvalidArgument`] for non-positive or non-finite increments.
    ///
    /// # Example
    ///
    /// ```rust
    /// use spm_core::Grid2D;
    ///
    /// let grid = Grid2D::new(4, 8, 0.0, 0.0, 0.5, 0.25).unwrap();
    /// assert_eq!(grid.x(2), 1.0);
    /// assert_eq!(grid.y(3), 0.75);
    /// ```
    pub fn new(
        row_count: usize,
        column_count: usize,
        origin_x: f64,
        origin_y: f64,
        increment_x: f64,
        increment_y: f64,
    ) -> Result<Self> {
        if row_count == 0 || column_count == 0 {
            return Err(Error::invalid_dimensions(
                row_count,
                column_count,
                "row and column counts must be > 0",
            ));
        }
        if !(increment_x > 0.0 && increment_x.is_finite())
            || !(increment_y > 0.0 && increment_y.is_finite())
        {
            return Err(Error::invalid_argument(format!(
                "grid increments must be finite and > 0, got ({increment_x}, {increment_y})"
            )));
        }
        if !origin_x.is_finite() || !origin_y.is_finite() {
            return Err(Error::invalid_argument(format!(
                "grid origin must be finite, got ({origin_x}, {origin_y})"
            )));
        }
        Ok(Self {
            row_count,
            column_count,
            origin_x,
            origin_y,
            increment_x,
            increment_y,
            x_quantity: Quantity::distance_x(),
            y_quantity: Quantity::distance_y(),
        })
    }

    /// Creates a grid spanning `[x_min, x_max] x [y_min, y_max]` with the
    /// given counts. A single-cell axis gets the axis length (or 1) as its
    /// increment.
    pub fn from_extent(
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        row_count: usize,
        column_count: usize,
    ) -> Result<Self> {
        let increment_x = axis_increment(x_max - x_min, column_count);
        let increment_y = axis_increment(y_max - y_min, row_count);
        Self::new(row_count, column_count, x_min, y_min, increment_x, increment_y)
    }

    /// Returns a copy with different axis quantities.
    pub fn with_quantities(mut self, x_quantity: Quantity, y_quantity: Quantity) -> Self {
        self.x_quantity = x_quantity;
        self.y_quantity = y_quantity;
        self
    }

    /// Returns a copy moved to a new origin.
    pub fn with_origin(&self, origin_x: f64, origin_y: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            ..self.clone()
        }
    }

    /// Returns a copy with new spacing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for non-positive or non-finite increments.
    pub fn with_increments(&self, increment_x: f64, increment_y: f64) -> Result<Self> {
        Self::new(
            self.row_count,
            self.column_count,
            self.origin_x,
            self.origin_y,
            increment_x,
            increment_y,
        )
        .map(|g| g.with_quantities(self.x_quantity.clone(), self.y_quantity.clone()))
    }

    /// Number of rows (samples along y).
    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns (samples along x).
    #[inline]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Total number of cells.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.row_count * self.column_count
    }

    /// X coordinate of the first column.
    #[inline]
    pub fn origin_x(&self) -> f64 {
        self.origin_x
    }

    /// Y coordinate of the first row.
    #[inline]
    pub fn origin_y(&self) -> f64 {
        self.origin_y
    }

    /// Spacing between columns.
    #[inline]
    pub fn increment_x(&self) -> f64 {
        self.increment_x
    }

    /// Spacing between rows.
    #[inline]
    pub fn increment_y(&self) -> f64 {
        self.increment_y
    }

    /// Quantity of the x axis.
    #[inline]
    pub fn x_quantity(&self) -> &Quantity {
        &self.x_quantity
    }

    /// Quantity of the y axis.
    #[inline]
    pub fn y_quantity(&self) -> &Quantity {
        &self.y_quantity
    }

    /// X coordinate of column `col`.
    #[inline]
    pub fn x(&self, col: usize) -> f64 {
        self.origin_x + col as f64 * self.increment_x
    }

    /// Y coordinate of row `row`.
    #[inline]
    pub fn y(&self, row: usize) -> f64 {
        self.origin_y + row as f64 * self.increment_y
    }

    /// X coordinate of the last column.
    #[inline]
    pub fn x_max(&self) -> f64 {
        self.x(self.column_count - 1)
    }

    /// Y coordinate of the last row.
    #[inline]
    pub fn y_max(&self) -> f64 {
        self.y(self.row_count - 1)
    }

    /// Distance between the first and last column.
    #[inline]
    pub fn x_range(&self) -> f64 {
        self.x_max() - self.origin_x
    }

    /// Distance between the first and last row.
    #[inline]
    pub fn y_range(&self) -> f64 {
        self.y_max() - self.origin_y
    }

    /// Centre of the sampled extent.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            self.origin_x + 0.5 * self.x_range(),
            self.origin_y + 0.5 * self.y_range(),
        )
    }

    /// Fractional column coordinate of `x`.
    #[inline]
    pub fn column_position(&self, x: f64) -> f64 {
        (x - self.origin_x) / self.increment_x
    }

    /// Fractional row coordinate of `y`.
    #[inline]
    pub fn row_position(&self, y: f64) -> f64 {
        (y - self.origin_y) / self.increment_y
    }

    /// Nearest column to `x`, or `None` when `x` rounds outside the grid.
    pub fn column_index(&self, x: f64) -> Option<usize> {
        nearest_index(self.column_position(x), self.column_count)
    }

    /// Nearest row to `y`, or `None` when `y` rounds outside the grid.
    pub fn row_index(&self, y: f64) -> Option<usize> {
        nearest_index(self.row_position(y), self.row_count)
    }

    /// Column at or left of `x` together with the fractional offset from it.
    ///
    /// The column may be negative or past the last column; callers check.
    #[inline]
    pub fn column_floor(&self, x: f64) -> (isize, f64) {
        let position = self.column_position(x);
        let floor = position.floor();
        (floor as isize, position - floor)
    }

    /// Row at or below `y` together with the fractional offset from it.
    #[inline]
    pub fn row_floor(&self, y: f64) -> (isize, f64) {
        let position = self.row_position(y);
        let floor = position.floor();
        (floor as isize, position - floor)
    }

    /// Returns `true` when `(x, y)` lies within the sampled extent.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.origin_x && x <= self.x_max() && y >= self.origin_y && y <= self.y_max()
    }

    /// Returns `true` when `(row, col)` is a valid cell.
    #[inline]
    pub fn contains_cell(&self, row: isize, col: isize) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.row_count && (col as usize) < self.column_count
    }

    /// Grid with x and y roles exchanged.
    pub fn transpose(&self) -> Self {
        Self {
            row_count: self.column_count,
            column_count: self.row_count,
            origin_x: self.origin_y,
            origin_y: self.origin_x,
            increment_x: self.increment_y,
            increment_y: self.increment_x,
            x_quantity: self.y_quantity.clone(),
            y_quantity: self.x_quantity.clone(),
        }
    }

    /// Grid covering the same extent with different counts.
    pub fn change_density(&self, row_count: usize, column_count: usize) -> Result<Self> {
        Self::from_extent(
            self.origin_x,
            self.x_max(),
            self.origin_y,
            self.y_max(),
            row_count,
            column_count,
        )
        .map(|g| g.with_quantities(self.x_quantity.clone(), self.y_quantity.clone()))
    }
}

fn axis_increment(length: f64, count: usize) -> f64 {
    if count > 1 && length > 0.0 {
        length / (count - 1) as f64
    } else if length > 0.0 {
        length
    } else {
        1.0
    }
}

fn nearest_index(position: f64, count: usize) -> Option<usize> {
    let rounded = position.round();
    if rounded.is_nan() || rounded < 0.0 || rounded >= count as f64 {
        None
    } else {
        Some(rounded as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_affine_coordinates() {
        let grid = Grid2D::new(3, 5, -1.0, 2.0, 0.5, 2.0).unwrap();
        assert_relative_eq!(grid.x(0), -1.0);
        assert_relative_eq!(grid.x(4), 1.0);
        assert_relative_eq!(grid.y(2), 6.0);
        assert_relative_eq!(grid.x_range(), 2.0);
        assert_relative_eq!(grid.y_range(), 4.0);
        assert_eq!(grid.center(), (0.0, 4.0));
    }

    #[test]
    fn test_invalid_grid() {
        assert!(Grid2D::new(0, 5, 0.0, 0.0, 1.0, 1.0).is_err());
        assert!(Grid2D::new(5, 5, 0.0, 0.0, 0.0, 1.0).is_err());
        assert!(Grid2D::new(5, 5, 0.0, 0.0, 1.0, -2.0).is_err());
        assert!(Grid2D::new(5, 5, f64::NAN, 0.0, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_nearest_index() {
        let grid = Grid2D::new(4, 4, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(grid.column_index(1.4), Some(1));
        assert_eq!(grid.column_index(1.6), Some(2));
        assert_eq!(grid.column_index(-0.6), None);
        assert_eq!(grid.row_index(3.49), Some(3));
        assert_eq!(grid.row_index(3.51), None);
    }

    #[test]
    fn test_transpose_twice() {
        let grid = Grid2D::new(3, 7, 1.0, 2.0, 0.1, 0.3).unwrap();
        let t = grid.transpose();
        assert_eq!(t.row_count(), 7);
        assert_eq!(t.column_count(), 3);
        assert_eq!(t.increment_x(), 0.3);
        assert_eq!(t.transpose(), grid);
    }

    #[test]
    fn test_change_density_keeps_extent() {
        let grid = Grid2D::new(5, 9, 0.0, 0.0, 0.25, 0.5).unwrap();
        let dense = grid.change_density(9, 17).unwrap();
        assert_relative_eq!(dense.x_max(), grid.x_max(), epsilon = 1e-12);
        assert_relative_eq!(dense.y_max(), grid.y_max(), epsilon = 1e-12);
        assert_relative_eq!(dense.increment_x(), 0.125, epsilon = 1e-12);
    }

    #[test]
    fn test_single_cell_extent() {
        let grid = Grid2D::from_extent(2.0, 2.0, 0.0, 4.0, 5, 1).unwrap();
        assert_eq!(grid.increment_x(), 1.0);
        assert_eq!(grid.increment_y(), 1.0);
    }
}
