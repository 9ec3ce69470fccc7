//! Channel data: values sampled on a grid or at scattered points.
//!
//! - [`GridChannel2DData`] - row-major value matrix attached to a [`Grid2D`]
//! - [`ScatteredChannel2DData`] - parallel x/y/z arrays with a [`PointDomain`]
//! - [`Channel2D`] - tagged union of both, used by transforms to pick the
//!   grid-optimised or the point-wise algorithm
//!
//! Channels are values: every transform builds a new channel and leaves its
//! input untouched. Accessors that hand out owned data (`*_copy`) return deep
//! copies that callers may mutate freely.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::grid::Grid2D;
use crate::interpolation::Interpolation2D;
use crate::quantity::Quantity;
use crate::roi::{Roi, RoiPosition};

/// Values sampled on a regular grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridChannel2DData {
    grid: Grid2D,
    values: Vec<f64>,
    z_quantity: Quantity,
}

impl GridChannel2DData {
    /// Creates a channel from row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `values.len()` differs from
    /// the grid's cell count.
    pub fn new(grid: Grid2D, values: Vec<f64>, z_quantity: Quantity) -> Result<Self> {
        if values.len() != grid.item_count() {
            return Err(Error::invalid_dimensions(
                grid.row_count(),
                grid.column_count(),
                format!("expected {} values, got {}", grid.item_count(), values.len()),
            ));
        }
        Ok(Self {
            grid,
            values,
            z_quantity,
        })
    }

    /// Creates a channel from a `[row][column]` matrix.
    ///
    /// # Example
    ///
    /// ```rust
    /// use spm_core::{Grid2D, GridChannel2DData, Quantity};
    ///
    /// let grid = Grid2D::new(2, 2, 0.0, 0.0, 1.0, 1.0).unwrap();
    /// let channel = GridChannel2DData::from_matrix(
    ///     grid,
    ///     vec![vec![5.0, 3.0], vec![7.0, 2.0]],
    ///     Quantity::height(),
    /// )
    /// .unwrap();
    /// assert_eq!(channel.value(1, 0), 7.0);
    /// ```
    pub fn from_matrix(grid: Grid2D, matrix: Vec<Vec<f64>>, z_quantity: Quantity) -> Result<Self> {
        if matrix.len() != grid.row_count() || matrix.iter().any(|r| r.len() != grid.column_count()) {
            return Err(Error::invalid_dimensions(
                matrix.len(),
                matrix.first().map_or(0, Vec::len),
                format!(
                    "matrix must be {}x{} and rectangular",
                    grid.row_count(),
                    grid.column_count()
                ),
            ));
        }
        let values = matrix.into_iter().flatten().collect();
        Self::new(grid, values, z_quantity)
    }

    /// Channel with every cell set to `value`.
    pub fn filled(grid: Grid2D, value: f64, z_quantity: Quantity) -> Self {
        let values = vec![value; grid.item_count()];
        Self {
            grid,
            values,
            z_quantity,
        }
    }

    /// Sibling channel on the same grid with new values.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self> {
        Self::new(self.grid.clone(), values, self.z_quantity.clone())
    }

    /// Same values and grid, new value quantity.
    pub fn with_z_quantity(&self, z_quantity: Quantity) -> Self {
        Self {
            z_quantity,
            ..self.clone()
        }
    }

    /// Sampling grid.
    #[inline]
    pub fn grid(&self) -> &Grid2D {
        &self.grid
    }

    /// Quantity of the values.
    #[inline]
    pub fn z_quantity(&self) -> &Quantity {
        &self.z_quantity
    }

    /// Number of rows.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.grid.row_count()
    }

    /// Number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.grid.column_count()
    }

    /// Row-major index of `(row, col)`.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.grid.column_count() + col
    }

    /// Value at `(row, col)`.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[self.index(row, col)]
    }

    /// Row-major values.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Owned copy of the row-major values.
    pub fn values_copy(&self) -> Vec<f64> {
        self.values.clone()
    }

    /// Consumes the channel, returning its values.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// One row of values.
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        let cols = self.grid.column_count();
        &self.values[row * cols..(row + 1) * cols]
    }

    /// One column of values (copied).
    pub fn column(&self, col: usize) -> Vec<f64> {
        (0..self.row_count()).map(|row| self.value(row, col)).collect()
    }

    /// Deep copy as a `[row][column]` matrix.
    pub fn data_copy(&self) -> Vec<Vec<f64>> {
        self.values
            .chunks(self.grid.column_count())
            .map(<[f64]>::to_vec)
            .collect()
    }

    /// Smallest non-NaN value (`NaN` if all are NaN).
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::NAN, f64::min)
    }

    /// Largest non-NaN value (`NaN` if all are NaN).
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NAN, f64::max)
    }

    /// Smallest non-NaN value among the cells matching `position`.
    pub fn min_in_roi(&self, roi: &Roi, position: RoiPosition) -> f64 {
        if position == RoiPosition::Everything {
            return self.min();
        }
        let mut min = f64::NAN;
        let cols = self.grid.column_count();
        let values = &self.values;
        roi.add_points(&self.grid, position, &mut |row: usize, col: usize| {
            min = min.min(values[row * cols + col]);
        });
        min
    }
}

/// Point-density descriptor of a scattered point set.
///
/// Identifies the domain the points cover and suggests a grid for resampling.
/// Rebuilt whenever point coordinates change.
#[derive(Debug, Clone, PartialEq)]
pub struct PointDomain {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    point_count: usize,
    mean_spacing: f64,
    suggested_rows: usize,
    suggested_columns: usize,
}

impl PointDomain {
    /// Describes the domain of the given coordinates.
    pub fn from_points(x: &[f64], y: &[f64]) -> Self {
        let (x_min, x_max) = finite_extent(x);
        let (y_min, y_max) = finite_extent(y);
        let n = x.len().max(1);
        let width = (x_max - x_min).max(0.0);
        let height = (y_max - y_min).max(0.0);

        let (mean_spacing, rows, cols) = if width > 0.0 && height > 0.0 {
            let spacing = (width * height / n as f64).sqrt();
            let cols = (width / spacing).round() as usize + 1;
            let rows = (height / spacing).round() as usize + 1;
            (spacing, rows.max(1), cols.max(1))
        } else if width > 0.0 {
            (width / (n.max(2) - 1) as f64, 1, n)
        } else if height > 0.0 {
            (height / (n.max(2) - 1) as f64, n, 1)
        } else {
            (0.0, 1, 1)
        };

        Self {
            x_min,
            x_max,
            y_min,
            y_max,
            point_count: x.len(),
            mean_spacing,
            suggested_rows: rows,
            suggested_columns: cols,
        }
    }

    /// Bounds `(x_min, y_min, x_max, y_max)`.
    #[inline]
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.x_min, self.y_min, self.x_max, self.y_max)
    }

    /// Number of points described.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Average distance between neighbouring points for a uniform layout.
    #[inline]
    pub fn mean_spacing(&self) -> f64 {
        self.mean_spacing
    }

    /// Suggested `(rows, columns)` for resampling.
    #[inline]
    pub fn suggested_dimensions(&self) -> (usize, usize) {
        (self.suggested_rows, self.suggested_columns)
    }

    /// Grid covering the domain with the suggested dimensions.
    pub fn suggested_grid(&self) -> Result<Grid2D> {
        Grid2D::from_extent(
            self.x_min,
            self.x_max,
            self.y_min,
            self.y_max,
            self.suggested_rows,
            self.suggested_columns,
        )
    }
}

fn finite_extent(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo > hi { (0.0, 0.0) } else { (lo, hi) }
}

/// Values sampled at scattered (x, y) positions.
#[derive(Debug, Clone, PartialEq)]
pub struct ScatteredChannel2DData {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
    domain: PointDomain,
    x_quantity: Quantity,
    y_quantity: Quantity,
    z_quantity: Quantity,
}

impl ScatteredChannel2DData {
    /// Creates a scattered channel with default quantities.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when the arrays are empty or of
    /// different lengths.
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self> {
        if x.is_empty() {
            return Err(Error::invalid_argument("scattered channel needs at least one point"));
        }
        if x.len() != y.len() || x.len() != z.len() {
            return Err(Error::invalid_argument(format!(
                "coordinate arrays differ in length: x={}, y={}, z={}",
                x.len(),
                y.len(),
                z.len()
            )));
        }
        let domain = PointDomain::from_points(&x, &y);
        Ok(Self {
            x,
            y,
            z,
            domain,
            x_quantity: Quantity::distance_x(),
            y_quantity: Quantity::distance_y(),
            z_quantity: Quantity::height(),
        })
    }

    /// Returns a copy with different quantities.
    pub fn with_quantities(mut self, x_quantity: Quantity, y_quantity: Quantity, z_quantity: Quantity) -> Self {
        self.x_quantity = x_quantity;
        self.y_quantity = y_quantity;
        self.z_quantity = z_quantity;
        self
    }

    /// Same quantities, new coordinates; the domain is rebuilt.
    pub fn with_coordinates(&self, x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self> {
        Ok(Self::new(x, y, z)?.with_quantities(
            self.x_quantity.clone(),
            self.y_quantity.clone(),
            self.z_quantity.clone(),
        ))
    }

    /// Same positions and domain, new values.
    pub fn with_z(&self, z: Vec<f64>) -> Result<Self> {
        if z.len() != self.z.len() {
            return Err(Error::invalid_argument(format!(
                "expected {} values, got {}",
                self.z.len(),
                z.len()
            )));
        }
        Ok(Self { z, ..self.clone() })
    }

    /// Number of points.
    #[inline]
    pub fn point_count(&self) -> usize {
        self.x.len()
    }

    /// X coordinates.
    #[inline]
    pub fn x_coordinates(&self) -> &[f64] {
        &self.x
    }

    /// Y coordinates.
    #[inline]
    pub fn y_coordinates(&self) -> &[f64] {
        &self.y
    }

    /// Values.
    #[inline]
    pub fn z_coordinates(&self) -> &[f64] {
        &self.z
    }

    /// Owned copy of the x coordinates.
    pub fn x_coordinates_copy(&self) -> Vec<f64> {
        self.x.clone()
    }

    /// Owned copy of the y coordinates.
    pub fn y_coordinates_copy(&self) -> Vec<f64> {
        self.y.clone()
    }

    /// Owned copy of the values.
    pub fn z_coordinates_copy(&self) -> Vec<f64> {
        self.z.clone()
    }

    /// Point-density descriptor.
    #[inline]
    pub fn domain(&self) -> &PointDomain {
        &self.domain
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

    /// Quantity of the values.
    #[inline]
    pub fn z_quantity(&self) -> &Quantity {
        &self.z_quantity
    }

    /// Indices of the points matching `position` relative to `roi`.
    pub fn indices_in_roi(&self, roi: &Roi, position: RoiPosition) -> Vec<usize> {
        (0..self.point_count())
            .filter(|&i| match position {
                RoiPosition::Everything => true,
                RoiPosition::Inside => roi.contains(self.x[i], self.y[i]),
                RoiPosition::Outside => !roi.contains(self.x[i], self.y[i]),
            })
            .collect()
    }
}

/// Optional override of the grid used when resampling scattered data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GriddingConfig {
    /// Row count; `None` uses the domain's suggestion.
    pub rows: Option<usize>,
    /// Column count; `None` uses the domain's suggestion.
    pub columns: Option<usize>,
}

/// Channel data in either representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Channel2D {
    /// Regular-grid data.
    Grid(GridChannel2DData),
    /// Scattered-point data.
    Scattered(ScatteredChannel2DData),
}

impl Channel2D {
    /// Returns `true` for grid data.
    #[inline]
    pub fn is_grid(&self) -> bool {
        matches!(self, Self::Grid(_))
    }

    /// Grid data, if this is a grid channel.
    #[inline]
    pub fn as_grid(&self) -> Option<&GridChannel2DData> {
        match self {
            Self::Grid(g) => Some(g),
            Self::Scattered(_) => None,
        }
    }

    /// Scattered data, if this is a scattered channel.
    #[inline]
    pub fn as_scattered(&self) -> Option<&ScatteredChannel2DData> {
        match self {
            Self::Grid(_) => None,
            Self::Scattered(s) => Some(s),
        }
    }

    /// Quantity of the values.
    pub fn z_quantity(&self) -> &Quantity {
        match self {
            Self::Grid(g) => g.z_quantity(),
            Self::Scattered(s) => s.z_quantity(),
        }
    }

    /// Number of samples.
    pub fn point_count(&self) -> usize {
        match self {
            Self::Grid(g) => g.grid().item_count(),
            Self::Scattered(s) => s.point_count(),
        }
    }

    /// Grid representation of this channel.
    ///
    /// Grid data is returned as-is; scattered data is resampled onto the
    /// domain's suggested grid.
    pub fn default_gridding(&self, interpolation: &dyn Interpolation2D) -> Result<GridChannel2DData> {
        self.default_gridding_with(&GriddingConfig::default(), interpolation)
    }

    /// Like [`Self::default_gridding`], honoring explicit dimensions.
    pub fn default_gridding_with(
        &self,
        config: &GriddingConfig,
        interpolation: &dyn Interpolation2D,
    ) -> Result<GridChannel2DData> {
        match self {
            Self::Grid(g) => Ok(g.clone()),
            Self::Scattered(s) => {
                let (rows, cols) = s.domain().suggested_dimensions();
                let rows = config.rows.unwrap_or(rows);
                let cols = config.columns.unwrap_or(cols);
                let (x0, y0, x1, y1) = s.domain().bounds();
                debug!(points = s.point_count(), rows, cols, "Gridding scattered channel");
                let grid = Grid2D::from_extent(x0, x1, y0, y1, rows, cols)?
                    .with_quantities(s.x_quantity().clone(), s.y_quantity().clone());
                interpolation.grid_scattered(s, &grid)
            }
        }
    }
}

impl From<GridChannel2DData> for Channel2D {
    fn from(channel: GridChannel2DData) -> Self {
        Self::Grid(channel)
    }
}

impl From<ScatteredChannel2DData> for Channel2D {
    fn from(channel: ScatteredChannel2DData) -> Self {
        Self::Scattered(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> GridChannel2DData {
        let grid = Grid2D::new(2, 3, 0.0, 0.0, 1.0, 1.0).unwrap();
        GridChannel2DData::new(grid, vec![1.0, 2.0, 3.0, 4.0, f64::NAN, -6.0], Quantity::height()).unwrap()
    }

    #[test]
    fn test_dimensions_validated() {
        let grid = Grid2D::new(2, 3, 0.0, 0.0, 1.0, 1.0).unwrap();
        assert!(GridChannel2DData::new(grid.clone(), vec![0.0; 5], Quantity::height()).is_err());
        assert!(GridChannel2DData::from_matrix(grid, vec![vec![0.0; 3], vec![0.0; 2]], Quantity::height()).is_err());
    }

    #[test]
    fn test_data_copy_is_deep() {
        let c = channel();
        let mut copy = c.data_copy();
        copy[0][0] = 100.0;
        assert_eq!(c.value(0, 0), 1.0);
        assert_eq!(copy[1][2], -6.0);
    }

    #[test]
    fn test_min_max_ignore_nan() {
        let c = channel();
        assert_eq!(c.min(), -6.0);
        assert_eq!(c.max(), 4.0);
        assert_eq!(c.row(1)[0], 4.0);
        assert_eq!(c.column(2), vec![3.0, -6.0]);
    }

    #[test]
    fn test_min_in_roi() {
        let c = channel();
        let roi = Roi::rectangle(0.0, 0.0, 1.0, 1.0);
        assert_eq!(c.min_in_roi(&roi, RoiPosition::Inside), 1.0);
        assert_eq!(c.min_in_roi(&roi, RoiPosition::Outside), -6.0);
        assert_eq!(c.min_in_roi(&roi, RoiPosition::Everything), -6.0);
    }

    #[test]
    fn test_scattered_validation() {
        assert!(ScatteredChannel2DData::new(vec![], vec![], vec![]).is_err());
        assert!(ScatteredChannel2DData::new(vec![0.0], vec![0.0, 1.0], vec![0.0]).is_err());
    }

    #[test]
    fn test_point_domain() {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for r in 0..5 {
            for c in 0..10 {
                x.push(c as f64);
                y.push(r as f64 * 0.5);
            }
        }
        let domain = PointDomain::from_points(&x, &y);
        assert_eq!(domain.point_count(), 50);
        assert_eq!(domain.bounds(), (0.0, 0.0, 9.0, 2.0));
        let (rows, cols) = domain.suggested_dimensions();
        assert!(rows >= 2 && cols >= 8, "{rows}x{cols}");
    }

    #[test]
    fn test_with_z_keeps_domain() {
        let s = ScatteredChannel2DData::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![1.0, 2.0]).unwrap();
        let t = s.with_z(vec![5.0, 6.0]).unwrap();
        assert_eq!(t.domain(), s.domain());
        assert!(s.with_z(vec![1.0]).is_err());
    }
}
