//! Geometric transformations.
//!
//! - [`FlipHorizontally`] / [`FlipVertically`] - Mirror within the same extent
//! - [`Transpose`] - Exchange the x and y axes
//! - [`RotateClockwise`] / [`RotateCounterClockwise`] - Quarter turns about the centre
//! - [`Rotate`] - Arbitrary angle with interpolation and a fill value
//!
//! Rows advance along y and columns along x. Quarter turns produce a new
//! [`Grid2D`] with exchanged counts, increments and axis quantities; the
//! origin is recomputed so that the image centre stays put. Scattered
//! channels get new coordinates and a rebuilt point domain.
//!
//! With a ROI, flips and [`Rotate`] write the transformed value only at the
//! matching cells. Transforms that change the grid dimensions (transpose and
//! quarter turns) always act on the whole channel.
//!
//! # Example
//!
//! ```rust
//! use spm_core::{Grid2D, GridChannel2DData, Quantity};
//! use spm_ops::geometry::RotateClockwise;
//! use spm_ops::transform::GridTransform;
//!
//! let grid = Grid2D::new(2, 3, 0.0, 0.0, 1.0, 1.0).unwrap();
//! let ch = GridChannel2DData::from_matrix(
//!     grid,
//!     vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
//!     Quantity::height(),
//! )
//! .unwrap();
//! let rotated = RotateClockwise.transform_grid(&ch).unwrap();
//! assert_eq!(rotated.data_copy(), vec![vec![3.0, 6.0], vec![2.0, 5.0], vec![1.0, 4.0]]);
//! ```

use serde::{Deserialize, Serialize};
use spm_core::{
    Grid2D, GridChannel2DData, Interpolation2D, Roi, RoiPosition, ScatteredChannel2DData, Unit, convert_or_raw,
};
use spm_math::InterpolationMethod2D;
use tracing::trace;

use crate::error::OpsResult;
use crate::transform::{GridTransform, ScatteredTransform, dispatch_channel_transform, merge_masked};

/// Mirrors the columns (x axis).
#[derive(Debug, Clone, Copy, Default)]
pub struct FlipHorizontally;

/// Mirrors the rows (y axis).
#[derive(Debug, Clone, Copy, Default)]
pub struct FlipVertically;

/// Exchanges rows and columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transpose;

/// Quarter turn clockwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotateClockwise;

/// Quarter turn counterclockwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotateCounterClockwise;

/// Value written where a rotated image has no source data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FillValue {
    /// Numeric value.
    pub value: f64,
    /// Unit of `value`; `None` means "already in the channel's unit".
    pub unit: Option<Unit>,
}

impl FillValue {
    /// Fill value with a unit.
    pub fn new(value: f64, unit: Option<Unit>) -> Self {
        Self { value, unit }
    }

    /// Fill value expressed in `target`, or the raw value when the units
    /// are incompatible.
    pub fn resolve(&self, target: &Unit) -> f64 {
        convert_or_raw(self.value, self.unit.as_ref(), target)
    }
}

/// Rotation by an arbitrary angle about the image centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotate {
    /// Counterclockwise angle in radians.
    pub angle: f64,
    /// Value for cells whose pre-image lies outside the source.
    pub fill: FillValue,
    /// Interpolation for off-grid pre-images.
    pub interpolation: InterpolationMethod2D,
}

impl Rotate {
    /// Rotation by `angle` radians with a zero fill and bilinear interpolation.
    pub fn new(angle: f64) -> Self {
        Self {
            angle,
            fill: FillValue::default(),
            interpolation: InterpolationMethod2D::default(),
        }
    }

    /// Rotation by `degrees`.
    pub fn degrees(degrees: f64) -> Self {
        Self::new(degrees.to_radians())
    }

    /// Sets the fill value.
    pub fn with_fill(mut self, fill: FillValue) -> Self {
        self.fill = fill;
        self
    }

    /// Sets the interpolation method.
    pub fn with_interpolation(mut self, interpolation: InterpolationMethod2D) -> Self {
        self.interpolation = interpolation;
        self
    }
}

/// Factor converting y coordinates into x units (1 when incompatible).
fn y_to_x_factor(x: &Unit, y: &Unit) -> f64 {
    y.conversion_factor_to(x).unwrap_or(1.0)
}

fn flip_columns(channel: &GridChannel2DData) -> Vec<f64> {
    let cols = channel.column_count();
    channel
        .values()
        .chunks(cols)
        .flat_map(|row| row.iter().rev().copied())
        .collect()
}

fn flip_rows(channel: &GridChannel2DData) -> Vec<f64> {
    let cols = channel.column_count();
    channel.values().rchunks(cols).flatten().copied().collect()
}

/// New coordinates for the points matching `position`; others keep theirs.
fn move_points(
    channel: &ScatteredChannel2DData,
    roi: Option<(&Roi, RoiPosition)>,
    f: impl Fn(f64, f64) -> (f64, f64),
) -> OpsResult<ScatteredChannel2DData> {
    let mut x = channel.x_coordinates_copy();
    let mut y = channel.y_coordinates_copy();
    let indices: Vec<usize> = match roi {
        Some((roi, position)) => channel.indices_in_roi(roi, position),
        None => (0..channel.point_count()).collect(),
    };
    for i in indices {
        (x[i], y[i]) = f(x[i], y[i]);
    }
    Ok(channel.with_coordinates(x, y, channel.z_coordinates_copy())?)
}

impl GridTransform for FlipHorizontally {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        Ok(channel.with_values(flip_columns(channel))?)
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
        merge_masked(channel, &flip_columns(channel), &roi.mask(channel.grid(), position))
    }
}

impl ScatteredTransform for FlipHorizontally {
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
        let (x0, _, x1, _) = channel.domain().bounds();
        move_points(channel, None, |x, y| (x0 + x1 - x, y))
    }

    fn transform_scattered_in_roi(
        &self,
        channel: &ScatteredChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<ScatteredChannel2DData> {
        let (x0, _, x1, _) = channel.domain().bounds();
        move_points(channel, Some((roi, position)), |x, y| (x0 + x1 - x, y))
    }
}

impl GridTransform for FlipVertically {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        Ok(channel.with_values(flip_rows(channel))?)
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
        merge_masked(channel, &flip_rows(channel), &roi.mask(channel.grid(), position))
    }
}

impl ScatteredTransform for FlipVertically {
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
        let (_, y0, _, y1) = channel.domain().bounds();
        move_points(channel, None, |x, y| (x, y0 + y1 - y))
    }

    fn transform_scattered_in_roi(
        &self,
        channel: &ScatteredChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<ScatteredChannel2DData> {
        let (_, y0, _, y1) = channel.domain().bounds();
        move_points(channel, Some((roi, position)), |x, y| (x, y0 + y1 - y))
    }
}

impl GridTransform for Transpose {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        let (rows, cols) = (channel.row_count(), channel.column_count());
        let values = spm_math::svd::transpose(rows, cols, channel.values());
        Ok(GridChannel2DData::new(
            channel.grid().transpose(),
            values,
            channel.z_quantity().clone(),
        )?)
    }

    fn transform_grid_in_roi(
        &self,
        channel: &GridChannel2DData,
        _roi: &Roi,
        _position: RoiPosition,
    ) -> OpsResult<GridChannel2DData> {
        self.transform_grid(channel)
    }
}

impl ScatteredTransform for Transpose {
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
        Ok(ScatteredChannel2DData::new(
            channel.y_coordinates_copy(),
            channel.x_coordinates_copy(),
            channel.z_coordinates_copy(),
        )?
        .with_quantities(
            channel.y_quantity().clone(),
            channel.x_quantity().clone(),
            channel.z_quantity().clone(),
        ))
    }

    fn transform_scattered_in_roi(
        &self,
        channel: &ScatteredChannel2DData,
        _roi: &Roi,
        _position: RoiPosition,
    ) -> OpsResult<ScatteredChannel2DData> {
        self.transform_scattered(channel)
    }
}

/// Grid of a quarter-turned image, centred where the original was.
fn quarter_turn_grid(grid: &Grid2D) -> OpsResult<Grid2D> {
    let (cx, cy) = grid.center();
    let rows = grid.column_count();
    let cols = grid.row_count();
    let increment_x = grid.increment_y();
    let increment_y = grid.increment_x();
    let origin_x = cx - 0.5 * (cols - 1) as f64 * increment_x;
    let origin_y = cy - 0.5 * (rows - 1) as f64 * increment_y;
    Ok(Grid2D::new(rows, cols, origin_x, origin_y, increment_x, increment_y)?
        .with_quantities(grid.y_quantity().clone(), grid.x_quantity().clone()))
}

/// Quarter-turns a scattered channel about its domain centre.
fn quarter_turn_points(channel: &ScatteredChannel2DData, clockwise: bool) -> OpsResult<ScatteredChannel2DData> {
    let (x0, y0, x1, y1) = channel.domain().bounds();
    let (cx, cy) = (0.5 * (x0 + x1), 0.5 * (y0 + y1));
    let (x, y): (Vec<f64>, Vec<f64>) = channel
        .x_coordinates()
        .iter()
        .zip(channel.y_coordinates())
        .map(|(&x, &y)| {
            let (dx, dy) = (x - cx, y - cy);
            if clockwise { (cx + dy, cy - dx) } else { (cx - dy, cy + dx) }
        })
        .unzip();
    Ok(ScatteredChannel2DData::new(x, y, channel.z_coordinates_copy())?.with_quantities(
        channel.y_quantity().clone(),
        channel.x_quantity().clone(),
        channel.z_quantity().clone(),
    ))
}

impl GridTransform for RotateClockwise {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        let (rows, cols) = (channel.row_count(), channel.column_count());
        trace!(rows, cols, "rotate clockwise");
        let mut values = Vec::with_capacity(rows * cols);
        for r in 0..cols {
            for c in 0..rows {
                values.push(channel.value(c, cols - 1 - r));
            }
        }
        Ok(GridChannel2DData::new(
            quarter_turn_grid(channel.grid())?,
            values,
            channel.z_quantity().clone(),
        )?)
    }

    fn transform_grid_in_roi(
        &self,
        channel: &GridChannel2DData,
        _roi: &Roi,
        _position: RoiPosition,
    ) -> OpsResult<GridChannel2DData> {
        self.transform_grid(channel)
    }
}

impl ScatteredTransform for RotateClockwise {
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
        quarter_turn_points(channel, true)
    }

    fn transform_scattered_in_roi(
        &self,
        channel: &ScatteredChannel2DData,
        _roi: &Roi,
        _position: RoiPosition,
    ) -> OpsResult<ScatteredChannel2DData> {
        quarter_turn_points(channel, true)
    }
}

impl GridTransform for RotateCounterClockwise {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        let (rows, cols) = (channel.row_count(), channel.column_count());
        trace!(rows, cols, "rotate counterclockwise");
        let mut values = Vec::with_capacity(rows * cols);
        for r in 0..cols {
            for c in 0..rows {
                values.push(channel.value(rows - 1 - c, r));
            }
        }
        Ok(GridChannel2DData::new(
            quarter_turn_grid(channel.grid())?,
            values,
            channel.z_quantity().clone(),
        )?)
    }

    fn transform_grid_in_roi(
        &self,
        channel: &GridChannel2DData,
        _roi: &Roi,
        _position: RoiPosition,
    ) -> OpsResult<GridChannel2DData> {
        self.transform_grid(channel)
    }
}

impl ScatteredTransform for RotateCounterClockwise {
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
        quarter_turn_points(channel, false)
    }

    fn transform_scattered_in_roi(
        &self,
        channel: &ScatteredChannel2DData,
        _roi: &Roi,
        _position: RoiPosition,
    ) -> OpsResult<ScatteredChannel2DData> {
        quarter_turn_points(channel, false)
    }
}

impl Rotate {
    /// Rotated values for every cell of `channel`.
    fn rotated_values(&self, channel: &GridChannel2DData, mask: Option<&spm_core::GridMask>) -> Vec<f64> {
        let grid = channel.grid();
        let (cx, cy) = grid.center();
        let f = y_to_x_factor(grid.x_quantity().unit(), grid.y_quantity().unit());
        let fill = self.fill.resolve(channel.z_quantity().unit());
        let (sin, cos) = (-self.angle).sin_cos();

        let mut values = channel.values_copy();
        for row in 0..grid.row_count() {
            let dy = (grid.y(row) - cy) * f;
            for col in 0..grid.column_count() {
                if mask.is_some_and(|m| !m.contains(row, col)) {
                    continue;
                }
                let dx = grid.x(col) - cx;
                let sx = cx + dx * cos - dy * sin;
                let sy = cy + (dx * sin + dy * cos) / f;
                let v = self.interpolation.value_at(channel, sx, sy);
                values[row * grid.column_count() + col] = if v.is_nan() { fill } else { v };
            }
        }
        values
    }
}

impl GridTransform for Rotate {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        trace!(
            rows = channel.row_count(),
            cols = channel.column_count(),
            angle = self.angle,
            "rotate"
        );
        Ok(channel.with_values(self.rotated_values(channel, None))?)
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
        // Cells whose pre-image lies in the ROI are the cells of the ROI
        // turned forward by the rotation angle.
        let (cx, cy) = channel.grid().center();
        let mask = roi.rotated_copy(-self.angle, cx, cy).mask(channel.grid(), position);
        Ok(channel.with_values(self.rotated_values(channel, Some(&mask)))?)
    }
}

impl Rotate {
    fn rotate_points(
        &self,
        channel: &ScatteredChannel2DData,
        roi: Option<(&Roi, RoiPosition)>,
    ) -> OpsResult<ScatteredChannel2DData> {
        let (x0, y0, x1, y1) = channel.domain().bounds();
        let (cx, cy) = (0.5 * (x0 + x1), 0.5 * (y0 + y1));
        let f = y_to_x_factor(channel.x_quantity().unit(), channel.y_quantity().unit());
        let (sin, cos) = self.angle.sin_cos();
        move_points(channel, roi, |x, y| {
            let (dx, dy) = (x - cx, (y - cy) * f);
            (cx + dx * cos - dy * sin, cy + (dx * sin + dy * cos) / f)
        })
    }
}

impl ScatteredTransform for Rotate {
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
        self.rotate_points(channel, None)
    }

    fn transform_scattered_in_roi(
        &self,
        channel: &ScatteredChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<ScatteredChannel2DData> {
        if position == RoiPosition::Everything {
            return self.transform_scattered(channel);
        }
        self.rotate_points(channel, Some((roi, position)))
    }
}

dispatch_channel_transform!(
    FlipHorizontally,
    FlipVertically,
    Transpose,
    RotateClockwise,
    RotateCounterClockwise,
    Rotate,
);
