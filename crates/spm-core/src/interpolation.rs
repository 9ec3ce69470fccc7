//! Interpolation seam used by regridding, rotation and cross-image arithmetic.
//!
//! The data model only defines the contract; `spm-math` provides the
//! implementations (nearest, bilinear, bicubic, inverse-distance gridding).

use crate::channel::{GridChannel2DData, ScatteredChannel2DData};
use crate::error::Result;
use crate::grid::Grid2D;

/// Interpolation of channel values at arbitrary positions.
pub trait Interpolation2D: Send + Sync {
    /// Value of `channel` at `(x, y)`.
    ///
    /// Returns `NaN` when `(x, y)` lies outside the channel's domain; callers
    /// treat `NaN` as "no value available".
    fn value_at(&self, channel: &GridChannel2DData, x: f64, y: f64) -> f64;

    /// Resamples scattered points onto `grid`.
    fn grid_scattered(
        &self,
        channel: &ScatteredChannel2DData,
        grid: &Grid2D,
    ) -> Result<GridChannel2DData>;

    /// Resamples `channel` onto a grid of the same extent with new counts.
    fn gridded(
        &self,
        channel: &GridChannel2DData,
        row_count: usize,
        column_count: usize,
    ) -> Result<GridChannel2DData> {
        let grid = channel.grid().change_density(row_count, column_count)?;
        let mut values = Vec::with_capacity(grid.item_count());
        for row in 0..row_count {
            let y = grid.y(row);
            for col in 0..column_count {
                values.push(self.value_at(channel, grid.x(col), y));
            }
        }
        GridChannel2DData::new(grid, values, channel.z_quantity().clone())
    }
}
