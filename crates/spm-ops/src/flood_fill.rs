//! Region growing from a seed point.
//!
//! [`FloodFill`] grows a 4-connected region from the cell nearest to a
//! physical seed position. A neighbour joins when its value minus the seed
//! value lies in `[min_difference, max_difference]`. Every region cell is set
//! to the fill value. The walk uses an explicit stack and a visited mask, so
//! region size is bounded by memory rather than call depth.
//!
//! [`FloodFillSolid`] also traces the region's outer boundary (see
//! [`crate::contour`]) and fills every cell enclosed by it, closing holes the
//! 4-connected growth left behind.
//!
//! A seed outside the grid, or outside the matching cells of a ROI, leaves
//! the channel unchanged. With a ROI the region only grows through matching
//! cells.
//!
//! # Example
//!
//! ```rust
//! use spm_core::{Grid2D, GridChannel2DData, Quantity};
//! use spm_ops::flood_fill::FloodFill;
//! use spm_ops::transform::GridTransform;
//!
//! let grid = Grid2D::new(3, 3, 0.0, 0.0, 1.0, 1.0).unwrap();
//! let ch = GridChannel2DData::filled(grid, 0.0, Quantity::height());
//! let filled = FloodFill::new(1.0, 1.0, 9.0).transform_grid(&ch).unwrap();
//! assert!(filled.values().iter().all(|&v| v == 9.0));
//! ```

use serde::{Deserialize, Serialize};
use spm_core::{GridChannel2DData, GridMask, GridPointRecipient, Roi, RoiPosition};
use tracing::{debug, trace};

use crate::contour::trace_contour;
use crate::error::OpsResult;
use crate::transform::GridTransform;

/// 4-connected flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloodFill {
    /// Seed x position.
    pub x: f64,
    /// Seed y position.
    pub y: f64,
    /// Value written into the region.
    pub fill_value: f64,
    /// Smallest admitted `value - seed_value`.
    pub min_difference: f64,
    /// Largest admitted `value - seed_value`.
    pub max_difference: f64,
}

impl FloodFill {
    /// Fill of the cells equal to the seed value.
    pub fn new(x: f64, y: f64, fill_value: f64) -> Self {
        Self {
            x,
            y,
            fill_value,
            min_difference: 0.0,
            max_difference: 0.0,
        }
    }

    /// Sets the admitted difference range.
    pub fn with_tolerance(mut self, min_difference: f64, max_difference: f64) -> Self {
        self.min_difference = min_difference;
        self.max_difference = max_difference;
        self
    }

    /// Seed cell `(row, col)` when the seed lies on the grid.
    fn seed(&self, channel: &GridChannel2DData) -> Option<(usize, usize)> {
        let grid = channel.grid();
        Some((grid.row_index(self.y)?, grid.column_index(self.x)?))
    }

    /// Cells reached from the seed; growth is limited to `allowed` if given.
    fn region(&self, channel: &GridChannel2DData, allowed: Option<&GridMask>) -> Option<GridMask> {
        let (seed_row, seed_col) = self.seed(channel)?;
        if allowed.is_some_and(|m| !m.contains(seed_row, seed_col)) {
            debug!(seed_row, seed_col, "Flood fill seed outside ROI");
            return None;
        }
        let rows = channel.row_count();
        let cols = channel.column_count();
        let seed_value = channel.value(seed_row, seed_col);
        trace!(rows, cols, seed_row, seed_col, seed_value, "flood fill");

        let admits = |row: usize, col: usize| {
            let d = channel.value(row, col) - seed_value;
            d >= self.min_difference && d <= self.max_difference && allowed.is_none_or(|m| m.contains(row, col))
        };

        let mut region = GridMask::new(rows, cols);
        let mut visited = vec![false; rows * cols];
        let mut stack = vec![(seed_row, seed_col)];
        visited[seed_row * cols + seed_col] = true;
        region.add_point(seed_row, seed_col);

        while let Some((row, col)) = stack.pop() {
            let neighbours = [
                (row.wrapping_sub(1), col),
                (row + 1, col),
                (row, col.wrapping_sub(1)),
                (row, col + 1),
            ];
            for (r, c) in neighbours {
                if r >= rows || c >= cols || visited[r * cols + c] {
                    continue;
                }
                visited[r * cols + c] = true;
                if admits(r, c) {
                    region.add_point(r, c);
                    stack.push((r, c));
                }
            }
        }
        debug!(cells = region.count(), "Flood fill region grown");
        Some(region)
    }

    fn apply(&self, channel: &GridChannel2DData, region: &GridMask) -> OpsResult<GridChannel2DData> {
        let values = channel
            .values()
            .iter()
            .zip(region.cells())
            .map(|(&v, &set)| if set { self.fill_value } else { v })
            .collect();
        Ok(channel.with_values(values)?)
    }
}

impl GridTransform for FloodFill {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        match self.region(channel, None) {
            Some(region) => self.apply(channel, &region),
            None => Ok(channel.clone()),
        }
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
        let allowed = roi.mask(channel.grid(), position);
        match self.region(channel, Some(&allowed)) {
            Some(region) => self.apply(channel, &region),
            None => Ok(channel.clone()),
        }
    }
}

/// Flood fill that also fills everything enclosed by the region's boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloodFillSolid {
    fill: FloodFill,
}

impl FloodFillSolid {
    /// Solid variant of `fill`.
    pub fn new(fill: FloodFill) -> Self {
        Self { fill }
    }

    /// Underlying flood fill parameters.
    pub fn fill(&self) -> &FloodFill {
        &self.fill
    }

    fn solid_region(&self, channel: &GridChannel2DData, allowed: Option<&GridMask>) -> Option<GridMask> {
        let mut region = self.fill.region(channel, allowed)?;
        if let Some(contour) = trace_contour(&region) {
            debug!(boundary = contour.len(), "Filling contour interior");
            let mut interior = GridMask::new(region.rows(), region.columns());
            contour.fill_interior(&mut interior);
            for (i, &set) in interior.cells().iter().enumerate() {
                let (row, col) = (i / region.columns(), i % region.columns());
                if set && allowed.is_none_or(|m| m.contains(row, col)) {
                    region.add_point(row, col);
                }
            }
        }
        Some(region)
    }
}

impl GridTransform for FloodFillSolid {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        match self.solid_region(channel, None) {
            Some(region) => self.fill.apply(channel, &region),
            None => Ok(channel.clone()),
        }
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
        let allowed = roi.mask(channel.grid(), position);
        match self.solid_region(channel, Some(&allowed)) {
            Some(region) => self.fill.apply(channel, &region),
            None => Ok(channel.clone()),
        }
    }
}
