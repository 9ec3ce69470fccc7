//! Level shift that pins the minimum to a chosen value.
//!
//! [`FixMinimum`] adds `minimum_new - min` to every matching value, where
//! `min` is the smallest non-NaN value among the matching points. With
//! `fix_only_if_old_minimum_lower` set, the channel is returned unchanged
//! when `min` is already below `minimum_new`; a minimum at or above the
//! target is shifted down onto it.
//!
//! With a ROI, `min` is the minimum of the selected points only. The
//! whole-channel minimum is a lower bound of every restricted minimum, so
//! it can prove that a restricted minimum is *not* below the target but
//! never that it is; the skip is therefore decided on the restricted
//! minimum. The whole-channel minimum is still looked at first to return
//! channels without any finite value before enumerating the ROI.
//!
//! # Example
//!
//! ```rust
//! use spm_core::{Grid2D, GridChannel2DData, Quantity};
//! use spm_ops::fix_minimum::FixMinimum;
//! use spm_ops::transform::GridTransform;
//!
//! let grid = Grid2D::new(2, 2, 0.0, 0.0, 1.0, 1.0).unwrap();
//! let ch = GridChannel2DData::from_matrix(grid, vec![vec![5.0, 3.0], vec![7.0, 2.0]], Quantity::height()).unwrap();
//! let fixed = FixMinimum::new(0.0, true).transform_grid(&ch).unwrap();
//! assert_eq!(fixed.data_copy(), vec![vec![3.0, 1.0], vec![5.0, 0.0]]);
//! ```

use serde::{Deserialize, Serialize};
use spm_core::{GridChannel2DData, Roi, RoiPosition, ScatteredChannel2DData};
use tracing::{debug, trace};

use crate::error::OpsResult;
use crate::transform::{GridTransform, ScatteredTransform, dispatch_channel_transform, map_grid_in_roi, map_scattered_in_roi};

/// Shifts values so that their minimum equals `minimum_new`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FixMinimum {
    /// Target minimum, in the channel's z unit.
    pub minimum_new: f64,
    /// Leave channels whose (restricted) minimum is below `minimum_new` untouched.
    pub fix_only_if_old_minimum_lower: bool,
}

impl FixMinimum {
    /// Creates the operation.
    pub fn new(minimum_new: f64, fix_only_if_old_minimum_lower: bool) -> Self {
        Self {
            minimum_new,
            fix_only_if_old_minimum_lower,
        }
    }

    /// Shift to apply for a channel whose (restricted) minimum is `min`, or
    /// `None` when nothing should change.
    fn shift(&self, min: f64) -> Option<f64> {
        if min.is_nan() {
            return None;
        }
        if self.fix_only_if_old_minimum_lower && min < self.minimum_new {
            debug!(min, target = self.minimum_new, "Minimum below target, leaving channel unchanged");
            return None;
        }
        Some(self.minimum_new - min)
    }
}

fn scattered_min(channel: &ScatteredChannel2DData, indices: impl Iterator<Item = usize>) -> f64 {
    let z = channel.z_coordinates();
    indices.map(|i| z[i]).fold(f64::NAN, f64::min)
}

impl GridTransform for FixMinimum {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        trace!(rows = channel.row_count(), cols = channel.column_count(), "fix minimum");
        match self.shift(channel.min()) {
            Some(shift) => Ok(channel.with_values(channel.values().iter().map(|v| v + shift).collect())?),
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
        if channel.min().is_nan() {
            return Ok(channel.clone());
        }
        match self.shift(channel.min_in_roi(roi, position)) {
            Some(shift) => map_grid_in_roi(channel, roi, position, |_, _, v| v + shift),
            None => Ok(channel.clone()),
        }
    }
}

impl ScatteredTransform for FixMinimum {
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
        match self.shift(scattered_min(channel, 0..channel.point_count())) {
            Some(shift) => Ok(channel.with_z(channel.z_coordinates().iter().map(|v| v + shift).collect())?),
            None => Ok(channel.clone()),
        }
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
        let min = scattered_min(channel, channel.indices_in_roi(roi, position).into_iter());
        match self.shift(min) {
            Some(shift) => map_scattered_in_roi(channel, roi, position, |_, _, z| z + shift),
            None => Ok(channel.clone()),
        }
    }
}

dispatch_channel_transform!(FixMinimum);
