//! Regridding to new row and column counts.
//!
//! [`Regrid`] keeps the sampled extent and resamples it with the configured
//! [`InterpolationMethod2D`]. Requesting the current dimensions returns an
//! unchanged copy. Scattered channels are gridded straight onto the requested
//! dimensions.
//!
//! # Example
//!
//! ```rust
//! use spm_core::{Grid2D, GridChannel2DData, Quantity};
//! use spm_ops::resize::Regrid;
//! use spm_ops::transform::GridTransform;
//!
//! let grid = Grid2D::new(2, 2, 0.0, 0.0, 1.0, 1.0).unwrap();
//! let ch = GridChannel2DData::new(grid, vec![0.0, 1.0, 2.0, 3.0], Quantity::height()).unwrap();
//! let fine = Regrid::new(3, 3).transform_grid(&ch).unwrap();
//! assert_eq!(fine.value(1, 1), 1.5);
//! ```

use serde::{Deserialize, Serialize};
use spm_core::{Channel2D, GridChannel2DData, GriddingConfig, Interpolation2D, Roi, RoiPosition};
use spm_math::InterpolationMethod2D;
use tracing::{debug, trace};

use crate::error::{OpsError, OpsResult};
use crate::transform::{Channel2DTransform, GridTransform};

/// Resampling to `rows x columns` over the same extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regrid {
    /// Target row count.
    pub rows: usize,
    /// Target column count.
    pub columns: usize,
    /// Interpolation used for resampling.
    pub method: InterpolationMethod2D,
}

impl Regrid {
    /// Bilinear regrid to `rows x columns`.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            method: InterpolationMethod2D::default(),
        }
    }

    /// Sets the interpolation method.
    pub fn with_method(mut self, method: InterpolationMethod2D) -> Self {
        self.method = method;
        self
    }

    fn validate(&self) -> OpsResult<()> {
        if self.rows == 0 || self.columns == 0 {
            return Err(OpsError::InvalidDimensions(format!(
                "cannot regrid to {}x{}",
                self.rows, self.columns
            )));
        }
        Ok(())
    }
}

impl GridTransform for Regrid {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        self.validate()?;
        if channel.row_count() == self.rows && channel.column_count() == self.columns {
            return Ok(channel.clone());
        }
        trace!(
            rows = channel.row_count(),
            cols = channel.column_count(),
            new_rows = self.rows,
            new_cols = self.columns,
            "regrid"
        );
        Ok(self.method.gridded(channel, self.rows, self.columns)?)
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

impl Channel2DTransform for Regrid {
    fn transform(&self, channel: &Channel2D) -> OpsResult<Channel2D> {
        match channel {
            Channel2D::Grid(g) => Ok(Channel2D::Grid(self.transform_grid(g)?)),
            Channel2D::Scattered(_) => {
                self.validate()?;
                debug!(rows = self.rows, cols = self.columns, "Gridding scattered channel for regrid");
                let config = GriddingConfig {
                    rows: Some(self.rows),
                    columns: Some(self.columns),
                };
                Ok(Channel2D::Grid(channel.default_gridding_with(&config, &self.method)?))
            }
        }
    }

    fn transform_in_roi(&self, channel: &Channel2D, _roi: &Roi, _position: RoiPosition) -> OpsResult<Channel2D> {
        self.transform(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use spm_core::{Grid2D, Quantity, ScatteredChannel2DData};

    fn plane() -> GridChannel2DData {
        let grid = Grid2D::new(4, 5, 10.0, 20.0, 0.5, 0.25).unwrap();
        let values = (0..20).map(|i| (i % 5) as f64 * 2.0 + (i / 5) as f64).collect();
        GridChannel2DData::new(grid, values, Quantity::height()).unwrap()
    }

    #[test]
    fn test_same_dimensions_unchanged() {
        let ch = plane();
        assert_eq!(Regrid::new(4, 5).transform_grid(&ch).unwrap(), ch);
    }

    #[test]
    fn test_plane_preserved_and_extent_kept() {
        let ch = plane();
        let out = Regrid::new(7, 9).transform_grid(&ch).unwrap();
        assert_eq!((out.row_count(), out.column_count()), (7, 9));
        assert_relative_eq!(out.grid().x_max(), ch.grid().x_max(), epsilon = 1e-12);
        assert_relative_eq!(out.grid().y_max(), ch.grid().y_max(), epsilon = 1e-12);
        for r in 0..7 {
            for c in 0..9 {
                let expected = (c as f64 * 0.5) * 2.0 + r as f64 * 0.5;
                assert_relative_eq!(out.value(r, c), expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(Regrid::new(0, 3).transform_grid(&plane()).is_err());
    }

    #[test]
    fn test_scattered_gridded_to_requested_size() {
        let s = ScatteredChannel2DData::new(
            vec![0.0, 1.0, 0.0, 1.0, 0.5],
            vec![0.0, 0.0, 1.0, 1.0, 0.5],
            vec![1.0, 1.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        let out = Regrid::new(3, 4).transform(&Channel2D::from(s)).unwrap();
        let g = out.as_grid().unwrap();
        assert_eq!((g.row_count(), g.column_count()), (3, 4));
        assert!(g.values().iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }
}
