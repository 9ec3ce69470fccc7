//! Transform traits shared by every operation.
//!
//! Transforms are stateless parameter objects. Applying one never modifies
//! its input; the result is a new channel.
//!
//! - [`GridTransform`] - operations defined on regular grids
//! - [`Channel2DTransform`] - operations on either channel representation
//! - [`GriddedTransform`] - lifts a [`GridTransform`] to [`Channel2DTransform`]
//!   by gridding scattered input first
//!
//! ROI-aware variants take a [`Roi`] and a [`RoiPosition`]. With
//! [`RoiPosition::Everything`] they fall back to the whole-channel algorithm.

use spm_core::{Channel2D, GridChannel2DData, GridMask, GriddingConfig, Roi, RoiPosition, ScatteredChannel2DData};
use spm_math::InterpolationMethod2D;

use crate::error::OpsResult;

/// Operation on grid channels.
pub trait GridTransform {
    /// Transforms the whole channel.
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData>;

    /// Transforms the cells matching `position` relative to `roi`.
    fn transform_grid_in_roi(
        &self,
        channel: &GridChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<GridChannel2DData>;
}

/// Operation on grid or scattered channels.
pub trait Channel2DTransform {
    /// Transforms the whole channel.
    fn transform(&self, channel: &Channel2D) -> OpsResult<Channel2D>;

    /// Transforms the points matching `position` relative to `roi`.
    fn transform_in_roi(&self, channel: &Channel2D, roi: &Roi, position: RoiPosition) -> OpsResult<Channel2D>;
}

/// Operation on scattered channels.
///
/// Types implementing both this and [`GridTransform`] get a
/// [`Channel2DTransform`] impl dispatching on the channel representation.
pub trait ScatteredTransform {
    /// Transforms every point.
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData>;

    /// Transforms the points matching `position` relative to `roi`.
    fn transform_scattered_in_roi(
        &self,
        channel: &ScatteredChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<ScatteredChannel2DData>;
}

/// Implements [`Channel2DTransform`] for types that implement both
/// [`GridTransform`] and [`ScatteredTransform`].
///
/// `dispatch_channel_transform!(A, B)` for plain types,
/// `dispatch_channel_transform!(generic <F: Bound> Wrapper<F>)` for a type
/// with one bounded parameter.
macro_rules! dispatch_channel_transform {
    (@impl [$($generics:tt)*] $ty:ty) => {
        impl<$($generics)*> $crate::transform::Channel2DTransform for $ty {
            fn transform(&self, channel: &spm_core::Channel2D) -> $crate::OpsResult<spm_core::Channel2D> {
                use $crate::transform::{GridTransform, ScatteredTransform};
                Ok(match channel {
                    spm_core::Channel2D::Grid(g) => spm_core::Channel2D::Grid(self.transform_grid(g)?),
                    spm_core::Channel2D::Scattered(s) => spm_core::Channel2D::Scattered(self.transform_scattered(s)?),
                })
            }

            fn transform_in_roi(
                &self,
                channel: &spm_core::Channel2D,
                roi: &spm_core::Roi,
                position: spm_core::RoiPosition,
            ) -> $crate::OpsResult<spm_core::Channel2D> {
                use $crate::transform::{GridTransform, ScatteredTransform};
                Ok(match channel {
                    spm_core::Channel2D::Grid(g) => {
                        spm_core::Channel2D::Grid(self.transform_grid_in_roi(g, roi, position)?)
                    }
                    spm_core::Channel2D::Scattered(s) => {
                        spm_core::Channel2D::Scattered(self.transform_scattered_in_roi(s, roi, position)?)
                    }
                })
            }
        }
    };
    (generic <$param:ident : $bound:path> $ty:ty) => {
        dispatch_channel_transform!(@impl [$param: $bound] $ty);
    };
    ($($ty:ty),+ $(,)?) => {
        $(
            dispatch_channel_transform!(@impl [] $ty);
        )+
    };
}

pub(crate) use dispatch_channel_transform;

/// Applies a grid-only transform to any channel, gridding scattered data
/// with the configured interpolation first.
///
/// # Example
///
/// ```rust
/// use spm_core::{Channel2D, ScatteredChannel2DData};
/// use spm_ops::arithmetic::Negate;
/// use spm_ops::transform::{Channel2DTransform, GriddedTransform};
///
/// let points = ScatteredChannel2DData::new(
///     vec![0.0, 1.0, 0.0, 1.0],
///     vec![0.0, 0.0, 1.0, 1.0],
///     vec![1.0, 2.0, 3.0, 4.0],
/// )
/// .unwrap();
/// let out = GriddedTransform::new(Negate).transform(&Channel2D::from(points)).unwrap();
/// assert!(out.is_grid());
/// ```
#[derive(Debug, Clone)]
pub struct GriddedTransform<T> {
    inner: T,
    interpolation: InterpolationMethod2D,
    gridding: GriddingConfig,
}

impl<T> GriddedTransform<T> {
    /// Wraps `inner` with default gridding.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            interpolation: InterpolationMethod2D::default(),
            gridding: GriddingConfig::default(),
        }
    }

    /// Sets the interpolation used for gridding.
    pub fn with_interpolation(mut self, interpolation: InterpolationMethod2D) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Overrides the gridding dimensions.
    pub fn with_gridding(mut self, gridding: GriddingConfig) -> Self {
        self.gridding = gridding;
        self
    }

    /// The wrapped transform.
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: GridTransform> Channel2DTransform for GriddedTransform<T> {
    fn transform(&self, channel: &Channel2D) -> OpsResult<Channel2D> {
        let grid = channel.default_gridding_with(&self.gridding, &self.interpolation)?;
        Ok(Channel2D::Grid(self.inner.transform_grid(&grid)?))
    }

    fn transform_in_roi(&self, channel: &Channel2D, roi: &Roi, position: RoiPosition) -> OpsResult<Channel2D> {
        let grid = channel.default_gridding_with(&self.gridding, &self.interpolation)?;
        Ok(Channel2D::Grid(self.inner.transform_grid_in_roi(&grid, roi, position)?))
    }
}

/// New channel with `f(row, col, value)` written at every cell.
pub(crate) fn map_grid(
    channel: &GridChannel2DData,
    f: impl Fn(usize, usize, f64) -> f64,
) -> OpsResult<GridChannel2DData> {
    let cols = channel.column_count();
    let values = channel
        .values()
        .iter()
        .enumerate()
        .map(|(i, &v)| f(i / cols, i % cols, v))
        .collect();
    Ok(channel.with_values(values)?)
}

/// New channel with `f(row, col, value)` written at the cells matching
/// `position`; other cells keep their value.
pub(crate) fn map_grid_in_roi(
    channel: &GridChannel2DData,
    roi: &Roi,
    position: RoiPosition,
    f: impl Fn(usize, usize, f64) -> f64,
) -> OpsResult<GridChannel2DData> {
    if position == RoiPosition::Everything {
        return map_grid(channel, f);
    }
    let cols = channel.column_count();
    let mut values = channel.values_copy();
    roi.add_points(channel.grid(), position, &mut |row: usize, col: usize| {
        let i = row * cols + col;
        values[i] = f(row, col, values[i]);
    });
    Ok(channel.with_values(values)?)
}

/// Takes `transformed` at the cells set in `mask` and `channel` elsewhere.
pub(crate) fn merge_masked(
    channel: &GridChannel2DData,
    transformed: &[f64],
    mask: &GridMask,
) -> OpsResult<GridChannel2DData> {
    let values = channel
        .values()
        .iter()
        .zip(transformed)
        .zip(mask.cells())
        .map(|((&old, &new), &set)| if set { new } else { old })
        .collect();
    Ok(channel.with_values(values)?)
}

/// New channel with `f(x, y, z)` as the value of every point.
pub(crate) fn map_scattered(
    channel: &ScatteredChannel2DData,
    f: impl Fn(f64, f64, f64) -> f64,
) -> OpsResult<ScatteredChannel2DData> {
    let z = channel
        .x_coordinates()
        .iter()
        .zip(channel.y_coordinates())
        .zip(channel.z_coordinates())
        .map(|((&x, &y), &z)| f(x, y, z))
        .collect();
    Ok(channel.with_z(z)?)
}

/// New scattered channel with `f(x, y, z)` as the value of every point
/// matching `position`.
pub(crate) fn map_scattered_in_roi(
    channel: &ScatteredChannel2DData,
    roi: &Roi,
    position: RoiPosition,
    f: impl Fn(f64, f64, f64) -> f64,
) -> OpsResult<ScatteredChannel2DData> {
    if position == RoiPosition::Everything {
        return map_scattered(channel, f);
    }
    let x = channel.x_coordinates();
    let y = channel.y_coordinates();
    let mut z = channel.z_coordinates_copy();
    for i in channel.indices_in_roi(roi, position) {
        z[i] = f(x[i], y[i], z[i]);
    }
    Ok(channel.with_z(z)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spm_core::{Grid2D, Quantity};

    fn channel() -> GridChannel2DData {
        let grid = Grid2D::new(3, 3, 0.0, 0.0, 1.0, 1.0).unwrap();
        GridChannel2DData::new(grid, (0..9).map(f64::from).collect(), Quantity::height()).unwrap()
    }

    #[test]
    fn test_map_everything_and_inside() {
        let ch = channel();
        let roi = Roi::rectangle(0.0, 0.0, 1.0, 1.0);
        let all = map_grid_in_roi(&ch, &roi, RoiPosition::Everything, |_, _, v| v + 1.0).unwrap();
        assert_eq!(all.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        let inside = map_grid_in_roi(&ch, &roi, RoiPosition::Inside, |_, _, v| -v).unwrap();
        assert_eq!(inside.values(), &[-0.0, -1.0, 2.0, -3.0, -4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_merge_masked() {
        let ch = channel();
        let mask = Roi::rectangle(2.0, 2.0, 2.0, 2.0).mask(ch.grid(), RoiPosition::Inside);
        let merged = merge_masked(&ch, &[100.0; 9], &mask).unwrap();
        assert_eq!(merged.value(2, 2), 100.0);
        assert_eq!(merged.value(0, 0), 0.0);
    }

    #[test]
    fn test_map_scattered() {
        let s = ScatteredChannel2DData::new(vec![0.0, 5.0], vec![0.0, 5.0], vec![1.0, 2.0]).unwrap();
        let roi = Roi::rectangle(-1.0, -1.0, 1.0, 1.0);
        let out = map_scattered_in_roi(&s, &roi, RoiPosition::Outside, |x, y, z| x + y + z).unwrap();
        assert_eq!(out.z_coordinates(), &[1.0, 12.0]);
    }
}
