//! Pixel-value transformations.
//!
//! - [`ImageArithmetic`] - Combine with another image, cell by cell or by
//!   sampling the other image at each point's position
//! - [`ConstantOperation`] - Add or multiply by a constant
//! - [`Negate`] - Flip the sign of every value
//! - [`AddFunction`] / [`ReplaceData`] - Apply a [`SurfaceFunction`] of
//!   `(x, y)` or `(x, y, z)`
//!
//! Values from other sources (the second image, a constant with a unit) are
//! converted into the channel's z unit when the units are compatible and used
//! as raw numbers otherwise.
//!
//! # Example
//!
//! ```rust
//! use spm_core::{Grid2D, GridChannel2DData, Quantity};
//! use spm_ops::arithmetic::{AddFunction, PlaneFunction};
//! use spm_ops::transform::GridTransform;
//!
//! let grid = Grid2D::new(2, 2, 0.0, 0.0, 1.0, 1.0).unwrap();
//! let ch = GridChannel2DData::filled(grid, 1.0, Quantity::height());
//! let tilted = AddFunction::new(PlaneFunction::new(0.0, 1.0, 2.0)).transform_grid(&ch).unwrap();
//! assert_eq!(tilted.values(), &[1.0, 2.0, 3.0, 4.0]);
//! ```

use serde::{Deserialize, Serialize};
use spm_core::{GridChannel2DData, Interpolation2D, Roi, RoiPosition, ScatteredChannel2DData, Unit, convert_or_raw};
use spm_math::InterpolationMethod2D;
use tracing::{debug, trace};

use crate::error::OpsResult;
use crate::transform::{
    GridTransform, ScatteredTransform, dispatch_channel_transform, map_grid, map_grid_in_roi, map_scattered,
    map_scattered_in_roi,
};

/// Binary operation between two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArithmeticOperation {
    /// `a + b`
    #[default]
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`
    Divide,
}

impl ArithmeticOperation {
    /// Applies the operation.
    #[inline]
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
        }
    }
}

/// How the second image is matched to this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArithmeticMode {
    /// Cell `(row, col)` with cell `(row, col)`. Only the overlapping
    /// `min(rows) x min(cols)` block is combined.
    #[default]
    Pixelwise,
    /// The other image is interpolated at each point's `(x, y)`. Points
    /// where it has no value keep theirs.
    Interpolated,
}

/// Combines a channel with a second grid image.
#[derive(Debug, Clone)]
pub struct ImageArithmetic {
    operation: ArithmeticOperation,
    other: GridChannel2DData,
    mode: ArithmeticMode,
    interpolation: InterpolationMethod2D,
}

impl ImageArithmetic {
    /// Pixelwise `operation` with `other`.
    pub fn new(operation: ArithmeticOperation, other: GridChannel2DData) -> Self {
        Self {
            operation,
            other,
            mode: ArithmeticMode::default(),
            interpolation: InterpolationMethod2D::default(),
        }
    }

    /// Sets the matching mode.
    pub fn with_mode(mut self, mode: ArithmeticMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the interpolation used in [`ArithmeticMode::Interpolated`].
    pub fn with_interpolation(mut self, interpolation: InterpolationMethod2D) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Operation applied.
    pub fn operation(&self) -> ArithmeticOperation {
        self.operation
    }

    /// Factor taking the other image's values into `unit`.
    fn factor(&self, unit: &Unit) -> f64 {
        self.other.z_quantity().unit().conversion_factor_to(unit).unwrap_or(1.0)
    }

    fn sample(&self, x: f64, y: f64) -> f64 {
        self.interpolation.value_at(&self.other, x, y)
    }
}

impl ImageArithmetic {
    /// Combines `channel` with the other image at the cells selected by
    /// `region`, or at every cell when `None`.
    fn combine_grid(
        &self,
        channel: &GridChannel2DData,
        region: Option<(&Roi, RoiPosition)>,
    ) -> OpsResult<GridChannel2DData> {
        let factor = self.factor(channel.z_quantity().unit());
        let op = self.operation;
        trace!(
            rows = channel.row_count(),
            cols = channel.column_count(),
            other_rows = self.other.row_count(),
            other_cols = self.other.column_count(),
            ?op,
            "image arithmetic"
        );
        let rows = channel.row_count().min(self.other.row_count());
        let cols = channel.column_count().min(self.other.column_count());
        if self.mode == ArithmeticMode::Pixelwise && (rows < channel.row_count() || cols < channel.column_count()) {
            debug!(rows, cols, "Images differ in size, combining the overlap only");
        }
        let grid = channel.grid();
        let cell = |row: usize, col: usize, v: f64| match self.mode {
            ArithmeticMode::Pixelwise if row < rows && col < cols => op.apply(v, self.other.value(row, col) * factor),
            ArithmeticMode::Pixelwise => v,
            ArithmeticMode::Interpolated => {
                let b = self.sample(grid.x(col), grid.y(row));
                if b.is_nan() { v } else { op.apply(v, b * factor) }
            }
        };
        match region {
            Some((roi, position)) => map_grid_in_roi(channel, roi, position, cell),
            None => map_grid(channel, cell),
        }
    }

    fn combine_scattered(&self, channel: &ScatteredChannel2DData) -> impl Fn(f64, f64, f64) -> f64 + '_ {
        let factor = self.factor(channel.z_quantity().unit());
        let op = self.operation;
        move |x, y, z| {
            let b = self.sample(x, y);
            if b.is_nan() { z } else { op.apply(z, b * factor) }
        }
    }
}

impl GridTransform for ImageArithmetic {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        self.combine_grid(channel, None)
    }

    fn transform_grid_in_roi(
        &self,
        channel: &GridChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<GridChannel2DData> {
        self.combine_grid(channel, Some((roi, position)))
    }
}

impl ScatteredTransform for ImageArithmetic {
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
        map_scattered(channel, self.combine_scattered(channel))
    }

    fn transform_scattered_in_roi(
        &self,
        channel: &ScatteredChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<ScatteredChannel2DData> {
        map_scattered_in_roi(channel, roi, position, self.combine_scattered(channel))
    }
}

/// Addition or multiplication by a constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantOperation {
    /// Adds `value`, given in `unit` (`None`: the channel's unit).
    Add {
        /// Offset.
        value: f64,
        /// Unit of the offset.
        unit: Option<Unit>,
    },
    /// Multiplies by a dimensionless factor.
    Multiply {
        /// Factor.
        factor: f64,
    },
}

impl ConstantOperation {
    /// Adds `value` expressed in the channel's unit.
    pub fn add(value: f64) -> Self {
        Self::Add { value, unit: None }
    }

    /// Multiplies by `factor`.
    pub fn multiply(factor: f64) -> Self {
        Self::Multiply { factor }
    }

    fn operator(&self, target: &Unit) -> impl Fn(f64) -> f64 + use<> {
        let (offset, factor) = match self {
            Self::Add { value, unit } => (convert_or_raw(*value, unit.as_ref(), target), 1.0),
            Self::Multiply { factor } => (0.0, *factor),
        };
        move |v| v * factor + offset
    }
}

impl GridTransform for ConstantOperation {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        let f = self.operator(channel.z_quantity().unit());
        Ok(channel.with_values(channel.values().iter().map(|&v| f(v)).collect())?)
    }

    fn transform_grid_in_roi(
        &self,
        channel: &GridChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<GridChannel2DData> {
        let f = self.operator(channel.z_quantity().unit());
        map_grid_in_roi(channel, roi, position, |_, _, v| f(v))
    }
}

impl ScatteredTransform for ConstantOperation {
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
        let f = self.operator(channel.z_quantity().unit());
        Ok(channel.with_z(channel.z_coordinates().iter().map(|&v| f(v)).collect())?)
    }

    fn transform_scattered_in_roi(
        &self,
        channel: &ScatteredChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<ScatteredChannel2DData> {
        let f = self.operator(channel.z_quantity().unit());
        map_scattered_in_roi(channel, roi, position, |_, _, z| f(z))
    }
}

/// Negates every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Negate;

impl GridTransform for Negate {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        Ok(channel.with_values(channel.values().iter().map(|v| -v).collect())?)
    }

    fn transform_grid_in_roi(
        &self,
        channel: &GridChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<GridChannel2DData> {
        map_grid_in_roi(channel, roi, position, |_, _, v| -v)
    }
}

impl ScatteredTransform for Negate {
    fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
        Ok(channel.with_z(channel.z_coordinates().iter().map(|v| -v).collect())?)
    }

    fn transform_scattered_in_roi(
        &self,
        channel: &ScatteredChannel2DData,
        roi: &Roi,
        position: RoiPosition,
    ) -> OpsResult<ScatteredChannel2DData> {
        map_scattered_in_roi(channel, roi, position, |_, _, z| -z)
    }
}

/// Function of position and, optionally, the current value.
pub trait SurfaceFunction: Send + Sync {
    /// Value at `(x, y)`; `z` is the current value when the caller passes it.
    fn evaluate(&self, x: f64, y: f64, z: Option<f64>) -> f64;
}

impl<F> SurfaceFunction for F
where
    F: Fn(f64, f64, Option<f64>) -> f64 + Send + Sync,
{
    fn evaluate(&self, x: f64, y: f64, z: Option<f64>) -> f64 {
        self(x, y, z)
    }
}

/// `a + b·x + c·y`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaneFunction {
    /// Constant term.
    pub a: f64,
    /// Slope along x.
    pub b: f64,
    /// Slope along y.
    pub c: f64,
}

impl PlaneFunction {
    /// Plane `a + b·x + c·y`.
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }
}

impl SurfaceFunction for PlaneFunction {
    fn evaluate(&self, x: f64, y: f64, _z: Option<f64>) -> f64 {
        self.a + self.b * x + self.c * y
    }
}

/// Adds `f(x, y[, z])` to every value.
#[derive(Debug, Clone)]
pub struct AddFunction<F> {
    function: F,
    uses_dependent_variable: bool,
}

impl<F: SurfaceFunction> AddFunction<F> {
    /// Adds `function(x, y)`.
    pub fn new(function: F) -> Self {
        Self {
            function,
            uses_dependent_variable: false,
        }
    }

    /// Passes the current value as the third argument.
    pub fn with_dependent_variable(mut self, uses_dependent_variable: bool) -> Self {
        self.uses_dependent_variable = uses_dependent_variable;
        self
    }

    fn apply(&self, x: f64, y: f64, z: f64) -> f64 {
        z + self.function.evaluate(x, y, self.uses_dependent_variable.then_some(z))
    }
}

/// Replaces every value by `f(x, y[, z])`.
#[derive(Debug, Clone)]
pub struct ReplaceData<F> {
    function: F,
    uses_dependent_variable: bool,
}

impl<F: SurfaceFunction> ReplaceData<F> {
    /// Replaces values with `function(x, y)`.
    pub fn new(function: F) -> Self {
        Self {
            function,
            uses_dependent_variable: false,
        }
    }

    /// Passes the current value as the third argument.
    pub fn with_dependent_variable(mut self, uses_dependent_variable: bool) -> Self {
        self.uses_dependent_variable = uses_dependent_variable;
        self
    }

    fn apply(&self, x: f64, y: f64, z: f64) -> f64 {
        self.function.evaluate(x, y, self.uses_dependent_variable.then_some(z))
    }
}

macro_rules! function_transform {
    ($name:ident) => {
        impl<F: SurfaceFunction> GridTransform for $name<F> {
            fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
                let grid = channel.grid();
                map_grid(channel, |row, col, v| self.apply(grid.x(col), grid.y(row), v))
            }

            fn transform_grid_in_roi(
                &self,
                channel: &GridChannel2DData,
                roi: &Roi,
                position: RoiPosition,
            ) -> OpsResult<GridChannel2DData> {
                let grid = channel.grid();
                map_grid_in_roi(channel, roi, position, |row, col, v| self.apply(grid.x(col), grid.y(row), v))
            }
        }

        impl<F: SurfaceFunction> ScatteredTransform for $name<F> {
            fn transform_scattered(&self, channel: &ScatteredChannel2DData) -> OpsResult<ScatteredChannel2DData> {
                map_scattered(channel, |x, y, z| self.apply(x, y, z))
            }

            fn transform_scattered_in_roi(
                &self,
                channel: &ScatteredChannel2DData,
                roi: &Roi,
                position: RoiPosition,
            ) -> OpsResult<ScatteredChannel2DData> {
                map_scattered_in_roi(channel, roi, position, |x, y, z| self.apply(x, y, z))
            }
        }

        dispatch_channel_transform!(generic <F: SurfaceFunction> $name<F>);
    };
}

function_transform!(AddFunction);
function_transform!(ReplaceData);

dispatch_channel_transform!(ImageArithmetic, ConstantOperation, Negate);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Channel2DTransform;
    use approx::assert_relative_eq;
    use spm_core::{Channel2D, Grid2D, Quantity};

    fn channel(rows: usize, cols: usize, values: Vec<f64>) -> GridChannel2DData {
        let grid = Grid2D::new(rows, cols, 0.0, 0.0, 1.0, 1.0).unwrap();
        GridChannel2DData::new(grid, values, Quantity::height()).unwrap()
    }

    #[test]
    fn test_pixelwise_truncates_to_overlap() {
        let a = channel(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = channel(3, 2, vec![10.0; 6]);
        let sum = ImageArithmetic::new(ArithmeticOperation::Add, b).transform_grid(&a).unwrap();
        assert_eq!(sum.values(), &[11.0, 12.0, 3.0, 14.0, 15.0, 6.0]);
        assert_eq!(sum.grid(), a.grid());
    }

    #[test]
    fn test_whole_channel_ignores_roi_shape() {
        let a = channel(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = channel(3, 2, vec![10.0; 6]);
        let far = Roi::rectangle(100.0, 100.0, 101.0, 101.0);
        let transforms: [&dyn GridTransform; 3] = [
            &ImageArithmetic::new(ArithmeticOperation::Multiply, b.clone()),
            &ImageArithmetic::new(ArithmeticOperation::Add, b).with_mode(ArithmeticMode::Interpolated),
            &AddFunction::new(PlaneFunction::new(1.0, 2.0, 0.5)),
        ];
        for t in transforms {
            let whole = t.transform_grid(&a).unwrap();
            assert_ne!(whole, a);
            assert_eq!(t.transform_grid_in_roi(&a, &far, RoiPosition::Everything).unwrap(), whole);
            assert_eq!(t.transform_grid_in_roi(&a, &far, RoiPosition::Inside).unwrap(), a);
        }

        let s = ScatteredChannel2DData::new(vec![0.0, 1.0], vec![0.0, 1.0], vec![2.0, 3.0]).unwrap();
        let other = channel(2, 2, vec![1.0; 4]);
        let sum = ImageArithmetic::new(ArithmeticOperation::Add, other).with_mode(ArithmeticMode::Interpolated);
        assert_eq!(sum.transform_scattered(&s).unwrap().z_coordinates(), &[3.0, 4.0]);
        assert_eq!(
            sum.transform_scattered_in_roi(&s, &far, RoiPosition::Everything).unwrap(),
            sum.transform_scattered(&s).unwrap()
        );
    }

    #[test]
    fn test_other_image_unit_converted() {
        let a = channel(1, 2, vec![1.0, 1.0]);
        let b = channel(1, 2, vec![0.001, 0.002]).with_z_quantity(Quantity::new("Height", Unit::micrometre()));
        let sum = ImageArithmetic::new(ArithmeticOperation::Add, b).transform_grid(&a).unwrap();
        assert_relative_eq!(sum.value(0, 0), 2.0, epsilon = 1e-12);
        assert_relative_eq!(sum.value(0, 1), 3.0, epsilon = 1e-12);

        let volts = channel(1, 2, vec![2.0, 3.0]).with_z_quantity(Quantity::new("Bias", Unit::volt()));
        let product = ImageArithmetic::new(ArithmeticOperation::Multiply, volts).transform_grid(&a).unwrap();
        assert_eq!(product.values(), &[2.0, 3.0]);
    }

    #[test]
    fn test_interpolated_keeps_values_outside_other() {
        let a = channel(1, 4, vec![1.0, 1.0, 1.0, 1.0]);
        // other covers x in [0, 2] only
        let grid = Grid2D::new(2, 3, 0.0, 0.0, 1.0, 1.0).unwrap();
        let b = GridChannel2DData::new(grid, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0], Quantity::height()).unwrap();
        let diff = ImageArithmetic::new(ArithmeticOperation::Subtract, b)
            .with_mode(ArithmeticMode::Interpolated)
            .transform_grid(&a)
            .unwrap();
        assert_eq!(diff.values(), &[1.0, 0.0, -1.0, 1.0]);
    }

    #[test]
    fn test_constant_operations() {
        let a = channel(1, 3, vec![1.0, 2.0, 3.0]);
        let shifted = ConstantOperation::Add {
            value: 0.5,
            unit: Some(Unit::micrometre()),
        }
        .transform_grid(&a)
        .unwrap();
        assert_relative_eq!(shifted.value(0, 0), 501.0, epsilon = 1e-9);
        let scaled = ConstantOperation::multiply(-2.0).transform_grid(&a).unwrap();
        assert_eq!(scaled.values(), &[-2.0, -4.0, -6.0]);
        let raw = ConstantOperation::Add {
            value: 4.0,
            unit: Some(Unit::volt()),
        }
        .transform_grid(&a)
        .unwrap();
        assert_eq!(raw.values(), &[5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_negate_in_roi() {
        let a = channel(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let roi = Roi::rectangle(0.0, 0.0, 1.0, 0.0);
        let out = Negate.transform_grid_in_roi(&a, &roi, RoiPosition::Outside).unwrap();
        assert_eq!(out.values(), &[1.0, 2.0, -3.0, -4.0]);
    }

    #[test]
    fn test_function_with_dependent_variable() {
        let a = channel(1, 2, vec![3.0, 4.0]);
        let square = |_x: f64, _y: f64, z: Option<f64>| z.map_or(-1.0, |z| z * z);
        let replaced = ReplaceData::new(square).transform_grid(&a).unwrap();
        assert_eq!(replaced.values(), &[-1.0, -1.0]);
        let replaced = ReplaceData::new(square).with_dependent_variable(true).transform_grid(&a).unwrap();
        assert_eq!(replaced.values(), &[9.0, 16.0]);
        let added = AddFunction::new(square).with_dependent_variable(true).transform_grid(&a).unwrap();
        assert_eq!(added.values(), &[12.0, 20.0]);
    }

    #[test]
    fn test_scattered_dispatch() {
        let s = ScatteredChannel2DData::new(vec![0.0, 2.0], vec![1.0, 3.0], vec![1.0, 1.0]).unwrap();
        let out = AddFunction::new(PlaneFunction::new(1.0, 1.0, 1.0))
            .transform(&Channel2D::from(s))
            .unwrap();
        assert_eq!(out.as_scattered().unwrap().z_coordinates(), &[3.0, 7.0]);

        let negated = Negate
            .transform_in_roi(
                &Channel2D::from(ScatteredChannel2DData::new(vec![0.0, 5.0], vec![0.0, 5.0], vec![1.0, 2.0]).unwrap()),
                &Roi::rectangle(4.0, 4.0, 6.0, 6.0),
                RoiPosition::Inside,
            )
            .unwrap();
        assert_eq!(negated.as_scattered().unwrap().z_coordinates(), &[1.0, -2.0]);
    }
}
