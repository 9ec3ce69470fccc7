//! Physical quantities and unit conversion.
//!
//! AFM channels carry units on every axis: lateral positions in
//! micrometres or nanometres, heights in nanometres, deflection in volts.
//! Transformations that combine two data sets (or a data set and a
//! user-entered constant) convert between compatible units and fall back to
//! the raw number when the units are incompatible.
//!
//! # Example
//!
//! ```rust
//! use spm_core::Unit;
//!
//! let factor = Unit::micrometre().conversion_factor_to(&Unit::nanometre());
//! assert_eq!(factor.map(|f| f.round()), Some(1000.0));
//! assert!(Unit::volt().conversion_factor_to(&Unit::nanometre()).is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical dimension of a unit. Units convert only within one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Pure number.
    Dimensionless,
    /// Length (base unit: metre).
    Length,
    /// Electric potential (base unit: volt).
    Voltage,
    /// Force (base unit: newton).
    Force,
    /// Frequency (base unit: hertz).
    Frequency,
    /// Plane angle (base unit: radian).
    Angle,
}

/// A unit: a symbol, its dimension, and its scale relative to the base unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    symbol: String,
    dimension: Dimension,
    scale: f64,
}

impl Unit {
    /// Creates a unit with the given symbol, dimension and scale to the
    /// dimension's base unit.
    pub fn new(symbol: impl Into<String>, dimension: Dimension, scale: f64) -> Self {
        Self {
            symbol: symbol.into(),
            dimension,
            scale,
        }
    }

    /// Dimensionless unit.
    pub fn dimensionless() -> Self {
        Self::new("", Dimension::Dimensionless, 1.0)
    }

    /// Metre.
    pub fn metre() -> Self {
        Self::new("m", Dimension::Length, 1.0)
    }

    /// Millimetre.
    pub fn millimetre() -> Self {
        Self::new("mm", Dimension::Length, 1e-3)
    }

    /// Micrometre.
    pub fn micrometre() -> Self {
        Self::new("µm", Dimension::Length, 1e-6)
    }

    /// Nanometre.
    pub fn nanometre() -> Self {
        Self::new("nm", Dimension::Length, 1e-9)
    }

    /// Picometre.
    pub fn picometre() -> Self {
        Self::new("pm", Dimension::Length, 1e-12)
    }

    /// Volt.
    pub fn volt() -> Self {
        Self::new("V", Dimension::Voltage, 1.0)
    }

    /// Millivolt.
    pub fn millivolt() -> Self {
        Self::new("mV", Dimension::Voltage, 1e-3)
    }

    /// Newton.
    pub fn newton() -> Self {
        Self::new("N", Dimension::Force, 1.0)
    }

    /// Nanonewton.
    pub fn nanonewton() -> Self {
        Self::new("nN", Dimension::Force, 1e-9)
    }

    /// Hertz.
    pub fn hertz() -> Self {
        Self::new("Hz", Dimension::Frequency, 1.0)
    }

    /// Degree of arc.
    pub fn degree() -> Self {
        Self::new("°", Dimension::Angle, std::f64::consts::PI / 180.0)
    }

    /// Unit symbol.
    #[inline]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Unit dimension.
    #[inline]
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Returns `true` if values in `self` can be expressed in `other`.
    #[inline]
    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Factor `f` such that `value_in_self * f == value_in_other`.
    ///
    /// Returns `None` for incompatible units.
    pub fn conversion_factor_to(&self, other: &Unit) -> Option<f64> {
        if self.is_compatible(other) {
            Some(self.scale / other.scale)
        } else {
            None
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// A named quantity (e.g. "Height") expressed in a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    name: String,
    unit: Unit,
}

impl Quantity {
    /// Creates a quantity.
    pub fn new(name: impl Into<String>, unit: Unit) -> Self {
        Self {
            name: name.into(),
            unit,
        }
    }

    /// Lateral distance along x in micrometres.
    pub fn distance_x() -> Self {
        Self::new("Distance", Unit::micrometre())
    }

    /// Lateral distance along y in micrometres.
    pub fn distance_y() -> Self {
        Self::new("Distance", Unit::micrometre())
    }

    /// Topographic height in nanometres.
    pub fn height() -> Self {
        Self::new("Height", Unit::nanometre())
    }

    /// Quantity name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quantity unit.
    #[inline]
    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Same quantity expressed in another unit.
    pub fn with_unit(&self, unit: Unit) -> Self {
        Self {
            name: self.name.clone(),
            unit,
        }
    }

    /// Conversion factor from this quantity's unit to `other`'s unit.
    #[inline]
    pub fn conversion_factor_to(&self, other: &Quantity) -> Option<f64> {
        self.unit.conversion_factor_to(&other.unit)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.symbol.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.unit)
        }
    }
}

/// Expresses `value` (given in `from`) in `to`.
///
/// Falls back to the raw value when `from` is absent or incompatible.
pub fn convert_or_raw(value: f64, from: Option<&Unit>, to: &Unit) -> f64 {
    from.and_then(|u| u.conversion_factor_to(to))
        .map_or(value, |factor| value * factor)
}
