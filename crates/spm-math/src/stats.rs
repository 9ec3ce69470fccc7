//! Descriptive statistics over `f64` slices.
//!
//! All functions are pure. Unless stated otherwise, `NaN` entries are
//! ignored and an empty (or all-`NaN`) input yields `NaN`.
//!
//! Percentiles use the classic `p * (n + 1)` estimator with linear
//! interpolation between order statistics, clamped to the sample extremes.

use serde::{Deserialize, Serialize};

/// Finite values of `values`, sorted ascending.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Bias-corrected sample variance (`0` for a single value).
pub fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    if m.is_nan() {
        return f64::NAN;
    }
    let (ss, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), &v| (s + (v - m) * (v - m), n + 1));
    if n < 2 { 0.0 } else { ss / (n - 1) as f64 }
}

/// Sample standard deviation.
#[inline]
pub fn standard_deviation(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Smallest non-`NaN` value.
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NAN, f64::min)
}

/// Largest non-`NaN` value.
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NAN, f64::max)
}

/// `p`-th percentile (`0 < p <= 100`) of an ascending sorted slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let pos = p * (n as f64 + 1.0) / 100.0;
    let floor = pos.floor();
    if pos < 1.0 {
        return sorted[0];
    }
    if pos >= n as f64 {
        return sorted[n - 1];
    }
    let lower = sorted[floor as usize - 1];
    let upper = sorted[floor as usize];
    lower + (pos - floor) * (upper - lower)
}

/// `p`-th percentile of unsorted values.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    percentile_sorted(&sorted_finite(values), p)
}

/// Median.
#[inline]
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// First and third quartiles.
pub fn quartiles(values: &[f64]) -> (f64, f64) {
    let sorted = sorted_finite(values);
    (percentile_sorted(&sorted, 25.0), percentile_sorted(&sorted, 75.0))
}

/// Interquartile range `Q3 - Q1`.
pub fn interquartile_range(values: &[f64]) -> f64 {
    let (q1, q3) = quartiles(values);
    q3 - q1
}

/// Sub-slice of an ascending sorted slice with the `lower` fraction of
/// smallest and the `upper` fraction of largest values removed.
///
/// Fractions are clamped to `[0, 1]`; the result is empty when they cover
/// the whole sample.
pub fn trim_sorted(sorted: &[f64], lower: f64, upper: f64) -> &[f64] {
    let n = sorted.len();
    let drop_low = (n as f64 * lower.clamp(0.0, 1.0)).floor() as usize;
    let drop_high = (n as f64 * upper.clamp(0.0, 1.0)).floor() as usize;
    if drop_low + drop_high >= n {
        return &sorted[0..0];
    }
    &sorted[drop_low..n - drop_high]
}

/// Mean after removing the `lower`/`upper` fractions of extreme values.
pub fn trimmed_mean(values: &[f64], lower: f64, upper: f64) -> f64 {
    let sorted = sorted_finite(values);
    mean(trim_sorted(&sorted, lower, upper))
}

/// Measure of central location of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum LocationMeasure {
    /// Arithmetic mean.
    Mean,
    /// Median.
    #[default]
    Median,
    /// Mean after trimming the given fractions of smallest/largest values.
    TrimmedMean {
        /// Fraction of smallest values removed.
        lower: f64,
        /// Fraction of largest values removed.
        upper: f64,
    },
}

impl LocationMeasure {
    /// Location of `values` (`NaN` for an empty sample).
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        match *self {
            Self::Mean => mean(values),
            Self::Median => median(values),
            Self::TrimmedMean { lower, upper } => trimmed_mean(values, lower, upper),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_sd() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&v), 5.0);
        assert_relative_eq!(variance(&v), 32.0 / 7.0, epsilon = 1e-12);
        assert!(mean(&[]).is_nan());
        assert_eq!(variance(&[3.0]), 0.0);
    }

    #[test]
    fn test_nan_ignored() {
        let v = [1.0, f64::NAN, 3.0];
        assert_relative_eq!(mean(&v), 2.0);
        assert_eq!(min(&v), 1.0);
        assert_eq!(max(&v), 3.0);
        assert_eq!(median(&v), 2.0);
    }

    #[test]
    fn test_percentiles() {
        let v: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_relative_eq!(median(&v), 5.5);
        // p * (n + 1) estimator
        assert_relative_eq!(percentile(&v, 25.0), 2.75);
        assert_relative_eq!(percentile(&v, 75.0), 8.25);
        assert_relative_eq!(interquartile_range(&v), 5.5);
        assert_eq!(percentile(&v, 1.0), 1.0);
        assert_eq!(percentile(&v, 100.0), 10.0);
    }

    #[test]
    fn test_trim_sorted() {
        let v: Vec<f64> = (0..10).map(f64::from).collect();
        assert_eq!(trim_sorted(&v, 0.2, 0.1), &[2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert!(trim_sorted(&v, 0.5, 0.5).is_empty());
        assert_eq!(trim_sorted(&v, 0.0, 0.0).len(), 10);
    }

    #[test]
    fn test_location_measures() {
        let v = [1.0, 2.0, 3.0, 4.0, 100.0];
        assert_relative_eq!(LocationMeasure::Mean.evaluate(&v), 22.0);
        assert_relative_eq!(LocationMeasure::Median.evaluate(&v), 3.0);
        let trimmed = LocationMeasure::TrimmedMean { lower: 0.2, upper: 0.2 };
        assert_relative_eq!(trimmed.evaluate(&v), 3.0);
    }
}
