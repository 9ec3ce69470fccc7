//! Polynomial regression (least squares and least absolute deviations).
//!
//! Fits are computed in a normalised abscissa `t = (x - shift) / scale`
//! which keeps the Vandermonde system well conditioned for long scan lines.
//! [`Polynomial::value`] applies the same normalisation, so callers only ever
//! deal with raw `x`.

use nalgebra::{DMatrix, DVector, SVD};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{MathError, MathResult};

const MAX_IRLS_ITERATIONS: usize = 50;
const IRLS_TOLERANCE: f64 = 1e-10;

/// Regression loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RegressionStrategy {
    /// Ordinary least squares (L2).
    #[default]
    LeastSquares,
    /// Least absolute deviations (L1), robust to outliers.
    LeastAbsoluteDeviations,
}

/// Polynomial in a normalised abscissa.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coefficients: Vec<f64>,
    shift: f64,
    scale: f64,
}

impl Polynomial {
    /// Polynomial `Σ c_k x^k` in the raw abscissa.
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self {
            coefficients,
            shift: 0.0,
            scale: 1.0,
        }
    }

    /// Constant polynomial.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Degree (number of coefficients minus one).
    #[inline]
    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    /// Coefficients in the normalised abscissa, lowest power first.
    #[inline]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Evaluates the polynomial at `x` (Horner).
    pub fn value(&self, x: f64) -> f64 {
        let t = (x - self.shift) / self.scale;
        self.coefficients.iter().rev().fold(0.0, |acc, &c| acc * t + c)
    }
}

/// Fits a polynomial of `degree` through `(x, y)`.
///
/// # Errors
///
/// - [`MathError::InvalidParameter`] if `x` and `y` differ in length
/// - [`MathError::InsufficientData`] if there are not more points than `degree`
/// - [`MathError::DecompositionFailed`] if the linear solve fails
pub fn fit_polynomial(
    x: &[f64],
    y: &[f64],
    degree: usize,
    strategy: RegressionStrategy,
) -> MathResult<Polynomial> {
    if x.len() != y.len() {
        return Err(MathError::InvalidParameter(format!(
            "x and y differ in length: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n <= degree {
        return Err(MathError::InsufficientData(format!(
            "degree {degree} fit needs more than {degree} points, got {n}"
        )));
    }
    trace!(n, degree, ?strategy, "fit_polynomial");

    let (lo, hi) = x
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let shift = 0.5 * (lo + hi);
    let half_span = 0.5 * (hi - lo);
    let scale = if half_span > 0.0 { half_span } else { 1.0 };

    let design = DMatrix::from_fn(n, degree + 1, |r, c| ((x[r] - shift) / scale).powi(c as i32));
    let target = DVector::from_column_slice(y);

    let mut coefficients = solve_least_squares(design.clone(), target.clone())?;

    if strategy == RegressionStrategy::LeastAbsoluteDeviations {
        for _ in 0..MAX_IRLS_ITERATIONS {
            let residuals = &target - &design * &coefficients;
            let floor = residuals.amax().max(1.0) * 1e-9;
            let weights: Vec<f64> = residuals.iter().map(|r| 1.0 / r.abs().max(floor).sqrt()).collect();

            let weighted_design = DMatrix::from_fn(n, degree + 1, |r, c| design[(r, c)] * weights[r]);
            let weighted_target = DVector::from_fn(n, |r, _| target[r] * weights[r]);
            let next = solve_least_squares(weighted_design, weighted_target)?;

            let change = (&next - &coefficients).amax();
            coefficients = next;
            if change < IRLS_TOLERANCE {
                break;
            }
        }
    }

    Ok(Polynomial {
        coefficients: coefficients.iter().copied().collect(),
        shift,
        scale,
    })
}

fn solve_least_squares(design: DMatrix<f64>, target: DVector<f64>) -> MathResult<DVector<f64>> {
    SVD::new(design, true, true)
        .solve(&target, 1e-14)
        .map_err(|e| MathError::DecompositionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_line_fit() {
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 - 0.5 * v).collect();
        let p = fit_polynomial(&x, &y, 1, RegressionStrategy::LeastSquares).unwrap();
        assert_eq!(p.degree(), 1);
        for &v in &x {
            assert_relative_eq!(p.value(v), 3.0 - 0.5 * v, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_quadratic_fit() {
        let x: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 0.1).collect();
        let y: Vec<f64> = x.iter().map(|v| 1.0 + 2.0 * v - 0.01 * v * v).collect();
        let p = fit_polynomial(&x, &y, 2, RegressionStrategy::LeastSquares).unwrap();
        assert_relative_eq!(p.value(102.5), 1.0 + 205.0 - 0.01 * 102.5 * 102.5, epsilon = 1e-6);
    }

    #[test]
    fn test_l1_resists_outlier() {
        let x: Vec<f64> = (0..21).map(f64::from).collect();
        let mut y: Vec<f64> = x.iter().map(|v| 2.0 * v).collect();
        y[10] = 500.0;
        let l1 = fit_polynomial(&x, &y, 1, RegressionStrategy::LeastAbsoluteDeviations).unwrap();
        let l2 = fit_polynomial(&x, &y, 1, RegressionStrategy::LeastSquares).unwrap();
        assert!((l1.value(15.0) - 30.0).abs() < 0.5, "l1 = {}", l1.value(15.0));
        assert!((l2.value(15.0) - 30.0).abs() > 5.0);
    }

    #[test]
    fn test_constant_fit() {
        let p = fit_polynomial(&[1.0, 2.0, 3.0], &[4.0, 6.0, 8.0], 0, RegressionStrategy::LeastSquares).unwrap();
        assert_relative_eq!(p.value(10.0), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_insufficient_data() {
        assert!(fit_polynomial(&[1.0, 2.0], &[1.0, 2.0], 2, RegressionStrategy::LeastSquares).is_err());
        assert!(fit_polynomial(&[1.0], &[1.0, 2.0], 0, RegressionStrategy::LeastSquares).is_err());
    }

    #[test]
    fn test_raw_polynomial() {
        let p = Polynomial::new(vec![1.0, 0.0, 2.0]);
        assert_eq!(p.value(3.0), 19.0);
        assert_eq!(Polynomial::constant(4.0).value(-7.0), 4.0);
    }
}
