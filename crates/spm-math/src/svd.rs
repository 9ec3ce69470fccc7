//! Singular value decomposition behind a small seam.
//!
//! Kernel separability needs only a numeric rank and the leading singular
//! triple of a small dense matrix. [`MatrixDecomposition`] isolates that
//! need so the linear-algebra backend can be swapped; [`NalgebraSvd`] is the
//! default backend.
//!
//! Callers pass matrices with `rows >= columns`; transpose first otherwise.

use nalgebra::{DMatrix, SVD};

use crate::error::{MathError, MathResult};

/// Dense-matrix SVD provider.
pub trait MatrixDecomposition {
    /// Decomposes a row-major `rows x columns` matrix (`rows >= columns`).
    fn svd(&self, rows: usize, columns: usize, data: &[f64]) -> MathResult<SvdResult>;
}

/// SVD backed by `nalgebra`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NalgebraSvd;

impl MatrixDecomposition for NalgebraSvd {
    fn svd(&self, rows: usize, columns: usize, data: &[f64]) -> MathResult<SvdResult> {
        if rows == 0 || columns == 0 || data.len() != rows * columns {
            return Err(MathError::InvalidParameter(format!(
                "matrix data of length {} does not describe a {}x{} matrix",
                data.len(),
                rows,
                columns
            )));
        }
        if rows < columns {
            return Err(MathError::InvalidParameter(format!(
                "SVD requires rows >= columns, got {rows}x{columns}"
            )));
        }

        let matrix = DMatrix::from_row_slice(rows, columns, data);
        let svd = SVD::new(matrix, true, true);
        let u = svd
            .u
            .ok_or_else(|| MathError::DecompositionFailed("left singular vectors missing".into()))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| MathError::DecompositionFailed("right singular vectors missing".into()))?;

        let k = svd.singular_values.len();
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&a, &b| svd.singular_values[b].total_cmp(&svd.singular_values[a]));

        let singular_values = order.iter().map(|&i| svd.singular_values[i]).collect();
        let left = order
            .iter()
            .map(|&i| (0..rows).map(|r| u[(r, i)]).collect())
            .collect();
        let right = order
            .iter()
            .map(|&i| (0..columns).map(|c| v_t[(i, c)]).collect())
            .collect();

        Ok(SvdResult {
            rows,
            columns,
            singular_values,
            left,
            right,
        })
    }
}

/// Decomposition `A = U Σ Vᵀ` with singular values in descending order.
#[derive(Debug, Clone)]
pub struct SvdResult {
    rows: usize,
    columns: usize,
    singular_values: Vec<f64>,
    left: Vec<Vec<f64>>,
    right: Vec<Vec<f64>>,
}

impl SvdResult {
    /// Singular values, largest first.
    #[inline]
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }

    /// Numeric rank with the default tolerance
    /// `max(rows, columns) * σ_max * ε`.
    pub fn rank(&self) -> usize {
        let sigma_max = self.singular_values.first().copied().unwrap_or(0.0);
        let tolerance = self.rows.max(self.columns) as f64 * sigma_max * f64::EPSILON;
        self.rank_with_tolerance(tolerance)
    }

    /// Number of singular values above `tolerance`.
    pub fn rank_with_tolerance(&self, tolerance: f64) -> usize {
        self.singular_values.iter().filter(|&&s| s > tolerance).count()
    }

    /// `k`-th left singular vector (length `rows`).
    pub fn left_vector(&self, k: usize) -> Option<&[f64]> {
        self.left.get(k).map(Vec::as_slice)
    }

    /// `k`-th right singular vector (length `columns`).
    pub fn right_vector(&self, k: usize) -> Option<&[f64]> {
        self.right.get(k).map(Vec::as_slice)
    }
}

/// Numeric rank of a row-major matrix of any shape.
pub fn numeric_rank(rows: usize, columns: usize, data: &[f64]) -> MathResult<usize> {
    if rows >= columns {
        Ok(NalgebraSvd.svd(rows, columns, data)?.rank())
    } else {
        let transposed = transpose(rows, columns, data);
        Ok(NalgebraSvd.svd(columns, rows, &transposed)?.rank())
    }
}

/// Transposes a row-major `rows x columns` matrix.
pub fn transpose(rows: usize, columns: usize, data: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; data.len()];
    for r in 0..rows {
        for c in 0..columns {
            out[c * rows + r] = data[r * columns + c];
        }
    }
    out
}
