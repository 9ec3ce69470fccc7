//! Convolution kernels.
//!
//! A [`Kernel2D`] is an odd-sized weight matrix with a unique centre cell.
//! Convolution reverses the kernel and correlates it with the image, reading
//! past the border by clamping to the nearest valid row or column:
//!
//! ```text
//! out[i][j] = Σ_a Σ_b K[a][b] * img[clamp(i + cr - a)][clamp(j + cc - b)]
//! ```
//!
//! Rank-one kernels with both dimensions above one are separable: they
//! factor into an `N x 1` and a `1 x M` kernel whose sequential convolution
//! equals the original (see [`Kernel2D::separable_filters`]).
//!
//! # Kernels
//!
//! - [`Kernel2D::mean`] - Box average
//! - [`Kernel2D::gaussian`] - Gaussian smoothing (separable)
//! - [`Kernel2D::laplacian`] / [`Kernel2D::laplacian_of_gaussian`] - Curvature
//! - [`Kernel2D::sharpen`] - Unsharp masking
//! - [`Kernel2D::sobel_x`] / [`Kernel2D::sobel_y`] - Gradients (separable)
//!
//! # Example
//!
//! ```rust
//! use spm_ops::kernel::Kernel2D;
//!
//! let k = Kernel2D::gaussian(1.0, 1.0, 2).unwrap();
//! assert_eq!((k.rows(), k.columns()), (5, 5));
//! assert!(k.is_separable());
//!
//! let src = vec![1.0; 6 * 6];
//! let out = k.convolve(&src, 6, 6).unwrap();
//! assert!(out.iter().all(|v| (v - 1.0).abs() < 1e-12));
//! ```

use spm_math::svd::{MatrixDecomposition, NalgebraSvd, transpose};
use tracing::{debug, trace};

use crate::error::{OpsError, OpsResult, check_buffer};

/// Odd-dimensioned convolution kernel, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel2D {
    rows: usize,
    columns: usize,
    data: Vec<f64>,
}

/// Factors of a separable kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelSeparation {
    /// Vertical `N x 1` factor, applied first.
    pub initial: Kernel2D,
    /// Horizontal `1 x M` factor, applied second.
    pub r#final: Kernel2D,
}

impl Kernel2D {
    /// Creates a kernel from its rows.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::InvalidParameter`] if the matrix is empty, ragged,
    /// or has an even number of rows or columns.
    pub fn new(rows: Vec<Vec<f64>>) -> OpsResult<Self> {
        let row_count = rows.len();
        let column_count = rows.first().map_or(0, Vec::len);
        if row_count == 0 || column_count == 0 {
            return Err(OpsError::InvalidParameter("kernel must not be empty".into()));
        }
        if rows.iter().any(|r| r.len() != column_count) {
            return Err(OpsError::InvalidParameter(
                "kernel rows must all have the same length".into(),
            ));
        }
        Self::from_row_major(row_count, column_count, rows.into_iter().flatten().collect())
    }

    /// Creates a kernel from row-major weights.
    pub fn from_row_major(rows: usize, columns: usize, data: Vec<f64>) -> OpsResult<Self> {
        if rows == 0 || columns == 0 {
            return Err(OpsError::InvalidParameter("kernel must not be empty".into()));
        }
        if rows % 2 == 0 {
            return Err(OpsError::InvalidParameter(
                "kernel must have odd number of rows".into(),
            ));
        }
        if columns % 2 == 0 {
            return Err(OpsError::InvalidParameter(
                "kernel must have odd number of columns".into(),
            ));
        }
        if data.len() != rows * columns {
            return Err(OpsError::InvalidParameter(format!(
                "kernel data size {} doesn't match {}x{}",
                data.len(),
                rows,
                columns
            )));
        }
        Ok(Self { rows, columns, data })
    }

    /// Box average over a `rows x columns` window.
    pub fn mean(rows: usize, columns: usize) -> OpsResult<Self> {
        let count = rows * columns;
        Self::from_row_major(rows, columns, vec![1.0 / count.max(1) as f64; count])
    }

    /// Normalised Gaussian with per-axis standard deviations, in cells.
    ///
    /// The kernel spans `2 * radius + 1` cells along each axis.
    pub fn gaussian(sigma_x: f64, sigma_y: f64, radius: usize) -> OpsResult<Self> {
        if !(sigma_x > 0.0) || !(sigma_y > 0.0) {
            return Err(OpsError::InvalidParameter(format!(
                "gaussian sigma must be > 0, got ({sigma_x}, {sigma_y})"
            )));
        }
        let size = 2 * radius + 1;
        let half = radius as i64;
        let mut data = Vec::with_capacity(size * size);
        for dy in -half..=half {
            for dx in -half..=half {
                let (dx, dy) = (dx as f64, dy as f64);
                data.push((-(dx * dx) / (2.0 * sigma_x * sigma_x) - (dy * dy) / (2.0 * sigma_y * sigma_y)).exp());
            }
        }
        let sum: f64 = data.iter().sum();
        data.iter_mut().for_each(|w| *w /= sum);
        Self::from_row_major(size, size, data)
    }

    /// Five-point discrete Laplacian.
    pub fn laplacian() -> Self {
        Self {
            rows: 3,
            columns: 3,
            data: vec![
                0.0, 1.0, 0.0,
                1.0, -4.0, 1.0,
                0.0, 1.0, 0.0,
            ],
        }
    }

    /// Laplacian of Gaussian, shifted to zero sum.
    pub fn laplacian_of_gaussian(sigma: f64, radius: usize) -> OpsResult<Self> {
        if !(sigma > 0.0) {
            return Err(OpsError::InvalidParameter(format!("sigma must be > 0, got {sigma}")));
        }
        let size = 2 * radius + 1;
        let half = radius as i64;
        let s2 = sigma * sigma;
        let mut data = Vec::with_capacity(size * size);
        for dy in -half..=half {
            for dx in -half..=half {
                let r2 = (dx * dx + dy * dy) as f64;
                data.push((r2 - 2.0 * s2) / (s2 * s2) * (-r2 / (2.0 * s2)).exp());
            }
        }
        let mean = data.iter().sum::<f64>() / data.len() as f64;
        data.iter_mut().for_each(|w| *w -= mean);
        Self::from_row_major(size, size, data)
    }

    /// Sharpening kernel; `amount` around 0.5-2.0.
    pub fn sharpen(amount: f64) -> Self {
        let center = 1.0 + 4.0 * amount;
        Self {
            rows: 3,
            columns: 3,
            data: vec![
                0.0, -amount, 0.0,
                -amount, center, -amount,
                0.0, -amount, 0.0,
            ],
        }
    }

    /// Sobel derivative along x (columns).
    pub fn sobel_x() -> Self {
        Self {
            rows: 3,
            columns: 3,
            data: vec![
                -1.0, 0.0, 1.0,
                -2.0, 0.0, 2.0,
                -1.0, 0.0, 1.0,
            ],
        }
    }

    /// Sobel derivative along y (rows).
    pub fn sobel_y() -> Self {
        Self::sobel_x().transposed()
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Weight at `(row, col)`.
    #[inline]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.columns + col]
    }

    /// Row-major weights.
    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Centre cell `(row, col)`.
    #[inline]
    pub fn center(&self) -> (usize, usize) {
        (self.rows / 2, self.columns / 2)
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Kernel rotated by 180 degrees.
    pub fn reversed(&self) -> Self {
        Self {
            rows: self.rows,
            columns: self.columns,
            data: self.data.iter().rev().copied().collect(),
        }
    }

    /// Kernel with rows and columns exchanged.
    pub fn transposed(&self) -> Self {
        Self {
            rows: self.columns,
            columns: self.rows,
            data: transpose(self.rows, self.columns, &self.data),
        }
    }

    /// Numeric rank of the weight matrix.
    pub fn rank(&self) -> OpsResult<usize> {
        Ok(spm_math::numeric_rank(self.rows, self.columns, &self.data)?)
    }

    /// `true` when the kernel has rank one and both dimensions exceed one.
    pub fn is_separable(&self) -> bool {
        self.rows > 1 && self.columns > 1 && matches!(self.rank(), Ok(1))
    }

    /// Vertical and horizontal factors of a separable kernel, or `None`.
    pub fn separable_filters(&self) -> Option<KernelSeparation> {
        self.separable_filters_with(&NalgebraSvd)
    }

    /// Like [`Self::separable_filters`] with an explicit SVD backend.
    pub fn separable_filters_with(&self, svd: &dyn MatrixDecomposition) -> Option<KernelSeparation> {
        if !self.is_separable() {
            return None;
        }
        // The backend wants rows >= columns; K^T = U S V^T gives K = V S U^T.
        let wide = self.rows < self.columns;
        let decomposition = if wide {
            svd.svd(self.columns, self.rows, &transpose(self.rows, self.columns, &self.data))
        } else {
            svd.svd(self.rows, self.columns, &self.data)
        };
        let decomposition = match decomposition {
            Ok(d) => d,
            Err(err) => {
                debug!(%err, "SVD failed, treating kernel as non-separable");
                return None;
            }
        };

        let sigma = decomposition.singular_values().first().copied()?;
        let scale = sigma.sqrt();
        let (vertical, horizontal) = if wide {
            (decomposition.right_vector(0)?, decomposition.left_vector(0)?)
        } else {
            (decomposition.left_vector(0)?, decomposition.right_vector(0)?)
        };

        let initial = Self {
            rows: self.rows,
            columns: 1,
            data: vertical.iter().map(|v| v * scale).collect(),
        };
        let r#final = Self {
            rows: 1,
            columns: self.columns,
            data: horizontal.iter().map(|v| v * scale).collect(),
        };
        Some(KernelSeparation { initial, r#final })
    }

    /// Convolution at a single cell with border clamping.
    pub fn convolve_at(&self, row: usize, col: usize, src: &[f64], rows: usize, cols: usize) -> f64 {
        let (cr, cc) = self.center();
        let max_r = rows as isize - 1;
        let max_c = cols as isize - 1;
        let mut sum = 0.0;
        for a in 0..self.rows {
            let sr = (row as isize + cr as isize - a as isize).clamp(0, max_r) as usize;
            let src_row = &src[sr * cols..(sr + 1) * cols];
            for b in 0..self.columns {
                let sc = (col as isize + cc as isize - b as isize).clamp(0, max_c) as usize;
                sum += self.data[a * self.columns + b] * src_row[sc];
            }
        }
        sum
    }

    /// Convolves a whole row-major image.
    ///
    /// Border cells whose footprint leaves the image take the clamped path;
    /// the interior is computed without bounds adjustment.
    pub fn convolve(&self, src: &[f64], rows: usize, cols: usize) -> OpsResult<Vec<f64>> {
        trace!(rows, cols, kernel_rows = self.rows, kernel_cols = self.columns, "convolve");
        check_buffer(src.len(), rows, cols)?;

        let (cr, cc) = self.center();
        let reversed = self.reversed();
        let mut dst = vec![0.0; rows * cols];

        for row in 0..rows {
            let row_interior = row >= cr && row + cr < rows;
            for col in 0..cols {
                let interior = row_interior && col >= cc && col + cc < cols;
                dst[row * cols + col] = if interior {
                    let mut sum = 0.0;
                    for a in 0..self.rows {
                        let base = (row - cr + a) * cols + col - cc;
                        let weights = &reversed.data[a * self.columns..(a + 1) * self.columns];
                        sum += weights
                            .iter()
                            .zip(&src[base..base + self.columns])
                            .map(|(w, v)| w * v)
                            .sum::<f64>();
                    }
                    sum
                } else {
                    self.convolve_at(row, col, src, rows, cols)
                };
            }
        }
        Ok(dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_validation() {
        assert!(Kernel2D::new(vec![]).is_err());
        assert!(Kernel2D::new(vec![vec![1.0, 2.0]]).is_err());
        assert!(Kernel2D::new(vec![vec![1.0], vec![2.0]]).is_err());
        assert!(Kernel2D::new(vec![vec![1.0, 2.0, 3.0], vec![1.0]]).is_err());
        let err = Kernel2D::new(vec![vec![1.0]; 2]).unwrap_err();
        assert!(err.to_string().contains("odd number of rows"));
        assert!(Kernel2D::new(vec![vec![1.0, 2.0, 3.0]]).is_ok());
    }

    #[test]
    fn test_reversed_and_transposed() {
        let k = Kernel2D::new(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]]).unwrap();
        assert_eq!(k.reversed().data(), &[9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(k.transposed().value(0, 2), 7.0);
        assert_eq!(k.center(), (1, 1));
        assert_eq!(k.rank().unwrap(), 2);
        assert!(!k.is_separable());
    }

    #[test]
    fn test_separability() {
        assert!(Kernel2D::gaussian(1.0, 2.0, 2).unwrap().is_separable());
        assert!(Kernel2D::sobel_x().is_separable());
        assert!(Kernel2D::mean(3, 5).unwrap().is_separable());
        assert!(!Kernel2D::laplacian().is_separable());
        // single row: rank one but not separable
        assert!(!Kernel2D::new(vec![vec![1.0, 2.0, 1.0]]).unwrap().is_separable());
        assert!(Kernel2D::laplacian().separable_filters().is_none());
    }

    #[test]
    fn test_separable_filters_reproduce_kernel() {
        for kernel in [
            Kernel2D::sobel_y(),
            Kernel2D::mean(3, 7).unwrap(),
            Kernel2D::mean(5, 3).unwrap(),
            Kernel2D::gaussian(0.8, 1.5, 3).unwrap(),
        ] {
            let sep = kernel.separable_filters().unwrap();
            assert_eq!(sep.initial.columns(), 1);
            assert_eq!(sep.r#final.rows(), 1);
            for r in 0..kernel.rows() {
                for c in 0..kernel.columns() {
                    assert_relative_eq!(
                        sep.initial.value(r, 0) * sep.r#final.value(0, c),
                        kernel.value(r, c),
                        epsilon = 1e-12
                    );
                }
            }
        }
    }

    #[test]
    fn test_convolution_reverses_kernel() {
        // impulse response of a convolution is the kernel itself
        let k = Kernel2D::new(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]]).unwrap();
        let mut src = vec![0.0; 25];
        src[12] = 1.0;
        let out = k.convolve(&src, 5, 5).unwrap();
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(out[(r + 1) * 5 + c + 1], k.value(r, c));
            }
        }
    }

    #[test]
    fn test_border_clamping() {
        let k = Kernel2D::new(vec![vec![0.0, 0.0, 0.0], vec![0.0, 0.0, 1.0], vec![0.0, 0.0, 0.0]]).unwrap();
        // picks the left neighbour: out[i][j] = img[i][clamp(j - 1)]
        let src = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let out = k.convolve(&src, 2, 3).unwrap();
        assert_eq!(out, vec![1.0, 1.0, 2.0, 4.0, 4.0, 5.0]);
    }

    #[test]
    fn test_fast_interior_matches_clamped_path() {
        let k = Kernel2D::new(vec![
            vec![0.1, -0.3, 0.2],
            vec![0.5, 1.0, -0.7],
            vec![0.0, 0.4, 0.9],
        ])
        .unwrap();
        let (rows, cols) = (7, 9);
        let src: Vec<f64> = (0..rows * cols).map(|i| ((i * 37) % 11) as f64 - 4.0).collect();
        let out = k.convolve(&src, rows, cols).unwrap();
        for r in 0..rows {
            for c in 0..cols {
                assert_relative_eq!(out[r * cols + c], k.convolve_at(r, c, &src, rows, cols), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_factories() {
        assert_relative_eq!(Kernel2D::gaussian(1.2, 0.7, 3).unwrap().sum(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(Kernel2D::laplacian_of_gaussian(1.0, 3).unwrap().sum(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(Kernel2D::sharpen(1.5).sum(), 1.0, epsilon = 1e-12);
        assert!(Kernel2D::gaussian(0.0, 1.0, 1).is_err());
        assert!(Kernel2D::mean(2, 3).is_err());
    }

    #[test]
    fn test_size_mismatch() {
        assert!(Kernel2D::laplacian().convolve(&[1.0; 5], 2, 3).is_err());
    }
}
