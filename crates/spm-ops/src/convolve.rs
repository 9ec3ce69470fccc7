//! Convolution strategies.
//!
//! - [`SimpleConvolution`] - Direct 2D convolution, `O(k²)` per cell
//! - [`SequenceConvolution`] - Vertical then horizontal pass, `O(2k)` per cell
//! - [`KernelConvolution`] - Picks the sequence form for separable kernels
//!
//! All strategies clamp at the border and agree to floating-point
//! tolerance. Masked convolution writes only the cells of a [`GridMask`];
//! every other cell keeps its source value.
//!
//! # Example
//!
//! ```rust
//! use spm_ops::convolve::{Convolution, KernelConvolution};
//! use spm_ops::kernel::Kernel2D;
//!
//! let conv = KernelConvolution::new(Kernel2D::mean(3, 3).unwrap());
//! assert!(conv.is_separable());
//! let out = conv.convolve(&[2.0; 16], 4, 4).unwrap();
//! assert!((out[5] - 2.0).abs() < 1e-12);
//! ```

use spm_core::{GridChannel2DData, GridMask, Roi, RoiPosition};
use tracing::{debug, trace};

use crate::error::{OpsError, OpsResult, check_buffer};
use crate::kernel::{Kernel2D, KernelSeparation};
use crate::transform::GridTransform;

/// Convolution of a row-major image.
pub trait Convolution: Send + Sync {
    /// Convolves every cell.
    fn convolve(&self, src: &[f64], rows: usize, cols: usize) -> OpsResult<Vec<f64>>;

    /// Convolves the cells set in `mask`; other cells are copied from `src`.
    fn convolve_masked(&self, src: &[f64], rows: usize, cols: usize, mask: &GridMask) -> OpsResult<Vec<f64>>;
}

fn check_mask(mask: &GridMask, rows: usize, cols: usize) -> OpsResult<()> {
    if mask.rows() != rows || mask.columns() != cols {
        return Err(OpsError::SizeMismatch(format!(
            "mask is {}x{}, image is {}x{}",
            mask.rows(),
            mask.columns(),
            rows,
            cols
        )));
    }
    Ok(())
}

/// Direct convolution with one kernel.
#[derive(Debug, Clone)]
pub struct SimpleConvolution {
    kernel: Kernel2D,
}

impl SimpleConvolution {
    /// Wraps `kernel`.
    pub fn new(kernel: Kernel2D) -> Self {
        Self { kernel }
    }

    /// The kernel.
    pub fn kernel(&self) -> &Kernel2D {
        &self.kernel
    }
}

impl Convolution for SimpleConvolution {
    fn convolve(&self, src: &[f64], rows: usize, cols: usize) -> OpsResult<Vec<f64>> {
        self.kernel.convolve(src, rows, cols)
    }

    fn convolve_masked(&self, src: &[f64], rows: usize, cols: usize, mask: &GridMask) -> OpsResult<Vec<f64>> {
        check_buffer(src.len(), rows, cols)?;
        check_mask(mask, rows, cols)?;
        let mut dst = src.to_vec();
        for row in 0..rows {
            for col in 0..cols {
                if mask.contains(row, col) {
                    dst[row * cols + col] = self.kernel.convolve_at(row, col, src, rows, cols);
                }
            }
        }
        Ok(dst)
    }
}

/// Two-pass convolution with the factors of a separable kernel.
#[derive(Debug, Clone)]
pub struct SequenceConvolution {
    initial: Kernel2D,
    r#final: Kernel2D,
}

impl SequenceConvolution {
    /// Builds the two passes from a kernel separation.
    pub fn new(separation: KernelSeparation) -> Self {
        Self {
            initial: separation.initial,
            r#final: separation.r#final,
        }
    }

    /// Vertical factor.
    pub fn initial(&self) -> &Kernel2D {
        &self.initial
    }

    /// Horizontal factor.
    pub fn final_kernel(&self) -> &Kernel2D {
        &self.r#final
    }
}

impl Convolution for SequenceConvolution {
    fn convolve(&self, src: &[f64], rows: usize, cols: usize) -> OpsResult<Vec<f64>> {
        let intermediate = self.initial.convolve(src, rows, cols)?;
        self.r#final.convolve(&intermediate, rows, cols)
    }

    fn convolve_masked(&self, src: &[f64], rows: usize, cols: usize, mask: &GridMask) -> OpsResult<Vec<f64>> {
        check_buffer(src.len(), rows, cols)?;
        check_mask(mask, rows, cols)?;
        let mut dst = src.to_vec();
        let Some((r0, r1, c0, c1)) = mask.bounding_box() else {
            return Ok(dst);
        };

        // First pass over the bounding box, padded by the horizontal half-width.
        let (_, half) = self.r#final.center();
        let pc0 = c0.saturating_sub(half);
        let pc1 = (c1 + half).min(cols);
        let width = pc1 - pc0;
        trace!(r0, r1, pc0, pc1, "masked sequence convolution");

        let mut padded = vec![0.0; (r1 - r0) * width];
        for row in r0..r1 {
            for col in pc0..pc1 {
                padded[(row - r0) * width + col - pc0] = self.initial.convolve_at(row, col, src, rows, cols);
            }
        }

        let weights = self.r#final.reversed();
        let weights = weights.data();
        for row in r0..r1 {
            let line = &padded[(row - r0) * width..(row - r0 + 1) * width];
            for col in c0..c1 {
                if !mask.contains(row, col) {
                    continue;
                }
                let mut sum = 0.0;
                for (b, w) in weights.iter().enumerate() {
                    let sc = (col as isize - half as isize + b as isize).clamp(0, cols as isize - 1) as usize;
                    sum += w * line[sc - pc0];
                }
                dst[row * cols + col] = sum;
            }
        }
        Ok(dst)
    }
}

/// Convolution facade choosing the cheapest exact strategy for a kernel.
#[derive(Debug, Clone)]
pub struct KernelConvolution {
    strategy: Strategy,
}

#[derive(Debug, Clone)]
enum Strategy {
    Simple(SimpleConvolution),
    Sequence(SequenceConvolution),
}

impl KernelConvolution {
    /// Inspects `kernel` and picks the two-pass form when it is separable.
    pub fn new(kernel: Kernel2D) -> Self {
        let strategy = match kernel.separable_filters() {
            Some(separation) => {
                debug!(rows = kernel.rows(), cols = kernel.columns(), "Kernel is separable, using two-pass convolution");
                Strategy::Sequence(SequenceConvolution::new(separation))
            }
            None => Strategy::Simple(SimpleConvolution::new(kernel)),
        };
        Self { strategy }
    }

    /// `true` when the two-pass form is used.
    pub fn is_separable(&self) -> bool {
        matches!(self.strategy, Strategy::Sequence(_))
    }

    fn inner(&self) -> &dyn Convolution {
        match &self.strategy {
            Strategy::Simple(s) => s,
            Strategy::Sequence(s) => s,
        }
    }
}

impl Convolution for KernelConvolution {
    fn convolve(&self, src: &[f64], rows: usize, cols: usize) -> OpsResult<Vec<f64>> {
        self.inner().convolve(src, rows, cols)
    }

    fn convolve_masked(&self, src: &[f64], rows: usize, cols: usize, mask: &GridMask) -> OpsResult<Vec<f64>> {
        self.inner().convolve_masked(src, rows, cols, mask)
    }
}

/// Kernel convolution as a channel transform.
#[derive(Debug, Clone)]
pub struct KernelTransformation {
    convolution: KernelConvolution,
}

impl KernelTransformation {
    /// Convolution with `kernel`.
    pub fn new(kernel: Kernel2D) -> Self {
        Self {
            convolution: KernelConvolution::new(kernel),
        }
    }
}

impl GridTransform for KernelTransformation {
    fn transform_grid(&self, channel: &GridChannel2DData) -> OpsResult<GridChannel2DData> {
        let values = self
            .convolution
            .convolve(channel.values(), channel.row_count(), channel.column_count())?;
        Ok(channel.with_values(values)?)
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
        let mask = roi.mask(channel.grid(), position);
        let values =
            self.convolution
                .convolve_masked(channel.values(), channel.row_count(), channel.column_count(), &mask)?;
        Ok(channel.with_values(values)?)
    }
}
