//! Concurrent per-cell filtering.
//!
//! A [`PixelFilter`] computes one output cell from a read-only source image.
//! [`ConcurrentFilter`] splits the rows into contiguous ranges and runs one
//! task per range on a dedicated rayon pool:
//!
//! ```text
//! tasks = min(max(rows / min_rows_per_task, 1), max_task_count)
//! ```
//!
//! Each task writes only its own rows of the output buffer. The call returns
//! after every task has finished; the first failing cell aborts the run and
//! its error is returned. The pool is dropped on every path.
//!
//! Without the `parallel` feature the same contract is served sequentially.
//!
//! # Example
//!
//! ```rust
//! use spm_ops::concurrent::{ConcurrencyConfig, ConcurrentFilter};
//! use spm_ops::filters::MedianFilter;
//!
//! let src: Vec<f64> = (0..64).map(f64::from).collect();
//! let filter = ConcurrentFilter::new(ConcurrencyConfig::default());
//! let out = filter.apply(&MedianFilter::new(1), &src, 8, 8).unwrap();
//! assert_eq!(out.len(), 64);
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use spm_core::GridMask;
use tracing::{debug, trace};

use crate::error::{OpsError, OpsResult, check_buffer};

/// Computes one output cell.
pub trait PixelFilter: Send + Sync {
    /// Filtered value at `(row, col)` of the row-major `src`.
    fn filter(&self, row: usize, col: usize, src: &[f64], rows: usize, cols: usize) -> OpsResult<f64>;
}

/// Sizing of the concurrent filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Upper bound on the number of tasks (and worker threads).
    pub max_task_count: usize,
    /// Rows a task should at least receive.
    pub min_rows_per_task: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_task_count: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
            min_rows_per_task: 20,
        }
    }
}

impl ConcurrencyConfig {
    /// Config with at most `max_task_count` tasks.
    pub fn with_max_task_count(max_task_count: usize) -> Self {
        Self {
            max_task_count: max_task_count.max(1),
            ..Self::default()
        }
    }

    /// Number of tasks for an image with `rows` rows.
    pub fn task_count(&self, rows: usize) -> usize {
        (rows / self.min_rows_per_task.max(1)).max(1).min(self.max_task_count.max(1))
    }
}

/// Runs a [`PixelFilter`] over disjoint row ranges in parallel.
#[derive(Debug, Clone, Default)]
pub struct ConcurrentFilter {
    config: ConcurrencyConfig,
}

impl ConcurrentFilter {
    /// Creates a filter runner.
    pub fn new(config: ConcurrencyConfig) -> Self {
        Self { config }
    }

    /// Sizing in use.
    pub fn config(&self) -> &ConcurrencyConfig {
        &self.config
    }

    /// Filters every cell.
    pub fn apply(&self, filter: &dyn PixelFilter, src: &[f64], rows: usize, cols: usize) -> OpsResult<Vec<f64>> {
        self.run(filter, src, rows, cols, None)
    }

    /// Filters the cells set in `mask`; other cells are copied from `src`.
    pub fn apply_masked(
        &self,
        filter: &dyn PixelFilter,
        src: &[f64],
        rows: usize,
        cols: usize,
        mask: &GridMask,
    ) -> OpsResult<Vec<f64>> {
        if mask.rows() != rows || mask.columns() != cols {
            return Err(OpsError::SizeMismatch(format!(
                "mask is {}x{}, image is {}x{}",
                mask.rows(),
                mask.columns(),
                rows,
                cols
            )));
        }
        self.run(filter, src, rows, cols, Some(mask))
    }

    fn run(
        &self,
        filter: &dyn PixelFilter,
        src: &[f64],
        rows: usize,
        cols: usize,
        mask: Option<&GridMask>,
    ) -> OpsResult<Vec<f64>> {
        check_buffer(src.len(), rows, cols)?;
        let tasks = self.config.task_count(rows);
        let rows_per_task = rows.div_ceil(tasks);
        trace!(rows, cols, tasks, rows_per_task, "concurrent filter");

        let mut dst = src.to_vec();
        let fill = |task: usize, chunk: &mut [f64]| -> OpsResult<()> {
            let first_row = task * rows_per_task;
            for (k, value) in chunk.iter_mut().enumerate() {
                let row = first_row + k / cols;
                let col = k % cols;
                if mask.is_none_or(|m| m.contains(row, col)) {
                    *value = filter.filter(row, col, src, rows, cols)?;
                }
            }
            Ok(())
        };

        #[cfg(feature = "parallel")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(tasks)
                .thread_name(|index| format!("spm-filter-{index}"))
                .build()
                .map_err(|e| OpsError::TaskFailed(e.to_string()))?;
            pool.install(|| {
                dst.par_chunks_mut(rows_per_task * cols)
                    .enumerate()
                    .try_for_each(|(task, chunk)| fill(task, chunk))
            })?;
            debug!(tasks, "Concurrent filter finished");
        }

        #[cfg(not(feature = "parallel"))]
        {
            for (task, chunk) in dst.chunks_mut(rows_per_task * cols).enumerate() {
                fill(task, chunk)?;
            }
            debug!(tasks, "Sequential filter finished");
        }

        Ok(dst)
    }
}
