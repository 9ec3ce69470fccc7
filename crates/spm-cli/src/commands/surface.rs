//! Surface command
//!
//! Builds a synthetic height image (tilted plane, two bumps, per-line
//! offsets and a little deterministic noise) and runs it through line
//! correction, a filter and a minimum fix, printing statistics per step.

use anyhow::{Result, bail};
use spm_core::{Grid2D, GridChannel2DData, Quantity};
use spm_ops::concurrent::ConcurrencyConfig;
use spm_ops::filters::{FilterTransformation, GradientMagnitudeFilter, MedianFilter};
use spm_ops::fix_minimum::FixMinimum;
use spm_ops::{GridTransform, Kernel2D, KernelTransformation, LineFitCorrection};
#[allow(unused_imports)]
use tracing::{debug, info, trace};

use super::summarize;
use crate::SurfaceArgs;

/// Sampling step of the synthetic grid, in micrometres.
const STEP: f64 = 0.01;

/// Synthetic `rows x cols` height image.
pub fn synthetic_surface(rows: usize, cols: usize) -> Result<GridChannel2DData> {
    let grid = Grid2D::new(rows, cols, 0.0, 0.0, STEP, STEP)?;
    let (cx1, cy1) = (grid.x(cols / 3), grid.y(rows / 3));
    let (cx2, cy2) = (grid.x(2 * cols / 3), grid.y(2 * rows / 3));
    let sigma = STEP * (rows.min(cols) as f64 / 8.0).max(1.0);

    let mut values = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        let y = grid.y(r);
        let line_offset = ((r * 37) % 11) as f64 * 0.1;
        for c in 0..cols {
            let x = grid.x(c);
            let bump = |bx: f64, by: f64, h: f64| {
                let d2 = (x - bx).powi(2) + (y - by).powi(2);
                h * (-d2 / (2.0 * sigma * sigma)).exp()
            };
            let noise = ((r * 7919 + c * 104_729) % 1000) as f64 / 1000.0 - 0.5;
            values.push(
                40.0 * x + 15.0 * y + bump(cx1, cy1, 3.0) + bump(cx2, cy2, 2.0) + line_offset + 0.05 * noise,
            );
        }
    }
    Ok(GridChannel2DData::new(grid, values, Quantity::height())?)
}

fn filter_step(name: &str, config: ConcurrencyConfig) -> Result<Option<Box<dyn GridTransform>>> {
    let step: Box<dyn GridTransform> = match name.to_lowercase().as_str() {
        "gaussian" | "gauss" => Box::new(KernelTransformation::new(Kernel2D::gaussian(1.0, 1.0, 2)?)),
        "median" => Box::new(FilterTransformation::with_concurrency(MedianFilter::new(1), config)),
        "gradient" => Box::new(FilterTransformation::with_concurrency(GradientMagnitudeFilter::default(), config)),
        "none" => return Ok(None),
        other => bail!("unknown filter '{other}'"),
    };
    Ok(Some(step))
}

pub fn run(args: SurfaceArgs, verbose: bool, threads: Option<usize>) -> Result<()> {
    trace!(rows = args.rows, cols = args.cols, filter = %args.filter, "surface::run");
    let config = match threads {
        Some(n) => ConcurrencyConfig::with_max_task_count(n),
        None => ConcurrencyConfig::default(),
    };

    let mut steps: Vec<(&str, Box<dyn GridTransform>)> = Vec::new();
    if args.line_correction {
        steps.push(("lines", Box::new(LineFitCorrection::new(1))));
    }
    if let Some(filter) = filter_step(&args.filter, config)? {
        steps.push(("filter", filter));
    }
    steps.push(("minimum", Box::new(FixMinimum::new(0.0, false))));

    let mut channel = synthetic_surface(args.rows, args.cols)?;
    println!("{}", summarize("input", channel.values()));
    for (label, step) in &steps {
        info!(step = *label, "Applying");
        channel = step.transform_grid(&channel)?;
        println!("{}", summarize(label, channel.values()));
    }

    if verbose {
        println!(
            "{} x {} cells, {} tasks",
            channel.row_count(),
            channel.column_count(),
            config.task_count(channel.row_count())
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_surface_shape() {
        let ch = synthetic_surface(16, 24).unwrap();
        assert_eq!((ch.row_count(), ch.column_count()), (16, 24));
        assert!(ch.values().iter().all(|v| v.is_finite()));
        assert!(synthetic_surface(0, 4).is_err());
    }

    #[test]
    fn test_pipeline_pins_minimum() {
        let ch = synthetic_surface(32, 32).unwrap();
        let fixed = FixMinimum::new(0.0, false).transform_grid(&ch).unwrap();
        assert_eq!(fixed.min(), 0.0);
        assert!(filter_step("sharpen", ConcurrencyConfig::default()).is_err());
        assert!(filter_step("none", ConcurrencyConfig::default()).unwrap().is_none());
    }

    #[test]
    fn test_run_all_filters() {
        for filter in ["gaussian", "median", "gradient", "none"] {
            let args = SurfaceArgs {
                rows: 24,
                cols: 20,
                filter: filter.into(),
                line_correction: true,
            };
            assert!(run(args, true, Some(2)).is_ok(), "{filter}");
        }
    }
}
