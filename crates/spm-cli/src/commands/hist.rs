//! Hist command
//!
//! Bins a list of values with the histogram model and prints the bins,
//! optionally with a fitted distribution.

use anyhow::{Context, Result, bail};
use spm_hist::{BinningMethod, DistributionType, FitType, HistogramSampleModel, HistogramType};
use tracing::{debug, trace};

use crate::HistArgs;

fn parse_method(name: &str) -> Result<BinningMethod> {
    Ok(match name.to_lowercase().as_str() {
        "manual" => BinningMethod::Manual,
        "sturges" => BinningMethod::Sturges,
        "scott" | "scotts" => BinningMethod::Scotts,
        "fd" | "freedman-diaconis" => BinningMethod::FreedmanDiaconis,
        "sqrt" | "square-root" => BinningMethod::SquareRoot,
        other => bail!("unknown binning method '{other}'"),
    })
}

fn parse_histogram_type(name: &str) -> Result<HistogramType> {
    Ok(match name.to_lowercase().as_str() {
        "count" => HistogramType::Count,
        "probability" | "prob" => HistogramType::Probability,
        "density" | "pdf" => HistogramType::ProbabilityDensity,
        "log-count" | "log" => HistogramType::LogCount,
        other => bail!("unknown histogram type '{other}'"),
    })
}

fn parse_fit(name: &str) -> Result<FitType> {
    Ok(match name.to_lowercase().as_str() {
        "normal" | "gauss" => FitType::Normal,
        "log-normal" | "lognormal" => FitType::LogNormal,
        "laplace" => FitType::Laplace,
        other => bail!("unknown fit type '{other}'"),
    })
}

/// Configures a model from the arguments.
fn build_model(args: &HistArgs) -> Result<HistogramSampleModel> {
    let mut model = HistogramSampleModel::new("values", &args.values).context("Failed to build histogram model")?;
    model.add_listener(|event| debug!(?event, "histogram model"));

    model.specify_binning_method(parse_method(&args.method)?);
    if let Some(bins) = args.bins {
        model.specify_bin_count(bins)?;
    }
    if let Some(width) = args.width {
        model.specify_bin_width(width)?;
    }
    model.specify_trim_smallest(args.trim_low)?;
    model.specify_trim_largest(args.trim_high)?;
    model.specify_histogram_type(parse_histogram_type(&args.histogram_type)?)?;
    if args.cumulative {
        model.specify_distribution_type(DistributionType::Cumulative);
    }
    if let Some(fit) = &args.fit {
        model.specify_fit_type(parse_fit(fit)?)?;
        model.specify_fitted(true);
    }
    Ok(model)
}

pub fn run(args: HistArgs, verbose: bool) -> Result<()> {
    trace!(values = args.values.len(), method = %args.method, "hist::run");
    let model = build_model(&args)?;

    if verbose {
        println!(
            "{} of {} values retained, range [{}, {}]",
            model.retained_count(),
            model.sample().len(),
            model.range_min(),
            model.range_max()
        );
    }
    println!(
        "{} binning: {} bins of width {:.6}",
        model.binning_method(),
        model.bin_count(),
        model.bin_width()
    );

    let dataset = model.histogram_dataset()?;
    for bin in dataset.bins() {
        println!("[{:>12.6}, {:>12.6}]  {:>6}  {:>12.6}", bin.lower, bin.upper, bin.count, bin.y);
    }

    if model.is_fitted() {
        let fit = model.fitted_distribution()?;
        println!("fit: {fit:?}");
        let curve = model.fit_curve()?;
        // a handful of points is enough on a terminal
        for (x, y) in curve.iter().step_by(curve.len().div_ceil(10).max(1)) {
            println!("  f({x:.6}) = {y:.6}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: Vec<f64>) -> HistArgs {
        HistArgs {
            values,
            method: "sturges".into(),
            bins: None,
            width: None,
            trim_low: 0.0,
            trim_high: 0.0,
            histogram_type: "count".into(),
            cumulative: false,
            fit: None,
        }
    }

    #[test]
    fn test_manual_bins_from_args() {
        let mut a = args((1..=10).map(f64::from).collect());
        a.method = "manual".into();
        a.bins = Some(5.0);
        let model = build_model(&a).unwrap();
        assert_eq!(model.binning_method(), BinningMethod::Manual);
        assert_eq!(model.histogram_dataset().unwrap().len(), 5);
    }

    #[test]
    fn test_unknown_names_rejected() {
        assert!(parse_method("golden").is_err());
        assert!(parse_histogram_type("area").is_err());
        assert!(parse_fit("cauchy").is_err());
        let mut a = args(vec![1.0, 2.0]);
        a.trim_low = 2.0;
        assert!(build_model(&a).is_err());
    }

    #[test]
    fn test_run_with_fit() {
        let mut a = args(vec![0.8, 1.1, 1.3, 1.2, 0.9, 1.0, 1.4, 1.05]);
        a.fit = Some("laplace".into());
        a.cumulative = true;
        assert!(run(a, true).is_ok());
    }
}
