//! CLI command implementations

pub mod hist;
pub mod surface;

use spm_math::stats;

/// Summary line for a set of values.
pub fn summarize(label: &str, values: &[f64]) -> String {
    format!(
        "{label:<10} min {:>10.4}  max {:>10.4}  mean {:>10.4}  sd {:>10.4}",
        stats::min(values),
        stats::max(values),
        stats::mean(values),
        stats::standard_deviation(values),
    )
}
