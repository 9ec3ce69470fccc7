//! Binned histogram data ready for plotting.
//!
//! Bins have equal width starting at the range minimum. The upper edge of
//! the last bin is set to the range maximum exactly so that rounding in
//! `min + k * width` never leaves a gap at the end.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// What the y axis of a histogram shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HistogramType {
    /// Number of values per bin.
    #[default]
    Count,
    /// Fraction of values per bin.
    Probability,
    /// Fraction of values per unit of x.
    ProbabilityDensity,
    /// `log10` of the count; empty bins have no value.
    LogCount,
}

impl HistogramType {
    /// All types, in display order.
    pub const ALL: [HistogramType; 4] = [
        HistogramType::Count,
        HistogramType::Probability,
        HistogramType::ProbabilityDensity,
        HistogramType::LogCount,
    ];

    /// Whether the type needs strictly positive data.
    pub fn requires_positive_values(&self) -> bool {
        matches!(self, HistogramType::ProbabilityDensity)
    }

    /// Y value for a bin holding `count` of `total` values over `width`.
    pub fn y_value(&self, count: usize, total: usize, width: f64) -> f64 {
        let c = count as f64;
        let n = total as f64;
        match self {
            HistogramType::Count => c,
            HistogramType::Probability => c / n,
            HistogramType::ProbabilityDensity => c / (n * width),
            HistogramType::LogCount => {
                if count == 0 {
                    f64::NAN
                } else {
                    c.log10()
                }
            }
        }
    }
}

/// Ordinary or cumulative counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DistributionType {
    /// Each value counts in its own bin.
    #[default]
    Ordinary,
    /// Each value counts in its bin and every bin after it.
    Cumulative,
}

/// One histogram bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    /// Inclusive lower edge.
    pub lower: f64,
    /// Upper edge; inclusive for the last bin.
    pub upper: f64,
    /// Number of values counted in the bin.
    pub count: usize,
    /// Plotted value, see [`HistogramType::y_value`].
    pub y: f64,
}

impl HistogramBin {
    /// Bin centre.
    #[inline]
    pub fn center(&self) -> f64 {
        0.5 * (self.lower + self.upper)
    }

    /// Bin width.
    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Histogram over `[range_min, range_max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramDataset {
    bins: Vec<HistogramBin>,
    histogram_type: HistogramType,
    distribution_type: DistributionType,
    total: usize,
}

impl HistogramDataset {
    /// Bins `values` into `round(bin_count)` (at least one) bins of `bin_width`.
    ///
    /// Values outside `[range_min, range_max]` are dropped. `total` used for
    /// probabilities is the number of values that were kept.
    pub fn build(
        values: &[f64],
        range_min: f64,
        range_max: f64,
        bin_count: f64,
        bin_width: f64,
        histogram_type: HistogramType,
        distribution_type: DistributionType,
    ) -> Self {
        let n_bins = if bin_count.is_finite() { (bin_count.round() as usize).max(1) } else { 1 };
        trace!(bins = n_bins, values = values.len(), range_min, range_max, "build histogram");

        let mut counts = vec![0usize; n_bins];
        let mut total = 0;
        for &v in values {
            if !(v >= range_min && v <= range_max) {
                continue;
            }
            total += 1;
            let k = ((v - range_min) / bin_width).floor();
            let index = if k.is_finite() && k > 0.0 { (k as usize).min(n_bins - 1) } else { 0 };
            match distribution_type {
                DistributionType::Ordinary => counts[index] += 1,
                DistributionType::Cumulative => counts[index..].iter_mut().for_each(|c| *c += 1),
            }
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(k, count)| {
                let lower = range_min + k as f64 * bin_width;
                let upper = if k + 1 == n_bins { range_max } else { range_min + (k + 1) as f64 * bin_width };
                HistogramBin {
                    lower,
                    upper,
                    count,
                    y: histogram_type.y_value(count, total, upper - lower),
                }
            })
            .collect();

        Self {
            bins,
            histogram_type,
            distribution_type,
            total,
        }
    }

    /// Bins in ascending order.
    pub fn bins(&self) -> &[HistogramBin] {
        &self.bins
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Always `false`; a dataset has at least one bin.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Number of values that fell inside the range.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Y axis meaning.
    pub fn histogram_type(&self) -> HistogramType {
        self.histogram_type
    }

    /// Ordinary or cumulative.
    pub fn distribution_type(&self) -> DistributionType {
        self.distribution_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ten() -> Vec<f64> {
        (1..=10).map(f64::from).collect()
    }

    #[test]
    fn test_bins_tile_range() {
        let ds = HistogramDataset::build(&ten(), 1.0, 10.0, 5.0, 1.8, HistogramType::Count, DistributionType::Ordinary);
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.bins()[0].lower, 1.0);
        assert_eq!(ds.bins()[4].upper, 10.0);
        for pair in ds.bins().windows(2) {
            assert_eq!(pair[0].upper, pair[1].lower);
        }
        assert!(ds.bins().iter().all(|b| b.count == 2));
    }

    #[test]
    fn test_out_of_range_dropped_and_probability() {
        let ds = HistogramDataset::build(&ten(), 3.0, 6.0, 3.0, 1.0, HistogramType::Probability, DistributionType::Ordinary);
        assert_eq!(ds.total(), 4);
        let counts: Vec<usize> = ds.bins().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 2]);
        assert_relative_eq!(ds.bins().iter().map(|b| b.y).sum::<f64>(), 1.0);
    }

    #[test]
    fn test_cumulative_and_density() {
        let ds = HistogramDataset::build(&ten(), 1.0, 10.0, 5.0, 1.8, HistogramType::Count, DistributionType::Cumulative);
        let counts: Vec<usize> = ds.bins().iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 4, 6, 8, 10]);

        let pd = HistogramDataset::build(
            &ten(),
            1.0,
            10.0,
            5.0,
            1.8,
            HistogramType::ProbabilityDensity,
            DistributionType::Ordinary,
        );
        let area: f64 = pd.bins().iter().map(|b| b.y * b.width()).sum();
        assert_relative_eq!(area, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_log_count_empty_bin_is_nan() {
        let ds = HistogramDataset::build(&[1.0, 1.0, 4.0], 1.0, 4.0, 3.0, 1.0, HistogramType::LogCount, DistributionType::Ordinary);
        assert_relative_eq!(ds.bins()[0].y, 2f64.log10());
        assert!(ds.bins()[1].y.is_nan());
    }
}
