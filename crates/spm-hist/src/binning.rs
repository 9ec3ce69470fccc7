//! Binning policies.
//!
//! A [`BinningMethod`] turns the retained sample into either a bin count or
//! a bin width; the model derives the other quantity from the range length.
//!
//! | method | rule |
//! |--------|------|
//! | Sturges | `count = ceil(1 + log2 n)` |
//! | Scott | `width = 3.5 * sd / n^(1/3)` |
//! | Freedman-Diaconis | `width = 2 * iqr / n^(1/3)` |
//! | Square root | `count = round(sqrt n)` |
//! | Manual | last width or count entered by the user |

use serde::{Deserialize, Serialize};
use spm_math::stats;

/// Residuals and widths at or below this are treated as zero.
pub const TOLERANCE: f64 = 1e-14;

/// Ranges not longer than this are degenerate and get a single bin.
pub const MINIMAL_EXTENSIVE_RANGE_LENGTH: f64 = 1e-14;

/// Policy deriving bin count or width from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BinningMethod {
    /// Keep the width or count last entered by the user.
    Manual,
    /// Sturges' formula.
    #[default]
    Sturges,
    /// Scott's normal reference rule.
    Scotts,
    /// Freedman-Diaconis rule.
    FreedmanDiaconis,
    /// Square-root choice.
    SquareRoot,
}

/// Quantity a binning rule prescribes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BinRule {
    Count(f64),
    Width(f64),
    /// Rule not applicable; keep the current count.
    KeepCount,
}

impl BinningMethod {
    /// All methods, in display order.
    pub const ALL: [BinningMethod; 5] = [
        BinningMethod::Manual,
        BinningMethod::Sturges,
        BinningMethod::Scotts,
        BinningMethod::FreedmanDiaconis,
        BinningMethod::SquareRoot,
    ];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            BinningMethod::Manual => "Manual",
            BinningMethod::Sturges => "Sturges",
            BinningMethod::Scotts => "Scott",
            BinningMethod::FreedmanDiaconis => "Freedman-Diaconis",
            BinningMethod::SquareRoot => "Square root",
        }
    }

    /// Whether the method prescribes a width rather than a count.
    pub fn prescribes_width(&self) -> bool {
        matches!(self, BinningMethod::Scotts | BinningMethod::FreedmanDiaconis)
    }

    /// Rule for the ascending sorted, non-empty `sorted` sample.
    ///
    /// `Manual` has no data-driven rule and yields [`BinRule::KeepCount`].
    pub(crate) fn rule(&self, sorted: &[f64]) -> BinRule {
        let n = sorted.len() as f64;
        match self {
            BinningMethod::Manual => BinRule::KeepCount,
            BinningMethod::Sturges => BinRule::Count(sturges_count(sorted.len())),
            BinningMethod::Scotts => {
                let width = 3.5 * stats::standard_deviation(sorted) / n.cbrt();
                width_or_keep(width)
            }
            BinningMethod::FreedmanDiaconis => {
                let width = 2.0 * stats::interquartile_range(sorted) / n.cbrt();
                width_or_keep(width)
            }
            BinningMethod::SquareRoot => BinRule::Count(n.sqrt().round().max(1.0)),
        }
    }
}

impl std::fmt::Display for BinningMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn width_or_keep(width: f64) -> BinRule {
    if width > TOLERANCE { BinRule::Width(width) } else { BinRule::KeepCount }
}

/// Sturges' bin count for `n` values.
pub fn sturges_count(n: usize) -> f64 {
    if n == 0 {
        return 1.0;
    }
    (1.0 + (n as f64).log2()).ceil()
}

/// Bin count for `width` over `range_length`, and the amount by which the
/// range must grow so the bins tile it exactly.
///
/// The residual `ceil(count) - count` is ignored when within [`TOLERANCE`].
pub fn count_for_width(range_length: f64, width: f64) -> (f64, f64) {
    let raw = range_length / width;
    if raw - raw.floor() <= TOLERANCE * raw.max(1.0) {
        return (raw.floor().max(1.0), 0.0);
    }
    let count = raw.ceil();
    let residual = count - raw;
    if residual.abs() > TOLERANCE {
        (count, residual * width)
    } else {
        (count, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sturges() {
        assert_eq!(sturges_count(10), 5.0);
        assert_eq!(sturges_count(16), 5.0);
        assert_eq!(sturges_count(1), 1.0);
    }

    #[test]
    fn test_count_for_width_nudges_range() {
        assert_eq!(count_for_width(10.0, 2.0), (5.0, 0.0));
        let (count, grow) = count_for_width(10.0, 3.0);
        assert_eq!(count, 4.0);
        assert_relative_eq!(grow, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rules() {
        let sorted: Vec<f64> = (1..=9).map(f64::from).collect();
        assert_eq!(BinningMethod::SquareRoot.rule(&sorted), BinRule::Count(3.0));
        assert_eq!(BinningMethod::Manual.rule(&sorted), BinRule::KeepCount);
        match BinningMethod::Scotts.rule(&sorted) {
            BinRule::Width(w) => assert_relative_eq!(w, 3.5 * 7.5f64.sqrt() / 9f64.cbrt(), epsilon = 1e-12),
            other => panic!("unexpected rule {other:?}"),
        }
        // zero spread: Freedman-Diaconis falls back to the current count
        assert_eq!(BinningMethod::FreedmanDiaconis.rule(&[2.0; 8]), BinRule::KeepCount);
    }
}
