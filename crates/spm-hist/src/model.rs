//! Interactive histogram configuration for one sample.
//!
//! [`HistogramSampleModel`] keeps bin count, bin width and range consistent
//! while the user edits any of them. Each edit runs through a silent
//! mutator that returns the list of [`HistogramModelEvent`]s it caused; the
//! public method then hands that list to every registered listener.
//!
//! Two flavours of setter exist:
//!
//! - `specify_*`: user edits. They may switch the binning method to
//!   [`BinningMethod::Manual`], drop full-range mode and re-derive bins.
//! - `set_*`: programmatic edits. They only keep width and count in step.
//!
//! The model is not thread-safe; it belongs to the single thread that owns
//! the editing session.
//!
//! # Example
//!
//! ```rust
//! use spm_hist::{BinningMethod, HistogramSampleModel};
//!
//! let sample: Vec<f64> = (1..=10).map(f64::from).collect();
//! let mut model = HistogramSampleModel::new("height", &sample).unwrap();
//! model.specify_bin_count(5.0).unwrap();
//! assert_eq!(model.binning_method(), BinningMethod::Manual);
//! assert!((model.bin_width() - 1.8).abs() < 1e-12);
//!
//! let histogram = model.histogram_dataset().unwrap();
//! assert!(histogram.bins().iter().all(|b| b.count == 2));
//! ```

use std::cell::OnceCell;
use std::fmt;

use serde::{Deserialize, Serialize};
use spm_math::stats;
use tracing::{debug, trace};

use crate::binning::{BinRule, BinningMethod, MINIMAL_EXTENSIVE_RANGE_LENGTH, count_for_width, sturges_count};
use crate::dataset::{DistributionType, HistogramDataset, HistogramType};
use crate::error::{HistogramError, HistogramResult};
use crate::fit::{FitType, FittedDistribution};

/// Change notification emitted after an edit.
#[derive(Debug, Clone, PartialEq)]
pub enum HistogramModelEvent {
    /// Sample name changed.
    NameChanged {
        /// Previous name.
        old: String,
        /// New name.
        new: String,
    },
    /// Bin count changed.
    BinCountChanged {
        /// Previous value.
        old: f64,
        /// New value.
        new: f64,
    },
    /// Bin width changed.
    BinWidthChanged {
        /// Previous value.
        old: f64,
        /// New value.
        new: f64,
    },
    /// Lower range bound changed.
    RangeMinChanged {
        /// Previous value.
        old: f64,
        /// New value.
        new: f64,
    },
    /// Upper range bound changed.
    RangeMaxChanged {
        /// Previous value.
        old: f64,
        /// New value.
        new: f64,
    },
    /// Fraction of smallest values trimmed changed.
    TrimSmallestChanged {
        /// Previous value.
        old: f64,
        /// New value.
        new: f64,
    },
    /// Fraction of largest values trimmed changed.
    TrimLargestChanged {
        /// Previous value.
        old: f64,
        /// New value.
        new: f64,
    },
    /// Binning method changed.
    BinningMethodChanged {
        /// Previous method.
        old: BinningMethod,
        /// New method.
        new: BinningMethod,
    },
    /// Histogram type changed.
    HistogramTypeChanged {
        /// Previous type.
        old: HistogramType,
        /// New type.
        new: HistogramType,
    },
    /// Distribution type changed.
    DistributionTypeChanged {
        /// Previous type.
        old: DistributionType,
        /// New type.
        new: DistributionType,
    },
    /// Fit family changed.
    FitTypeChanged {
        /// Previous family.
        old: FitType,
        /// New family.
        new: FitType,
    },
    /// Fit overlay switched on or off.
    FittedChanged(bool),
    /// Full-range mode switched on or off.
    FullRangeChanged(bool),
    /// Whether the model has all inputs needed to build a histogram.
    InputProvidedChanged(bool),
    /// Whether the retained data contains values `<= 0`.
    NonPositiveValuesChanged(bool),
}

/// Which of width and count the user entered last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpecifiedBinParameter {
    /// Bin count.
    #[default]
    Count,
    /// Bin width.
    Width,
}

/// Handle returned by [`HistogramSampleModel::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type Listener = Box<dyn FnMut(&HistogramModelEvent)>;

/// Editable settings; the undo snapshot.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    name: String,
    bin_count: f64,
    bin_width: f64,
    range_min: f64,
    range_max: f64,
    last_specified: SpecifiedBinParameter,
    last_specified_count: f64,
    last_specified_width: f64,
    binning_method: BinningMethod,
    histogram_type: HistogramType,
    distribution_type: DistributionType,
    fit_type: FitType,
    fitted: bool,
    full_range: bool,
    trim_smallest: f64,
    trim_largest: f64,
}

/// Observable state compared before and after an edit.
struct Observed {
    settings: Settings,
    input_provided: bool,
    non_positive: bool,
}

fn same(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl Observed {
    fn changes(&self, after: &Observed) -> Vec<HistogramModelEvent> {
        use HistogramModelEvent as E;
        let (a, b) = (&self.settings, &after.settings);
        let mut events = Vec::new();
        if a.name != b.name {
            events.push(E::NameChanged {
                old: a.name.clone(),
                new: b.name.clone(),
            });
        }
        if a.trim_smallest != b.trim_smallest {
            events.push(E::TrimSmallestChanged {
                old: a.trim_smallest,
                new: b.trim_smallest,
            });
        }
        if a.trim_largest != b.trim_largest {
            events.push(E::TrimLargestChanged {
                old: a.trim_largest,
                new: b.trim_largest,
            });
        }
        if a.binning_method != b.binning_method {
            events.push(E::BinningMethodChanged {
                old: a.binning_method,
                new: b.binning_method,
            });
        }
        if a.full_range != b.full_range {
            events.push(E::FullRangeChanged(b.full_range));
        }
        if !same(a.range_min, b.range_min) {
            events.push(E::RangeMinChanged {
                old: a.range_min,
                new: b.range_min,
            });
        }
        if !same(a.range_max, b.range_max) {
            events.push(E::RangeMaxChanged {
                old: a.range_max,
                new: b.range_max,
            });
        }
        if !same(a.bin_count, b.bin_count) {
            events.push(E::BinCountChanged {
                old: a.bin_count,
                new: b.bin_count,
            });
        }
        if !same(a.bin_width, b.bin_width) {
            events.push(E::BinWidthChanged {
                old: a.bin_width,
                new: b.bin_width,
            });
        }
        if self.non_positive != after.non_positive {
            events.push(E::NonPositiveValuesChanged(after.non_positive));
        }
        if a.histogram_type != b.histogram_type {
            events.push(E::HistogramTypeChanged {
                old: a.histogram_type,
                new: b.histogram_type,
            });
        }
        if a.distribution_type != b.distribution_type {
            events.push(E::DistributionTypeChanged {
                old: a.distribution_type,
                new: b.distribution_type,
            });
        }
        if a.fit_type != b.fit_type {
            events.push(E::FitTypeChanged {
                old: a.fit_type,
                new: b.fit_type,
            });
        }
        if a.fitted != b.fitted {
            events.push(E::FittedChanged(b.fitted));
        }
        if self.input_provided != after.input_provided {
            events.push(E::InputProvidedChanged(after.input_provided));
        }
        events
    }
}

fn check_fraction(name: &str, value: f64) -> HistogramResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(HistogramError::InvalidArgument(format!("{name} must be in [0, 1], got {value}")))
    }
}

fn check_positive(name: &str, value: f64) -> HistogramResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(HistogramError::InvalidArgument(format!("{name} must be positive, got {value}")))
    }
}

fn check_finite(name: &str, value: f64) -> HistogramResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(HistogramError::InvalidArgument(format!("{name} must be finite, got {value}")))
    }
}

/// Histogram configuration of one named sample.
pub struct HistogramSampleModel {
    /// Finite input values, ascending.
    sample: Vec<f64>,
    /// `sample` after trimming.
    data_to_plot: Vec<f64>,
    settings: Settings,
    undo_point: Option<Settings>,
    fit: OnceCell<FittedDistribution>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: usize,
}

impl fmt::Debug for HistogramSampleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistogramSampleModel")
            .field("sample_len", &self.sample.len())
            .field("retained", &self.data_to_plot.len())
            .field("settings", &self.settings)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl HistogramSampleModel {
    /// Model for `sample`; non-finite values are dropped.
    ///
    /// Starts with Sturges binning over the full data range, a count
    /// histogram, ordinary distribution, a normal fit switched off and no
    /// trimming.
    pub fn new(name: impl Into<String>, sample: &[f64]) -> HistogramResult<Self> {
        let sample = stats::sorted_finite(sample);
        if sample.is_empty() {
            return Err(HistogramError::InvalidArgument("sample has no finite values".into()));
        }
        let mut model = Self {
            data_to_plot: sample.clone(),
            sample,
            settings: Settings {
                name: name.into(),
                bin_count: f64::NAN,
                bin_width: f64::NAN,
                range_min: f64::NAN,
                range_max: f64::NAN,
                last_specified: SpecifiedBinParameter::Count,
                last_specified_count: f64::NAN,
                last_specified_width: f64::NAN,
                binning_method: BinningMethod::default(),
                histogram_type: HistogramType::default(),
                distribution_type: DistributionType::default(),
                fit_type: FitType::default(),
                fitted: false,
                full_range: true,
                trim_smallest: 0.0,
                trim_largest: 0.0,
            },
            undo_point: None,
            fit: OnceCell::new(),
            listeners: Vec::new(),
            next_listener: 0,
        };
        model.refresh_trimmed();
        model.apply_full_range();
        model.derive_bins();
        model.sync_shadows();
        trace!(name = %model.settings.name, n = model.sample.len(), bins = model.settings.bin_count, "histogram model");
        Ok(model)
    }

    // ---- listeners ----

    /// Registers `listener` for change events.
    pub fn add_listener(&mut self, listener: impl FnMut(&HistogramModelEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unregisters a listener; returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, events: &[HistogramModelEvent]) {
        for event in events {
            for (_, listener) in &mut self.listeners {
                listener(event);
            }
        }
    }

    fn observe(&self) -> Observed {
        Observed {
            settings: self.settings.clone(),
            input_provided: self.input_provided(),
            non_positive: self.contains_non_positive_values(),
        }
    }

    /// Runs `edit` and returns the events it caused, without notifying.
    ///
    /// Arguments are validated before the edit runs, so edits cannot fail.
    fn silently(&mut self, edit: impl FnOnce(&mut Self)) -> Vec<HistogramModelEvent> {
        let before = self.observe();
        edit(self);
        before.changes(&self.observe())
    }

    /// Runs `edit`, then notifies listeners of the events it caused.
    fn edit(&mut self, edit: impl FnOnce(&mut Self)) {
        let events = self.silently(edit);
        if !events.is_empty() {
            debug!(events = events.len(), "Histogram model changed");
        }
        self.notify(&events);
    }

    // ---- derived state ----

    fn refresh_trimmed(&mut self) {
        let s = &mut self.settings;
        self.data_to_plot = stats::trim_sorted(&self.sample, s.trim_smallest, s.trim_largest).to_vec();
        self.fit = OnceCell::new();
        let non_positive = self.data_to_plot.first().is_some_and(|&v| v <= 0.0);
        if non_positive && s.fit_type.requires_positive_values() {
            debug!(from = ?s.fit_type, "Non-positive values present, switching fit to normal");
            s.fit_type = FitType::Normal;
        }
        if non_positive && s.histogram_type.requires_positive_values() {
            debug!(from = ?s.histogram_type, "Non-positive values present, switching histogram to count");
            s.histogram_type = HistogramType::Count;
        }
    }

    fn apply_full_range(&mut self) {
        if self.settings.full_range {
            self.settings.range_min = self.data_min();
            self.settings.range_max = self.data_max();
        }
    }

    fn apply_count(&mut self, count: f64) {
        self.settings.bin_count = count;
        self.settings.bin_width = self.range_length() / count;
    }

    fn apply_width(&mut self, width: f64) {
        let (count, grow) = count_for_width(self.range_length(), width);
        if grow != 0.0 {
            trace!(grow, "Extending range max to a whole number of bins");
            self.settings.range_max += grow;
        }
        self.settings.bin_count = count;
        self.settings.bin_width = width;
    }

    fn current_or_sturges_count(&self) -> f64 {
        let count = self.settings.bin_count;
        if count.is_finite() && count >= 1.0 {
            count
        } else {
            sturges_count(self.data_to_plot.len())
        }
    }

    /// Recomputes count and width for the active binning method.
    fn derive_bins(&mut self) {
        let length = self.range_length();
        if self.data_to_plot.is_empty() || length.is_nan() {
            self.settings.bin_count = f64::NAN;
            self.settings.bin_width = f64::NAN;
            return;
        }
        if !self.is_range_extensive() {
            self.settings.bin_count = 1.0;
            self.settings.bin_width = length;
            return;
        }
        let method = self.settings.binning_method;
        match method {
            BinningMethod::Manual => match self.settings.last_specified {
                SpecifiedBinParameter::Width => self.apply_width(self.settings.last_specified_width),
                SpecifiedBinParameter::Count => self.apply_count(self.settings.last_specified_count),
            },
            _ => match method.rule(&self.data_to_plot) {
                BinRule::Count(count) => self.apply_count(count),
                BinRule::Width(width) => self.apply_width(width),
                BinRule::KeepCount => {
                    debug!(?method, "Binning rule not applicable, keeping bin count");
                    self.apply_count(self.current_or_sturges_count());
                }
            },
        }
    }

    fn sync_shadows(&mut self) {
        let s = &mut self.settings;
        if s.bin_count.is_finite() {
            s.last_specified_count = s.bin_count;
        }
        if s.bin_width.is_finite() && s.bin_width > 0.0 {
            s.last_specified_width = s.bin_width;
        }
    }

    fn check_range_min(&self, value: f64) -> HistogramResult<()> {
        check_finite("range min", value)?;
        if value > self.settings.range_max {
            return Err(HistogramError::InvalidArgument(format!(
                "range min {value} exceeds range max {}",
                self.settings.range_max
            )));
        }
        Ok(())
    }

    fn check_range_max(&self, value: f64) -> HistogramResult<()> {
        check_finite("range max", value)?;
        if value < self.settings.range_min {
            return Err(HistogramError::InvalidArgument(format!(
                "range max {value} is below range min {}",
                self.settings.range_min
            )));
        }
        Ok(())
    }

    // ---- user edits ----

    /// Renames the sample.
    pub fn specify_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.edit(|m| {
            m.settings.name = name;
        });
    }

    /// Sets the bin width as a user edit: switches to manual binning and
    /// recomputes the count, extending the range end if needed.
    pub fn specify_bin_width(&mut self, width: f64) -> HistogramResult<()> {
        check_positive("bin width", width)?;
        self.edit(|m| {
            m.settings.binning_method = BinningMethod::Manual;
            m.settings.last_specified = SpecifiedBinParameter::Width;
            m.settings.last_specified_width = width;
            m.apply_full_range();
            m.derive_bins();
        });
        Ok(())
    }

    /// Sets the bin count as a user edit: switches to manual binning and
    /// recomputes the width.
    pub fn specify_bin_count(&mut self, count: f64) -> HistogramResult<()> {
        check_positive("bin count", count)?;
        self.edit(|m| {
            m.settings.binning_method = BinningMethod::Manual;
            m.settings.last_specified = SpecifiedBinParameter::Count;
            m.settings.last_specified_count = count;
            m.apply_full_range();
            m.derive_bins();
        });
        Ok(())
    }

    /// Sets the lower range bound and leaves full-range mode.
    pub fn specify_range_min(&mut self, value: f64) -> HistogramResult<()> {
        self.check_range_min(value)?;
        self.edit(|m| {
            m.settings.full_range = false;
            m.settings.range_min = value;
            m.derive_bins();
        });
        Ok(())
    }

    /// Sets the upper range bound and leaves full-range mode.
    pub fn specify_range_max(&mut self, value: f64) -> HistogramResult<()> {
        self.check_range_max(value)?;
        self.edit(|m| {
            m.settings.full_range = false;
            m.settings.range_max = value;
            m.derive_bins();
        });
        Ok(())
    }

    /// Switches full-range mode; entering it resets the range to the data.
    pub fn specify_full_range(&mut self, full_range: bool) {
        self.edit(|m| {
            m.settings.full_range = full_range;
            m.apply_full_range();
            m.derive_bins();
        });
    }

    /// Changes the binning method and re-derives the bins.
    ///
    /// Switching to manual keeps the current binning.
    pub fn specify_binning_method(&mut self, method: BinningMethod) {
        self.edit(|m| {
            let previous = m.settings.binning_method;
            if method == BinningMethod::Manual && previous != BinningMethod::Manual {
                m.sync_shadows();
                m.settings.last_specified = if previous.prescribes_width() {
                    SpecifiedBinParameter::Width
                } else {
                    SpecifiedBinParameter::Count
                };
            }
            m.settings.binning_method = method;
            m.apply_full_range();
            m.derive_bins();
        });
    }

    /// Sets the fraction of smallest values to drop.
    pub fn specify_trim_smallest(&mut self, fraction: f64) -> HistogramResult<()> {
        check_fraction("trim smallest", fraction)?;
        if fraction == self.settings.trim_smallest {
            return Ok(());
        }
        self.edit(|m| {
            m.settings.trim_smallest = fraction;
            m.retrim();
        });
        Ok(())
    }

    /// Sets the fraction of largest values to drop.
    pub fn specify_trim_largest(&mut self, fraction: f64) -> HistogramResult<()> {
        check_fraction("trim largest", fraction)?;
        if fraction == self.settings.trim_largest {
            return Ok(());
        }
        self.edit(|m| {
            m.settings.trim_largest = fraction;
            m.retrim();
        });
        Ok(())
    }

    fn retrim(&mut self) {
        self.refresh_trimmed();
        self.apply_full_range();
        self.derive_bins();
        debug!(
            retained = self.data_to_plot.len(),
            of = self.sample.len(),
            "Trimmed sample"
        );
    }

    /// Sets the histogram type; must be one of [`Self::allowed_histogram_types`].
    pub fn specify_histogram_type(&mut self, histogram_type: HistogramType) -> HistogramResult<()> {
        if !self.allowed_histogram_types().contains(&histogram_type) {
            return Err(HistogramError::InvalidArgument(format!(
                "{histogram_type:?} histogram needs positive values"
            )));
        }
        self.edit(|m| {
            m.settings.histogram_type = histogram_type;
        });
        Ok(())
    }

    /// Sets ordinary or cumulative counting.
    pub fn specify_distribution_type(&mut self, distribution_type: DistributionType) {
        self.edit(|m| {
            m.settings.distribution_type = distribution_type;
        });
    }

    /// Sets the fit family; must be one of [`Self::allowed_fit_types`].
    pub fn specify_fit_type(&mut self, fit_type: FitType) -> HistogramResult<()> {
        if !self.allowed_fit_types().contains(&fit_type) {
            return Err(HistogramError::InvalidArgument(format!("{fit_type:?} fit needs positive values")));
        }
        self.edit(|m| {
            if m.settings.fit_type != fit_type {
                m.fit = OnceCell::new();
            }
            m.settings.fit_type = fit_type;
        });
        Ok(())
    }

    /// Switches the fit overlay on or off.
    pub fn specify_fitted(&mut self, fitted: bool) {
        self.edit(|m| {
            m.settings.fitted = fitted;
        });
    }

    // ---- programmatic edits ----

    /// Sets the bin width and the matching count without changing method
    /// or range mode.
    pub fn set_bin_width(&mut self, width: f64) -> HistogramResult<()> {
        check_positive("bin width", width)?;
        self.edit(|m| {
            m.settings.last_specified = SpecifiedBinParameter::Width;
            m.settings.last_specified_width = width;
            m.apply_width(width);
        });
        Ok(())
    }

    /// Sets the bin count and the matching width without changing method
    /// or range mode.
    pub fn set_bin_count(&mut self, count: f64) -> HistogramResult<()> {
        check_positive("bin count", count)?;
        self.edit(|m| {
            m.settings.last_specified = SpecifiedBinParameter::Count;
            m.settings.last_specified_count = count;
            m.apply_count(count);
        });
        Ok(())
    }

    /// Sets the lower range bound, keeping the full-range flag.
    pub fn set_range_min(&mut self, value: f64) -> HistogramResult<()> {
        self.check_range_min(value)?;
        self.edit(|m| {
            m.settings.range_min = value;
            m.derive_bins();
        });
        Ok(())
    }

    /// Sets the upper range bound, keeping the full-range flag.
    pub fn set_range_max(&mut self, value: f64) -> HistogramResult<()> {
        self.check_range_max(value)?;
        self.edit(|m| {
            m.settings.range_max = value;
            m.derive_bins();
        });
        Ok(())
    }

    // ---- undo ----

    /// Remembers the current settings for [`Self::undo`].
    pub fn set_undo_point(&mut self) {
        self.undo_point = Some(self.settings.clone());
    }

    /// Restores the settings saved by [`Self::set_undo_point`].
    ///
    /// Returns `false` when no undo point exists.
    pub fn undo(&mut self) -> bool {
        let Some(saved) = self.undo_point.clone() else {
            return false;
        };
        self.edit(|m| {
            m.settings = saved;
            m.refresh_trimmed();
        });
        true
    }

    // ---- accessors ----

    /// Sample name.
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// All finite values, ascending.
    pub fn sample(&self) -> &[f64] {
        &self.sample
    }

    /// Values left after trimming, ascending.
    pub fn data_to_plot(&self) -> &[f64] {
        &self.data_to_plot
    }

    /// Number of values left after trimming.
    pub fn retained_count(&self) -> usize {
        self.data_to_plot.len()
    }

    /// Smallest retained value.
    pub fn data_min(&self) -> f64 {
        self.data_to_plot.first().copied().unwrap_or(f64::NAN)
    }

    /// Largest retained value.
    pub fn data_max(&self) -> f64 {
        self.data_to_plot.last().copied().unwrap_or(f64::NAN)
    }

    /// Current bin count; may be fractional for manual widths.
    pub fn bin_count(&self) -> f64 {
        self.settings.bin_count
    }

    /// Current bin width.
    pub fn bin_width(&self) -> f64 {
        self.settings.bin_width
    }

    /// Lower range bound.
    pub fn range_min(&self) -> f64 {
        self.settings.range_min
    }

    /// Upper range bound.
    pub fn range_max(&self) -> f64 {
        self.settings.range_max
    }

    /// `range_max - range_min`.
    pub fn range_length(&self) -> f64 {
        self.settings.range_max - self.settings.range_min
    }

    /// Whether the range is long enough to hold more than one bin.
    pub fn is_range_extensive(&self) -> bool {
        self.range_length() > MINIMAL_EXTENSIVE_RANGE_LENGTH
    }

    /// Active binning method.
    pub fn binning_method(&self) -> BinningMethod {
        self.settings.binning_method
    }

    /// Width or count, whichever was entered last.
    pub fn last_specified(&self) -> SpecifiedBinParameter {
        self.settings.last_specified
    }

    /// Histogram type.
    pub fn histogram_type(&self) -> HistogramType {
        self.settings.histogram_type
    }

    /// Distribution type.
    pub fn distribution_type(&self) -> DistributionType {
        self.settings.distribution_type
    }

    /// Fit family.
    pub fn fit_type(&self) -> FitType {
        self.settings.fit_type
    }

    /// Whether the fit overlay is shown.
    pub fn is_fitted(&self) -> bool {
        self.settings.fitted
    }

    /// Whether the range follows the retained data.
    pub fn is_full_range(&self) -> bool {
        self.settings.full_range
    }

    /// Fraction of smallest values dropped.
    pub fn trim_smallest(&self) -> f64 {
        self.settings.trim_smallest
    }

    /// Fraction of largest values dropped.
    pub fn trim_largest(&self) -> f64 {
        self.settings.trim_largest
    }

    /// Whether the retained data has values `<= 0`.
    pub fn contains_non_positive_values(&self) -> bool {
        self.data_to_plot.first().is_some_and(|&v| v <= 0.0)
    }

    /// Fit families usable with the retained data.
    pub fn allowed_fit_types(&self) -> Vec<FitType> {
        let non_positive = self.contains_non_positive_values();
        FitType::ALL
            .into_iter()
            .filter(|t| !(non_positive && t.requires_positive_values()))
            .collect()
    }

    /// Histogram types usable with the retained data.
    pub fn allowed_histogram_types(&self) -> Vec<HistogramType> {
        let non_positive = self.contains_non_positive_values();
        HistogramType::ALL
            .into_iter()
            .filter(|t| !(non_positive && t.requires_positive_values()))
            .collect()
    }

    /// Whether a histogram can be built: a name, a width, a count and a
    /// range are all present.
    pub fn input_provided(&self) -> bool {
        let s = &self.settings;
        !s.name.is_empty() && !s.bin_width.is_nan() && !s.bin_count.is_nan() && !self.range_length().is_nan()
    }

    fn require_input(&self, what: &str) -> HistogramResult<()> {
        if self.input_provided() {
            Ok(())
        } else {
            Err(HistogramError::IllegalState(format!("{what} requested before input is provided")))
        }
    }

    // ---- outputs ----

    /// Bins the retained data with the current settings.
    pub fn histogram_dataset(&self) -> HistogramResult<HistogramDataset> {
        self.require_input("histogram")?;
        let s = &self.settings;
        Ok(HistogramDataset::build(
            &self.data_to_plot,
            s.range_min,
            s.range_max,
            s.bin_count,
            s.bin_width,
            s.histogram_type,
            s.distribution_type,
        ))
    }

    /// Distribution of the configured family fitted to the retained data.
    ///
    /// Computed on first request and cached until the data or family change.
    pub fn fitted_distribution(&self) -> HistogramResult<FittedDistribution> {
        self.require_input("fitted distribution")?;
        if let Some(fit) = self.fit.get() {
            return Ok(*fit);
        }
        let fit = FittedDistribution::fit(self.settings.fit_type, &self.data_to_plot)?;
        Ok(*self.fit.get_or_init(|| fit))
    }

    /// Fit overlay over the current range, scaled to the histogram type.
    pub fn fit_curve(&self) -> HistogramResult<Vec<(f64, f64)>> {
        let fit = self.fitted_distribution()?;
        let s = &self.settings;
        Ok(fit.curve(
            s.range_min,
            s.range_max,
            s.histogram_type,
            s.distribution_type,
            self.data_to_plot.len(),
            s.bin_width,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ten() -> HistogramSampleModel {
        let sample: Vec<f64> = (1..=10).map(f64::from).collect();
        HistogramSampleModel::new("height", &sample).unwrap()
    }

    fn recorder(model: &mut HistogramSampleModel) -> Rc<RefCell<Vec<HistogramModelEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        model.add_listener(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    #[test]
    fn test_defaults() {
        let m = ten();
        assert_eq!(m.binning_method(), BinningMethod::Sturges);
        assert_eq!(m.histogram_type(), HistogramType::Count);
        assert_eq!(m.distribution_type(), DistributionType::Ordinary);
        assert_eq!(m.fit_type(), FitType::Normal);
        assert!(!m.is_fitted());
        assert!(m.is_full_range());
        assert_eq!((m.range_min(), m.range_max()), (1.0, 10.0));
        assert_eq!(m.bin_count(), 5.0);
        assert_relative_eq!(m.bin_width(), 1.8);
        assert!(m.input_provided());
    }

    #[test]
    fn test_empty_or_nan_sample_rejected() {
        assert!(matches!(
            HistogramSampleModel::new("x", &[]),
            Err(HistogramError::InvalidArgument(_))
        ));
        assert!(HistogramSampleModel::new("x", &[f64::NAN]).is_err());
        let m = HistogramSampleModel::new("x", &[f64::NAN, 2.0, 1.0]).unwrap();
        assert_eq!(m.sample(), &[1.0, 2.0]);
    }

    #[test]
    fn test_manual_count_scenario() {
        let mut m = ten();
        m.specify_binning_method(BinningMethod::Manual);
        m.specify_bin_count(5.0).unwrap();
        assert_eq!((m.range_min(), m.range_max()), (1.0, 10.0));
        assert_relative_eq!(m.bin_width(), 1.8);
        let ds = m.histogram_dataset().unwrap();
        assert_eq!(ds.len(), 5);
        assert!(ds.bins().iter().all(|b| b.count == 2));
        assert_eq!(ds.bins()[4].upper, 10.0);
    }

    #[test]
    fn test_width_edit_nudges_range_max() {
        let mut m = ten();
        m.specify_bin_width(2.0).unwrap();
        assert_eq!(m.binning_method(), BinningMethod::Manual);
        assert_eq!(m.last_specified(), SpecifiedBinParameter::Width);
        // 9 / 2 = 4.5 bins -> 5 bins, range grows by one half bin
        assert_eq!(m.bin_count(), 5.0);
        assert_relative_eq!(m.range_max(), 11.0);
        let ds = m.histogram_dataset().unwrap();
        assert_eq!(ds.bins()[4].upper, m.range_max());
        assert_eq!(ds.total(), 10);
    }

    #[test]
    fn test_manual_keeps_last_specified_on_range_edit() {
        let mut m = ten();
        m.specify_bin_count(3.0).unwrap();
        m.specify_range_min(4.0).unwrap();
        assert!(!m.is_full_range());
        assert_eq!(m.bin_count(), 3.0);
        assert_relative_eq!(m.bin_width(), 2.0);

        m.specify_bin_width(1.0).unwrap();
        m.specify_range_max(8.0).unwrap();
        assert_eq!(m.bin_width(), 1.0);
        assert_eq!(m.bin_count(), 4.0);
        assert!(m.specify_range_max(1.0).is_err());
    }

    #[test]
    fn test_programmatic_range_edit_keeps_order() {
        let mut m = ten();
        let events = recorder(&mut m);
        assert!(matches!(m.set_range_max(0.0), Err(HistogramError::InvalidArgument(_))));
        assert!(matches!(m.set_range_min(11.0), Err(HistogramError::InvalidArgument(_))));
        assert!(events.borrow().is_empty());
        assert_eq!((m.range_min(), m.range_max()), (1.0, 10.0));
        assert!(m.bin_width() > 0.0);

        m.set_range_max(6.0).unwrap();
        m.set_range_min(2.0).unwrap();
        assert!(m.is_full_range());
        let ds = m.histogram_dataset().unwrap();
        assert_eq!(ds.bins()[0].lower, 2.0);
        assert_eq!(ds.bins()[ds.len() - 1].upper, m.range_max());
        assert!(ds.bins().iter().all(|b| b.lower < b.upper));
    }

    #[test]
    fn test_binning_methods() {
        let sample: Vec<f64> = (1..=100).map(f64::from).collect();
        let mut m = HistogramSampleModel::new("x", &sample).unwrap();
        m.specify_binning_method(BinningMethod::SquareRoot);
        assert_eq!(m.bin_count(), 10.0);
        assert_relative_eq!(m.bin_width(), 9.9);

        m.specify_binning_method(BinningMethod::FreedmanDiaconis);
        let iqr = stats::interquartile_range(&sample);
        assert_relative_eq!(m.bin_width(), 2.0 * iqr / 100f64.cbrt());
        assert_eq!(m.bin_count(), m.bin_count().ceil());

        let (count, width) = (m.bin_count(), m.bin_width());
        m.specify_binning_method(BinningMethod::Manual);
        assert_eq!(m.last_specified(), SpecifiedBinParameter::Width);
        assert_eq!(m.bin_count(), count);
        assert_relative_eq!(m.bin_width(), width);
    }

    #[test]
    fn test_degenerate_range_single_bin() {
        let mut m = HistogramSampleModel::new("x", &[3.0, 3.0, 3.0]).unwrap();
        assert!(!m.is_range_extensive());
        assert_eq!(m.bin_count(), 1.0);
        m.specify_binning_method(BinningMethod::Scotts);
        assert_eq!(m.bin_count(), 1.0);
        let ds = m.histogram_dataset().unwrap();
        assert_eq!(ds.bins()[0].count, 3);
    }

    #[test]
    fn test_trimming() {
        let mut m = ten();
        m.specify_trim_smallest(0.2).unwrap();
        m.specify_trim_largest(0.1).unwrap();
        assert_eq!(m.data_to_plot(), &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!((m.range_min(), m.range_max()), (3.0, 9.0));
        assert!(m.specify_trim_smallest(1.5).is_err());
        assert!(m.specify_trim_largest(-0.1).is_err());

        m.specify_trim_smallest(0.6).unwrap();
        m.specify_trim_largest(0.5).unwrap();
        assert!(m.data_to_plot().is_empty());
        assert!(!m.input_provided());
        assert!(matches!(m.histogram_dataset(), Err(HistogramError::IllegalState(_))));
        assert!(matches!(m.fitted_distribution(), Err(HistogramError::IllegalState(_))));
    }

    #[test]
    fn test_same_trim_twice_emits_nothing() {
        let mut m = ten();
        let events = recorder(&mut m);
        m.specify_trim_smallest(0.1).unwrap();
        let first = events.borrow().len();
        assert!(first > 0);
        assert!(events.borrow().contains(&HistogramModelEvent::TrimSmallestChanged { old: 0.0, new: 0.1 }));
        m.specify_trim_smallest(0.1).unwrap();
        assert_eq!(events.borrow().len(), first);
    }

    #[test]
    fn test_non_positive_values_restrict_types() {
        let mut m = HistogramSampleModel::new("x", &[-1.0, 1.0, 2.0, 3.0]).unwrap();
        assert!(m.contains_non_positive_values());
        assert!(!m.allowed_fit_types().contains(&FitType::LogNormal));
        assert!(!m.allowed_histogram_types().contains(&HistogramType::ProbabilityDensity));
        assert!(m.specify_fit_type(FitType::LogNormal).is_err());

        let events = recorder(&mut m);
        m.specify_trim_smallest(0.25).unwrap();
        assert!(!m.contains_non_positive_values());
        assert!(events.borrow().contains(&HistogramModelEvent::NonPositiveValuesChanged(false)));
        m.specify_fit_type(FitType::LogNormal).unwrap();
        m.specify_histogram_type(HistogramType::ProbabilityDensity).unwrap();

        // trimming back in the negative value resets both selections
        m.specify_trim_smallest(0.0).unwrap();
        assert_eq!(m.fit_type(), FitType::Normal);
        assert_eq!(m.histogram_type(), HistogramType::Count);
    }

    #[test]
    fn test_undo_restores_settings() {
        let mut m = ten();
        m.set_undo_point();
        m.specify_bin_width(2.0).unwrap();
        m.specify_trim_largest(0.2).unwrap();
        let events = recorder(&mut m);
        assert!(m.undo());
        assert_eq!(m.binning_method(), BinningMethod::Sturges);
        assert_eq!(m.range_max(), 10.0);
        assert_eq!(m.data_to_plot().len(), 10);
        assert!(
            events
                .borrow()
                .contains(&HistogramModelEvent::BinningMethodChanged { old: BinningMethod::Manual, new: BinningMethod::Sturges })
        );
        assert!(!HistogramSampleModel::new("x", &[1.0]).unwrap().undo());
    }

    #[test]
    fn test_listener_removal_and_name() {
        let mut m = ten();
        let events = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&events);
        let id = m.add_listener(move |_| *sink.borrow_mut() += 1);
        m.specify_fitted(true);
        assert_eq!(*events.borrow(), 1);
        assert!(m.remove_listener(id));
        assert!(!m.remove_listener(id));
        m.specify_fitted(false);
        assert_eq!(*events.borrow(), 1);

        let log = recorder(&mut m);
        m.specify_name("");
        assert!(!m.input_provided());
        assert!(log.borrow().contains(&HistogramModelEvent::InputProvidedChanged(false)));
    }

    #[test]
    fn test_set_keeps_method() {
        let mut m = ten();
        m.set_bin_count(3.0).unwrap();
        assert_eq!(m.binning_method(), BinningMethod::Sturges);
        assert_relative_eq!(m.bin_width(), 3.0);
        m.set_range_max(12.0).unwrap();
        assert!(m.is_full_range());
        assert_eq!(m.bin_count(), 5.0);
    }

    #[test]
    fn test_fit_curve_cached_and_scaled() {
        let mut m = ten();
        m.specify_fitted(true);
        let first = m.fitted_distribution().unwrap();
        assert_eq!(m.fitted_distribution().unwrap(), first);
        let curve = m.fit_curve().unwrap();
        assert_eq!(curve.len(), crate::fit::FIT_CURVE_POINTS);
        assert_relative_eq!(curve[0].1, first.density(1.0) * 10.0 * 1.8, epsilon = 1e-12);

        m.specify_fit_type(FitType::Laplace).unwrap();
        assert_eq!(m.fitted_distribution().unwrap().fit_type(), FitType::Laplace);
    }
}
