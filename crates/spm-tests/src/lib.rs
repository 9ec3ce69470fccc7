//! Integration tests for spm-rs crates.
//!
//! This crate contains end-to-end tests that check behaviour spanning
//! several spm-rs crates: convolution strategies against each other, ROI
//! restricted transforms against whole-image ones, geometric round trips
//! and the histogram model against its bins.

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use spm_core::{Channel2D, Grid2D, GridChannel2DData, Quantity, Roi, RoiPosition};
    use spm_hist::{BinningMethod, DistributionType, HistogramModelEvent, HistogramSampleModel, HistogramType};
    use spm_ops::arithmetic::{ConstantOperation, Negate};
    use spm_ops::convolve::{Convolution, SequenceConvolution, SimpleConvolution};
    use spm_ops::filters::{FilterTransformation, MedianFilter};
    use spm_ops::fix_minimum::FixMinimum;
    use spm_ops::flood_fill::FloodFill;
    use spm_ops::geometry::{FlipHorizontally, FlipVertically, Rotate, RotateClockwise, RotateCounterClockwise, Transpose};
    use spm_ops::{
        Channel2DTransform, ConcurrencyConfig, GridTransform, Kernel2D, KernelTransformation, LineFitCorrection,
    };
    use std::cell::RefCell;
    use std::rc::Rc;

    fn channel(rows: usize, cols: usize, values: Vec<f64>) -> GridChannel2DData {
        let grid = Grid2D::new(rows, cols, -0.3, 1.2, 0.25, 0.5).unwrap();
        GridChannel2DData::new(grid, values, Quantity::height()).unwrap()
    }

    /// Image dimensions with matching values.
    fn image() -> impl Strategy<Value = (usize, usize, Vec<f64>)> {
        (1usize..12, 1usize..12).prop_flat_map(|(rows, cols)| {
            (Just(rows), Just(cols), prop::collection::vec(-50.0f64..50.0, rows * cols))
        })
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    /// Per-cell union of the INSIDE and OUTSIDE results, split along the
    /// cells `selection` marks as inside.
    fn combine(t: &dyn GridTransform, ch: &GridChannel2DData, roi: &Roi, selection: &Roi) -> Vec<f64> {
        let inside = t.transform_grid_in_roi(ch, roi, RoiPosition::Inside).unwrap();
        let outside = t.transform_grid_in_roi(ch, roi, RoiPosition::Outside).unwrap();
        let mask = selection.mask(ch.grid(), RoiPosition::Inside);
        mask.cells()
            .iter()
            .zip(inside.values().iter().zip(outside.values()))
            .map(|(&set, (&i, &o))| if set { i } else { o })
            .collect()
    }

    proptest! {
        #[test]
        fn separable_matches_direct_convolution(
            (rows, cols, values) in image(),
            u in prop::collection::vec(0.1f64..2.0, 2..4),
            v in prop::collection::vec(0.1f64..2.0, 2..4),
        ) {
            // odd-length factors
            let u: Vec<f64> = u.iter().chain(u.iter().skip(1)).copied().collect();
            let v: Vec<f64> = v.iter().chain(v.iter().skip(1)).copied().collect();
            let data: Vec<f64> = u.iter().flat_map(|a| v.iter().map(move |b| a * b)).collect();
            let kernel = Kernel2D::from_row_major(u.len(), v.len(), data).unwrap();
            let separation = kernel.separable_filters().unwrap();

            let direct = SimpleConvolution::new(kernel).convolve(&values, rows, cols).unwrap();
            let two_pass = SequenceConvolution::new(separation).convolve(&values, rows, cols).unwrap();
            for (a, b) in direct.iter().zip(&two_pass) {
                prop_assert!(close(*a, *b), "{} vs {}", a, b);
            }
        }

        #[test]
        fn border_reads_clamped_coordinates(
            (rows, cols, values) in image(),
            weights in prop::collection::vec(-1.0f64..1.0, 15),
        ) {
            let kernel = Kernel2D::from_row_major(3, 5, weights.clone()).unwrap();
            let out = SimpleConvolution::new(kernel).convolve(&values, rows, cols).unwrap();
            for row in 0..rows {
                for col in 0..cols {
                    let mut expected = 0.0;
                    for a in 0..3 {
                        for b in 0..5 {
                            let sr = (row as isize + 1 - a as isize).clamp(0, rows as isize - 1) as usize;
                            let sc = (col as isize + 2 - b as isize).clamp(0, cols as isize - 1) as usize;
                            expected += weights[a * 5 + b] * values[sr * cols + sc];
                        }
                    }
                    prop_assert!(close(out[row * cols + col], expected));
                }
            }
        }

        #[test]
        fn geometric_round_trips((rows, cols, values) in image()) {
            let x = channel(rows, cols, values);

            let flipped = FlipHorizontally.transform_grid(&x).unwrap();
            prop_assert_eq!(&FlipHorizontally.transform_grid(&flipped).unwrap(), &x);
            let flipped = FlipVertically.transform_grid(&x).unwrap();
            prop_assert_eq!(&FlipVertically.transform_grid(&flipped).unwrap(), &x);
            let transposed = Transpose.transform_grid(&x).unwrap();
            prop_assert_eq!(&Transpose.transform_grid(&transposed).unwrap(), &x);

            let turned = RotateCounterClockwise.transform_grid(&x).unwrap();
            let back = RotateClockwise.transform_grid(&turned).unwrap();
            prop_assert_eq!(back.row_count(), rows);
            prop_assert_eq!(back.column_count(), cols);
            prop_assert_eq!(back.values(), x.values());
            prop_assert!(close(back.grid().origin_x(), x.grid().origin_x()));
            prop_assert!(close(back.grid().origin_y(), x.grid().origin_y()));
        }

        #[test]
        fn roi_inside_and_outside_make_everything(
            (rows, cols, values) in image(),
            x0 in -0.5f64..3.0,
            y0 in 1.0f64..7.0,
            w in 0.0f64..3.0,
            h in 0.0f64..5.0,
        ) {
            let ch = channel(rows, cols, values);
            let roi = Roi::rectangle(x0, y0, x0 + w, y0 + h);
            let split_rows = ConcurrencyConfig { max_task_count: 3, min_rows_per_task: 2 };
            let transforms: Vec<Box<dyn GridTransform>> = vec![
                Box::new(ConstantOperation::add(2.5)),
                Box::new(ConstantOperation::multiply(-0.5)),
                Box::new(Negate),
                Box::new(FlipHorizontally),
                Box::new(FlipVertically),
                Box::new(KernelTransformation::new(Kernel2D::gaussian(1.0, 0.7, 1).unwrap())),
                Box::new(FilterTransformation::new(MedianFilter::new(1))),
                Box::new(FilterTransformation::with_concurrency(MedianFilter::new(1), split_rows)),
            ];
            for t in &transforms {
                let everything = t.transform_grid_in_roi(&ch, &roi, RoiPosition::Everything).unwrap();
                let combined = combine(t.as_ref(), &ch, &roi, &roi);
                for (a, b) in combined.iter().zip(everything.values()) {
                    prop_assert!(close(*a, *b));
                }
            }

            // rotation selects cells by their pre-image: the ROI turned forward
            let rotate = Rotate::degrees(30.0);
            let (cx, cy) = ch.grid().center();
            let selection = roi.rotated_copy(-rotate.angle, cx, cy);
            let everything = rotate.transform_grid(&ch).unwrap();
            let combined = combine(&rotate, &ch, &roi, &selection);
            for (a, b) in combined.iter().zip(everything.values()) {
                prop_assert!(close(*a, *b));
            }
        }

        // The minimum fix and line corrections derive one parameter from the
        // selected points (the minimum, the line fits) and so do not split
        // into INSIDE and OUTSIDE halves. Their ROI contracts are checked on
        // their own.

        #[test]
        fn roi_minimum_fix_touches_selection_only(
            (rows, cols, values) in image(),
            x0 in -0.5f64..3.0,
            y0 in 1.0f64..7.0,
            w in 0.0f64..3.0,
            h in 0.0f64..5.0,
            target in -10.0f64..10.0,
        ) {
            let ch = channel(rows, cols, values);
            let roi = Roi::rectangle(x0, y0, x0 + w, y0 + h);
            let mask = roi.mask(ch.grid(), RoiPosition::Inside);
            let out = FixMinimum::new(target, false)
                .transform_grid_in_roi(&ch, &roi, RoiPosition::Inside)
                .unwrap();
            let mut selected_min = f64::INFINITY;
            for (i, &set) in mask.cells().iter().enumerate() {
                if set {
                    selected_min = selected_min.min(out.values()[i]);
                } else {
                    prop_assert_eq!(out.values()[i], ch.values()[i]);
                }
            }
            if mask.cells().iter().any(|&set| set) {
                prop_assert!(close(selected_min, target));
            }
        }

        #[test]
        fn line_fit_over_covering_roi_matches_whole_channel((rows, cols, values) in image()) {
            let ch = channel(rows, cols, values);
            let grid = ch.grid();
            let cover = Roi::rectangle(grid.x(0) - 1.0, grid.y(0) - 1.0, grid.x_max() + 1.0, grid.y_max() + 1.0);
            let correction = LineFitCorrection::new(1);
            let whole = correction.transform_grid(&ch).unwrap();
            let inside = correction.transform_grid_in_roi(&ch, &cover, RoiPosition::Inside).unwrap();
            for (a, b) in inside.values().iter().zip(whole.values()) {
                prop_assert!(close(*a, *b));
            }
        }

        #[test]
        fn histogram_bins_tile_range(
            sample in prop::collection::vec(-100.0f64..100.0, 1..200),
            method in prop::sample::select(BinningMethod::ALL.to_vec()),
            trim_low in 0.0f64..0.3,
            trim_high in 0.0f64..0.3,
        ) {
            let mut model = HistogramSampleModel::new("sample", &sample).unwrap();
            model.specify_binning_method(method);
            model.specify_trim_smallest(trim_low).unwrap();
            model.specify_trim_largest(trim_high).unwrap();
            prop_assume!(model.input_provided());

            let ds = model.histogram_dataset().unwrap();
            prop_assert_eq!(ds.bins()[0].lower, model.range_min());
            prop_assert_eq!(ds.bins()[ds.len() - 1].upper, model.range_max());
            for pair in ds.bins().windows(2) {
                prop_assert_eq!(pair[0].upper, pair[1].lower);
                prop_assert!(pair[0].lower <= pair[0].upper);
            }
            // full range: every retained value lands in a bin
            let total: usize = ds.bins().iter().map(|b| b.count).sum();
            prop_assert_eq!(total, model.retained_count());
        }
    }

    #[test]
    fn test_count_conservation_after_manual_edits() {
        let sample: Vec<f64> = (0..57).map(|i| (i as f64 * 0.37).sin() * 4.0).collect();
        let mut model = HistogramSampleModel::new("sine", &sample).unwrap();
        model.specify_bin_width(0.3).unwrap();
        model.specify_trim_largest(0.1).unwrap();
        model.specify_distribution_type(DistributionType::Ordinary);
        assert_eq!(model.histogram_type(), HistogramType::Count);
        let ds = model.histogram_dataset().unwrap();
        assert_eq!(ds.bins().iter().map(|b| b.count).sum::<usize>(), model.retained_count());
    }

    #[test]
    fn test_same_trim_twice_is_silent() {
        let sample: Vec<f64> = (1..=40).map(f64::from).collect();
        let mut model = HistogramSampleModel::new("ramp", &sample).unwrap();
        let events = Rc::new(RefCell::new(Vec::<HistogramModelEvent>::new()));
        let sink = Rc::clone(&events);
        model.add_listener(move |e| sink.borrow_mut().push(e.clone()));

        model.specify_trim_smallest(0.05).unwrap();
        model.specify_trim_largest(0.1).unwrap();
        let count = events.borrow().len();
        model.specify_trim_smallest(0.05).unwrap();
        model.specify_trim_largest(0.1).unwrap();
        assert_eq!(events.borrow().len(), count);
    }

    #[test]
    fn test_manual_five_bins_of_ten_values() {
        let sample: Vec<f64> = (1..=10).map(f64::from).collect();
        let mut model = HistogramSampleModel::new("ten", &sample).unwrap();
        model.specify_binning_method(BinningMethod::Manual);
        model.specify_bin_count(5.0).unwrap();
        model.specify_full_range(true);

        assert_eq!(model.range_min(), 1.0);
        assert_eq!(model.range_max(), 10.0);
        assert_relative_eq!(model.bin_width(), 1.8);
        let ds = model.histogram_dataset().unwrap();
        assert_eq!(ds.len(), 5);
        assert!(ds.bins().iter().all(|b| b.count == 2));
        assert_eq!(ds.bins()[4].upper, 10.0);
    }

    #[test]
    fn test_flood_fill_uniform_grid() {
        let grid = Grid2D::new(3, 3, 0.0, 0.0, 1.0, 1.0).unwrap();
        let ch = GridChannel2DData::filled(grid, 0.0, Quantity::height());
        let filled = FloodFill::new(1.0, 1.0, 9.0).transform_grid(&ch).unwrap();
        assert_eq!(filled.values(), &[9.0; 9]);
    }

    #[test]
    fn test_fix_minimum_example() {
        let grid = Grid2D::new(2, 2, 0.0, 0.0, 1.0, 1.0).unwrap();
        let ch = GridChannel2DData::from_matrix(grid, vec![vec![5.0, 3.0], vec![7.0, 2.0]], Quantity::height()).unwrap();
        let op = FixMinimum::new(0.0, true);
        let fixed = op.transform_grid(&ch).unwrap();
        assert_eq!(fixed.data_copy(), vec![vec![3.0, 1.0], vec![5.0, 0.0]]);
        assert_eq!(op.transform_grid(&fixed).unwrap(), fixed);

        // same result through the representation-dispatching entry point
        let via_channel = op.transform(&Channel2D::from(ch)).unwrap();
        assert_eq!(via_channel.as_grid(), Some(&fixed));
    }
}
