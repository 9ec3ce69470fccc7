//! Benchmarks for spm-rs operations.
//!
//! Run with: `cargo bench`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use spm_core::{Grid2D, GridChannel2DData, Quantity};
use spm_hist::{BinningMethod, HistogramSampleModel};
use spm_ops::concurrent::{ConcurrencyConfig, ConcurrentFilter};
use spm_ops::convolve::{Convolution, SequenceConvolution, SimpleConvolution};
use spm_ops::filters::{ConvolutionFilter, MedianFilter};
use spm_ops::flood_fill::FloodFill;
use spm_ops::{GridTransform, Kernel2D, LineFitCorrection};

fn image(size: usize) -> Vec<f64> {
    (0..size * size).map(|i| ((i * 7919) % 1009) as f64 * 0.01).collect()
}

/// Direct, two-pass and concurrent convolution with the same gaussian.
fn bench_convolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("convolution");

    for radius in [1usize, 3, 5] {
        let kernel = Kernel2D::gaussian(radius as f64, radius as f64, radius).unwrap();
        let direct = SimpleConvolution::new(kernel.clone());
        let two_pass = SequenceConvolution::new(kernel.separable_filters().unwrap());
        let concurrent = ConcurrentFilter::new(ConcurrencyConfig::default());
        let per_cell = ConvolutionFilter::new(kernel);

        let size = 256;
        let src = image(size);
        group.throughput(Throughput::Elements((size * size) as u64));

        group.bench_with_input(BenchmarkId::new("direct", radius), &src, |b, s| {
            b.iter(|| direct.convolve(black_box(s), size, size).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("separable", radius), &src, |b, s| {
            b.iter(|| two_pass.convolve(black_box(s), size, size).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("concurrent", radius), &src, |b, s| {
            b.iter(|| concurrent.apply(&per_cell, black_box(s), size, size).unwrap())
        });
    }

    group.finish();
}

/// Median filter, sequential against pooled.
fn bench_median(c: &mut Criterion) {
    let mut group = c.benchmark_group("median");
    let size = 128;
    let src = image(size);

    for tasks in [1usize, 4] {
        let runner = ConcurrentFilter::new(ConcurrencyConfig::with_max_task_count(tasks));
        group.bench_with_input(BenchmarkId::new("tasks", tasks), &src, |b, s| {
            b.iter(|| runner.apply(&MedianFilter::new(2), black_box(s), size, size).unwrap())
        });
    }

    group.finish();
}

/// Region growing and line fitting on a whole image.
fn bench_transforms(c: &mut Criterion) {
    let size = 256;
    let grid = Grid2D::new(size, size, 0.0, 0.0, 1.0, 1.0).unwrap();
    let flat = GridChannel2DData::filled(grid.clone(), 0.0, Quantity::height());
    let textured = GridChannel2DData::new(grid, image(size), Quantity::height()).unwrap();

    c.bench_function("flood_fill_256", |b| {
        let fill = FloodFill::new(128.0, 128.0, 1.0);
        b.iter(|| fill.transform_grid(black_box(&flat)).unwrap())
    });
    c.bench_function("line_fit_256", |b| {
        let correction = LineFitCorrection::new(2);
        b.iter(|| correction.transform_grid(black_box(&textured)).unwrap())
    });
}

/// Re-binning after every method change.
fn bench_histogram(c: &mut Criterion) {
    let sample = image(100);
    c.bench_function("histogram_rebin_10k", |b| {
        let mut model = HistogramSampleModel::new("bench", &sample).unwrap();
        b.iter(|| {
            for method in BinningMethod::ALL {
                model.specify_binning_method(method);
                black_box(model.histogram_dataset().unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_convolution, bench_median, bench_transforms, bench_histogram);
criterion_main!(benches);
