//! Benchmarks for the overlay, classification and zonal reporting

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use postfire_algorithms::classification::{classify, ThresholdLadder};
use postfire_algorithms::overlay::weighted_overlay;
use postfire_algorithms::statistics::{area_in_ranges, class_statistics, AreaRange};
use postfire_core::{GeoTransform, Raster, Region};

fn create_layer(size: usize, seed: usize) -> Raster<f64> {
    let mut r = Raster::new(size, size);
    r.set_transform(GeoTransform::new(0.0, size as f64 * 10.0, 10.0, -10.0));
    for row in 0..size {
        for col in 0..size {
            let v = ((row * 7 + col * 13 + seed * 31) % 200) as f64 / 200.0;
            r.set(row, col, v).unwrap();
        }
    }
    r
}

fn bench_overlay(c: &mut Criterion) {
    let mut group = c.benchmark_group("mce/overlay");
    for size in [256, 512, 1024, 2048] {
        let layers: Vec<_> = (0..5).map(|i| create_layer(size, i)).collect();
        let weights = [0.164, 0.267, 0.072, 0.408, 0.089];
        let inputs: Vec<_> = layers.iter().zip(weights).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| weighted_overlay(black_box(&inputs)).unwrap())
        });
    }
    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("mce/classify");
    let ladder = ThresholdLadder::new(vec![0.1, 0.3, 0.4, 0.6]).unwrap();
    for size in [256, 512, 1024, 2048] {
        let layer = create_layer(size, 0);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| classify(black_box(&layer), &ladder).unwrap())
        });
    }
    group.finish();
}

fn bench_zonal(c: &mut Criterion) {
    let mut group = c.benchmark_group("mce/zonal");
    let ladder = ThresholdLadder::new(vec![0.1, 0.3, 0.4, 0.6]).unwrap();
    let ranges = [
        AreaRange::new(-1.0, 0.1, "very low"),
        AreaRange::new(0.1, 0.3, "low"),
        AreaRange::new(0.3, 0.4, "moderate"),
        AreaRange::new(0.4, 0.6, "high"),
        AreaRange::new(0.6, 1.5, "very high"),
    ];
    for size in [256, 512, 1024] {
        let layer = create_layer(size, 0);
        let classes = classify(&layer, &ladder).unwrap();
        group.bench_with_input(BenchmarkId::new("class_statistics", size), &size, |b, _| {
            b.iter(|| class_statistics(black_box(&classes), &Region::Full, 10.0, &ladder).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("area_in_ranges", size), &size, |b, _| {
            b.iter(|| area_in_ranges(black_box(&layer), &Region::Full, 10.0, &ranges).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_overlay, bench_classify, bench_zonal);
criterion_main!(benches);
