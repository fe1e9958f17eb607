//! Tracker benchmarks using Criterion.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};

use imcmc_track::io::{Region, RegionSchedule};
use imcmc_track::sampler::ExecutionStrategy;
use imcmc_track::{DiffusionDistance, SamplerConfig, Tracker};

fn pattern(len: usize, modulus: usize, mult: usize) -> Vec<f64> {
    (0..len).map(|i| ((i * mult) % modulus) as f64 / modulus as f64).collect()
}

fn square_frame() -> RgbImage {
    RgbImage::from_fn(160, 120, |x, y| {
        if (60..100).contains(&x) && (30..90).contains(&y) {
            Rgb([230, 60, 40])
        } else {
            Rgb([20, 20, 20])
        }
    })
}

fn tracker_with(execution: ExecutionStrategy) -> Tracker {
    let config = SamplerConfig {
        iterations: 50,
        execution,
        ..SamplerConfig::default()
    };
    let region = Region {
        center_x: 80.0,
        center_y: 60.0,
        width: 40.0,
        height: 60.0,
        angle_degrees: 0.0,
        frame_index: 0,
    };
    Tracker::new(config, RegionSchedule::new(vec![region])).expect("valid tracker")
}

/// Diffusion distance on a canonical 20x60 template.
fn benchmark_diffusion_distance_2d(c: &mut Criterion) {
    let a = pattern(20 * 60, 7, 1);
    let b = pattern(20 * 60, 11, 3);
    let mut dd = DiffusionDistance::new();

    c.bench_function("diffusion_distance_20x60", |bench| {
        bench.iter(|| dd.dd2d(black_box(&a), black_box(&b), 60, 20).expect("matching sizes"))
    });
}

/// Diffusion distance on a 16x16x16 histogram.
fn benchmark_diffusion_distance_3d(c: &mut Criterion) {
    let a = pattern(16 * 16 * 16, 13, 1);
    let b = pattern(16 * 16 * 16, 5, 7);
    let mut dd = DiffusionDistance::new();

    c.bench_function("diffusion_distance_16x16x16", |bench| {
        bench.iter(|| dd.dd3d(black_box(&a), black_box(&b), 16, 16, 16).expect("matching sizes"))
    });
}

fn benchmark_tracker_frame_sequential(c: &mut Criterion) {
    let frame = square_frame();
    let mut tracker = tracker_with(ExecutionStrategy::Sequential);
    tracker.process_frame(&frame).expect("first frame");

    c.bench_function("tracker_frame_sequential", |b| {
        b.iter(|| tracker.process_frame(black_box(&frame)).expect("frame"))
    });
}

fn benchmark_tracker_frame_parallel(c: &mut Criterion) {
    let frame = square_frame();
    let mut tracker = tracker_with(ExecutionStrategy::Parallel);
    tracker.process_frame(&frame).expect("first frame");

    c.bench_function("tracker_frame_parallel", |b| {
        b.iter(|| tracker.process_frame(black_box(&frame)).expect("frame"))
    });
}

criterion_group!(
    benches,
    benchmark_diffusion_distance_2d,
    benchmark_diffusion_distance_3d,
    benchmark_tracker_frame_sequential,
    benchmark_tracker_frame_parallel,
);
criterion_main!(benches);
