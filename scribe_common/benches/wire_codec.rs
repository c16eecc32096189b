//! Wire codec benchmarks

use criterion::{Criterion, criterion_group, criterion_main};
use scribe_common::geom::{Point2D, TrajectoryPoint};
use scribe_common::wire::{REGION_LEN, decode_point, flags_of, stage_point};
use std::hint::black_box;

/// Benchmark staging a point into a region image
fn bench_stage_point(c: &mut Criterion) {
    let point = TrajectoryPoint::new(Point2D::new(491.3, 133.9), 50.0, 150);
    let mut buf = [0u8; REGION_LEN];

    c.bench_function("stage_point", |b| {
        b.iter(|| {
            stage_point(black_box(&mut buf), black_box(&point));
        });
    });
}

/// Benchmark decoding a staged point and the flag byte
fn bench_decode(c: &mut Criterion) {
    let point = TrajectoryPoint::new(Point2D::new(491.3, 133.9), 50.0, 150);
    let mut buf = [0u8; REGION_LEN];
    stage_point(&mut buf, &point);

    c.bench_function("decode_point", |b| {
        b.iter(|| {
            black_box(decode_point(black_box(&buf)));
        });
    });

    c.bench_function("decode_flags", |b| {
        b.iter(|| {
            black_box(flags_of(black_box(&buf)));
        });
    });
}

criterion_group!(benches, bench_stage_point, bench_decode);
criterion_main!(benches);
