//! Accumulator update and window assembly throughput
//!
//! Run with: cargo bench --package vibespec-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::f64::consts::PI;
use std::time::Duration;

use vibespec::spectrum::{SpectralAccumulator, Taper, TaperKind, Transform};
use vibespec::store::{Cell, ColumnBatch, StoreError};
use vibespec::window::WindowAssembler;

fn tone(n: usize, fs: f64) -> Vec<f64> {
    (0..n)
        .map(|i| (2.0 * PI * 12.5 * i as f64 / fs).sin() + 0.1 * (i as f64 * 0.37).sin())
        .collect()
}

fn bench_accumulator_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("Accumulator Update");
    group.measurement_time(Duration::from_secs(5));

    for &n in &[1024usize, 4096, 16384] {
        let signal = tone(n, 200.0);
        group.throughput(Throughput::Elements(n as u64));

        for transform in [Transform::Magnitude, Transform::Periodogram] {
            let mut acc = SpectralAccumulator::new(
                "bench",
                n,
                200.0,
                transform,
                Taper::new(TaperKind::Hann, n),
            )
            .unwrap();

            group.bench_with_input(
                BenchmarkId::new(transform.label(), n),
                &signal,
                |b, signal| b.iter(|| acc.update(black_box(signal)).unwrap()),
            );
        }
    }

    group.finish();
}

fn bench_window_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("Window Assembly");
    let rows = 65536;
    group.throughput(Throughput::Elements(rows as u64));

    for &batch in &[512usize, 4096] {
        group.bench_with_input(BenchmarkId::new("batch_rows", batch), &batch, |b, &batch| {
            b.iter(|| {
                let batches = (0..rows / batch).map(move |k| {
                    let index = (k * batch..(k + 1) * batch).map(|i| i as f64 * 0.005).collect();
                    let cells = (0..batch).map(|i| Cell::Scalar(i as f64)).collect();
                    Ok::<_, StoreError>(ColumnBatch::new(index, vec![cells]))
                });
                let assembler = WindowAssembler::new(batches, 16384, vec!["x".into()]).unwrap();
                black_box(assembler.count())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_accumulator_update, bench_window_assembly);
criterion_main!(benches);
