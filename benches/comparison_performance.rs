use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pitwall::analysis::{align, assemble, compute_kpis};
use pitwall::{Lap, TelemetrySample};
use std::time::Duration;

/// A lap sampled roughly every 4m, the density of a timing-feed car data stream
fn create_sample_lap(driver: &str, points: usize, speed_offset: f64) -> Lap {
    let mut time = 0.;
    let telemetry = (0..points)
        .map(|i| {
            let distance = i as f64 * 4.1;
            let speed = 200. + speed_offset + (i as f64 * 0.05).sin() * 90.;
            if i > 0 {
                time += 4.1 / (speed / 3.6);
            }
            TelemetrySample::new(distance, time, speed)
                .with_inputs(80., 20.)
                .with_position(distance.cos() * 500., distance.sin() * 500.)
        })
        .collect();
    Lap::new(driver, 1, time)
        .with_sectors([time / 3., time / 3., time / 3.])
        .with_telemetry(telemetry)
}

fn bench_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("alignment");

    let lap_a = create_sample_lap("VER", 800, 3.);
    let lap_b = create_sample_lap("HAM", 760, 0.);

    group.bench_function("align_800_760_samples", |b| {
        b.iter(|| black_box(align(&lap_a, &lap_b).unwrap()));
    });

    group.finish();
}

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");

    let lap = create_sample_lap("VER", 800, 3.);

    group.bench_function("compute_kpis_800_samples", |b| {
        b.iter(|| black_box(compute_kpis(&lap).unwrap()));
    });

    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("comparison");

    let lap_a = create_sample_lap("VER", 800, 3.);
    let lap_b = create_sample_lap("HAM", 760, 0.);
    let single_sample = create_sample_lap("ALO", 1, 0.);

    group.bench_function("assemble_full", |b| {
        b.iter(|| black_box(assemble(&lap_a, &lap_b).unwrap()));
    });

    group.bench_function("assemble_degraded", |b| {
        b.iter(|| black_box(assemble(&single_sample, &lap_b).unwrap()));
    });

    let result = assemble(&lap_a, &lap_b).unwrap();
    group.bench_function("serialize_comparison", |b| {
        b.iter(|| black_box(serde_json::to_string(&result).unwrap()));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = bench_alignment, bench_metrics, bench_assemble
}
criterion_main!(benches);
