/// Benchmarks for the rainfall index engine.
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array3;
use rainfall_indices::demo::jjas_dates;
use rainfall_indices::indices::IndexEngine;
use rainfall_indices::models::{GriddedField, Scenario, TimeAxis};
use rainfall_indices::units::Units;

fn daily_field(n: usize) -> GriddedField {
    let dates = jjas_dates(2050);
    let nt = dates.len();
    // Alternating dry spells and showers, with an occasional heavy day.
    let data = Array3::from_shape_fn((nt, n, n), |(t, i, j)| match (t + i + j) % 11 {
        0 => 120.0,
        1..=4 => 0.2,
        k => k as f64,
    });
    let axis: Vec<f64> = (0..n).map(|i| i as f64 * 0.25).collect();
    GriddedField::new(
        Some("pr".to_string()),
        Units::MmPerDay,
        axis.clone(),
        axis,
        TimeAxis::Daily(dates),
        data,
    )
    .unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let engine = IndexEngine::default();
    for n in [16, 64, 128] {
        let fields = vec![daily_field(n)];
        let name = format!("indices({n}x{n})");
        c.bench_function(&name, |b| {
            b.iter(|| {
                engine
                    .compute(black_box(&fields), Scenario::Ssp585, "1990-2019")
                    .unwrap()
            })
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
