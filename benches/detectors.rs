//! Benchmarks for the change-point detectors.

use breakscan::prelude::*;
use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn synthetic_series(n: usize) -> PriceSeries {
    let base = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
    let dates = (0..n).map(|i| base + Duration::days(i as i64)).collect();
    let prices = (0..n)
        .map(|i| {
            let level = if i < n / 2 { 50.0 } else { 80.0 };
            level + ((i % 7) as f64 - 3.0) * 0.4
        })
        .collect();
    PriceSeries::new(dates, prices).expect("valid synthetic series")
}

fn bench_rolling(c: &mut Criterion) {
    let mut group = c.benchmark_group("rolling_detect");
    for size in [1_000, 5_000, 10_000].iter() {
        let series = synthetic_series(*size);
        let config = RollingConfig::default();
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| rolling_detect(black_box(&series), &config))
        });
    }
    group.finish();
}

fn bench_bayes(c: &mut Criterion) {
    let series = synthetic_series(500);
    let config = BayesConfig::default()
        .n_changepoints(2)
        .draws(200)
        .tune(200)
        .chains(2)
        .seed(1);
    c.bench_function("bayes_detect_500", |b| {
        b.iter(|| bayes_detect(black_box(&series), &config))
    });
}

criterion_group!(benches, bench_rolling, bench_bayes);
criterion_main!(benches);
