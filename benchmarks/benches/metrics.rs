use benchmarks::{accuracy, RegressionMetrics};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_metrics(c: &mut Criterion) {
    let n = 100_000;
    let y_true: Vec<f64> = (0..n).map(|i| i as f64 * 0.5).collect();
    let y_pred: Vec<f64> = y_true.iter().map(|v| v + 0.25).collect();
    c.bench_function("regression_metrics_100k", |b| {
        b.iter(|| RegressionMetrics::score(black_box(&y_true), black_box(&y_pred)))
    });

    let labels: Vec<String> = (0..n).map(|i| format!("class_{}", i % 3)).collect();
    let predicted: Vec<String> = (0..n).map(|i| format!("class_{}", i % 4)).collect();
    c.bench_function("accuracy_100k", |b| {
        b.iter(|| accuracy(black_box(&labels), black_box(&predicted)))
    });
}

criterion_group!(benches, bench_metrics);
criterion_main!(benches);
