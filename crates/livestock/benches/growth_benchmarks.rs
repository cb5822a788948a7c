use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, TimeZone, Utc};
use herdbook_livestock::{DateRange, WeightObservation, compute_growth};

/// Irregularly sampled series, shuffled so the calculator has to sort.
fn series(len: usize) -> Vec<WeightObservation> {
    let origin = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let mut out: Vec<WeightObservation> = (0..len)
        .map(|i| {
            let day = (i as i64) * 3 + (i as i64 % 5);
            let weight = 40.0 + i as f64 * 0.9;
            WeightObservation::new(origin + Duration::days(day), weight, "").unwrap()
        })
        .collect();
    out.reverse();
    out
}

fn bench_compute_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_growth");
    let origin = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let range = DateRange::new(origin, origin + Duration::days(100_000)).unwrap();

    for len in [10usize, 100, 1_000, 10_000] {
        let observations = series(len);
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &observations, |b, obs| {
            b.iter(|| compute_growth(black_box(obs), black_box(&range)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compute_growth);
criterion_main!(benches);
