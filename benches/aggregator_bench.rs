use boiler_state::{Aggregator, AggregatorOptions, MAX_ENTRIES};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn full_aggregator() -> Aggregator {
    let aggregator = Aggregator::open(AggregatorOptions::in_memory()).unwrap();
    for i in 0..MAX_ENTRIES {
        let t = 25.0 + (i % 20) as f64;
        aggregator.ingest(&[t, t - 2.0, t - 6.0]).unwrap();
    }
    aggregator
}

fn bench_ingest(c: &mut Criterion) {
    let aggregator = full_aggregator();
    let mut group = c.benchmark_group("ingest");
    group.throughput(Throughput::Elements(1));

    group.bench_function("ingest_at_capacity", |b| {
        let mut t = 30.0;
        b.iter(|| {
            aggregator.ingest(black_box(&[t, t - 2.0, t - 6.0])).unwrap();
            t = if t > 50.0 { 30.0 } else { t + 0.1 };
        });
    });
    group.finish();
}

fn bench_reads(c: &mut Criterion) {
    let aggregator = full_aggregator();
    let mut group = c.benchmark_group("read");

    group.bench_function("snapshot", |b| {
        b.iter(|| black_box(aggregator.snapshot()));
    });

    for size in [60i64, 1440, -1] {
        group.bench_function(format!("window_{size}"), |b| {
            b.iter(|| black_box(aggregator.get_snapshot(black_box(size))));
        });
    }

    group.bench_function("window_json_1440", |b| {
        b.iter(|| black_box(serde_json::to_string(&aggregator.get_snapshot(1440)).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_ingest, bench_reads);
criterion_main!(benches);
