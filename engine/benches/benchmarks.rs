//! Performance benchmarks for tandem-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use tandem_engine::{checksum, merge_payloads, retain_within, ChangeQueue, RecordType, MS_PER_DAY};

fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");

    for size in [10usize, 100, 1000] {
        let payload = json!({
            "messages": (0..size).map(|i| format!("message {i}")).collect::<Vec<_>>(),
        });
        group.bench_with_input(BenchmarkId::new("payload", size), &payload, |b, payload| {
            b.iter(|| checksum(black_box(payload)))
        });
    }

    group.finish();
}

fn bench_queue_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_operations");

    group.bench_function("enqueue", |b| {
        let mut queue = ChangeQueue::new();
        let mut id = 0u64;

        b.iter(|| {
            id += 1;
            queue.enqueue(
                format!("rec_{id}"),
                RecordType::Settings,
                json!({"theme": "dark"}),
                black_box(1000),
                "phone",
            )
        })
    });

    group.bench_function("clear_uploaded_1000", |b| {
        b.iter_batched(
            || {
                let mut queue = ChangeQueue::new();
                for i in 0..1000u64 {
                    queue.enqueue(format!("rec_{i}"), RecordType::Memory, json!(i), i, "phone");
                }
                let ids: Vec<_> = queue.drain().into_iter().map(|r| r.id).collect();
                (queue, ids)
            },
            |(mut queue, ids)| queue.clear_uploaded(black_box(&ids)),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn bench_retention(c: &mut Criterion) {
    let now = 100 * MS_PER_DAY;
    let mut queue = ChangeQueue::new();
    for day in 0..100u64 {
        queue.enqueue(
            format!("rec_{day}"),
            RecordType::Conversation,
            json!({"day": day}),
            day * MS_PER_DAY,
            "phone",
        );
    }
    let records = queue.drain();

    c.bench_function("retain_within_100", |b| {
        b.iter_batched(
            || records.clone(),
            |records| retain_within(records, black_box(now), 30),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_merge(c: &mut Criterion) {
    let ours = json!({"a": 1, "b": 2, "c": 3, "d": 4});
    let theirs = json!({"c": 30, "d": 40, "e": 50});

    c.bench_function("merge_payloads", |b| {
        b.iter(|| merge_payloads(Some(black_box(&ours)), black_box(&theirs), 1000))
    });
}

criterion_group!(
    benches,
    bench_checksum,
    bench_queue_operations,
    bench_retention,
    bench_merge
);
criterion_main!(benches);
