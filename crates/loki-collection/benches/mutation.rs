use bson::{Bson, DateTime};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use loki_collection::{Collection, CollectionOptions};

fn now() -> DateTime {
    DateTime::from_millis(1_700_000_000_000)
}

fn seeded(n: usize, adaptive: bool) -> Collection {
    let mut opts = CollectionOptions::new("bench");
    opts.indices = vec!["age".to_string(), "status".to_string()];
    opts.adaptive_binary_indices = adaptive;
    let mut collection = Collection::new(opts).unwrap();
    for i in 0..n {
        collection
            .insert(
                Bson::Document(bson::doc! {
                    "name": format!("user-{i}"),
                    "status": if i % 2 == 0 { "active" } else { "rejected" },
                    "age": (i % 80) as i32,
                }),
                now(),
            )
            .unwrap();
    }
    collection
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for adaptive in [true, false] {
        for n in [100, 1_000, 10_000] {
            group.bench_with_input(
                BenchmarkId::new(if adaptive { "adaptive" } else { "lazy" }, n),
                &n,
                |b, &n| {
                    b.iter(|| seeded(n, adaptive));
                },
            );
        }
    }
    group.finish();
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");
    for adaptive in [true, false] {
        for n in [100, 1_000, 10_000] {
            let base = seeded(n, adaptive);
            group.bench_with_input(
                BenchmarkId::new(if adaptive { "adaptive" } else { "lazy" }, n),
                &n,
                |b, _| {
                    b.iter_batched(
                        || base.get(1).unwrap().clone(),
                        |mut doc| {
                            doc.insert("age", 42);
                            // `base` is read-only across iterations; each
                            // batch clones its own collection so `update`
                            // has somewhere to apply.
                            let mut collection = seeded(n, adaptive);
                            collection.update(doc, now()).unwrap()
                        },
                        criterion::BatchSize::SmallInput,
                    );
                },
            );
        }
    }
    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove");
    for n in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || seeded(n, true),
                |mut collection| {
                    let id = collection.get(1).map(|_| 1).unwrap();
                    collection.remove_by_id(id).unwrap()
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_update, bench_remove);
criterion_main!(benches);
