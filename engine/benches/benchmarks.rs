//! Performance benchmarks for basket-engine

use basket_engine::{ChangeEvent, InsertPosition, Record, SortSpec, SyncState};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

fn product(i: u64) -> Record {
    Record::from_value(json!({
        "id": format!("p{}", i),
        "created": format!("2025-11-16 16:{:02}:{:02}.000Z", (i / 60) % 60, i % 60),
        "name": format!("Product {}", i),
        "icon": "noto:red-apple",
        "shoppingCartUsages": i % 17
    }))
    .unwrap()
}

fn loaded_state(size: u64) -> SyncState {
    let mut state = SyncState::new();
    state.begin_load();
    state.finish_load((0..size).map(product).collect());
    state
}

fn bench_change_events(c: &mut Criterion) {
    let mut group = c.benchmark_group("change_events");

    for size in [100u64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("create_head", size), &size, |b, &size| {
            b.iter_batched(
                || loaded_state(size),
                |mut state| {
                    state.apply(
                        black_box(ChangeEvent::created(product(size + 1))),
                        InsertPosition::Head,
                    )
                },
                criterion::BatchSize::SmallInput,
            )
        });

        group.bench_with_input(BenchmarkId::new("update_last", size), &size, |b, &size| {
            let mut state = loaded_state(size);
            b.iter(|| {
                state.apply(
                    black_box(ChangeEvent::updated(product(size - 1))),
                    InsertPosition::Head,
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("delete", size), &size, |b, &size| {
            b.iter_batched(
                || loaded_state(size),
                |mut state| {
                    state.apply(
                        black_box(ChangeEvent::deleted(product(size / 2))),
                        InsertPosition::Head,
                    )
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort");
    let spec = SortSpec::parse("-shoppingCartUsages,name");

    for size in [100u64, 1_000] {
        let records: Vec<_> = (0..size).map(product).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter_batched(
                || records.clone(),
                |mut records| spec.sort(black_box(&mut records)),
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_change_events, bench_sort);
criterion_main!(benches);
