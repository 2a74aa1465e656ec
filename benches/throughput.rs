use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use liftsync::{
    payload::{Payload, SetLog},
    queue::store::OperationStore,
    types::OpKind,
};

fn set(n: u32) -> Payload {
    SetLog {
        session_id: "bench".to_string(),
        exercise_id: "squat".to_string(),
        set_number: n,
        weight_kg: 100.0,
        reps: 5,
        rpe: None,
        performed_at_ms: u64::from(n),
    }
    .into()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("runtime")
}

fn bench_enqueue(c: &mut Criterion) {
    let rt = runtime();
    c.bench_function("memory_enqueue_1k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = OperationStore::in_memory();
                for i in 0..1_000u32 {
                    store.enqueue(set(i)).await.expect("enqueue");
                }
            });
        });
    });

    c.bench_function("sqlite_enqueue_1k", |b| {
        b.iter(|| {
            let tmp = tempfile::TempDir::new().expect("tmp");
            let store = OperationStore::open_sqlite(tmp.path().join("q.db")).expect("open");
            rt.block_on(async {
                for i in 0..1_000u32 {
                    store.enqueue(set(i)).await.expect("enqueue");
                }
            });
        });
    });
}

fn bench_list_pending(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("list_pending");

    for n in [100u32, 1_000, 10_000] {
        let store = OperationStore::open_sqlite(":memory:").expect("open");
        rt.block_on(async {
            for i in 0..n {
                store.enqueue(set(i)).await.expect("enqueue");
            }
        });
        group.bench_with_input(BenchmarkId::from_parameter(n), &store, |b, store| {
            b.iter(|| {
                rt.block_on(store.list_pending(OpKind::LogSet))
                    .expect("list")
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_enqueue, bench_list_pending);
criterion_main!(benches);
