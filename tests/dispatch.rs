use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use serde_json::json;

use liftsync::{
    config::SyncConfig,
    connectivity::ConnectivityMonitor,
    dispatch::{DispatchError, Dispatched, Dispatcher, synthesize_optimistic_result},
    payload::{Payload, SetLog, WeightLog},
    queue::store::OperationStore,
    remote::{RemoteError, RemoteResult},
    status::StatusChannel,
    types::{OpKind, OpStatus},
};

fn set(set_number: u32) -> Payload {
    SetLog {
        session_id: "s1".to_string(),
        exercise_id: "deadlift".to_string(),
        set_number,
        weight_kg: 140.0,
        reps: 3,
        rpe: Some(9.0),
        performed_at_ms: 2_000 + u64::from(set_number),
    }
    .into()
}

fn dispatcher(online: bool) -> (Dispatcher, OperationStore, StatusChannel) {
    let store = OperationStore::in_memory();
    let status = StatusChannel::new();
    let dispatcher = Dispatcher::new(
        store.clone(),
        ConnectivityMonitor::new(online),
        status.clone(),
        &SyncConfig::default(),
    );
    (dispatcher, store, status)
}

#[tokio::test]
async fn online_success_returns_server_response_and_queues_nothing() {
    let (dispatcher, store, status) = dispatcher(true);

    let result = dispatcher
        .dispatch(set(1), |_| async { Ok(json!({ "id": "srv-42" })) })
        .await
        .expect("dispatch");

    assert_eq!(result.confirmed(), Some(json!({ "id": "srv-42" })));
    assert_eq!(store.count().await.expect("count"), 0);
    assert_eq!(status.current().pending_count, 0);
}

#[tokio::test]
async fn transport_failure_queues_exactly_one_record() {
    let (dispatcher, store, status) = dispatcher(true);

    let result = dispatcher
        .dispatch(set(1), |_| async {
            Err::<serde_json::Value, _>(RemoteError::Transport("dns failure".to_string()))
        })
        .await
        .expect("dispatch");

    let Dispatched::Optimistic(optimistic) = result else {
        panic!("expected optimistic result");
    };
    let pending = store.list_pending(OpKind::LogSet).await.expect("list");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, optimistic.op_id);
    assert_eq!(pending[0].payload, set(1));
    assert_eq!(pending[0].status, OpStatus::Pending);
    assert_eq!(status.current().pending_count, 1);
}

#[tokio::test]
async fn rejection_is_returned_and_nothing_is_queued() {
    let (dispatcher, store, status) = dispatcher(true);

    let err = dispatcher
        .dispatch(set(1), |_| async {
            Err::<serde_json::Value, _>(RemoteError::rejected(Some(400), "weight out of range"))
        })
        .await
        .expect_err("rejected");

    match err {
        DispatchError::Rejected(rejection) => {
            assert_eq!(rejection.status, Some(400));
            assert_eq!(rejection.message, "weight out of range");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.count().await.expect("count"), 0);
    assert_eq!(status.current().pending_count, 0);
}

#[tokio::test]
async fn offline_writes_skip_the_network_and_queue_in_order() {
    let (dispatcher, store, status) = dispatcher(false);
    let calls = Arc::new(AtomicUsize::new(0));

    let mut placeholders = Vec::new();
    for n in 1..=3 {
        let calls = Arc::clone(&calls);
        let result = dispatcher
            .dispatch(set(n), move |_| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(serde_json::Value::Null)
            })
            .await
            .expect("dispatch");
        let Dispatched::Optimistic(optimistic) = result else {
            panic!("expected optimistic result");
        };
        assert_eq!(optimistic.kind, OpKind::LogSet);
        assert_eq!(optimistic.payload, set(n));
        placeholders.push(optimistic);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(status.current().pending_count, 3);

    let pending = store.list_pending(OpKind::LogSet).await.expect("list");
    let queued: Vec<_> = pending.iter().map(|op| op.id).collect();
    let returned: Vec<_> = placeholders.iter().map(|p| p.op_id).collect();
    assert_eq!(queued, returned);
    assert!(placeholders.iter().all(|p| p.placeholder_id.starts_with("local-")));
}

#[tokio::test]
async fn slow_call_is_deferred_after_the_request_timeout() {
    let store = OperationStore::in_memory();
    let config = SyncConfig {
        request_timeout_ms: 20,
        ..SyncConfig::default()
    };
    let dispatcher = Dispatcher::new(
        store.clone(),
        ConnectivityMonitor::new(true),
        StatusChannel::new(),
        &config,
    );

    let result = dispatcher
        .dispatch(set(1), |_| async {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            RemoteResult::Ok(serde_json::Value::Null)
        })
        .await
        .expect("dispatch");

    assert!(result.is_optimistic());
    assert_eq!(store.count().await.expect("count"), 1);
}

#[tokio::test]
async fn optimistic_result_mirrors_the_queued_record() {
    let store = OperationStore::in_memory();
    let entry = WeightLog {
        weight_kg: 77.7,
        body_fat_pct: None,
        logged_at_ms: 3_000,
        notes: None,
    };
    let op = store.enqueue(entry.into()).await.expect("enqueue");

    let result = synthesize_optimistic_result(&op);

    assert_eq!(result.placeholder_id, format!("local-{}", op.id));
    assert_eq!(result.op_id, op.id);
    assert_eq!(result.kind, OpKind::LogWeight);
    assert_eq!(result.payload, op.payload);
    assert_eq!(result.created_at_ms, op.created_at_ms);
}
