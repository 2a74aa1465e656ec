use std::sync::{Arc, Mutex};

use liftsync::status::{StatusChannel, SyncStatus};

fn recorder(channel: &StatusChannel) -> (Arc<Mutex<Vec<SyncStatus>>>, liftsync::status::Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = channel.subscribe(move |status| sink.lock().expect("lock").push(status));
    (seen, sub)
}

#[test]
fn subscribers_see_changes_only() {
    let channel = StatusChannel::new();
    let (seen, _sub) = recorder(&channel);

    channel.set_pending(2);
    channel.set_pending(2);
    channel.publish(SyncStatus {
        is_syncing: true,
        pending_count: 2,
    });
    channel.publish(SyncStatus {
        is_syncing: true,
        pending_count: 2,
    });
    channel.publish(SyncStatus::default());

    assert_eq!(
        *seen.lock().expect("lock"),
        vec![
            SyncStatus {
                is_syncing: false,
                pending_count: 2
            },
            SyncStatus {
                is_syncing: true,
                pending_count: 2
            },
            SyncStatus::default(),
        ]
    );
}

#[test]
fn set_pending_preserves_syncing_flag() {
    let channel = StatusChannel::new();
    channel.publish(SyncStatus {
        is_syncing: true,
        pending_count: 4,
    });

    channel.set_pending(3);

    assert_eq!(
        channel.current(),
        SyncStatus {
            is_syncing: true,
            pending_count: 3
        }
    );
}

#[test]
fn every_subscriber_is_notified() {
    let channel = StatusChannel::new();
    let (first, _a) = recorder(&channel);
    let (second, _b) = recorder(&channel);
    assert_eq!(channel.subscriber_count(), 2);

    channel.set_pending(1);

    assert_eq!(first.lock().expect("lock").len(), 1);
    assert_eq!(second.lock().expect("lock").len(), 1);
}

#[test]
fn unsubscribe_is_idempotent() {
    let channel = StatusChannel::new();
    let (seen, sub) = recorder(&channel);

    sub.unsubscribe();
    sub.unsubscribe();
    channel.set_pending(5);

    assert!(seen.lock().expect("lock").is_empty());
    assert_eq!(channel.subscriber_count(), 0);
}

#[test]
fn dropping_the_subscription_unsubscribes() {
    let channel = StatusChannel::new();
    let (seen, sub) = recorder(&channel);
    drop(sub);

    channel.set_pending(1);

    assert!(seen.lock().expect("lock").is_empty());
    assert_eq!(channel.subscriber_count(), 0);
}

#[test]
fn subscription_outliving_the_channel_is_harmless() {
    let channel = StatusChannel::new();
    let (_seen, sub) = recorder(&channel);
    drop(channel);

    sub.unsubscribe();
}

#[test]
fn callback_may_unsubscribe_itself() {
    let channel = StatusChannel::new();
    let slot: Arc<Mutex<Option<liftsync::status::Subscription>>> = Arc::new(Mutex::new(None));
    let calls = Arc::new(Mutex::new(0usize));

    let inner_slot = Arc::clone(&slot);
    let inner_calls = Arc::clone(&calls);
    let sub = channel.subscribe(move |_| {
        *inner_calls.lock().expect("lock") += 1;
        if let Some(sub) = inner_slot.lock().expect("lock").take() {
            sub.unsubscribe();
        }
    });
    *slot.lock().expect("lock") = Some(sub);

    channel.set_pending(1);
    channel.set_pending(2);

    assert_eq!(*calls.lock().expect("lock"), 1);
    assert_eq!(channel.subscriber_count(), 0);
}

#[tokio::test]
async fn watch_receiver_tracks_latest_status() {
    let channel = StatusChannel::new();
    let mut rx = channel.watch();

    channel.set_pending(7);

    rx.changed().await.expect("changed");
    assert_eq!(rx.borrow_and_update().pending_count, 7);
}

#[test]
fn concurrent_pending_updates_never_resurrect_syncing_flag() {
    for _ in 0..50 {
        let channel = StatusChannel::new();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for n in 0..200 {
                    channel.publish(SyncStatus {
                        is_syncing: true,
                        pending_count: n,
                    });
                }
                channel.publish(SyncStatus {
                    is_syncing: false,
                    pending_count: 0,
                });
            });
            scope.spawn(|| {
                for n in 0..200 {
                    channel.set_pending(n);
                }
            });
        });

        assert!(!channel.current().is_syncing);
    }
}
