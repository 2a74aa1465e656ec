//! Publish/subscribe channel for `{is_syncing, pending_count}`.

use std::sync::{
    Arc, Mutex, Weak,
    atomic::{AtomicU64, Ordering},
};

use hashbrown::HashMap;
use tokio::sync::watch;

/// Observable sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncStatus {
    /// A sync pass is in progress.
    pub is_syncing: bool,
    /// Live queued operations.
    pub pending_count: usize,
}

type Callback = Box<dyn Fn(SyncStatus) + Send + Sync>;

struct Shared {
    state: watch::Sender<SyncStatus>,
    callbacks: Mutex<HashMap<u64, Arc<Callback>>>,
    next_id: AtomicU64,
}

/// Fan-out of [`SyncStatus`] changes to any number of observers.
#[derive(Clone)]
pub struct StatusChannel {
    shared: Arc<Shared>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SyncStatus::default());
        Self {
            shared: Arc::new(Shared {
                state,
                callbacks: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Registers `callback` for every future change.
    ///
    /// The callback runs on the publishing task and must not block.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(SyncStatus) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Arc<Callback> = Arc::new(Box::new(callback));
        if let Ok(mut callbacks) = self.shared.callbacks.lock() {
            callbacks.insert(id, callback);
        }
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Snapshot for observers that missed earlier notifications.
    pub fn current(&self) -> SyncStatus {
        *self.shared.state.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<SyncStatus> {
        self.shared.state.subscribe()
    }

    /// Stores `status` and notifies subscribers if it differs from the last one.
    pub fn publish(&self, status: SyncStatus) {
        self.update(|current| *current = status);
    }

    /// Replaces only the pending count, keeping whatever `is_syncing` is current.
    pub fn set_pending(&self, pending_count: usize) {
        self.update(|current| current.pending_count = pending_count);
    }

    /// Applies `change` under the channel lock; read and write are one step.
    fn update(&self, change: impl FnOnce(&mut SyncStatus)) {
        let mut published = None;
        self.shared.state.send_if_modified(|current| {
            let mut next = *current;
            change(&mut next);
            if next == *current {
                return false;
            }
            *current = next;
            published = Some(next);
            true
        });
        let Some(status) = published else {
            return;
        };

        // Snapshot so callbacks may (un)subscribe without deadlocking.
        let callbacks: Vec<Arc<Callback>> = match self.shared.callbacks.lock() {
            Ok(callbacks) => callbacks.values().cloned().collect(),
            Err(_) => return,
        };
        for callback in callbacks {
            callback(status);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared
            .callbacks
            .lock()
            .map(|callbacks| callbacks.len())
            .unwrap_or(0)
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`StatusChannel::subscribe`]; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Removes the callback. Safe to call more than once.
    pub fn unsubscribe(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if let Ok(mut callbacks) = shared.callbacks.lock() {
            callbacks.remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
