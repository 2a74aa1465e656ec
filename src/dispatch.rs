//! Single call site for writes that must work offline.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    config::SyncConfig,
    connectivity::ConnectivityMonitor,
    op::QueuedOperation,
    payload::Payload,
    persist::PersistError,
    queue::store::OperationStore,
    remote::{RemoteApi, RemoteError, RemoteResult, Rejection},
    status::StatusChannel,
    sync::coordinator::with_timeout,
    types::{OpId, OpKind},
};

/// Local stand-in for a server response to a deferred write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimisticResult {
    /// Placeholder id the UI can show until the server assigns one.
    pub placeholder_id: String,
    /// Queue record that will replay this write.
    pub op_id: OpId,
    pub kind: OpKind,
    pub payload: Payload,
    /// Enqueue time in milliseconds since epoch.
    pub created_at_ms: u64,
}

/// Outcome of [`Dispatcher::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched<T> {
    /// The server accepted the write; its response is returned unchanged.
    Confirmed(T),
    /// The write was queued for a later sync pass.
    Optimistic(OptimisticResult),
}

impl<T> Dispatched<T> {
    pub fn is_optimistic(&self) -> bool {
        matches!(self, Dispatched::Optimistic(_))
    }

    pub fn confirmed(self) -> Option<T> {
        match self {
            Dispatched::Confirmed(value) => Some(value),
            Dispatched::Optimistic(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The server declined the write; it was not queued.
    #[error("write rejected: {0}")]
    Rejected(Rejection),
    /// The write could not be queued.
    #[error("failed to queue write: {0}")]
    Persist(#[from] PersistError),
}

/// Builds the optimistic result for a freshly queued operation.
pub fn synthesize_optimistic_result(op: &QueuedOperation) -> OptimisticResult {
    OptimisticResult {
        placeholder_id: format!("local-{}", op.id),
        op_id: op.id,
        kind: op.kind,
        payload: op.payload.clone(),
        created_at_ms: op.created_at_ms,
    }
}

/// Sends writes directly when possible and queues them otherwise.
#[derive(Clone)]
pub struct Dispatcher {
    store: OperationStore,
    connectivity: ConnectivityMonitor,
    status: StatusChannel,
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        store: OperationStore,
        connectivity: ConnectivityMonitor,
        status: StatusChannel,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            connectivity,
            status,
            request_timeout: config.request_timeout(),
        }
    }

    /// Performs `remote_call`, falling back to the queue on transport failure.
    ///
    /// Offline callers never reach the network. Rejections are returned to the
    /// caller and leave the queue untouched.
    pub async fn dispatch<T, F, Fut>(
        &self,
        payload: Payload,
        remote_call: F,
    ) -> Result<Dispatched<T>, DispatchError>
    where
        F: FnOnce(Payload) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        if !self.connectivity.is_online() {
            tracing::debug!(kind = %payload.kind(), "offline, deferring write");
            return self.defer(payload).await.map(Dispatched::Optimistic);
        }

        match with_timeout(self.request_timeout, remote_call(payload.clone())).await {
            Ok(value) => Ok(Dispatched::Confirmed(value)),
            Err(RemoteError::Transport(reason)) => {
                tracing::info!(kind = %payload.kind(), %reason, "write deferred after transport failure");
                self.defer(payload).await.map(Dispatched::Optimistic)
            }
            Err(RemoteError::Rejected(rejection)) => Err(DispatchError::Rejected(rejection)),
        }
    }

    /// [`Dispatcher::dispatch`] through the matching [`RemoteApi`] call.
    pub async fn dispatch_via<R>(
        &self,
        api: &R,
        payload: impl Into<Payload>,
    ) -> Result<Dispatched<Value>, DispatchError>
    where
        R: RemoteApi + ?Sized,
    {
        self.dispatch(payload.into(), |payload| async move { api.replay(&payload).await })
            .await
    }

    async fn defer(&self, payload: Payload) -> Result<OptimisticResult, DispatchError> {
        let op = self.store.enqueue(payload).await?;
        match self.store.count().await {
            Ok(pending) => self.status.set_pending(pending),
            Err(err) => tracing::warn!(error = %err, "could not refresh pending count"),
        }
        Ok(synthesize_optimistic_result(&op))
    }
}
