use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crate::{
    config::SyncConfig,
    connectivity::ConnectivityMonitor,
    op::{QueuedOperation, sort_for_replay},
    persist::PersistResult,
    queue::store::OperationStore,
    remote::{RemoteApi, RemoteError, RemoteResult},
    status::{StatusChannel, SyncStatus},
    types::OpKind,
};

use super::{PassOutcome, PassReport, SkipReason, SyncError};

/// Drains the operation store against the remote service.
///
/// At most one pass runs at a time per coordinator; a pass started while
/// another is running returns [`SkipReason::AlreadyRunning`] without touching
/// the store or the network.
pub struct SyncCoordinator<R: ?Sized> {
    store: OperationStore,
    connectivity: ConnectivityMonitor,
    status: StatusChannel,
    remote: Arc<R>,
    config: SyncConfig,
    running: AtomicBool,
}

/// Clears the running flag even if the pass future is dropped mid-flight.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<R: RemoteApi + ?Sized> SyncCoordinator<R> {
    pub fn new(
        store: OperationStore,
        connectivity: ConnectivityMonitor,
        status: StatusChannel,
        remote: Arc<R>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            connectivity,
            status,
            remote,
            config,
            running: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &OperationStore {
        &self.store
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn status(&self) -> &StatusChannel {
        &self.status
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs one sync pass unless one is already running or the device is offline.
    pub async fn run_sync_pass(&self) -> Result<PassOutcome, SyncError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!("sync pass already running, skipping");
            return Ok(PassOutcome::Skipped(SkipReason::AlreadyRunning));
        }
        let _guard = PassGuard(&self.running);

        if !self.connectivity.is_online() {
            tracing::trace!("offline, skipping sync pass");
            return Ok(PassOutcome::Skipped(SkipReason::Offline));
        }

        let pending = self.store.count().await?;
        self.status.publish(SyncStatus {
            is_syncing: true,
            pending_count: pending,
        });
        tracing::debug!(pending, "sync pass started");

        let result = self.drain().await;

        // Idle status goes out on every exit, even when the store failed.
        let pending = match self.store.count().await {
            Ok(count) => count,
            Err(_) => self.status.current().pending_count,
        };
        self.status.publish(SyncStatus {
            is_syncing: false,
            pending_count: pending,
        });

        let report = result?;
        tracing::debug!(
            synced = report.synced,
            failed = report.failed,
            abandoned = report.abandoned,
            purged = report.purged,
            pending,
            "sync pass finished"
        );
        Ok(PassOutcome::Completed(report))
    }

    async fn drain(&self) -> PersistResult<PassReport> {
        let mut report = PassReport::default();
        for kind in OpKind::ALL {
            self.drain_kind(kind, &mut report).await?;
        }
        if self.config.purge_retired_after_pass {
            report.purged = self.store.purge_retired().await?;
        }
        Ok(report)
    }

    async fn drain_kind(&self, kind: OpKind, report: &mut PassReport) -> PersistResult<()> {
        let mut ops = self.store.list_pending(kind).await?;
        sort_for_replay(&mut ops);

        for op in ops {
            match self.replay_one(&op).await {
                Ok(_) => {
                    self.store.mark_synced(op.id).await?;
                    report.synced += 1;
                }
                Err(err) => self.record_failure(&op, err, report).await?,
            }
        }
        Ok(())
    }

    async fn replay_one(&self, op: &QueuedOperation) -> RemoteResult<serde_json::Value> {
        with_timeout(self.config.request_timeout(), self.remote.replay(&op.payload)).await
    }

    async fn record_failure(
        &self,
        op: &QueuedOperation,
        err: RemoteError,
        report: &mut PassReport,
    ) -> PersistResult<()> {
        let message = err.to_string();
        tracing::warn!(id = %op.id, kind = %op.kind, error = %message, "replay failed");

        // Transport failures say nothing about the payload, so they never count
        // toward abandonment.
        let updated = if err.is_transport() {
            self.store.mark_failed_transient(op.id, message.clone()).await?
        } else {
            self.store.mark_failed(op.id, message.clone()).await?
        };
        let Some(updated) = updated else {
            return Ok(());
        };
        report.failed += 1;

        let exhausted = match self.config.max_attempts {
            Some(max) => !err.is_transport() && updated.attempts >= max,
            None => false,
        };
        if exhausted {
            tracing::warn!(id = %op.id, attempts = updated.attempts, "abandoning operation");
            self.store.mark_abandoned(op.id, message).await?;
            report.abandoned += 1;
        }
        Ok(())
    }
}

/// Bounds `call` by `limit`; an expired call is a transport failure.
pub(crate) async fn with_timeout<T, F>(limit: Duration, call: F) -> RemoteResult<T>
where
    F: Future<Output = RemoteResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Transport(format!(
            "no response within {} ms",
            limit.as_millis()
        ))),
    }
}
