//! Async front end over a [`QueueBackend`]: id assignment, status
//! transitions and timestamps for queued writes.

use std::{path::Path, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    op::{QueuedOperation, now_ms},
    payload::Payload,
    persist::{
        PersistError, PersistResult, QueueBackend, memory::MemoryBackend, sqlite::SqliteBackend,
    },
    types::{OpId, OpKind, OpSeq, OpStatus},
};

struct Inner {
    backend: Box<dyn QueueBackend>,
    next_seq: OpSeq,
}

/// Shared handle to the durable queue of deferred writes.
///
/// Clones share one backend. Every call runs on the blocking pool under a
/// single lock and completes before the returned future resolves, so an
/// `enqueue` that returned `Ok` is visible to the next `list_pending`.
#[derive(Clone)]
pub struct OperationStore {
    inner: Arc<Mutex<Inner>>,
}

impl OperationStore {
    /// Wraps `backend`, continuing sequence numbers after its highest stored one.
    pub fn new(backend: impl QueueBackend + 'static) -> PersistResult<Self> {
        let next_seq = backend.max_seq()? + 1;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                backend: Box::new(backend),
                next_seq,
            })),
        })
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                backend: Box::new(MemoryBackend::new()),
                next_seq: 1,
            })),
        }
    }

    /// Opens or creates the SQLite queue at `path`.
    pub fn open_sqlite(path: impl AsRef<Path>) -> PersistResult<Self> {
        Self::new(SqliteBackend::open(path)?)
    }

    /// Persists a new pending operation and returns it.
    pub async fn enqueue(&self, payload: Payload) -> PersistResult<QueuedOperation> {
        let op = self
            .with_backend(move |inner| {
                let op = QueuedOperation::new(inner.next_seq, payload, now_ms());
                inner.backend.insert(&op)?;
                inner.next_seq += 1;
                Ok(op)
            })
            .await?;
        tracing::debug!(id = %op.id, kind = %op.kind, seq = op.seq, "enqueued operation");
        Ok(op)
    }

    /// Pending and failed records of `kind`, in storage order.
    pub async fn list_pending(&self, kind: OpKind) -> PersistResult<Vec<QueuedOperation>> {
        self.with_backend(move |inner| {
            let mut ops = inner.backend.list_kind(kind)?;
            ops.retain(|op| op.status.is_live());
            Ok(ops)
        })
        .await
    }

    /// Retires `id`. Unknown or already retired ids are left alone.
    pub async fn mark_synced(&self, id: OpId) -> PersistResult<()> {
        self.with_backend(move |inner| {
            match inner.backend.get(id)? {
                Some(op) if op.status.is_live() => {
                    inner
                        .backend
                        .update_status(id, OpStatus::Synced, None, op.attempts)?;
                }
                _ => {}
            }
            Ok(())
        })
        .await
    }

    /// Records a rejected replay; the record stays eligible for the next pass.
    ///
    /// Increments `attempts`. Returns the updated record, or `None` when `id`
    /// is no longer live.
    pub async fn mark_failed(
        &self,
        id: OpId,
        error: impl Into<String>,
    ) -> PersistResult<Option<QueuedOperation>> {
        self.record_failure(id, error.into(), true).await
    }

    /// Like [`OperationStore::mark_failed`] but leaves `attempts` untouched,
    /// for failures that never reached the server.
    pub async fn mark_failed_transient(
        &self,
        id: OpId,
        error: impl Into<String>,
    ) -> PersistResult<Option<QueuedOperation>> {
        self.record_failure(id, error.into(), false).await
    }

    /// Moves a live record to the terminal abandoned state.
    pub async fn mark_abandoned(&self, id: OpId, error: impl Into<String>) -> PersistResult<()> {
        let error = error.into();
        self.with_backend(move |inner| {
            if let Some(op) = inner.backend.get(id)? {
                if op.status.is_live() {
                    inner
                        .backend
                        .update_status(id, OpStatus::Abandoned, Some(&error), op.attempts)?;
                }
            }
            Ok(())
        })
        .await
    }

    /// Live records across all kinds.
    pub async fn count(&self) -> PersistResult<usize> {
        self.with_backend(|inner| inner.backend.count_live()).await
    }

    /// Deletes retired records and returns how many were dropped.
    pub async fn purge_retired(&self) -> PersistResult<usize> {
        self.with_backend(|inner| {
            let purged = inner.backend.delete_with_status(OpStatus::Synced)?;
            if purged > 0 {
                inner.backend.flush()?;
            }
            Ok(purged)
        })
        .await
    }

    /// Records that hit the retry ceiling, in storage order.
    pub async fn list_abandoned(&self) -> PersistResult<Vec<QueuedOperation>> {
        self.with_backend(|inner| {
            let mut ops = inner.backend.list_all()?;
            ops.retain(|op| op.status == OpStatus::Abandoned);
            Ok(ops)
        })
        .await
    }

    /// Looks up one record in any status.
    pub async fn get(&self, id: OpId) -> PersistResult<Option<QueuedOperation>> {
        self.with_backend(move |inner| inner.backend.get(id)).await
    }

    /// Every stored record, any status, in storage order.
    pub async fn snapshot(&self) -> PersistResult<Vec<QueuedOperation>> {
        self.with_backend(|inner| inner.backend.list_all()).await
    }

    /// Forces buffered writes to disk.
    pub async fn flush(&self) -> PersistResult<()> {
        self.with_backend(|inner| inner.backend.flush()).await
    }

    async fn record_failure(
        &self,
        id: OpId,
        error: String,
        count_attempt: bool,
    ) -> PersistResult<Option<QueuedOperation>> {
        self.with_backend(move |inner| {
            let Some(mut op) = inner.backend.get(id)? else {
                return Ok(None);
            };
            if !op.status.is_live() {
                return Ok(None);
            }
            op.status = OpStatus::Failed;
            if count_attempt {
                op.attempts = op.attempts.saturating_add(1);
            }
            inner
                .backend
                .update_status(id, op.status, Some(&error), op.attempts)?;
            op.last_error = Some(error);
            Ok(Some(op))
        })
        .await
    }

    async fn with_backend<T, F>(&self, f: F) -> PersistResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Inner) -> PersistResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut inner = inner.blocking_lock();
            f(&mut inner)
        })
        .await
        .map_err(|e| PersistError::Message(format!("join error: {e}")))?
    }
}
