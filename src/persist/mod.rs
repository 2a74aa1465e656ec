pub mod memory;
pub mod sqlite;

use thiserror::Error;

use crate::{
    op::QueuedOperation,
    types::{OpId, OpKind, OpSeq, OpStatus},
};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("payload encoding error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Message(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Keyed storage for queued operations.
///
/// Implementations are synchronous; [`crate::queue::store::OperationStore`]
/// serializes access and moves calls off the async executor.
pub trait QueueBackend: Send {
    fn insert(&mut self, op: &QueuedOperation) -> PersistResult<()>;
    fn get(&self, id: OpId) -> PersistResult<Option<QueuedOperation>>;
    /// All records of `kind` regardless of status, in storage order.
    fn list_kind(&self, kind: OpKind) -> PersistResult<Vec<QueuedOperation>>;
    fn list_all(&self) -> PersistResult<Vec<QueuedOperation>>;
    /// Returns false when `id` is unknown.
    fn update_status(
        &mut self,
        id: OpId,
        status: OpStatus,
        last_error: Option<&str>,
        attempts: u32,
    ) -> PersistResult<bool>;
    fn delete_with_status(&mut self, status: OpStatus) -> PersistResult<usize>;
    fn count_live(&self) -> PersistResult<usize>;
    /// Highest sequence stored so far, 0 when empty.
    fn max_seq(&self) -> PersistResult<OpSeq>;
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
}
