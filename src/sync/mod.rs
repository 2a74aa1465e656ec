//! Sync pass coordination and its outcome types.

/// Single-flight drain of the operation store.
pub mod coordinator;

use thiserror::Error;

use crate::persist::PersistError;

/// Why a pass did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another pass holds the coordinator.
    AlreadyRunning,
    /// Connectivity reports offline; nothing was touched.
    Offline,
}

/// Per-pass counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassReport {
    /// Records confirmed by the server and retired.
    pub synced: usize,
    /// Records whose replay failed this pass.
    pub failed: usize,
    /// Failed records that crossed the retry ceiling.
    pub abandoned: usize,
    /// Retired records deleted at the end of the pass.
    pub purged: usize,
}

/// Result of a call to [`coordinator::SyncCoordinator::run_sync_pass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The pass ran to the end.
    Completed(PassReport),
    /// The pass returned without doing anything.
    Skipped(SkipReason),
}

impl PassOutcome {
    pub fn report(&self) -> Option<&PassReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            PassOutcome::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("queue storage failed during sync: {0}")]
    Persist(#[from] PersistError),
}
