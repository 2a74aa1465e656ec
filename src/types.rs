//! Shared primitive IDs and queue-related enums.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Locally generated identifier of a queued operation.
pub type OpId = Uuid;
/// Monotonic store-local enqueue sequence number.
pub type OpSeq = u64;
/// Remote identifier of a training session.
pub type SessionId = String;
/// Remote identifier of an exercise in the catalog.
pub type ExerciseId = String;

/// Kind of deferred write.
///
/// The set is closed; adding a kind means adding a variant here, a payload
/// variant, and a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpKind {
    /// A single logged set.
    LogSet,
    /// A session marked as completed.
    CompleteSession,
    /// A body-weight entry.
    LogWeight,
}

impl OpKind {
    /// Replay priority order used by every sync pass.
    pub const ALL: [OpKind; 3] = [OpKind::LogSet, OpKind::CompleteSession, OpKind::LogWeight];

    /// Stable storage tag.
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::LogSet => "log_set",
            OpKind::CompleteSession => "complete_session",
            OpKind::LogWeight => "log_weight",
        }
    }

    /// Parses a storage tag produced by [`OpKind::as_str`].
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "log_set" => Some(OpKind::LogSet),
            "complete_session" => Some(OpKind::CompleteSession),
            "log_weight" => Some(OpKind::LogWeight),
            _ => None,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a queued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpStatus {
    /// Waiting for its first replay.
    Pending,
    /// Replayed at least once and failed; still eligible.
    Failed,
    /// Confirmed by the server, kept until the next purge.
    Synced,
    /// Gave up after too many rejections; kept for inspection.
    Abandoned,
}

impl OpStatus {
    /// Whether the record still counts as pending work.
    pub fn is_live(self) -> bool {
        matches!(self, OpStatus::Pending | OpStatus::Failed)
    }

    /// Stable storage tag.
    pub fn as_str(self) -> &'static str {
        match self {
            OpStatus::Pending => "pending",
            OpStatus::Failed => "failed",
            OpStatus::Synced => "synced",
            OpStatus::Abandoned => "abandoned",
        }
    }

    /// Parses a storage tag produced by [`OpStatus::as_str`].
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "pending" => Some(OpStatus::Pending),
            "failed" => Some(OpStatus::Failed),
            "synced" => Some(OpStatus::Synced),
            "abandoned" => Some(OpStatus::Abandoned),
            _ => None,
        }
    }
}

impl fmt::Display for OpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
