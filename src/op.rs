//! Queued operation model and persistence wrappers.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{
    payload::Payload,
    types::{OpId, OpKind, OpSeq, OpStatus},
};

/// Version number for serialized [`PayloadEnvelope`] blobs.
pub const PAYLOAD_FORMAT_VERSION: u16 = 1;

/// A locally recorded write that the server has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    /// Stable identifier assigned at enqueue time.
    pub id: OpId,
    /// Store-local enqueue sequence, used to break `created_at_ms` ties.
    pub seq: OpSeq,
    /// Operation kind; always equal to `payload.kind()`.
    pub kind: OpKind,
    /// Replay data. Never rewritten after insert.
    pub payload: Payload,
    /// Enqueue time in milliseconds since epoch.
    pub created_at_ms: u64,
    /// Current lifecycle state.
    pub status: OpStatus,
    /// Reason for the most recent failure.
    pub last_error: Option<String>,
    /// Number of replays the server rejected so far.
    pub attempts: u32,
}

impl QueuedOperation {
    /// Builds a fresh pending record.
    pub fn new(seq: OpSeq, payload: Payload, created_at_ms: u64) -> Self {
        Self {
            id: OpId::new_v4(),
            seq,
            kind: payload.kind(),
            payload,
            created_at_ms,
            status: OpStatus::Pending,
            last_error: None,
            attempts: 0,
        }
    }

    /// Replay ordering key: oldest first, enqueue order on ties.
    pub fn replay_key(&self) -> (u64, OpSeq) {
        (self.created_at_ms, self.seq)
    }
}

/// Sorts records into replay order.
pub fn sort_for_replay(ops: &mut [QueuedOperation]) {
    ops.sort_by_key(QueuedOperation::replay_key);
}

/// Versioned wrapper for stable on-disk payload decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadEnvelope {
    /// Payload format version.
    pub format_version: u16,
    /// Wrapped payload.
    pub payload: Payload,
}

impl PayloadEnvelope {
    /// Constructs an envelope using [`PAYLOAD_FORMAT_VERSION`].
    pub fn new(payload: Payload) -> Self {
        Self {
            format_version: PAYLOAD_FORMAT_VERSION,
            payload,
        }
    }
}

/// Wall-clock milliseconds since the Unix epoch; 0 if the clock is before it.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
