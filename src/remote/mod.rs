//! Remote write calls and the transport/rejection error split.

pub mod http;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::payload::{Payload, SessionCompletion, SetLog, WeightLog};

/// Details of a write the server received and declined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// HTTP status, when the transport has one.
    pub status: Option<u16>,
    /// Server-provided reason.
    pub message: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{status} {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Failure of a remote write, classified once at the network boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// No response was received; the write may be retried later.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The server responded and declined the write.
    #[error("rejected by server: {0}")]
    Rejected(Rejection),
}

impl RemoteError {
    pub fn rejected(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Rejected(Rejection {
            status,
            message: message.into(),
        })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// One async call per operation kind.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn log_set(&self, set: &SetLog) -> RemoteResult<Value>;
    async fn complete_session(&self, completion: &SessionCompletion) -> RemoteResult<Value>;
    async fn log_weight(&self, entry: &WeightLog) -> RemoteResult<Value>;

    /// Routes a payload to the matching call.
    async fn replay(&self, payload: &Payload) -> RemoteResult<Value> {
        match payload {
            Payload::LogSet(set) => self.log_set(set).await,
            Payload::CompleteSession(completion) => self.complete_session(completion).await,
            Payload::LogWeight(entry) => self.log_weight(entry).await,
        }
    }
}
