//! Runtime event stream payloads.

use crate::sync::{PassReport, SkipReason};

/// What triggered a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Runtime start while already online.
    Startup,
    /// Connectivity went from offline to online.
    Reconnected,
    /// Periodic timer tick while online.
    Interval,
    /// Explicit request through the handle.
    Manual,
}

/// Events emitted from the sync runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Connectivity changed.
    ConnectivityChanged {
        /// New reachability.
        online: bool,
    },
    /// A pass ran to completion.
    PassFinished {
        /// What started it.
        trigger: Trigger,
        /// Per-pass counters.
        report: PassReport,
    },
    /// A pass returned without doing work.
    PassSkipped {
        /// What asked for it.
        trigger: Trigger,
        /// Why it did not run.
        reason: SkipReason,
    },
    /// A pass aborted on a storage error.
    PassFailed {
        /// What started it.
        trigger: Trigger,
        /// Error text.
        error: String,
    },
}
