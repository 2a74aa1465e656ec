//! Trigger loop that drives sync passes and its event stream.

/// Event stream types emitted by the runtime.
pub mod events;
/// Handle and trigger loop implementation.
pub mod handle;
