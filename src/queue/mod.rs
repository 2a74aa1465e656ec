//! Durable queue of deferred writes.

/// Async operation store over a pluggable backend.
pub mod store;
