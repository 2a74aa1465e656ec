//! Offline-first write queue and sync coordination for a workout-logging client.
//!
//! Writes go through [`dispatch::Dispatcher`]: online they hit the server,
//! offline (or on a transport failure) they land in a durable
//! [`queue::store::OperationStore`] and the caller gets an optimistic result.
//! [`sync::coordinator::SyncCoordinator`] later replays the queue, oldest
//! first within each kind, and [`status::StatusChannel`] reports
//! `{is_syncing, pending_count}` to observers.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use liftsync::{
//!     client::OfflineClient,
//!     config::SyncConfig,
//!     connectivity::ConnectivityMonitor,
//!     payload::{SessionCompletion, SetLog, WeightLog},
//!     queue::store::OperationStore,
//!     remote::{RemoteApi, RemoteResult},
//! };
//! use serde_json::{Value, json};
//!
//! struct Accepting;
//!
//! #[async_trait]
//! impl RemoteApi for Accepting {
//!     async fn log_set(&self, _set: &SetLog) -> RemoteResult<Value> {
//!         Ok(json!({ "id": "set-1" }))
//!     }
//!     async fn complete_session(&self, _c: &SessionCompletion) -> RemoteResult<Value> {
//!         Ok(Value::Null)
//!     }
//!     async fn log_weight(&self, _w: &WeightLog) -> RemoteResult<Value> {
//!         Ok(Value::Null)
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let client = OfflineClient::new(
//!     OperationStore::in_memory(),
//!     ConnectivityMonitor::new(false),
//!     Arc::new(Accepting),
//!     SyncConfig::default(),
//! );
//!
//! let set = SetLog {
//!     session_id: "s-1".to_string(),
//!     exercise_id: "squat".to_string(),
//!     set_number: 1,
//!     weight_kg: 60.0,
//!     reps: 8,
//!     rpe: None,
//!     performed_at_ms: 1,
//! };
//! let result = client.dispatcher.dispatch_via(&Accepting, set).await.expect("dispatch");
//! assert!(result.is_optimistic());
//! assert_eq!(client.status.current().pending_count, 1);
//!
//! client.connectivity.set_online(true);
//! let outcome = client.coordinator.run_sync_pass().await.expect("sync");
//! assert_eq!(outcome.report().map(|r| r.synced), Some(1));
//! assert_eq!(client.status.current().pending_count, 0);
//! # }
//! ```

/// Component wiring.
pub mod client;
/// Sync tunables and file/env configuration.
pub mod config;
/// Online/offline source of truth.
pub mod connectivity;
/// Offline-capable write entry point.
pub mod dispatch;
/// Queued operation model and payload envelope.
pub mod op;
/// Kind-specific write payloads.
pub mod payload;
/// Storage backends for the queue.
pub mod persist;
/// Async operation store.
pub mod queue;
/// Remote write calls and error classification.
pub mod remote;
/// Trigger loop and event stream.
pub mod runtime;
/// Sync status publish/subscribe.
pub mod status;
/// Sync pass coordination.
pub mod sync;
/// Shared primitive types and enums.
pub mod types;
