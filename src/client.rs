//! Wiring of store, connectivity, status, dispatcher, and coordinator.

use std::sync::Arc;

use crate::{
    config::SyncConfig,
    connectivity::ConnectivityMonitor,
    dispatch::Dispatcher,
    queue::store::OperationStore,
    remote::RemoteApi,
    runtime::handle::{SyncHandle, spawn_sync_runtime},
    status::StatusChannel,
    sync::coordinator::SyncCoordinator,
};

/// Every sync component, sharing one store, monitor, and status channel.
pub struct OfflineClient<R: ?Sized> {
    pub store: OperationStore,
    pub connectivity: ConnectivityMonitor,
    pub status: StatusChannel,
    pub dispatcher: Dispatcher,
    pub coordinator: Arc<SyncCoordinator<R>>,
}

impl<R> OfflineClient<R>
where
    R: RemoteApi + ?Sized + 'static,
{
    pub fn new(
        store: OperationStore,
        connectivity: ConnectivityMonitor,
        remote: Arc<R>,
        config: SyncConfig,
    ) -> Self {
        let status = StatusChannel::new();
        let dispatcher = Dispatcher::new(
            store.clone(),
            connectivity.clone(),
            status.clone(),
            &config,
        );
        let coordinator = Arc::new(SyncCoordinator::new(
            store.clone(),
            connectivity.clone(),
            status.clone(),
            remote,
            config,
        ));
        Self {
            store,
            connectivity,
            status,
            dispatcher,
            coordinator,
        }
    }

    /// Seeds the status channel with the stored pending count.
    pub async fn refresh_status(&self) -> Result<(), crate::persist::PersistError> {
        let pending = self.store.count().await?;
        self.status.set_pending(pending);
        Ok(())
    }

    /// Starts the background trigger loop; see [`spawn_sync_runtime`].
    pub fn spawn_runtime(&self) -> SyncHandle {
        spawn_sync_runtime(Arc::clone(&self.coordinator))
    }
}
