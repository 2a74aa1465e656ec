use std::sync::Arc;

use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    task::JoinSet,
    time::{Instant, MissedTickBehavior},
};

use crate::{
    remote::RemoteApi,
    sync::{PassOutcome, SyncError, coordinator::SyncCoordinator},
};

use super::events::{SyncEvent, Trigger};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("sync runtime is not running")]
    ChannelClosed,
}

/// Cloneable handle to a running sync loop.
///
/// Dropping the last handle stops the loop once in-flight passes finish.
pub struct SyncHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<SyncEvent>,
}

impl Clone for SyncHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

enum Command {
    SyncNow {
        resp: oneshot::Sender<Result<PassOutcome, SyncError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Starts the loop that turns triggers into sync passes.
///
/// Passes run on their own tasks, so a slow pass never blocks trigger
/// handling; the coordinator's single-flight flag turns overlapping
/// triggers into skips.
pub fn spawn_sync_runtime<R>(coordinator: Arc<SyncCoordinator<R>>) -> SyncHandle
where
    R: RemoteApi + ?Sized + 'static,
{
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(32);
    let (events_tx, _) = broadcast::channel::<SyncEvent>(256);
    let events_tx_loop = events_tx.clone();

    // Subscribed before spawning so a transition racing the first poll is not lost.
    let mut online_rx = coordinator.connectivity().subscribe();
    let mut was_online = *online_rx.borrow_and_update();

    tokio::spawn(async move {
        let period = coordinator.config().sync_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut watching = true;
        let mut passes = JoinSet::new();

        if was_online {
            spawn_pass(&mut passes, &coordinator, &events_tx_loop, Trigger::Startup, None);
        }

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        // Every handle is gone. In-flight passes must still
                        // record their remote successes before the loop exits.
                        while passes.join_next().await.is_some() {}
                        break;
                    };
                    match cmd {
                        Command::SyncNow { resp } => {
                            spawn_pass(&mut passes, &coordinator, &events_tx_loop, Trigger::Manual, Some(resp));
                        }
                        Command::Shutdown { resp } => {
                            while passes.join_next().await.is_some() {}
                            let _ = resp.send(());
                            break;
                        }
                    }
                }
                changed = online_rx.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                        continue;
                    }
                    let online = *online_rx.borrow_and_update();
                    if online == was_online {
                        continue;
                    }
                    was_online = online;
                    let _ = events_tx_loop.send(SyncEvent::ConnectivityChanged { online });
                    if online {
                        spawn_pass(&mut passes, &coordinator, &events_tx_loop, Trigger::Reconnected, None);
                    }
                }
                _ = ticker.tick() => {
                    if coordinator.connectivity().is_online() {
                        spawn_pass(&mut passes, &coordinator, &events_tx_loop, Trigger::Interval, None);
                    }
                }
                Some(joined) = passes.join_next(), if !passes.is_empty() => {
                    if let Err(err) = joined {
                        tracing::error!(error = %err, "sync pass task panicked");
                    }
                }
            }
        }
        tracing::debug!("sync runtime stopped");
    });

    SyncHandle { cmd_tx, events_tx }
}

impl SyncHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events_tx.subscribe()
    }

    /// Requests a pass now and waits for its outcome.
    ///
    /// Resolves to `Skipped(AlreadyRunning)` if another pass is in flight.
    pub async fn sync_now(&self) -> Result<PassOutcome, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SyncNow { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await
            .map_err(|_| RuntimeError::ChannelClosed)?
            .map_err(RuntimeError::from)
    }

    /// Stops the loop after in-flight passes finish.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

fn spawn_pass<R>(
    passes: &mut JoinSet<()>,
    coordinator: &Arc<SyncCoordinator<R>>,
    events_tx: &broadcast::Sender<SyncEvent>,
    trigger: Trigger,
    resp: Option<oneshot::Sender<Result<PassOutcome, SyncError>>>,
) where
    R: RemoteApi + ?Sized + 'static,
{
    let coordinator = Arc::clone(coordinator);
    let events_tx = events_tx.clone();
    passes.spawn(async move {
        let result = coordinator.run_sync_pass().await;
        let event = match &result {
            Ok(PassOutcome::Completed(report)) => SyncEvent::PassFinished {
                trigger,
                report: *report,
            },
            Ok(PassOutcome::Skipped(reason)) => SyncEvent::PassSkipped {
                trigger,
                reason: *reason,
            },
            Err(err) => {
                tracing::error!(?trigger, error = %err, "sync pass failed");
                SyncEvent::PassFailed {
                    trigger,
                    error: err.to_string(),
                }
            }
        };
        let _ = events_tx.send(event);
        if let Some(resp) = resp {
            let _ = resp.send(result);
        }
    });
}
