//! Single source of truth for network reachability.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};

use crate::remote::http::check_server;

/// Discrete connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// The network became reachable.
    Online,
    /// The network became unreachable.
    Offline,
}

impl Connectivity {
    fn from_online(online: bool) -> Self {
        if online { Self::Online } else { Self::Offline }
    }
}

/// Tracks whether the remote service is reachable.
///
/// The host feeds its platform signal through [`ConnectivityMonitor::set_online`]
/// (or lets [`ConnectivityMonitor::spawn_probe`] poll a health URL). Only real
/// transitions are published.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    state: Arc<watch::Sender<bool>>,
    events: broadcast::Sender<Connectivity>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        let (events, _) = broadcast::channel(64);
        Self {
            state: Arc::new(state),
            events,
        }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Records the current reachability; returns true on a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            let event = Connectivity::from_online(online);
            tracing::info!(?event, "connectivity changed");
            let _ = self.events.send(event);
        }
        changed
    }

    /// Latest-value view, suited to `changed().await` loops.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }

    /// Every transition, in order.
    pub fn transitions(&self) -> broadcast::Receiver<Connectivity> {
        self.events.subscribe()
    }

    /// Polls `health_url` every `interval` and feeds the result back in.
    ///
    /// Any HTTP response counts as reachable. The task ends when the
    /// returned handle is aborted.
    pub fn spawn_probe(
        &self,
        health_url: impl Into<String>,
        interval: Duration,
        timeout: Duration,
    ) -> Result<JoinHandle<()>, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let url = health_url.into();
        let monitor = self.clone();
        Ok(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let reachable = check_server(&client, &url).await;
                tracing::trace!(%url, reachable, "health check");
                monitor.set_online(reachable);
            }
        }))
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}
