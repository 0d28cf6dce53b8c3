//! Network monitor and the auto-sync-on-reconnect loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::engine::ScoutSync;

/// Online flag plus the time of the last transition in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Connectivity {
    pub online: bool,
    pub last_online_at: Option<DateTime<Utc>>,
    pub last_offline_at: Option<DateTime<Utc>>,
}

/// Holds the current connectivity state and broadcasts transitions.
pub struct NetworkMonitor {
    state: watch::Sender<Connectivity>,
}

impl NetworkMonitor {
    #[must_use]
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(Connectivity {
            online,
            ..Connectivity::default()
        });
        Self { state }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.state.borrow().online
    }

    #[must_use]
    pub fn snapshot(&self) -> Connectivity {
        *self.state.borrow()
    }

    /// Record a connectivity signal. Returns `true` if it was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if state.online == online {
                return false;
            }
            state.online = online;
            if online {
                state.last_online_at = Some(Utc::now());
            } else {
                state.last_offline_at = Some(Utc::now());
            }
            true
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
        changed
    }

    /// Receive every connectivity transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.state.subscribe()
    }
}

/// Source of connectivity signals.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Probe connectivity every `interval` and feed the result into `monitor`.
pub fn poll_connectivity(
    monitor: Arc<NetworkMonitor>,
    probe: Arc<dyn ConnectivityProbe>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let online = probe.is_reachable().await;
            monitor.set_online(online);
        }
    })
}

/// Run automatic sync passes for as long as the engine lives.
///
/// A pass is started once at startup if online, and after every reconnect
/// once the connection has stayed up for the settle delay. A pass that
/// records failures schedules a follow-up pass with exponential backoff.
pub fn spawn_auto_sync(engine: Arc<ScoutSync>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut connectivity = engine.network().subscribe();
        let settle_delay = engine.options().settle_delay;
        let mut failing_passes = 0;

        let mut retry_at = if connectivity.borrow_and_update().online {
            auto_pass(&engine, &mut failing_passes).await
        } else {
            None
        };

        loop {
            tokio::select! {
                changed = connectivity.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if !connectivity.borrow_and_update().online {
                        continue;
                    }
                    tokio::time::sleep(settle_delay).await;
                    if !engine.network().is_online() {
                        tracing::debug!("connection dropped while settling");
                        continue;
                    }
                    tracing::info!("reconnected, starting auto-sync");
                    retry_at = auto_pass(&engine, &mut failing_passes).await;
                }
                () = wait_until(retry_at) => {
                    retry_at = None;
                    if engine.network().is_online() {
                        tracing::info!(failing_passes, "retrying after backoff");
                        retry_at = auto_pass(&engine, &mut failing_passes).await;
                    }
                }
            }
        }
    })
}

/// Run one automatic pass and work out when the next one is due.
async fn auto_pass(engine: &ScoutSync, failing_passes: &mut u32) -> Option<Instant> {
    match engine.auto_sync_pass().await {
        Ok(Some(result)) if result.failed > 0 => {
            *failing_passes = failing_passes.saturating_add(1);
            let delay = engine.sync_config().backoff_delay(*failing_passes);
            tracing::debug!(?delay, "scheduling retry pass");
            Some(Instant::now() + delay)
        }
        Ok(_) => {
            *failing_passes = 0;
            None
        }
        Err(e) if e.is_invariant_violation() => {
            tracing::debug!(error = %e, "auto-sync skipped");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "auto-sync failed");
            None
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
