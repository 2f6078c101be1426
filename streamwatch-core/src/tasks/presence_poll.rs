// File: src/tasks/presence_poll.rs

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, sleep, Duration};
use tracing::{error, info};

use crate::config::WatchConfig;
use crate::scrape::ScrapeOrchestrator;
use crate::services::presence_monitor::PresenceMonitor;

/// Spawns the recurring poll driver: one warm-up check shortly after start,
/// then a fixed cadence until the stop signal flips.
///
/// The shutdown signal only interrupts the wait, never a cycle in progress;
/// once a tick has fired, that cycle runs to completion (bounded by its own
/// per-call timeouts) before the loop looks at the signal again.
pub fn spawn_presence_poll_task(
    monitor: Arc<PresenceMonitor>,
    config: &WatchConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    let warmup = Duration::from_secs(config.warmup_delay_secs);
    let cadence = Duration::from_secs(config.poll_interval_minutes.max(1) * 60);

    tokio::spawn(async move {
        info!(
            "presence monitor started with {} minute intervals",
            cadence.as_secs() / 60
        );

        // Warm-up check so a fresh process doesn't wait a full interval
        // before knowing anything.
        tokio::select! {
            _ = sleep(warmup) => monitor.run_cycle().await,
            changed = shutdown_rx.changed() => {
                // A dropped sender counts as a stop signal too.
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("presence monitor stopped before warm-up check");
                    return;
                }
            }
        }

        let mut ticker = interval(cadence);
        // interval() fires immediately; the warm-up check already covered
        // that slot.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => monitor.run_cycle().await,
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("presence monitor stopped");
                        return;
                    }
                }
            }
        }
    })
}

/// Owns the monitor's background task and enforces the shutdown order:
/// stop scheduling, let in-flight work drain, then close the shared scrape
/// resources.
pub struct MonitorRuntime {
    shutdown_tx: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
    orchestrator: Arc<ScrapeOrchestrator>,
}

impl MonitorRuntime {
    pub async fn start(
        monitor: Arc<PresenceMonitor>,
        orchestrator: Arc<ScrapeOrchestrator>,
        config: &WatchConfig,
    ) -> Self {
        orchestrator.init().await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = spawn_presence_poll_task(monitor, config, shutdown_rx);
        Self {
            shutdown_tx,
            handle,
            orchestrator,
        }
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            error!("presence poll task ended badly: {e}");
        }
        self.orchestrator.close().await;
        info!("monitor runtime shut down");
    }
}
