//! # Dashboard Feed
//!
//! Background task that turns sync events into dashboard state.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SyncStore ──(broadcast SyncEvent)──► DashboardFeed task              │
//! │                                           │                             │
//! │                                           │ view() + Aggregator         │
//! │                                           ▼                             │
//! │                                   watch<DashboardState> ──► UI         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every event triggers a recompute from the store's current snapshots, so
//! a lagged receiver only skips intermediate states, never the latest one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ts_rs::TS;

use tollgate_core::aggregate::recent_sales;
use tollgate_core::{Aggregates, Aggregator, FullRecompute, RecentSale};

use crate::config::DashboardSettings;
use crate::snapshot::{SyncEvent, SyncHealth};
use crate::sync_store::SyncStore;

/// Everything the dashboard renders.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardState {
    pub aggregates: Aggregates,
    pub recent_sales: Vec<RecentSale>,
    pub health: SyncHealth,
}

/// Computes dashboard state from the store's current view.
pub struct DashboardFeed<A = FullRecompute> {
    sync: Arc<SyncStore>,
    settings: DashboardSettings,
    aggregator: A,
    state_tx: watch::Sender<DashboardState>,
}

impl DashboardFeed<FullRecompute> {
    /// Spawns a feed using [`FullRecompute`].
    pub fn spawn(sync: Arc<SyncStore>, settings: DashboardSettings) -> DashboardHandle {
        Self::spawn_with(sync, settings, FullRecompute)
    }
}

impl<A: Aggregator + Send + 'static> DashboardFeed<A> {
    /// Spawns a feed with a custom aggregator.
    pub fn spawn_with(
        sync: Arc<SyncStore>,
        settings: DashboardSettings,
        aggregator: A,
    ) -> DashboardHandle {
        // Subscribe before the first compute so no event is missed in between.
        let events = sync.events();

        let mut feed = DashboardFeed {
            sync,
            settings,
            aggregator,
            state_tx: watch::channel(DashboardState::default()).0,
        };
        feed.recompute();

        let state_rx = feed.state_tx.subscribe();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(feed.run(events, cancel.clone()));

        DashboardHandle {
            state_rx,
            cancel,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    fn recompute(&mut self) {
        let view = self.sync.view();
        let aggregates = self.aggregator.aggregate(view.as_view());
        let recent = recent_sales(
            &view.terminals.items,
            &view.sales.items,
            self.settings.recent_sales,
        );

        self.state_tx.send_replace(DashboardState {
            aggregates,
            recent_sales: recent,
            health: self.sync.health(),
        });
    }

    async fn run(mut self, mut events: broadcast::Receiver<SyncEvent>, cancel: CancellationToken) {
        debug!("Dashboard feed started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = events.recv() => match received {
                    Ok(event) => {
                        debug!(topic = %event.topic(), "Recomputing dashboard");
                        self.recompute();
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Dashboard feed lagged; recomputing from current view");
                        self.recompute();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        info!("Dashboard feed stopped");
    }
}

// =============================================================================
// Dashboard Handle
// =============================================================================

/// Handle to a running dashboard feed.
#[derive(Debug, Clone)]
pub struct DashboardHandle {
    state_rx: watch::Receiver<DashboardState>,
    cancel: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl DashboardHandle {
    /// Returns the latest state.
    pub fn state(&self) -> DashboardState {
        self.state_rx.borrow().clone()
    }

    /// Returns a receiver that is notified on every recompute.
    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state_rx.clone()
    }

    /// Stops the feed and waits for it to exit. Safe to call twice.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Dashboard feed task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tollgate_core::Money;
    use tollgate_store::{Collection, DocumentWrite, MemoryStore, RecordStore};

    use crate::config::SyncConfig;
    use crate::session::ActorId;

    async fn wait_until(
        rx: &mut watch::Receiver<DashboardState>,
        predicate: impl FnMut(&DashboardState) -> bool,
    ) -> DashboardState {
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
            .await
            .expect("timed out waiting for dashboard")
            .expect("dashboard feed closed")
            .clone()
    }

    #[tokio::test]
    async fn test_feed_follows_sales() {
        let memory = MemoryStore::new();
        let config = Arc::new(SyncConfig::default());
        let sync = Arc::new(SyncStore::new(Arc::new(memory.clone()), config.clone()));
        sync.attach(ActorId::new("operator-1")).await.unwrap();

        let handle = DashboardFeed::spawn(sync.clone(), config.dashboard.clone());
        let mut rx = handle.subscribe();
        wait_until(&mut rx, |s| s.health.all_live()).await;

        let machines = config.collection(Collection::Machines);
        memory
            .write_one(
                &machines,
                "m1",
                DocumentWrite::new().set("name", "Kiosk A").set("paperLevel", 10),
            )
            .await
            .unwrap();
        memory
            .write_one(
                &config.collection(Collection::Sales),
                "s1",
                DocumentWrite::new()
                    .set("machineId", "m1")
                    .set("tokenCode", "ABC123")
                    .set("price", 10_000)
                    .set("franchiseeFee", 1_000)
                    .with_server_timestamp("timestamp"),
            )
            .await
            .unwrap();

        let state = wait_until(&mut rx, |s| s.aggregates.summary.total_sales == 1).await;
        assert_eq!(state.aggregates.summary.total_revenue, Money::from_rupiah(10_000));
        assert_eq!(state.aggregates.summary.low_stock_terminals, 1);
        assert_eq!(state.recent_sales.len(), 1);
        assert_eq!(state.recent_sales[0].terminal_name, "Kiosk A");

        handle.shutdown().await;
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_feed_reports_failed_topic() {
        let memory = MemoryStore::new();
        let config = Arc::new(SyncConfig::default());
        let sync = Arc::new(SyncStore::new(Arc::new(memory.clone()), config.clone()));
        sync.attach(ActorId::new("operator-1")).await.unwrap();

        let handle = DashboardFeed::spawn(sync.clone(), DashboardSettings::default());
        let mut rx = handle.subscribe();

        memory.break_subscriptions().await;
        let state = wait_until(&mut rx, |s| s.health.sales.is_failed()).await;
        assert!(!state.health.all_live());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_health_follows_refused_resubscribe_and_detach() {
        let memory = MemoryStore::new();
        let config = Arc::new(SyncConfig::default());
        let sync = Arc::new(SyncStore::new(Arc::new(memory.clone()), config.clone()));
        sync.attach(ActorId::new("operator-1")).await.unwrap();

        let handle = DashboardFeed::spawn(sync.clone(), DashboardSettings::default());
        let mut rx = handle.subscribe();
        wait_until(&mut rx, |s| s.health.all_live()).await;

        memory.deny_reads(true).await;
        assert!(sync.attach(ActorId::new("operator-2")).await.is_err());
        let refused = sync.health();
        assert!(refused.terminals.is_failed());

        let state = wait_until(&mut rx, |s| s.health == refused).await;
        assert!(state.health.sales.is_failed());
        assert_eq!(handle.state().health, sync.health());

        sync.detach().await;
        let idle = SyncHealth::default();
        wait_until(&mut rx, |s| s.health == idle).await;
        assert_eq!(handle.state().health, sync.health());

        handle.shutdown().await;
    }
}
