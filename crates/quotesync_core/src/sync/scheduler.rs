//! Periodic sync task.
//!
//! Runs one cycle immediately, then one per interval. Can be forced early
//! and is stopped through a cancellation token so no timer outlives its
//! owner.

use crate::service::quote_store::QuoteStore;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const FORCE_QUEUE_CAPACITY: usize = 4;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Handle to the background sync loop.
pub struct SyncScheduler {
    cancel: CancellationToken,
    force_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl SyncScheduler {
    /// Spawns the loop on the current tokio runtime.
    pub fn spawn(store: Arc<QuoteStore>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let (force_tx, force_rx) = mpsc::channel(FORCE_QUEUE_CAPACITY);
        let task = tokio::spawn(sync_loop(store, interval, cancel.clone(), force_rx));
        info!(
            "event=sync_scheduler module=sync status=started interval_ms={}",
            interval.as_millis()
        );
        Self {
            cancel,
            force_tx,
            task: Some(task),
        }
    }

    /// Requests an immediate cycle; dropped if requests are already queued.
    pub fn trigger(&self) {
        if self.force_tx.try_send(()).is_err() {
            debug!("event=sync_scheduler module=sync status=force_dropped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancels the loop and waits for an in-flight cycle to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("event=sync_scheduler module=sync status=shutdown_timeout");
            }
        }
        info!("event=sync_scheduler module=sync status=stopped");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn sync_loop(
    store: Arc<QuoteStore>,
    interval: Duration,
    cancel: CancellationToken,
    mut force_rx: mpsc::Receiver<()>,
) {
    let mut ticker = time::interval(interval);
    // Skip instead of bursting when a cycle overruns the period.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => run_cycle(&store, "tick").await,
            Some(()) = force_rx.recv() => run_cycle(&store, "forced").await,
        }
    }
}

async fn run_cycle(store: &QuoteStore, trigger: &str) {
    let report = store.sync().await;
    debug!(
        "event=sync_cycle module=sync status=done trigger={trigger} applied={} conflicts={} remote_unavailable={}",
        report.applied,
        report.conflicts.len(),
        report.is_remote_unavailable()
    );
}
