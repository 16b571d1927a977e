//! Timer and online-event source for automatic sync.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Default spacing between automatic sync ticks: ten minutes.
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 600_000;

/// Owns one recurring timer and one "network became available" signal;
/// both invoke the supplied tick callback. The callback does its own
/// error handling; nothing here catches or logs tick failures.
///
/// `start` and `stop` are idempotent. Dropping a running lifecycle
/// stops it.
pub struct SyncLifecycle {
    interval: Duration,
    online: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl SyncLifecycle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            online: Arc::new(Notify::new()),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Begin ticking. A second call while running is a no-op.
    pub fn start<F, Fut>(&mut self, tick: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send,
    {
        if self.handle.is_some() {
            return;
        }
        let online = self.online.clone();
        let period = self.interval;
        self.handle = Some(tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately; consume it
            // so starting the lifecycle is not itself a sync trigger.
            timer.tick().await;
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        debug!("sync timer tick");
                        tick().await;
                    }
                    _ = online.notified() => {
                        debug!("network online, syncing immediately");
                        tick().await;
                    }
                }
            }
        }));
    }

    /// Stop ticking and detach the online listener. Safe to call when
    /// not running.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Report that the network became available; fires an immediate
    /// tick if the lifecycle is running.
    pub fn notify_online(&self) {
        self.online.notify_one();
    }
}

impl Drop for SyncLifecycle {
    fn drop(&mut self) {
        self.stop();
    }
}
