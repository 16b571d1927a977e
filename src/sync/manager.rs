//! Top-level sync coordinator.
//!
//! Owns the push/pull cycle, the periodic lifecycle, the debounced
//! change trigger, and the gating flags (enabled, online, already
//! syncing). Everything below it is policy-free plumbing; this is
//! where the pieces are wired together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::db::LocalStore;
use crate::error::Result;
use crate::models::now_ms;
use crate::remote::RemoteAdapter;
use crate::sync::lifecycle::{SyncLifecycle, DEFAULT_SYNC_INTERVAL_MS};
use crate::sync::pusher::SyncPusher;
use crate::sync::resolver::{ConflictPolicy, ConflictResolver};
use crate::sync::strategy::{DeltaSync, FullCollectionSync};

/// Quiet window before a burst of local mutations triggers a sync.
const DEBOUNCE_MS: u64 = 500;

/// Broadcast to subscribers after a sync cycle changed (or may have
/// changed) local storage, so UI layers can refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StorageChanged {
    pub at: i64,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub interval_ms: u64,
    pub policy: ConflictPolicy,
    pub enabled: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SYNC_INTERVAL_MS,
            policy: ConflictPolicy::default(),
            enabled: true,
        }
    }
}

/// Clears the in-flight flag when the cycle ends, however it ends.
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct ManagerInner {
    local: LocalStore,
    remote: Arc<dyn RemoteAdapter>,
    resolver: Arc<dyn ConflictResolver>,
    enabled: AtomicBool,
    online: AtomicBool,
    is_syncing: AtomicBool,
    changed_tx: broadcast::Sender<StorageChanged>,
}

impl ManagerInner {
    fn can_sync(&self) -> bool {
        self.enabled.load(Ordering::SeqCst) && self.online.load(Ordering::SeqCst)
    }

    /// One push-then-pull cycle. Skipped silently when disabled,
    /// offline, or a cycle is already in flight. Errors are logged and
    /// swallowed; the next timer tick retries.
    async fn run_cycle(&self, full: bool) {
        if !self.can_sync() {
            debug!("sync skipped, disabled or offline");
            return;
        }
        if self.is_syncing.swap(true, Ordering::SeqCst) {
            debug!("sync skipped, cycle already in flight");
            return;
        }
        // Cleared on every exit path, cancellation included.
        let _in_flight = SyncingGuard(&self.is_syncing);

        let outcome = self.cycle(full).await;

        match outcome {
            Ok(()) => {
                info!(full, "sync cycle complete");
                let _ = self.changed_tx.send(StorageChanged { at: now_ms() });
            }
            Err(err) => warn!(error = %err, "sync cycle failed"),
        }
    }

    async fn cycle(&self, full: bool) -> Result<()> {
        let pusher = SyncPusher::new(self.local.clone(), self.remote.clone());
        let stats = pusher.push().await?;
        debug!(
            processed = stats.processed,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "push pass done"
        );

        if full {
            FullCollectionSync::new(
                self.local.clone(),
                self.remote.clone(),
                self.resolver.clone(),
            )
            .sync()
            .await?;
        } else {
            DeltaSync::new(
                self.local.clone(),
                self.remote.clone(),
                self.resolver.clone(),
            )
            .sync()
            .await?;
        }

        self.local.set_last_sync_timestamp(now_ms()).await?;
        Ok(())
    }
}

/// Coordinates automatic and on-demand synchronization for one local
/// store against one remote.
pub struct SyncManager {
    inner: Arc<ManagerInner>,
    lifecycle: Mutex<SyncLifecycle>,
    trigger_tx: mpsc::UnboundedSender<()>,
    debounce_handle: JoinHandle<()>,
}

impl SyncManager {
    pub fn new(local: LocalStore, remote: Arc<dyn RemoteAdapter>, options: SyncOptions) -> Self {
        let resolver = options.policy.resolver(local.clone());
        let (changed_tx, _) = broadcast::channel(16);
        let inner = Arc::new(ManagerInner {
            local,
            remote,
            resolver,
            enabled: AtomicBool::new(options.enabled),
            online: AtomicBool::new(true),
            is_syncing: AtomicBool::new(false),
            changed_tx,
        });

        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let debounce_handle = tokio::spawn(Self::debounce_worker(inner.clone(), trigger_rx));

        Self {
            inner,
            lifecycle: Mutex::new(SyncLifecycle::new(Duration::from_millis(
                options.interval_ms,
            ))),
            trigger_tx,
            debounce_handle,
        }
    }

    /// Collapses a burst of change notifications into one delta sync
    /// after a quiet window.
    async fn debounce_worker(inner: Arc<ManagerInner>, mut rx: mpsc::UnboundedReceiver<()>) {
        while rx.recv().await.is_some() {
            loop {
                match tokio::time::timeout(Duration::from_millis(DEBOUNCE_MS), rx.recv()).await {
                    Ok(Some(())) => continue,
                    Ok(None) => return,
                    Err(_) => break,
                }
            }
            inner.run_cycle(false).await;
        }
    }

    /// Begin periodic sync. Idempotent.
    pub fn start(&self) {
        let inner = self.inner.clone();
        self.lifecycle
            .lock()
            .expect("lifecycle lock poisoned")
            .start(move || {
                let inner = inner.clone();
                async move { inner.run_cycle(false).await }
            });
    }

    /// Stop periodic sync. Idempotent; on-demand sync still works.
    pub fn stop(&self) {
        self.lifecycle.lock().expect("lifecycle lock poisoned").stop();
    }

    /// Run one delta cycle now, bypassing debounce but not the gates.
    pub async fn sync_once(&self) {
        self.inner.run_cycle(false).await;
    }

    /// Run one full-collection cycle now.
    pub async fn sync_full(&self) {
        self.inner.run_cycle(true).await;
    }

    /// Report a local mutation; a debounced delta sync follows.
    pub fn trigger_sync(&self) {
        let _ = self.trigger_tx.send(());
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Update connectivity. Coming back online fires an immediate
    /// lifecycle tick so queued work drains without waiting for the
    /// timer.
    pub fn set_online(&self, online: bool) {
        let was = self.inner.online.swap(online, Ordering::SeqCst);
        if online && !was {
            self.lifecycle
                .lock()
                .expect("lifecycle lock poisoned")
                .notify_online();
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.is_syncing.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChanged> {
        self.inner.changed_tx.subscribe()
    }
}

impl Drop for SyncManager {
    fn drop(&mut self) {
        self.stop();
        self.debounce_handle.abort();
    }
}
