//! Queue drain: pushes pending local mutations to the remote store.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::LocalStore;
use crate::error::Result;
use crate::remote::RemoteAdapter;

/// Give up on a queue item after this many failed pushes. Items at the
/// cap stay in the queue with `failed` status, visible to ops tooling
/// but never retried automatically.
pub const MAX_PUSH_RETRIES: i64 = 5;

/// Outcome counts for one push pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushStats {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Drains the sync queue against the remote adapter, one item at a
/// time in FIFO order. A failing item is recorded and skipped; it
/// never blocks the rest of the batch. Pushing is at-least-once:
/// remote writes are upserts keyed by entity id, so replays after a
/// crash are harmless.
pub struct SyncPusher {
    local: LocalStore,
    remote: Arc<dyn RemoteAdapter>,
}

impl SyncPusher {
    pub fn new(local: LocalStore, remote: Arc<dyn RemoteAdapter>) -> Self {
        Self { local, remote }
    }

    pub async fn push(&self) -> Result<PushStats> {
        let promoted = self.local.requeue_failed(MAX_PUSH_RETRIES).await?;
        if promoted > 0 {
            debug!(promoted, "promoted failed queue items for retry");
        }

        let queue = self.local.get_sync_queue().await?;
        let mut stats = PushStats {
            processed: queue.len(),
            ..PushStats::default()
        };

        for item in queue {
            self.local.mark_syncing(&item.id).await?;
            match self.remote.apply_sync_item(&item).await {
                Ok(()) => {
                    self.local.mark_synced(&item.id).await?;
                    stats.succeeded += 1;
                }
                Err(e) => {
                    warn!(
                        item_id = %item.id,
                        entity_id = %item.entity_id,
                        operation = item.operation.as_str(),
                        error = %e,
                        "push failed, leaving item for retry"
                    );
                    self.local.mark_failed(&item.id, &e.to_string()).await?;
                    stats.failed += 1;
                }
            }
        }

        if stats.processed > 0 {
            debug!(
                processed = stats.processed,
                succeeded = stats.succeeded,
                failed = stats.failed,
                "push pass finished"
            );
        }
        Ok(stats)
    }
}
