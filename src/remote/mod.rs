//! Remote store adapters.
//!
//! Application code never writes the remote store directly; it is
//! reached only through [`crate::sync::SyncPusher`] (pushing queued
//! mutations via [`RemoteAdapter::apply_sync_item`]) and the pull
//! strategies (bulk and since-timestamp reads).

mod http;
mod memory;

pub use http::{check_server, HttpRemote};
pub use memory::MemoryRemote;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Field, FieldHistoryEntry, Node, SyncQueueItem};

/// A durable remote store mirroring the local entity surface, plus the
/// bulk and incremental pull primitives reconciliation needs.
#[async_trait]
pub trait RemoteAdapter: Send + Sync {
    /// The complete remote node collection.
    async fn pull_all_nodes(&self) -> Result<Vec<Node>>;

    /// The complete remote field collection.
    async fn pull_all_fields(&self) -> Result<Vec<Field>>;

    /// The complete remote history collection.
    async fn pull_all_history(&self) -> Result<Vec<FieldHistoryEntry>>;

    /// Nodes updated strictly after `since` (epoch ms).
    async fn pull_nodes_since(&self, since: i64) -> Result<Vec<Node>>;

    /// Fields updated strictly after `since` (epoch ms).
    async fn pull_fields_since(&self, since: i64) -> Result<Vec<Field>>;

    /// History entries written strictly after `since` (epoch ms).
    async fn pull_history_since(&self, since: i64) -> Result<Vec<FieldHistoryEntry>>;

    /// Interpret one queued local mutation and perform the equivalent
    /// remote write. Writes are upserts keyed by entity id, so replays
    /// of the same item are harmless (push is at-least-once).
    async fn apply_sync_item(&self, item: &SyncQueueItem) -> Result<()>;
}
