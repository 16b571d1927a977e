//! Push, pull, conflict resolution, and scheduling.

pub mod lifecycle;
pub mod manager;
pub mod pusher;
pub mod resolver;
pub mod strategy;

pub use lifecycle::{SyncLifecycle, DEFAULT_SYNC_INTERVAL_MS};
pub use manager::{StorageChanged, SyncManager, SyncOptions};
pub use pusher::{PushStats, SyncPusher, MAX_PUSH_RETRIES};
pub use resolver::{ConflictPolicy, ConflictResolver, LastWriteWins, Resolution, ServerAuthority};
pub use strategy::{DeltaSync, FullCollectionSync};
