//! Treedeck
//!
//! Offline-first storage and sync for a tree of nodes, each carrying an
//! ordered deck of key/value fields. The local SQLite store is always
//! authoritative; a remote server converges eventually through a queue
//! of pending mutations and pull-side reconciliation.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod sync;

pub use config::{Config, ConfigError, SyncSettings};
pub use db::{init_db, LocalStore, NodePatch};
pub use error::{Error, Result};
pub use models::{
    EntityType, Field, FieldHistoryEntry, HistoryAction, Node, QueueOperation, QueueStatus,
    SyncQueueItem,
};
pub use remote::{check_server, HttpRemote, MemoryRemote, RemoteAdapter};
pub use sync::{ConflictPolicy, StorageChanged, SyncManager, SyncOptions};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
