//! Conflict resolution for incoming remote records.
//!
//! Two interchangeable policies decide whether a pulled remote record
//! overwrites the local copy. Both are pure functions of the remote
//! record and local state; the only side effect is the conditional
//! `apply_remote_*` upsert.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::LocalStore;
use crate::error::Result;
use crate::models::{Field, Node};

/// Outcome of resolving one remote record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The remote record overwrote the local copy.
    Applied,
    /// The local copy won; no write happened.
    Skipped,
}

#[async_trait]
pub trait ConflictResolver: Send + Sync {
    async fn resolve_node(&self, remote: &Node) -> Result<Resolution>;
    async fn resolve_field(&self, remote: &Field) -> Result<Resolution>;
}

/// Which resolver a sync engine runs with. Last-write-wins is the
/// production default; server-authority stays available as the
/// pluggable alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    #[default]
    Lww,
    Server,
}

impl ConflictPolicy {
    pub fn resolver(&self, local: LocalStore) -> Arc<dyn ConflictResolver> {
        match self {
            ConflictPolicy::Lww => Arc::new(LastWriteWins::new(local)),
            ConflictPolicy::Server => Arc::new(ServerAuthority::new(local)),
        }
    }
}

/// Prefers whichever copy carries the greater `updated_at`; the local
/// copy wins ties. A missing local counterpart is applied
/// unconditionally.
pub struct LastWriteWins {
    local: LocalStore,
}

impl LastWriteWins {
    pub fn new(local: LocalStore) -> Self {
        Self { local }
    }
}

#[async_trait]
impl ConflictResolver for LastWriteWins {
    async fn resolve_node(&self, remote: &Node) -> Result<Resolution> {
        match self.local.get_node(&remote.id).await? {
            Some(local) if remote.updated_at <= local.updated_at => {
                debug!(node_id = %remote.id, "local node is newer or tied, skipping");
                Ok(Resolution::Skipped)
            }
            _ => {
                self.local.apply_remote_node(remote).await?;
                Ok(Resolution::Applied)
            }
        }
    }

    async fn resolve_field(&self, remote: &Field) -> Result<Resolution> {
        match self.local.get_field(&remote.id).await? {
            Some(local) if remote.updated_at <= local.updated_at => {
                debug!(field_id = %remote.id, "local field is newer or tied, skipping");
                Ok(Resolution::Skipped)
            }
            _ => {
                self.local.apply_remote_field(remote).await?;
                Ok(Resolution::Applied)
            }
        }
    }
}

/// Always takes the remote record, unless a local edit for the same
/// entity is still waiting in the push queue; in-flight local writes
/// are protected until they reach the server.
pub struct ServerAuthority {
    local: LocalStore,
}

impl ServerAuthority {
    pub fn new(local: LocalStore) -> Self {
        Self { local }
    }

    async fn resolve_id(&self, entity_id: &str) -> Result<bool> {
        let pending = self.local.pending_entity_ids().await?;
        Ok(!pending.contains(entity_id))
    }
}

#[async_trait]
impl ConflictResolver for ServerAuthority {
    async fn resolve_node(&self, remote: &Node) -> Result<Resolution> {
        if self.resolve_id(&remote.id).await? {
            self.local.apply_remote_node(remote).await?;
            Ok(Resolution::Applied)
        } else {
            debug!(node_id = %remote.id, "local push pending, skipping remote node");
            Ok(Resolution::Skipped)
        }
    }

    async fn resolve_field(&self, remote: &Field) -> Result<Resolution> {
        if self.resolve_id(&remote.id).await? {
            self.local.apply_remote_field(remote).await?;
            Ok(Resolution::Applied)
        } else {
            debug!(field_id = %remote.id, "local push pending, skipping remote field");
            Ok(Resolution::Skipped)
        }
    }
}
