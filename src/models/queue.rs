use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::now_ms;

/// Which table a queue item's payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    Node,
    Field,
    FieldHistory,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Node => "node",
            EntityType::Field => "field",
            EntityType::FieldHistory => "field-history",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "node" => Some(EntityType::Node),
            "field" => Some(EntityType::Field),
            "field-history" => Some(EntityType::FieldHistory),
            _ => None,
        }
    }
}

/// The local mutation a queue item replays against the remote store.
///
/// Deletes are soft deletes; the payload snapshot carries the
/// entity with `deleted_at` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueOperation {
    CreateNode,
    UpdateNode,
    DeleteNode,
    CreateField,
    UpdateField,
    DeleteField,
    CreateHistory,
}

impl QueueOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueOperation::CreateNode => "create-node",
            QueueOperation::UpdateNode => "update-node",
            QueueOperation::DeleteNode => "delete-node",
            QueueOperation::CreateField => "create-field",
            QueueOperation::UpdateField => "update-field",
            QueueOperation::DeleteField => "delete-field",
            QueueOperation::CreateHistory => "create-history",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create-node" => Some(QueueOperation::CreateNode),
            "update-node" => Some(QueueOperation::UpdateNode),
            "delete-node" => Some(QueueOperation::DeleteNode),
            "create-field" => Some(QueueOperation::CreateField),
            "update-field" => Some(QueueOperation::UpdateField),
            "delete-field" => Some(QueueOperation::DeleteField),
            "create-history" => Some(QueueOperation::CreateHistory),
            _ => None,
        }
    }
}

/// Lifecycle of a queue item. `Pending` items are visible to the
/// pusher; `Failed` items stay invisible until promoted back to
/// `Pending` by the retry pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Syncing,
    Synced,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Syncing => "syncing",
            QueueStatus::Synced => "synced",
            QueueStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QueueStatus::Pending),
            "syncing" => Some(QueueStatus::Syncing),
            "synced" => Some(QueueStatus::Synced),
            "failed" => Some(QueueStatus::Failed),
            _ => None,
        }
    }
}

/// A pending outbound mutation. Created in the same local transaction
/// as the entity write it represents; deleted once the remote confirms
/// it; kept with `Failed` status and an incremented retry count when a
/// push fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueItem {
    pub id: String,
    pub operation: QueueOperation,
    pub entity_type: EntityType,
    pub entity_id: String,
    /// Snapshot of the entity at enqueue time.
    pub payload: serde_json::Value,
    pub timestamp: i64,
    pub status: QueueStatus,
    pub retry_count: i64,
    pub last_error: Option<String>,
}

impl SyncQueueItem {
    pub fn new(
        operation: QueueOperation,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            operation,
            entity_type,
            entity_id: entity_id.into(),
            payload,
            timestamp: now_ms(),
            status: QueueStatus::Pending,
            retry_count: 0,
            last_error: None,
        }
    }
}
