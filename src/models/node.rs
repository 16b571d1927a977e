use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::now_ms;

/// A tree entity. `parent_id = None` marks a root. Nodes are only ever
/// attached at creation time, so cycles cannot form.
///
/// Deleting is soft: `deleted_at` carries the deletion timestamp and the
/// record stays in place until reconciliation confirms it gone remotely.
/// Children of a soft-deleted node are not cascaded; they become
/// unreachable through active listing until the parent is restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub name: String,
    pub subtitle: String,
    pub parent_id: Option<String>,
    pub updated_by: String,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Node {
    pub fn new(name: impl Into<String>, updated_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            subtitle: String::new(),
            parent_id: None,
            updated_by: updated_by.into(),
            updated_at: now_ms(),
            deleted_at: None,
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
