use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::now_ms;

/// A named value belonging to exactly one node. `card_order` positions
/// the field among its active siblings; the store keeps those values a
/// dense `0..n-1` sequence after every deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub name: String,
    pub value: Option<String>,
    pub parent_node_id: String,
    pub card_order: i64,
    pub updated_by: String,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Field {
    /// A new field for `parent_node_id`. The store assigns the real
    /// `card_order` at insert time.
    pub fn new(
        parent_node_id: impl Into<String>,
        name: impl Into<String>,
        updated_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            value: None,
            parent_node_id: parent_node_id.into(),
            card_order: 0,
            updated_by: updated_by.into(),
            updated_at: now_ms(),
            deleted_at: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
