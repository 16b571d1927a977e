use serde::{Deserialize, Serialize};

/// Kind of change a history entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Create,
    Update,
    Delete,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Create => "create",
            HistoryAction::Update => "update",
            HistoryAction::Delete => "delete",
        }
    }

    /// Parse from the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(HistoryAction::Create),
            "update" => Some(HistoryAction::Update),
            "delete" => Some(HistoryAction::Delete),
            _ => None,
        }
    }
}

/// Append-only audit record for one field's value.
///
/// `rev` increases monotonically per field, starting at 0 on creation;
/// the id is the composite `"<fieldId>:<rev>"`, which makes history
/// writes idempotent upserts on both sides of the sync boundary.
/// Entries are never mutated or hard-deleted by normal operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHistoryEntry {
    pub id: String,
    pub data_field_id: String,
    pub parent_node_id: String,
    pub action: HistoryAction,
    pub prev_value: Option<String>,
    pub new_value: Option<String>,
    pub updated_by: String,
    pub updated_at: i64,
    pub rev: i64,
}

impl FieldHistoryEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        data_field_id: impl Into<String>,
        parent_node_id: impl Into<String>,
        action: HistoryAction,
        prev_value: Option<String>,
        new_value: Option<String>,
        updated_by: impl Into<String>,
        updated_at: i64,
        rev: i64,
    ) -> Self {
        let data_field_id = data_field_id.into();
        Self {
            id: format!("{}:{}", data_field_id, rev),
            data_field_id,
            parent_node_id: parent_node_id.into(),
            action,
            prev_value,
            new_value,
            updated_by: updated_by.into(),
            updated_at,
            rev,
        }
    }
}
