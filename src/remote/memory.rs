//! In-process remote store.
//!
//! Serves as the fake remote in tests and as a stand-in backend for
//! embedded deployments that have no server. Carries the full
//! [`RemoteAdapter::apply_sync_item`] interpretation: field mutations
//! derive their matching remote history entry, and a field delete
//! recompacts the remote card order the same way the local store does.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::{Field, FieldHistoryEntry, HistoryAction, Node, QueueOperation, SyncQueueItem};
use crate::remote::RemoteAdapter;

#[derive(Debug, Default)]
struct RemoteState {
    nodes: HashMap<String, Node>,
    fields: HashMap<String, Field>,
    history: HashMap<String, FieldHistoryEntry>,
    /// Entity ids whose applies fail with `Unavailable`. Test hook for
    /// exercising per-item push failure paths.
    failing_entities: HashSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every apply touching `entity_id` fail with `Unavailable`.
    pub async fn inject_failure(&self, entity_id: impl Into<String>) {
        self.state.lock().await.failing_entities.insert(entity_id.into());
    }

    /// Clear all injected failures.
    pub async fn clear_failures(&self) {
        self.state.lock().await.failing_entities.clear();
    }

    /// Direct node upsert, bypassing the queue-item path. Used to seed
    /// remote-side state.
    pub async fn put_node(&self, node: Node) {
        self.state.lock().await.nodes.insert(node.id.clone(), node);
    }

    /// Direct field upsert, bypassing the queue-item path.
    pub async fn put_field(&self, field: Field) {
        self.state.lock().await.fields.insert(field.id.clone(), field);
    }

    /// Hard-delete a node remotely. Delta pulls cannot see this; only a
    /// full reconciliation pass will.
    pub async fn remove_node(&self, id: &str) {
        self.state.lock().await.nodes.remove(id);
    }

    /// Hard-delete a field remotely.
    pub async fn remove_field(&self, id: &str) {
        self.state.lock().await.fields.remove(id);
    }

    pub async fn node(&self, id: &str) -> Option<Node> {
        self.state.lock().await.nodes.get(id).cloned()
    }

    pub async fn field(&self, id: &str) -> Option<Field> {
        self.state.lock().await.fields.get(id).cloned()
    }

    pub async fn history_for(&self, field_id: &str) -> Vec<FieldHistoryEntry> {
        let state = self.state.lock().await;
        let mut entries: Vec<FieldHistoryEntry> = state
            .history
            .values()
            .filter(|e| e.data_field_id == field_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.rev);
        entries
    }
}

impl RemoteState {
    fn next_rev(&self, field_id: &str) -> i64 {
        self.history
            .values()
            .filter(|e| e.data_field_id == field_id)
            .map(|e| e.rev + 1)
            .max()
            .unwrap_or(0)
    }

    /// Derive the history entry the local side would have recorded for
    /// this field mutation, keyed by the same composite id so a pushed
    /// `create-history` item lands on the identical row.
    ///
    /// Push is at-least-once, so the same field item can arrive twice.
    /// A row with this field's `updated_at` and action already present
    /// means the mutation was derived before; deriving again would mint
    /// a spurious revision.
    fn derive_history(&mut self, field: &Field, action: HistoryAction, prev: Option<String>) {
        let already_derived = self.history.values().any(|e| {
            e.data_field_id == field.id && e.updated_at == field.updated_at && e.action == action
        });
        if already_derived {
            return;
        }
        let new_value = match action {
            HistoryAction::Delete => None,
            _ => field.value.clone(),
        };
        let entry = FieldHistoryEntry::new(
            field.id.clone(),
            field.parent_node_id.clone(),
            action,
            prev,
            new_value,
            field.updated_by.clone(),
            field.updated_at,
            self.next_rev(&field.id),
        );
        self.history.insert(entry.id.clone(), entry);
    }

    /// Renumber a node's active fields to `0..n-1`, mirroring the local
    /// invariant.
    fn compact_card_order(&mut self, node_id: &str) {
        let mut active: Vec<(i64, String)> = self
            .fields
            .values()
            .filter(|f| f.parent_node_id == node_id && !f.is_deleted())
            .map(|f| (f.card_order, f.id.clone()))
            .collect();
        // Preserve relative order before renumbering.
        active.sort();
        for (position, (_, id)) in active.iter().enumerate() {
            if let Some(field) = self.fields.get_mut(id) {
                field.card_order = position as i64;
            }
        }
    }
}

#[async_trait]
impl RemoteAdapter for MemoryRemote {
    async fn pull_all_nodes(&self) -> Result<Vec<Node>> {
        let state = self.state.lock().await;
        let mut nodes: Vec<Node> = state.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| (a.updated_at, &a.id).cmp(&(b.updated_at, &b.id)));
        Ok(nodes)
    }

    async fn pull_all_fields(&self) -> Result<Vec<Field>> {
        let state = self.state.lock().await;
        let mut fields: Vec<Field> = state.fields.values().cloned().collect();
        fields.sort_by(|a, b| (a.updated_at, &a.id).cmp(&(b.updated_at, &b.id)));
        Ok(fields)
    }

    async fn pull_all_history(&self) -> Result<Vec<FieldHistoryEntry>> {
        let state = self.state.lock().await;
        let mut entries: Vec<FieldHistoryEntry> = state.history.values().cloned().collect();
        entries.sort_by(|a, b| (&a.data_field_id, a.rev).cmp(&(&b.data_field_id, b.rev)));
        Ok(entries)
    }

    async fn pull_nodes_since(&self, since: i64) -> Result<Vec<Node>> {
        Ok(self
            .pull_all_nodes()
            .await?
            .into_iter()
            .filter(|n| n.updated_at > since)
            .collect())
    }

    async fn pull_fields_since(&self, since: i64) -> Result<Vec<Field>> {
        Ok(self
            .pull_all_fields()
            .await?
            .into_iter()
            .filter(|f| f.updated_at > since)
            .collect())
    }

    async fn pull_history_since(&self, since: i64) -> Result<Vec<FieldHistoryEntry>> {
        Ok(self
            .pull_all_history()
            .await?
            .into_iter()
            .filter(|e| e.updated_at > since)
            .collect())
    }

    async fn apply_sync_item(&self, item: &SyncQueueItem) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.failing_entities.contains(&item.entity_id) {
            return Err(Error::Unavailable(format!(
                "injected failure for {}",
                item.entity_id
            )));
        }

        match item.operation {
            QueueOperation::CreateNode | QueueOperation::UpdateNode | QueueOperation::DeleteNode => {
                let node: Node = serde_json::from_value(item.payload.clone())?;
                state.nodes.insert(node.id.clone(), node);
            }
            QueueOperation::CreateField => {
                let field: Field = serde_json::from_value(item.payload.clone())?;
                state.derive_history(&field, HistoryAction::Create, None);
                state.fields.insert(field.id.clone(), field);
            }
            QueueOperation::UpdateField => {
                let field: Field = serde_json::from_value(item.payload.clone())?;
                let prev = state.fields.get(&field.id).and_then(|f| f.value.clone());
                state.derive_history(&field, HistoryAction::Update, prev);
                state.fields.insert(field.id.clone(), field);
            }
            QueueOperation::DeleteField => {
                let field: Field = serde_json::from_value(item.payload.clone())?;
                let prev = state.fields.get(&field.id).and_then(|f| f.value.clone());
                state.derive_history(&field, HistoryAction::Delete, prev);
                let node_id = field.parent_node_id.clone();
                state.fields.insert(field.id.clone(), field);
                state.compact_card_order(&node_id);
            }
            QueueOperation::CreateHistory => {
                let entry: FieldHistoryEntry = serde_json::from_value(item.payload.clone())?;
                state.history.insert(entry.id.clone(), entry);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityType;

    fn item_for_node(op: QueueOperation, node: &Node) -> SyncQueueItem {
        SyncQueueItem::new(
            op,
            EntityType::Node,
            node.id.clone(),
            serde_json::to_value(node).unwrap(),
        )
    }

    fn item_for_field(op: QueueOperation, field: &Field) -> SyncQueueItem {
        SyncQueueItem::new(
            op,
            EntityType::Field,
            field.id.clone(),
            serde_json::to_value(field).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_apply_node_item_upserts() {
        let remote = MemoryRemote::new();
        let mut node = Node::new("Inbox", "alice");

        remote
            .apply_sync_item(&item_for_node(QueueOperation::CreateNode, &node))
            .await
            .unwrap();
        assert_eq!(remote.node(&node.id).await.unwrap().name, "Inbox");

        node.name = "Inbox v2".into();
        remote
            .apply_sync_item(&item_for_node(QueueOperation::UpdateNode, &node))
            .await
            .unwrap();
        assert_eq!(remote.node(&node.id).await.unwrap().name, "Inbox v2");
    }

    #[tokio::test]
    async fn test_create_field_derives_rev_zero_history() {
        let remote = MemoryRemote::new();
        let field = Field::new("node-1", "email", "alice").with_value("x");

        remote
            .apply_sync_item(&item_for_field(QueueOperation::CreateField, &field))
            .await
            .unwrap();

        let history = remote.history_for(&field.id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].rev, 0);
        assert_eq!(history[0].action, HistoryAction::Create);
        assert_eq!(history[0].new_value.as_deref(), Some("x"));
        assert_eq!(history[0].id, format!("{}:0", field.id));
    }

    #[tokio::test]
    async fn test_update_field_derives_history_with_remote_prev() {
        let remote = MemoryRemote::new();
        let mut field = Field::new("node-1", "email", "alice").with_value("x");
        remote
            .apply_sync_item(&item_for_field(QueueOperation::CreateField, &field))
            .await
            .unwrap();

        field.value = Some("y".into());
        remote
            .apply_sync_item(&item_for_field(QueueOperation::UpdateField, &field))
            .await
            .unwrap();

        let history = remote.history_for(&field.id).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].rev, 1);
        assert_eq!(history[1].prev_value.as_deref(), Some("x"));
        assert_eq!(history[1].new_value.as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn test_replayed_field_item_does_not_grow_history() {
        let remote = MemoryRemote::new();
        let mut field = Field::new("node-1", "email", "alice").with_value("x");

        // Push is at-least-once: the same item can arrive again after a
        // crash between apply and the local mark-synced.
        let create = item_for_field(QueueOperation::CreateField, &field);
        remote.apply_sync_item(&create).await.unwrap();
        remote.apply_sync_item(&create).await.unwrap();

        let history = remote.history_for(&field.id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].rev, 0);

        field.value = Some("y".into());
        field.updated_at += 1;
        let update = item_for_field(QueueOperation::UpdateField, &field);
        remote.apply_sync_item(&update).await.unwrap();
        remote.apply_sync_item(&update).await.unwrap();

        let history = remote.history_for(&field.id).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].rev, 1);
        assert_eq!(history[1].new_value.as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn test_delete_field_compacts_remote_card_order() {
        let remote = MemoryRemote::new();
        let mut fields = Vec::new();
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let mut f = Field::new("node-1", *name, "alice");
            f.card_order = i as i64;
            remote
                .apply_sync_item(&item_for_field(QueueOperation::CreateField, &f))
                .await
                .unwrap();
            fields.push(f);
        }

        let mut doomed = fields[1].clone();
        doomed.deleted_at = Some(doomed.updated_at + 1);
        remote
            .apply_sync_item(&item_for_field(QueueOperation::DeleteField, &doomed))
            .await
            .unwrap();

        assert_eq!(remote.field(&fields[0].id).await.unwrap().card_order, 0);
        assert_eq!(remote.field(&fields[2].id).await.unwrap().card_order, 1);
        assert!(remote.field(&doomed.id).await.unwrap().is_deleted());

        let history = remote.history_for(&doomed.id).await;
        assert_eq!(history.last().unwrap().action, HistoryAction::Delete);
        assert_eq!(history.last().unwrap().new_value, None);
    }

    #[tokio::test]
    async fn test_pushed_history_item_lands_on_derived_row() {
        let remote = MemoryRemote::new();
        let field = Field::new("node-1", "email", "alice").with_value("x");
        remote
            .apply_sync_item(&item_for_field(QueueOperation::CreateField, &field))
            .await
            .unwrap();

        // The explicit create-history push carries the authoritative
        // local entry; same composite id, so it overwrites in place.
        let entry = FieldHistoryEntry::new(
            field.id.clone(),
            "node-1",
            HistoryAction::Create,
            None,
            Some("x".into()),
            "alice",
            field.updated_at,
            0,
        );
        let item = SyncQueueItem::new(
            QueueOperation::CreateHistory,
            EntityType::FieldHistory,
            entry.id.clone(),
            serde_json::to_value(&entry).unwrap(),
        );
        remote.apply_sync_item(&item).await.unwrap();

        let history = remote.history_for(&field.id).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], entry);
    }

    #[tokio::test]
    async fn test_pull_since_filters_strictly() {
        let remote = MemoryRemote::new();
        let mut old = Node::new("old", "alice");
        old.updated_at = 1000;
        let mut new = Node::new("new", "alice");
        new.updated_at = 2000;
        remote.put_node(old).await;
        remote.put_node(new).await;

        let pulled = remote.pull_nodes_since(1000).await.unwrap();
        assert_eq!(pulled.len(), 1);
        assert_eq!(pulled[0].name, "new");

        assert_eq!(remote.pull_nodes_since(0).await.unwrap().len(), 2);
        assert!(remote.pull_nodes_since(2000).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failure_surfaces_as_unavailable() {
        let remote = MemoryRemote::new();
        let node = Node::new("Inbox", "alice");
        remote.inject_failure(node.id.clone()).await;

        let err = remote
            .apply_sync_item(&item_for_node(QueueOperation::CreateNode, &node))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));

        remote.clear_failures().await;
        remote
            .apply_sync_item(&item_for_node(QueueOperation::CreateNode, &node))
            .await
            .unwrap();
    }
}
