//! Pull-side reconciliation strategies.
//!
//! Delta sync is the fast default path: it only sees records updated
//! since the last successful cycle. Full collection sync is the
//! safety net that additionally detects remote hard deletes, which
//! delta sync by construction cannot.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::db::LocalStore;
use crate::error::Result;
use crate::remote::RemoteAdapter;
use crate::sync::resolver::ConflictResolver;

/// Incremental pull: everything changed since `last_sync_timestamp`
/// goes through the active resolver. History entries skip the
/// resolver; they are append-only and idempotent by composite id, so
/// they are upserted unconditionally. Soft-deleted remote records ride
/// the ordinary resolver path; a soft delete is just another update.
pub struct DeltaSync {
    local: LocalStore,
    remote: Arc<dyn RemoteAdapter>,
    resolver: Arc<dyn ConflictResolver>,
}

impl DeltaSync {
    pub fn new(
        local: LocalStore,
        remote: Arc<dyn RemoteAdapter>,
        resolver: Arc<dyn ConflictResolver>,
    ) -> Self {
        Self {
            local,
            remote,
            resolver,
        }
    }

    pub async fn sync(&self) -> Result<()> {
        let since = self.local.get_last_sync_timestamp().await?.unwrap_or(0);
        debug!(since, "delta sync pulling changes");

        for node in self.remote.pull_nodes_since(since).await? {
            self.resolver.resolve_node(&node).await?;
        }
        for field in self.remote.pull_fields_since(since).await? {
            self.resolver.resolve_field(&field).await?;
        }
        for entry in self.remote.pull_history_since(since).await? {
            self.local.apply_remote_history(&entry).await?;
        }
        Ok(())
    }
}

/// Complete pull: reconciles the entire remote collections. A local
/// entity absent from the remote set and without any unconfirmed queue
/// item is confirmed gone and hard-deleted locally. Everything the
/// remote does have goes through the resolver exactly as in delta
/// sync. History is upserted in full; orphaned history rows are
/// accepted as harmless.
pub struct FullCollectionSync {
    local: LocalStore,
    remote: Arc<dyn RemoteAdapter>,
    resolver: Arc<dyn ConflictResolver>,
}

impl FullCollectionSync {
    pub fn new(
        local: LocalStore,
        remote: Arc<dyn RemoteAdapter>,
        resolver: Arc<dyn ConflictResolver>,
    ) -> Self {
        Self {
            local,
            remote,
            resolver,
        }
    }

    pub async fn sync(&self) -> Result<()> {
        // Any queue item, failed and retrying included, marks its
        // entity as not-yet-confirmed; only the strict pending set is
        // the pusher's concern.
        let pending = self.local.unconfirmed_entity_ids().await?;

        let remote_nodes = self.remote.pull_all_nodes().await?;
        let remote_node_ids: HashSet<&str> = remote_nodes.iter().map(|n| n.id.as_str()).collect();
        for node in self.local.get_all_nodes().await? {
            if !remote_node_ids.contains(node.id.as_str()) && !pending.contains(&node.id) {
                debug!(node_id = %node.id, "node gone remotely, hard-deleting locally");
                self.local.delete_node_local(&node.id).await?;
            }
        }
        for node in &remote_nodes {
            self.resolver.resolve_node(node).await?;
        }

        let remote_fields = self.remote.pull_all_fields().await?;
        let remote_field_ids: HashSet<&str> = remote_fields.iter().map(|f| f.id.as_str()).collect();
        for field in self.local.get_all_fields().await? {
            if !remote_field_ids.contains(field.id.as_str()) && !pending.contains(&field.id) {
                debug!(field_id = %field.id, "field gone remotely, hard-deleting locally");
                self.local.delete_field_local(&field.id).await?;
            }
        }
        for field in &remote_fields {
            self.resolver.resolve_field(field).await?;
        }

        for entry in self.remote.pull_all_history().await? {
            self.local.apply_remote_history(&entry).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::{Field, FieldHistoryEntry, HistoryAction, Node};
    use crate::remote::MemoryRemote;
    use crate::sync::resolver::ConflictPolicy;
    use tempfile::TempDir;

    struct TestContext {
        local: LocalStore,
        remote: MemoryRemote,
        resolver: Arc<dyn ConflictResolver>,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        let local = LocalStore::new(pool);
        let resolver = ConflictPolicy::Lww.resolver(local.clone());
        TestContext {
            local,
            remote: MemoryRemote::new(),
            resolver,
            _temp_dir: temp_dir,
        }
    }

    fn delta(ctx: &TestContext) -> DeltaSync {
        DeltaSync::new(
            ctx.local.clone(),
            Arc::new(ctx.remote.clone()),
            ctx.resolver.clone(),
        )
    }

    fn full(ctx: &TestContext) -> FullCollectionSync {
        FullCollectionSync::new(
            ctx.local.clone(),
            Arc::new(ctx.remote.clone()),
            ctx.resolver.clone(),
        )
    }

    #[tokio::test]
    async fn test_delta_pulls_only_changes_after_last_sync() {
        let ctx = setup().await;

        let mut old = Node::new("old", "server");
        old.updated_at = 1000;
        let mut new = Node::new("new", "server");
        new.updated_at = 2000;
        ctx.remote.put_node(old.clone()).await;
        ctx.remote.put_node(new.clone()).await;

        ctx.local.set_last_sync_timestamp(1500).await.unwrap();
        delta(&ctx).sync().await.unwrap();

        assert!(ctx.local.get_node(&old.id).await.unwrap().is_none());
        assert!(ctx.local.get_node(&new.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delta_upserts_history_unconditionally() {
        let ctx = setup().await;

        let field = Field::new("node-1", "email", "server").with_value("x");
        let entry = FieldHistoryEntry::new(
            field.id.clone(),
            "node-1",
            HistoryAction::Create,
            None,
            Some("x".into()),
            "server",
            field.updated_at,
            0,
        );
        ctx.remote.put_field(field.clone()).await;
        let item = crate::models::SyncQueueItem::new(
            crate::models::QueueOperation::CreateHistory,
            crate::models::EntityType::FieldHistory,
            entry.id.clone(),
            serde_json::to_value(&entry).unwrap(),
        );
        ctx.remote.apply_sync_item(&item).await.unwrap();

        delta(&ctx).sync().await.unwrap();

        let history = ctx.local.get_field_history(&field.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], entry);
    }

    #[tokio::test]
    async fn test_delta_propagates_remote_soft_delete() {
        let ctx = setup().await;

        let mut node = Node::new("doomed", "server");
        node.updated_at = 1000;
        ctx.local.apply_remote_node(&node).await.unwrap();

        node.deleted_at = Some(2000);
        node.updated_at = 2000;
        ctx.remote.put_node(node.clone()).await;

        delta(&ctx).sync().await.unwrap();

        let local = ctx.local.get_node(&node.id).await.unwrap().unwrap();
        assert!(local.is_deleted());
        assert!(ctx.local.list_root_nodes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_hard_deletes_confirmed_absentees() {
        let ctx = setup().await;

        // Synced long ago, then hard-deleted remotely: no queue entry.
        let mut ghost = Node::new("ghost", "alice");
        ghost.updated_at = 1000;
        ctx.local.apply_remote_node(&ghost).await.unwrap();

        full(&ctx).sync().await.unwrap();

        assert!(ctx.local.get_node(&ghost.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_full_preserves_entities_with_pending_pushes() {
        let ctx = setup().await;

        // A freshly created node: absent remotely, but its create is
        // still queued, so reconciliation must not eat it.
        let mine = ctx.local.create_node(&Node::new("mine", "alice")).await.unwrap();

        full(&ctx).sync().await.unwrap();

        assert!(ctx.local.get_node(&mine.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_full_preserves_entities_with_failed_pushes() {
        let ctx = setup().await;

        // The node's create push failed and is parked for retry. It is
        // absent remotely, but the edit is not confirmed lost, so
        // reconciliation must leave it alone.
        let mine = ctx.local.create_node(&Node::new("mine", "alice")).await.unwrap();
        ctx.remote.inject_failure(mine.id.clone()).await;
        let pusher = crate::sync::pusher::SyncPusher::new(
            ctx.local.clone(),
            Arc::new(ctx.remote.clone()),
        );
        let stats = pusher.push().await.unwrap();
        assert_eq!(stats.failed, 1);

        full(&ctx).sync().await.unwrap();

        assert!(ctx.local.get_node(&mine.id).await.unwrap().is_some());

        // Once the remote recovers, the retried push still lands.
        ctx.remote.clear_failures().await;
        pusher.push().await.unwrap();
        assert!(ctx.remote.node(&mine.id).await.is_some());
    }

    #[tokio::test]
    async fn test_full_resolves_present_remote_entities() {
        let ctx = setup().await;

        let mut node = Node::new("stale", "alice");
        node.updated_at = 1000;
        ctx.local.apply_remote_node(&node).await.unwrap();

        let mut fresher = node.clone();
        fresher.name = "fresh".into();
        fresher.updated_at = 2000;
        ctx.remote.put_node(fresher).await;

        full(&ctx).sync().await.unwrap();

        assert_eq!(
            ctx.local.get_node(&node.id).await.unwrap().unwrap().name,
            "fresh"
        );
    }

    #[tokio::test]
    async fn test_full_reconciles_fields_and_history() {
        let ctx = setup().await;

        // Local-only field, long synced, gone remotely.
        let mut orphan = Field::new("node-1", "email", "alice");
        orphan.updated_at = 1000;
        ctx.local.apply_remote_field(&orphan).await.unwrap();

        // Remote field with history.
        let kept = Field::new("node-1", "phone", "server").with_value("123");
        ctx.remote.put_field(kept.clone()).await;
        let entry = FieldHistoryEntry::new(
            kept.id.clone(),
            "node-1",
            HistoryAction::Create,
            None,
            Some("123".into()),
            "server",
            kept.updated_at,
            0,
        );
        let item = crate::models::SyncQueueItem::new(
            crate::models::QueueOperation::CreateHistory,
            crate::models::EntityType::FieldHistory,
            entry.id.clone(),
            serde_json::to_value(&entry).unwrap(),
        );
        ctx.remote.apply_sync_item(&item).await.unwrap();

        full(&ctx).sync().await.unwrap();

        assert!(ctx.local.get_field(&orphan.id).await.unwrap().is_none());
        assert!(ctx.local.get_field(&kept.id).await.unwrap().is_some());
        assert_eq!(ctx.local.get_field_history(&kept.id).await.unwrap().len(), 1);
    }
}
