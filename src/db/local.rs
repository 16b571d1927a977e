//! The authoritative local store.
//!
//! All application reads and writes go through [`LocalStore`]. Every
//! mutation writes the entity, its history entry (for fields), and the
//! matching sync-queue item inside one SQLite transaction, so a partial
//! write (entity present, queue entry missing, or vice versa) is never
//! observable.
//!
//! The remote store is never touched from here; reconciliation feeds
//! remote state back in through the `apply_remote_*` upserts and the
//! silent `delete_*_local` hard deletes.

use std::collections::HashSet;

use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;

use crate::error::{Error, Result};
use crate::models::{
    now_ms, EntityType, Field, FieldHistoryEntry, HistoryAction, Node, QueueOperation, QueueStatus,
    SyncQueueItem,
};

/// Partial update for a node; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub name: Option<String>,
    pub subtitle: Option<String>,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: String,
    data_field_id: String,
    parent_node_id: String,
    action: String,
    prev_value: Option<String>,
    new_value: Option<String>,
    updated_by: String,
    updated_at: i64,
    rev: i64,
}

impl HistoryRow {
    fn into_entry(self) -> Result<FieldHistoryEntry> {
        let action = HistoryAction::parse(&self.action)
            .ok_or_else(|| Error::Internal(format!("unknown history action: {}", self.action)))?;
        Ok(FieldHistoryEntry {
            id: self.id,
            data_field_id: self.data_field_id,
            parent_node_id: self.parent_node_id,
            action,
            prev_value: self.prev_value,
            new_value: self.new_value,
            updated_by: self.updated_by,
            updated_at: self.updated_at,
            rev: self.rev,
        })
    }
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: String,
    operation: String,
    entity_type: String,
    entity_id: String,
    payload: String,
    timestamp: i64,
    status: String,
    retry_count: i64,
    last_error: Option<String>,
}

impl QueueRow {
    fn into_item(self) -> Result<SyncQueueItem> {
        let operation = QueueOperation::parse(&self.operation)
            .ok_or_else(|| Error::Internal(format!("unknown queue operation: {}", self.operation)))?;
        let entity_type = EntityType::parse(&self.entity_type)
            .ok_or_else(|| Error::Internal(format!("unknown entity type: {}", self.entity_type)))?;
        let status = QueueStatus::parse(&self.status)
            .ok_or_else(|| Error::Internal(format!("unknown queue status: {}", self.status)))?;
        Ok(SyncQueueItem {
            id: self.id,
            operation,
            entity_type,
            entity_id: self.entity_id,
            payload: serde_json::from_str(&self.payload)?,
            timestamp: self.timestamp,
            status,
            retry_count: self.retry_count,
            last_error: self.last_error,
        })
    }
}

/// Durable local store for nodes, fields, history, the sync queue and
/// sync metadata. Cheap to clone (shares the pool).
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Active root nodes, oldest update first.
    pub async fn list_root_nodes(&self) -> Result<Vec<Node>> {
        let nodes = sqlx::query_as::<_, Node>(
            "SELECT * FROM nodes WHERE parent_id IS NULL AND deleted_at IS NULL ORDER BY updated_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    /// Fetch a node by id regardless of deletion state.
    pub async fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let node = sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(node)
    }

    /// Active children of a node, oldest update first.
    pub async fn list_children(&self, parent_id: &str) -> Result<Vec<Node>> {
        let nodes = sqlx::query_as::<_, Node>(
            "SELECT * FROM nodes WHERE parent_id = ? AND deleted_at IS NULL ORDER BY updated_at ASC, id ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    /// Soft-deleted root-level and non-root nodes, most recently deleted first.
    pub async fn list_deleted_nodes(&self) -> Result<Vec<Node>> {
        let nodes = sqlx::query_as::<_, Node>(
            "SELECT * FROM nodes WHERE deleted_at IS NOT NULL ORDER BY deleted_at DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    /// Soft-deleted children of a node, most recently deleted first.
    pub async fn list_deleted_children(&self, parent_id: &str) -> Result<Vec<Node>> {
        let nodes = sqlx::query_as::<_, Node>(
            "SELECT * FROM nodes WHERE parent_id = ? AND deleted_at IS NOT NULL ORDER BY deleted_at DESC, id ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    /// Insert a new node and enqueue its outbound mutation.
    ///
    /// A non-null parent must reference an existing (possibly deleted)
    /// node; nodes are only attached at creation time, so the tree can
    /// never form a cycle.
    pub async fn create_node(&self, node: &Node) -> Result<Node> {
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = &node.parent_id {
            let parent = sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(&mut *tx)
                .await?;
            if parent.is_none() {
                return Err(Error::NotFound(format!("parent node {}", parent_id)));
            }
        }

        Self::insert_node_tx(&mut tx, node).await?;
        let item = SyncQueueItem::new(
            QueueOperation::CreateNode,
            EntityType::Node,
            node.id.clone(),
            serde_json::to_value(node)?,
        );
        Self::enqueue_tx(&mut tx, &item).await?;
        tx.commit().await?;

        self.get_node(&node.id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("node {}", node.id)))
    }

    /// Apply a partial update to an active node.
    pub async fn update_node(&self, id: &str, patch: NodePatch, updated_by: &str) -> Result<Node> {
        let mut node = self.require_active_node(id).await?;

        if let Some(name) = patch.name {
            node.name = name;
        }
        if let Some(subtitle) = patch.subtitle {
            node.subtitle = subtitle;
        }
        node.updated_by = updated_by.to_string();
        node.updated_at = now_ms();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE nodes SET name = ?, subtitle = ?, updated_by = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&node.name)
        .bind(&node.subtitle)
        .bind(&node.updated_by)
        .bind(node.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let item = SyncQueueItem::new(
            QueueOperation::UpdateNode,
            EntityType::Node,
            node.id.clone(),
            serde_json::to_value(&node)?,
        );
        Self::enqueue_tx(&mut tx, &item).await?;
        tx.commit().await?;

        Ok(node)
    }

    /// Mark an active node deleted. Children are left in place.
    pub async fn soft_delete_node(&self, id: &str, updated_by: &str) -> Result<Node> {
        let mut node = self.require_active_node(id).await?;

        let now = now_ms();
        node.deleted_at = Some(now);
        node.updated_at = now;
        node.updated_by = updated_by.to_string();

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE nodes SET deleted_at = ?, updated_at = ?, updated_by = ? WHERE id = ?")
            .bind(node.deleted_at)
            .bind(node.updated_at)
            .bind(&node.updated_by)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let item = SyncQueueItem::new(
            QueueOperation::DeleteNode,
            EntityType::Node,
            node.id.clone(),
            serde_json::to_value(&node)?,
        );
        Self::enqueue_tx(&mut tx, &item).await?;
        tx.commit().await?;

        Ok(node)
    }

    /// Clear a node's deletion marker.
    pub async fn restore_node(&self, id: &str, updated_by: &str) -> Result<Node> {
        let mut node = self
            .get_node(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("node {}", id)))?;
        if !node.is_deleted() {
            return Err(Error::Validation(format!("node {} is not deleted", id)));
        }

        node.deleted_at = None;
        node.updated_at = now_ms();
        node.updated_by = updated_by.to_string();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE nodes SET deleted_at = NULL, updated_at = ?, updated_by = ? WHERE id = ?",
        )
        .bind(node.updated_at)
        .bind(&node.updated_by)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let item = SyncQueueItem::new(
            QueueOperation::UpdateNode,
            EntityType::Node,
            node.id.clone(),
            serde_json::to_value(&node)?,
        );
        Self::enqueue_tx(&mut tx, &item).await?;
        tx.commit().await?;

        Ok(node)
    }

    async fn require_active_node(&self, id: &str) -> Result<Node> {
        match self.get_node(id).await? {
            Some(node) if !node.is_deleted() => Ok(node),
            _ => Err(Error::NotFound(format!("node {}", id))),
        }
    }

    // ------------------------------------------------------------------
    // Fields
    // ------------------------------------------------------------------

    /// Active fields of a node in card order.
    pub async fn list_fields(&self, node_id: &str) -> Result<Vec<Field>> {
        let fields = sqlx::query_as::<_, Field>(
            "SELECT * FROM fields WHERE parent_node_id = ? AND deleted_at IS NULL ORDER BY card_order ASC",
        )
        .bind(node_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fields)
    }

    /// Soft-deleted fields of a node, most recently deleted first.
    pub async fn list_deleted_fields(&self, node_id: &str) -> Result<Vec<Field>> {
        let fields = sqlx::query_as::<_, Field>(
            "SELECT * FROM fields WHERE parent_node_id = ? AND deleted_at IS NOT NULL ORDER BY deleted_at DESC, id ASC",
        )
        .bind(node_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fields)
    }

    /// Fetch a field by id regardless of deletion state.
    pub async fn get_field(&self, id: &str) -> Result<Option<Field>> {
        let field = sqlx::query_as::<_, Field>("SELECT * FROM fields WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(field)
    }

    /// Next free card position among a node's active fields.
    pub async fn next_card_order(&self, node_id: &str) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::next_card_order_tx(&mut conn, node_id).await
    }

    /// Insert a new field at the end of its node's deck, record the
    /// `rev = 0` history entry, and enqueue both.
    pub async fn create_field(&self, field: &Field) -> Result<Field> {
        let mut tx = self.pool.begin().await?;

        let parent = sqlx::query_as::<_, Node>("SELECT * FROM nodes WHERE id = ?")
            .bind(&field.parent_node_id)
            .fetch_optional(&mut *tx)
            .await?;
        if parent.is_none() {
            return Err(Error::NotFound(format!("node {}", field.parent_node_id)));
        }

        let mut stored = field.clone();
        stored.card_order = Self::next_card_order_tx(&mut tx, &stored.parent_node_id).await?;

        sqlx::query(
            r#"
            INSERT INTO fields (id, name, value, parent_node_id, card_order, updated_by, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.name)
        .bind(&stored.value)
        .bind(&stored.parent_node_id)
        .bind(stored.card_order)
        .bind(&stored.updated_by)
        .bind(stored.updated_at)
        .bind(stored.deleted_at)
        .execute(&mut *tx)
        .await?;

        let entry = FieldHistoryEntry::new(
            stored.id.clone(),
            stored.parent_node_id.clone(),
            HistoryAction::Create,
            None,
            stored.value.clone(),
            stored.updated_by.clone(),
            stored.updated_at,
            0,
        );
        Self::insert_history_tx(&mut tx, &entry).await?;
        Self::enqueue_field_and_history_tx(&mut tx, QueueOperation::CreateField, &stored, &entry)
            .await?;
        tx.commit().await?;

        Ok(stored)
    }

    /// Change an active field's value, appending an `update` history
    /// entry at the next revision.
    pub async fn update_field_value(
        &self,
        id: &str,
        value: Option<String>,
        updated_by: &str,
    ) -> Result<Field> {
        let mut field = self.require_active_field(id).await?;

        let prev_value = field.value.clone();
        field.value = value;
        field.updated_by = updated_by.to_string();
        field.updated_at = now_ms();

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE fields SET value = ?, updated_by = ?, updated_at = ? WHERE id = ?")
            .bind(&field.value)
            .bind(&field.updated_by)
            .bind(field.updated_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let rev = Self::next_rev_tx(&mut tx, id).await?;
        let entry = FieldHistoryEntry::new(
            field.id.clone(),
            field.parent_node_id.clone(),
            HistoryAction::Update,
            prev_value,
            field.value.clone(),
            field.updated_by.clone(),
            field.updated_at,
            rev,
        );
        Self::insert_history_tx(&mut tx, &entry).await?;
        Self::enqueue_field_and_history_tx(&mut tx, QueueOperation::UpdateField, &field, &entry)
            .await?;
        tx.commit().await?;

        Ok(field)
    }

    /// Soft-delete a field, recompact the surviving siblings to a dense
    /// `0..n-1` card order, and append a `delete` history entry.
    ///
    /// The sibling renumbering is silent: no queue entries, no
    /// `updated_at` bump. The remote recomputes its own order when it
    /// applies the delete.
    pub async fn soft_delete_field(&self, id: &str, updated_by: &str) -> Result<Field> {
        let mut field = self.require_active_field(id).await?;

        let prev_value = field.value.clone();
        let now = now_ms();
        field.deleted_at = Some(now);
        field.updated_at = now;
        field.updated_by = updated_by.to_string();

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE fields SET deleted_at = ?, updated_at = ?, updated_by = ? WHERE id = ?")
            .bind(field.deleted_at)
            .bind(field.updated_at)
            .bind(&field.updated_by)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        Self::compact_card_order_tx(&mut tx, &field.parent_node_id).await?;

        let rev = Self::next_rev_tx(&mut tx, id).await?;
        let entry = FieldHistoryEntry::new(
            field.id.clone(),
            field.parent_node_id.clone(),
            HistoryAction::Delete,
            prev_value,
            None,
            field.updated_by.clone(),
            field.updated_at,
            rev,
        );
        Self::insert_history_tx(&mut tx, &entry).await?;
        Self::enqueue_field_and_history_tx(&mut tx, QueueOperation::DeleteField, &field, &entry)
            .await?;
        tx.commit().await?;

        Ok(field)
    }

    /// Bring a soft-deleted field back, appended at the end of the deck.
    pub async fn restore_field(&self, id: &str, updated_by: &str) -> Result<Field> {
        let mut field = self
            .get_field(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("field {}", id)))?;
        if !field.is_deleted() {
            return Err(Error::Validation(format!("field {} is not deleted", id)));
        }

        field.deleted_at = None;
        field.updated_at = now_ms();
        field.updated_by = updated_by.to_string();

        let mut tx = self.pool.begin().await?;
        field.card_order = Self::next_card_order_tx(&mut tx, &field.parent_node_id).await?;
        sqlx::query(
            "UPDATE fields SET deleted_at = NULL, card_order = ?, updated_at = ?, updated_by = ? WHERE id = ?",
        )
        .bind(field.card_order)
        .bind(field.updated_at)
        .bind(&field.updated_by)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // The restore entry mirrors the value becoming visible again, so
        // the latest history entry always matches the field's current
        // state.
        let rev = Self::next_rev_tx(&mut tx, id).await?;
        let entry = FieldHistoryEntry::new(
            field.id.clone(),
            field.parent_node_id.clone(),
            HistoryAction::Update,
            None,
            field.value.clone(),
            field.updated_by.clone(),
            field.updated_at,
            rev,
        );
        Self::insert_history_tx(&mut tx, &entry).await?;
        Self::enqueue_field_and_history_tx(&mut tx, QueueOperation::UpdateField, &field, &entry)
            .await?;
        tx.commit().await?;

        Ok(field)
    }

    /// Full value history of a field, oldest revision first.
    pub async fn get_field_history(&self, field_id: &str) -> Result<Vec<FieldHistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT * FROM field_history WHERE data_field_id = ? ORDER BY rev ASC",
        )
        .bind(field_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(HistoryRow::into_entry).collect()
    }

    async fn require_active_field(&self, id: &str) -> Result<Field> {
        match self.get_field(id).await? {
            Some(field) if !field.is_deleted() => Ok(field),
            _ => Err(Error::NotFound(format!("field {}", id))),
        }
    }

    // ------------------------------------------------------------------
    // Sync queue
    // ------------------------------------------------------------------

    /// Pending queue items in FIFO order.
    pub async fn get_sync_queue(&self) -> Result<Vec<SyncQueueItem>> {
        let rows = sqlx::query_as::<_, QueueRow>(
            "SELECT * FROM sync_queue WHERE status = 'pending' ORDER BY timestamp ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(QueueRow::into_item).collect()
    }

    /// Entity ids with a pending push in flight.
    pub async fn pending_entity_ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT entity_id FROM sync_queue WHERE status = 'pending'")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Entity ids with any unconfirmed queue item, whatever its status.
    /// A mutation parked as `failed` (or stuck in `syncing` after a
    /// crash) is still awaiting retry; reconciliation must treat it the
    /// same as a pending one.
    pub async fn unconfirmed_entity_ids(&self) -> Result<HashSet<String>> {
        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT entity_id FROM sync_queue")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Mark an item as being pushed right now.
    pub async fn mark_syncing(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE sync_queue SET status = 'syncing' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a confirmed item from the queue.
    pub async fn mark_synced(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sync_queue WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a push failure; the item leaves the pending set until the
    /// retry pass promotes it again.
    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE sync_queue SET status = 'failed', retry_count = retry_count + 1, last_error = ? WHERE id = ?",
        )
        .bind(error)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Promote retryable items back to pending: failed items below the
    /// retry cap, plus any `syncing` stragglers a crashed cycle left
    /// behind. Returns the number of promoted rows.
    pub async fn requeue_failed(&self, max_retries: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE sync_queue SET status = 'pending' WHERE (status = 'failed' AND retry_count < ?) OR status = 'syncing'",
        )
        .bind(max_retries)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Queue item counts per status, for ops tooling.
    pub async fn queue_counts(&self) -> Result<Vec<(String, i64)>> {
        let counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM sync_queue GROUP BY status ORDER BY status")
                .fetch_all(&self.pool)
                .await?;
        Ok(counts)
    }

    // ------------------------------------------------------------------
    // Sync metadata
    // ------------------------------------------------------------------

    pub async fn get_last_sync_timestamp(&self) -> Result<Option<i64>> {
        let value: Option<(String,)> =
            sqlx::query_as("SELECT value FROM sync_metadata WHERE key = 'last_sync_timestamp'")
                .fetch_optional(&self.pool)
                .await?;
        match value {
            Some((raw,)) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|e| Error::Internal(format!("bad last_sync_timestamp: {}", e))),
            None => Ok(None),
        }
    }

    pub async fn set_last_sync_timestamp(&self, ts: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO sync_metadata (key, value) VALUES ('last_sync_timestamp', ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(ts.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reconciliation support
    // ------------------------------------------------------------------

    /// Overwrite the local node with the remote copy. No queue entry.
    pub async fn apply_remote_node(&self, node: &Node) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_node_tx(&mut conn, node).await
    }

    /// Overwrite the local field with the remote copy. No queue entry.
    pub async fn apply_remote_field(&self, field: &Field) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fields (id, name, value, parent_node_id, card_order, updated_by, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                value = excluded.value,
                parent_node_id = excluded.parent_node_id,
                card_order = excluded.card_order,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at,
                deleted_at = excluded.deleted_at
            "#,
        )
        .bind(&field.id)
        .bind(&field.name)
        .bind(&field.value)
        .bind(&field.parent_node_id)
        .bind(field.card_order)
        .bind(&field.updated_by)
        .bind(field.updated_at)
        .bind(field.deleted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Upsert a remote history entry by its composite id.
    pub async fn apply_remote_history(&self, entry: &FieldHistoryEntry) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_history_tx(&mut conn, entry).await
    }

    /// Every node, deleted included. Reconciliation input.
    pub async fn get_all_nodes(&self) -> Result<Vec<Node>> {
        let nodes = sqlx::query_as::<_, Node>("SELECT * FROM nodes ORDER BY updated_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(nodes)
    }

    /// Every field, deleted included. Reconciliation input.
    pub async fn get_all_fields(&self) -> Result<Vec<Field>> {
        let fields =
            sqlx::query_as::<_, Field>("SELECT * FROM fields ORDER BY updated_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(fields)
    }

    /// Every history entry, ordered by field then revision.
    pub async fn get_all_history(&self) -> Result<Vec<FieldHistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT * FROM field_history ORDER BY data_field_id ASC, rev ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(HistoryRow::into_entry).collect()
    }

    /// Hard-delete a node locally without touching the queue. Used only
    /// by full reconciliation once the remote confirms the row gone.
    pub async fn delete_node_local(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Hard-delete a field locally without touching the queue.
    pub async fn delete_field_local(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM fields WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Transaction-scoped helpers
    // ------------------------------------------------------------------

    async fn insert_node_tx(conn: &mut SqliteConnection, node: &Node) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO nodes (id, name, subtitle, parent_id, updated_by, updated_at, deleted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                subtitle = excluded.subtitle,
                parent_id = excluded.parent_id,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at,
                deleted_at = excluded.deleted_at
            "#,
        )
        .bind(&node.id)
        .bind(&node.name)
        .bind(&node.subtitle)
        .bind(&node.parent_id)
        .bind(&node.updated_by)
        .bind(node.updated_at)
        .bind(node.deleted_at)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn insert_history_tx(conn: &mut SqliteConnection, entry: &FieldHistoryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO field_history (id, data_field_id, parent_node_id, action, prev_value, new_value, updated_by, updated_at, rev)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                action = excluded.action,
                prev_value = excluded.prev_value,
                new_value = excluded.new_value,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.data_field_id)
        .bind(&entry.parent_node_id)
        .bind(entry.action.as_str())
        .bind(&entry.prev_value)
        .bind(&entry.new_value)
        .bind(&entry.updated_by)
        .bind(entry.updated_at)
        .bind(entry.rev)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    async fn enqueue_tx(conn: &mut SqliteConnection, item: &SyncQueueItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sync_queue (id, operation, entity_type, entity_id, payload, timestamp, status, retry_count, last_error)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(item.operation.as_str())
        .bind(item.entity_type.as_str())
        .bind(&item.entity_id)
        .bind(item.payload.to_string())
        .bind(item.timestamp)
        .bind(item.status.as_str())
        .bind(item.retry_count)
        .bind(&item.last_error)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Enqueue a field mutation together with its history entry.
    async fn enqueue_field_and_history_tx(
        conn: &mut SqliteConnection,
        operation: QueueOperation,
        field: &Field,
        entry: &FieldHistoryEntry,
    ) -> Result<()> {
        let field_item = SyncQueueItem::new(
            operation,
            EntityType::Field,
            field.id.clone(),
            serde_json::to_value(field)?,
        );
        Self::enqueue_tx(conn, &field_item).await?;

        let history_item = SyncQueueItem::new(
            QueueOperation::CreateHistory,
            EntityType::FieldHistory,
            entry.id.clone(),
            serde_json::to_value(entry)?,
        );
        Self::enqueue_tx(conn, &history_item).await
    }

    async fn next_card_order_tx(conn: &mut SqliteConnection, node_id: &str) -> Result<i64> {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(card_order) + 1, 0) FROM fields WHERE parent_node_id = ? AND deleted_at IS NULL",
        )
        .bind(node_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(next)
    }

    async fn next_rev_tx(conn: &mut SqliteConnection, field_id: &str) -> Result<i64> {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(rev) + 1, 0) FROM field_history WHERE data_field_id = ?",
        )
        .bind(field_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(next)
    }

    /// Renumber a node's active fields to `0..n-1`, preserving their
    /// relative order.
    async fn compact_card_order_tx(conn: &mut SqliteConnection, node_id: &str) -> Result<()> {
        let survivors = sqlx::query_as::<_, Field>(
            "SELECT * FROM fields WHERE parent_node_id = ? AND deleted_at IS NULL ORDER BY card_order ASC",
        )
        .bind(node_id)
        .fetch_all(&mut *conn)
        .await?;

        for (position, field) in survivors.iter().enumerate() {
            let position = position as i64;
            if field.card_order != position {
                sqlx::query("UPDATE fields SET card_order = ? WHERE id = ?")
                    .bind(position)
                    .bind(&field.id)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    struct TestContext {
        store: LocalStore,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup_store() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let pool = init_db(&db_path).await.unwrap();
        TestContext {
            store: LocalStore::new(pool),
            _temp_dir: temp_dir,
        }
    }

    fn node_at(name: &str, updated_at: i64) -> Node {
        let mut node = Node::new(name, "alice");
        node.updated_at = updated_at;
        node
    }

    #[tokio::test]
    async fn test_create_and_get_node() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = Node::new("Inbox", "alice").with_subtitle("catch-all");
        let created = store.create_node(&node).await.unwrap();
        assert_eq!(created.name, "Inbox");
        assert_eq!(created.subtitle, "catch-all");

        let fetched = store.get_node(&node.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_node_enqueues_one_item() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Inbox", "alice")).await.unwrap();

        let queue = store.get_sync_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].operation, QueueOperation::CreateNode);
        assert_eq!(queue[0].entity_type, EntityType::Node);
        assert_eq!(queue[0].entity_id, node.id);

        let snapshot: Node = serde_json::from_value(queue[0].payload.clone()).unwrap();
        assert_eq!(snapshot, node);
    }

    #[tokio::test]
    async fn test_create_node_with_missing_parent_fails_without_queue_entry() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let orphan = Node::new("Orphan", "alice").with_parent("nope");
        let err = store.create_node(&orphan).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        assert!(store.get_node(&orphan.id).await.unwrap().is_none());
        assert!(store.get_sync_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_root_list_sorted_by_updated_at_ascending() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        // Seed with explicit timestamps through the remote-apply path.
        store.apply_remote_node(&node_at("newest", 3000)).await.unwrap();
        store.apply_remote_node(&node_at("oldest", 1000)).await.unwrap();
        store.apply_remote_node(&node_at("middle", 2000)).await.unwrap();

        let roots = store.list_root_nodes().await.unwrap();
        let names: Vec<&str> = roots.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["oldest", "middle", "newest"]);
    }

    #[tokio::test]
    async fn test_list_children_excludes_deleted_and_roots() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let parent = store.create_node(&Node::new("Parent", "alice")).await.unwrap();
        let kept = store
            .create_node(&Node::new("Kept", "alice").with_parent(parent.id.clone()))
            .await
            .unwrap();
        let dropped = store
            .create_node(&Node::new("Dropped", "alice").with_parent(parent.id.clone()))
            .await
            .unwrap();
        store.soft_delete_node(&dropped.id, "alice").await.unwrap();

        let children = store.list_children(&parent.id).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, kept.id);

        let deleted = store.list_deleted_children(&parent.id).await.unwrap();
        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].id, dropped.id);
    }

    #[tokio::test]
    async fn test_update_node_partial() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store
            .create_node(&Node::new("Old Name", "alice").with_subtitle("keep me"))
            .await
            .unwrap();

        let patch = NodePatch {
            name: Some("New Name".into()),
            subtitle: None,
        };
        let updated = store.update_node(&node.id, patch, "bob").await.unwrap();
        assert_eq!(updated.name, "New Name");
        assert_eq!(updated.subtitle, "keep me");
        assert_eq!(updated.updated_by, "bob");
        assert!(updated.updated_at >= node.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_node_is_not_found() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let err = store
            .update_node("ghost", NodePatch::default(), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(store.get_sync_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore_node() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Doomed", "alice")).await.unwrap();
        let deleted = store.soft_delete_node(&node.id, "alice").await.unwrap();
        assert!(deleted.is_deleted());

        assert!(store.list_root_nodes().await.unwrap().is_empty());
        let trash = store.list_deleted_nodes().await.unwrap();
        assert_eq!(trash.len(), 1);
        assert_eq!(trash[0].id, node.id);

        let restored = store.restore_node(&node.id, "alice").await.unwrap();
        assert!(!restored.is_deleted());
        assert_eq!(store.list_root_nodes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_active_node_is_validation_error() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Alive", "alice")).await.unwrap();
        let err = store.restore_node(&node.id, "alice").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_deleting_parent_does_not_cascade_to_children() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let parent = store.create_node(&Node::new("Parent", "alice")).await.unwrap();
        let child = store
            .create_node(&Node::new("Child", "alice").with_parent(parent.id.clone()))
            .await
            .unwrap();

        store.soft_delete_node(&parent.id, "alice").await.unwrap();

        // The child is still active under its (now deleted) parent.
        let fetched = store.get_node(&child.id).await.unwrap().unwrap();
        assert!(!fetched.is_deleted());
        assert_eq!(store.list_children(&parent.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_fields_assigns_dense_card_order() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Contact", "alice")).await.unwrap();
        for name in ["email", "phone", "city"] {
            store
                .create_field(&Field::new(node.id.clone(), name, "alice"))
                .await
                .unwrap();
        }

        let fields = store.list_fields(&node.id).await.unwrap();
        let orders: Vec<i64> = fields.iter().map(|f| f.card_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(store.next_card_order(&node.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_card_order_stays_dense_after_deletes() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Contact", "alice")).await.unwrap();
        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d"] {
            let f = store
                .create_field(&Field::new(node.id.clone(), name, "alice"))
                .await
                .unwrap();
            ids.push(f.id);
        }

        // Delete a middle field, then the first one.
        store.soft_delete_field(&ids[1], "alice").await.unwrap();
        store.soft_delete_field(&ids[0], "alice").await.unwrap();

        let fields = store.list_fields(&node.id).await.unwrap();
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        let orders: Vec<i64> = fields.iter().map(|f| f.card_order).collect();
        assert_eq!(names, vec!["c", "d"]);
        assert_eq!(orders, vec![0, 1]);
        assert_eq!(store.next_card_order(&node.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_field_history_revisions() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Contact", "alice")).await.unwrap();
        let field = store
            .create_field(&Field::new(node.id.clone(), "email", "alice").with_value("x"))
            .await
            .unwrap();
        store
            .update_field_value(&field.id, Some("y".into()), "alice")
            .await
            .unwrap();

        let history = store.get_field_history(&field.id).await.unwrap();
        assert_eq!(history.len(), 2);

        assert_eq!(history[0].rev, 0);
        assert_eq!(history[0].action, HistoryAction::Create);
        assert_eq!(history[0].prev_value, None);
        assert_eq!(history[0].new_value.as_deref(), Some("x"));

        assert_eq!(history[1].rev, 1);
        assert_eq!(history[1].action, HistoryAction::Update);
        assert_eq!(history[1].prev_value.as_deref(), Some("x"));
        assert_eq!(history[1].new_value.as_deref(), Some("y"));
        assert_eq!(history[1].id, format!("{}:1", field.id));

        // Latest entry mirrors current value.
        let current = store.get_field(&field.id).await.unwrap().unwrap();
        assert_eq!(history[1].new_value, current.value);
    }

    #[tokio::test]
    async fn test_soft_delete_field_records_delete_entry() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Contact", "alice")).await.unwrap();
        let field = store
            .create_field(&Field::new(node.id.clone(), "email", "alice").with_value("x"))
            .await
            .unwrap();
        store.soft_delete_field(&field.id, "alice").await.unwrap();

        assert!(store.list_fields(&node.id).await.unwrap().is_empty());
        assert_eq!(store.list_deleted_fields(&node.id).await.unwrap().len(), 1);

        let history = store.get_field_history(&field.id).await.unwrap();
        assert_eq!(history.last().unwrap().action, HistoryAction::Delete);
        assert_eq!(history.last().unwrap().prev_value.as_deref(), Some("x"));
        assert_eq!(history.last().unwrap().new_value, None);
    }

    #[tokio::test]
    async fn test_restore_field_appends_at_end() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Contact", "alice")).await.unwrap();
        let first = store
            .create_field(&Field::new(node.id.clone(), "email", "alice").with_value("x"))
            .await
            .unwrap();
        store
            .create_field(&Field::new(node.id.clone(), "phone", "alice"))
            .await
            .unwrap();

        store.soft_delete_field(&first.id, "alice").await.unwrap();
        let restored = store.restore_field(&first.id, "alice").await.unwrap();

        // "phone" compacted to 0, the restored field re-appends after it.
        assert_eq!(restored.card_order, 1);
        let history = store.get_field_history(&first.id).await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.action, HistoryAction::Update);
        assert_eq!(last.new_value.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_update_deleted_field_is_not_found() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Contact", "alice")).await.unwrap();
        let field = store
            .create_field(&Field::new(node.id.clone(), "email", "alice"))
            .await
            .unwrap();
        store.soft_delete_field(&field.id, "alice").await.unwrap();

        let queue_before = store.get_sync_queue().await.unwrap().len();
        let err = store
            .update_field_value(&field.id, Some("z".into()), "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(store.get_sync_queue().await.unwrap().len(), queue_before);
    }

    #[tokio::test]
    async fn test_queue_is_fifo_and_pairs_field_with_history() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Contact", "alice")).await.unwrap();
        let field = store
            .create_field(&Field::new(node.id.clone(), "email", "alice").with_value("x"))
            .await
            .unwrap();

        let queue = store.get_sync_queue().await.unwrap();
        let ops: Vec<QueueOperation> = queue.iter().map(|i| i.operation).collect();
        assert_eq!(
            ops,
            vec![
                QueueOperation::CreateNode,
                QueueOperation::CreateField,
                QueueOperation::CreateHistory,
            ]
        );
        assert_eq!(queue[2].entity_id, format!("{}:0", field.id));
    }

    #[tokio::test]
    async fn test_mark_failed_hides_item_until_requeued() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        store.create_node(&Node::new("Inbox", "alice")).await.unwrap();
        let item = store.get_sync_queue().await.unwrap().remove(0);

        store.mark_failed(&item.id, "remote unreachable").await.unwrap();
        assert!(store.get_sync_queue().await.unwrap().is_empty());

        let promoted = store.requeue_failed(5).await.unwrap();
        assert_eq!(promoted, 1);
        let queue = store.get_sync_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].retry_count, 1);
        assert_eq!(queue[0].last_error.as_deref(), Some("remote unreachable"));
    }

    #[tokio::test]
    async fn test_requeue_respects_retry_cap() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        store.create_node(&Node::new("Inbox", "alice")).await.unwrap();
        let item = store.get_sync_queue().await.unwrap().remove(0);

        for _ in 0..3 {
            store.mark_failed(&item.id, "still down").await.unwrap();
        }
        // retry_count is 3 now; a cap of 3 keeps it dead.
        assert_eq!(store.requeue_failed(3).await.unwrap(), 0);
        assert!(store.get_sync_queue().await.unwrap().is_empty());
        assert_eq!(store.requeue_failed(4).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_requeue_recovers_stale_syncing_items() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        store.create_node(&Node::new("Inbox", "alice")).await.unwrap();
        let item = store.get_sync_queue().await.unwrap().remove(0);

        store.mark_syncing(&item.id).await.unwrap();
        assert!(store.get_sync_queue().await.unwrap().is_empty());

        assert_eq!(store.requeue_failed(5).await.unwrap(), 1);
        assert_eq!(store.get_sync_queue().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_synced_removes_item() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        store.create_node(&Node::new("Inbox", "alice")).await.unwrap();
        let item = store.get_sync_queue().await.unwrap().remove(0);
        store.mark_synced(&item.id).await.unwrap();
        assert!(store.get_sync_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pending_entity_ids() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Inbox", "alice")).await.unwrap();
        let ids = store.pending_entity_ids().await.unwrap();
        assert!(ids.contains(&node.id));
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_unconfirmed_entity_ids_covers_failed_and_syncing() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let failed = store.create_node(&Node::new("A", "alice")).await.unwrap();
        let stuck = store.create_node(&Node::new("B", "alice")).await.unwrap();
        let queue = store.get_sync_queue().await.unwrap();
        store.mark_failed(&queue[0].id, "down").await.unwrap();
        store.mark_syncing(&queue[1].id).await.unwrap();

        // The strict pending view is empty, but both entities still
        // carry an unconfirmed mutation.
        assert!(store.pending_entity_ids().await.unwrap().is_empty());
        let unconfirmed = store.unconfirmed_entity_ids().await.unwrap();
        assert!(unconfirmed.contains(&failed.id));
        assert!(unconfirmed.contains(&stuck.id));
    }

    #[tokio::test]
    async fn test_last_sync_timestamp_roundtrip() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        assert_eq!(store.get_last_sync_timestamp().await.unwrap(), None);
        store.set_last_sync_timestamp(1234).await.unwrap();
        assert_eq!(store.get_last_sync_timestamp().await.unwrap(), Some(1234));
        store.set_last_sync_timestamp(5678).await.unwrap();
        assert_eq!(store.get_last_sync_timestamp().await.unwrap(), Some(5678));
    }

    #[tokio::test]
    async fn test_apply_remote_node_upserts_without_queueing() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let mut node = Node::new("Remote", "server");
        store.apply_remote_node(&node).await.unwrap();
        assert!(store.get_sync_queue().await.unwrap().is_empty());

        node.name = "Remote v2".into();
        node.updated_at += 1;
        store.apply_remote_node(&node).await.unwrap();

        let fetched = store.get_node(&node.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Remote v2");
        assert!(store.get_sync_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_remote_history_is_idempotent() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let entry = FieldHistoryEntry::new(
            "field-1",
            "node-1",
            HistoryAction::Create,
            None,
            Some("x".into()),
            "server",
            1000,
            0,
        );
        store.apply_remote_history(&entry).await.unwrap();
        store.apply_remote_history(&entry).await.unwrap();

        let history = store.get_field_history("field-1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], entry);
    }

    #[tokio::test]
    async fn test_local_only_deletes_are_silent() {
        let ctx = setup_store().await;
        let store = &ctx.store;

        let node = store.create_node(&Node::new("Inbox", "alice")).await.unwrap();
        let field = store
            .create_field(&Field::new(node.id.clone(), "email", "alice"))
            .await
            .unwrap();
        let queue_len = store.get_sync_queue().await.unwrap().len();

        store.delete_field_local(&field.id).await.unwrap();
        store.delete_node_local(&node.id).await.unwrap();

        assert!(store.get_node(&node.id).await.unwrap().is_none());
        assert!(store.get_field(&field.id).await.unwrap().is_none());
        assert_eq!(store.get_sync_queue().await.unwrap().len(), queue_len);
    }
}
