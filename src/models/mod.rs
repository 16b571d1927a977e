mod field;
mod history;
mod node;
mod queue;

pub use field::Field;
pub use history::{FieldHistoryEntry, HistoryAction};
pub use node::Node;
pub use queue::{EntityType, QueueOperation, QueueStatus, SyncQueueItem};

/// Current time as epoch milliseconds. All persisted timestamps use
/// this representation.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
