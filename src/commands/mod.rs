mod config_cmd;
mod field_cmd;
mod node_cmd;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use field_cmd::FieldCommand;
pub use node_cmd::NodeCommand;
pub use sync_cmd::SyncCommand;

/// Render an epoch-milliseconds timestamp for display; falls back to
/// the raw number if it is out of range.
pub fn format_timestamp(ms: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => ms.to_string(),
    }
}
