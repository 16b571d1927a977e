//! Error types shared across the storage and sync layers.

use thiserror::Error;

/// Errors surfaced by the local store, the remote adapters, and the
/// sync engine.
///
/// Local-write failures (`NotFound`, `Validation`) are returned
/// synchronously from the original mutation call and never enter the
/// sync machinery. Push failures are recorded per queue item by the
/// pusher; cycle-level failures are logged and swallowed by the
/// sync manager.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced entity does not exist (or is not in the expected
    /// lifecycle state). Non-retryable.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input. Non-retryable.
    #[error("validation: {0}")]
    Validation(String),

    /// A remote precondition failed.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The remote rejected the caller's credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Network or remote outage. Retryable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Local database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Entity snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Anything unexpected.
    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a failed operation is worth retrying on a later cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Unavailable(_) | Error::Database(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Error::Unavailable(e.to_string())
        } else {
            Error::Internal(e.to_string())
        }
    }
}
