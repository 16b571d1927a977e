//! HTTP remote adapter.
//!
//! Thin JSON client against a treedeck sync server. The server side
//! owns the queue-item interpretation; this adapter only maps trait
//! methods onto REST endpoints:
//!
//! ```text
//! GET  /nodes              GET  /nodes?since=<ms>
//! GET  /fields             GET  /fields?since=<ms>
//! GET  /history            GET  /history?since=<ms>
//! POST /sync/apply         (body: one SyncQueueItem)
//! GET  /health
//! ```

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::models::{Field, FieldHistoryEntry, Node, SyncQueueItem};
use crate::remote::RemoteAdapter;

/// Checks if the sync server is reachable.
pub async fn check_server(server_url: &str) -> bool {
    let url = format!("{}/health", server_url.trim_end_matches('/'));
    match Client::new().get(&url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url: String = server_url.into();
        Self {
            client: Client::new(),
            base_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.client.get(self.url(path)).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn check_status(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let detail = resp.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(detail),
            StatusCode::NOT_FOUND => Error::NotFound(detail),
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => Error::Conflict(detail),
            StatusCode::TOO_MANY_REQUESTS => Error::Unavailable(detail),
            s if s.is_server_error() => Error::Unavailable(detail),
            s => Error::Internal(format!("unexpected status {}: {}", s, detail)),
        })
    }
}

#[async_trait]
impl RemoteAdapter for HttpRemote {
    async fn pull_all_nodes(&self) -> Result<Vec<Node>> {
        self.get_json("/nodes").await
    }

    async fn pull_all_fields(&self) -> Result<Vec<Field>> {
        self.get_json("/fields").await
    }

    async fn pull_all_history(&self) -> Result<Vec<FieldHistoryEntry>> {
        self.get_json("/history").await
    }

    async fn pull_nodes_since(&self, since: i64) -> Result<Vec<Node>> {
        self.get_json(&format!("/nodes?since={}", since)).await
    }

    async fn pull_fields_since(&self, since: i64) -> Result<Vec<Field>> {
        self.get_json(&format!("/fields?since={}", since)).await
    }

    async fn pull_history_since(&self, since: i64) -> Result<Vec<FieldHistoryEntry>> {
        self.get_json(&format!("/history?since={}", since)).await
    }

    async fn apply_sync_item(&self, item: &SyncQueueItem) -> Result<()> {
        let resp = self
            .client
            .post(self.url("/sync/apply"))
            .json(item)
            .send()
            .await?;
        Self::check_status(resp).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let remote = HttpRemote::new("https://sync.example.com/");
        assert_eq!(remote.url("/nodes"), "https://sync.example.com/nodes");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Nothing listens on this port.
        let remote = HttpRemote::new("http://127.0.0.1:1");
        let err = remote.pull_all_nodes().await.unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_check_server_unreachable() {
        assert!(!check_server("http://127.0.0.1:1").await);
    }
}
