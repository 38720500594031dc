//! Notification sink: hand the finished article to the downstream
//! automation hook.
//!
//! Delivery is best-effort and at-most-once. By the time the sink runs, the
//! document is already durably on disk, so a failed delivery must never
//! reclassify the job — the batch driver logs it and moves on.

use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How much of a webhook error body is kept for the log.
const BODY_EXCERPT_LEN: usize = 200;

/// Delivery capability of the downstream automation hook.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver the absolute path of a finished Markdown document.
    async fn notify(&self, md_path: &Path) -> Result<(), PipelineError>;
}

/// JSON webhook sink: `POST {url}` with body `{"path": "<absolute path>"}`.
pub struct WebhookSink {
    http: reqwest::Client,
    url: String,
}

impl WebhookSink {
    /// Build a sink for `url` with a short dedicated timeout — the hook is
    /// an automation trigger, not a long-running consumer.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PipelineError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn notify(&self, md_path: &Path) -> Result<(), PipelineError> {
        let abs = std::fs::canonicalize(md_path).unwrap_or_else(|_| md_path.to_path_buf());
        let payload = serde_json::json!({ "path": abs.to_string_lossy() });

        let response = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::NotificationFailed {
                url: self.url.clone(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut end = body.len().min(BODY_EXCERPT_LEN);
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            return Err(PipelineError::NotificationFailed {
                url: self.url.clone(),
                detail: format!("HTTP {status}: {}", &body[..end]),
            });
        }

        info!("notified webhook '{}' of '{}'", self.url, abs.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_construction() {
        assert!(WebhookSink::new("http://localhost:5678/webhook/kb", 10).is_ok());
    }
}
