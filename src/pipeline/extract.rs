//! Extraction client: submit a PDF to the remote OCR/layout service and
//! retrieve the output archive.
//!
//! The service contract is a multipart `POST`: a binary `file` part, a
//! `processor` field naming the layout engine, and an optional `backend`
//! field selecting the extraction model. A 2xx response carries the archive
//! as opaque bytes; this module never looks inside it — unpacking belongs
//! to [`crate::pipeline::locate`].
//!
//! Extraction runs are long (minutes per document on a GPU-backed service),
//! so the upload is streamed from disk rather than buffered, and the
//! request timeout is configured per client rather than per call.

use crate::error::PipelineError;
use crate::job::ProcessorKind;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// How much of an error body is kept in [`PipelineError::ExtractionRejected`].
const BODY_EXCERPT_LEN: usize = 200;

/// Archive name used when neither the caller nor the response names one.
const DEFAULT_ARCHIVE_NAME: &str = "output.tar.gz";

/// Submission capability of the remote extraction service.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Upload `pdf_path` for processing and write the returned archive.
    ///
    /// With `output_path` the archive lands exactly there (parent
    /// directories created as needed); without it the filename comes from
    /// the response's `Content-Disposition` header, written next to the
    /// PDF. Returns the written path.
    async fn submit(
        &self,
        pdf_path: &Path,
        processor: ProcessorKind,
        output_path: Option<&Path>,
    ) -> Result<PathBuf, PipelineError>;
}

/// HTTP client for the extraction service.
pub struct ExtractionClient {
    http: reqwest::Client,
    endpoint: String,
    backend: Option<String>,
}

impl ExtractionClient {
    /// Build a client for `endpoint` with an overall request timeout.
    pub fn new(
        endpoint: impl Into<String>,
        timeout_secs: u64,
        backend: Option<String>,
    ) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PipelineError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            backend,
        })
    }

    async fn submit_inner(
        &self,
        pdf_path: &Path,
        processor: ProcessorKind,
        output_path: Option<&Path>,
    ) -> Result<PathBuf, PipelineError> {
        let file_name = pdf_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_string();

        let file = tokio::fs::File::open(pdf_path)
            .await
            .map_err(|_| PipelineError::SourceNotFound {
                path: pdf_path.to_path_buf(),
            })?;
        let part = reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(
            ReaderStream::new(file),
        ))
        .file_name(file_name)
        .mime_str("application/pdf")
        .map_err(|e| PipelineError::Internal(format!("invalid mime type: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("processor", processor.as_str());
        if let Some(ref backend) = self.backend {
            form = form.text("backend", backend.clone());
        }

        info!(
            "submitting '{}' to extraction service: {}",
            pdf_path.display(),
            self.endpoint
        );
        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::ExtractionRequestFailed {
                url: self.endpoint.clone(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::ExtractionRejected {
                status: status.as_u16(),
                body_excerpt: excerpt(&body),
            });
        }

        let declared = disposition_filename(
            response
                .headers()
                .get(reqwest::header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok()),
        );
        if let Some(ref name) = declared {
            debug!("service declared archive filename: {name}");
        }

        let target = match output_path {
            Some(p) => p.to_path_buf(),
            None => {
                let name = declared.unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string());
                pdf_path
                    .parent()
                    .unwrap_or_else(|| Path::new("."))
                    .join(name)
            }
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::OutputWriteFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::ExtractionRequestFailed {
                url: self.endpoint.clone(),
                detail: e.to_string(),
            })?;

        if bytes.is_empty() {
            return Err(PipelineError::ArchiveEmpty { path: target });
        }

        tokio::fs::write(&target, &bytes)
            .await
            .map_err(|e| PipelineError::OutputWriteFailed {
                path: target.clone(),
                source: e,
            })?;

        info!(
            "saved extraction archive ({} bytes): {}",
            bytes.len(),
            target.display()
        );
        Ok(target)
    }
}

#[async_trait]
impl ExtractionService for ExtractionClient {
    async fn submit(
        &self,
        pdf_path: &Path,
        processor: ProcessorKind,
        output_path: Option<&Path>,
    ) -> Result<PathBuf, PipelineError> {
        self.submit_inner(pdf_path, processor, output_path).await
    }
}

/// Parse the filename out of a `Content-Disposition` header value.
pub fn disposition_filename(header: Option<&str>) -> Option<String> {
    let header = header?;
    let (_, raw) = header.split_once("filename=")?;
    let name = raw.trim().trim_matches('"').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn excerpt(body: &str) -> String {
    if body.len() <= BODY_EXCERPT_LEN {
        body.to_string()
    } else {
        let mut end = BODY_EXCERPT_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_filename_parsing() {
        assert_eq!(
            disposition_filename(Some("attachment; filename=\"report.tar.gz\"")),
            Some("report.tar.gz".to_string())
        );
        assert_eq!(
            disposition_filename(Some("attachment; filename=plain.tar.gz")),
            Some("plain.tar.gz".to_string())
        );
        assert_eq!(disposition_filename(Some("attachment")), None);
        assert_eq!(disposition_filename(Some("attachment; filename=\"\"")), None);
        assert_eq!(disposition_filename(None), None);
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(500);
        let e = excerpt(&long);
        assert!(e.len() < long.len());
        assert!(e.ends_with('…'));
        assert_eq!(excerpt("short"), "short");
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let body = "错".repeat(200);
        let e = excerpt(&body);
        assert!(e.ends_with('…'));
    }

    #[test]
    fn client_construction() {
        let c = ExtractionClient::new("http://127.0.0.1:7890/process/archive", 60, None);
        assert!(c.is_ok());
    }
}
