//! Error types for the doc2kb library.
//!
//! One enum covers every stage of the ingestion pipeline. The variants map
//! 1:1 onto the stages: resolving a source document, submitting it to the
//! extraction service, unpacking the returned archive, locating and
//! rewriting the Markdown artifact, and notifying the downstream hook.
//!
//! The per-job orchestrator catches any of these at the job boundary and
//! records the job as failed without aborting the batch — see
//! [`crate::job::JobOutcome`]. `NotificationFailed` is special: delivery is
//! best-effort, so it is logged but never changes a job's classification.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the doc2kb pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Source resolution ─────────────────────────────────────────────────
    /// A local source reference does not point to an existing file.
    #[error("source document not found: '{path}'\nCheck the worklist entry points at an existing file.")]
    SourceNotFound { path: PathBuf },

    /// The wiki export failed and no local fallback PDF exists.
    #[error("wiki export unavailable for '{reference}': {detail}")]
    ExportUnavailable { reference: String, detail: String },

    /// The office-to-PDF conversion did not produce a sibling PDF.
    #[error("office-to-PDF conversion failed for '{path}': {detail}")]
    ConversionFailed { path: PathBuf, detail: String },

    // ── Extraction service ────────────────────────────────────────────────
    /// The upload never reached the service (connect error, timeout, DNS).
    #[error("extraction request to '{url}' failed: {detail}")]
    ExtractionRequestFailed { url: String, detail: String },

    /// The service answered with a non-2xx status.
    #[error("extraction service rejected the document (HTTP {status}): {body_excerpt}")]
    ExtractionRejected { status: u16, body_excerpt: String },

    /// The service returned a 2xx but the archive body was empty.
    #[error("extraction returned an empty archive: '{path}'")]
    ArchiveEmpty { path: PathBuf },

    // ── Artifact handling ─────────────────────────────────────────────────
    /// Unpacking the archive failed (corrupt gzip/tar, I/O error).
    #[error("failed to unpack archive '{path}': {detail}")]
    UnpackFailed { path: PathBuf, detail: String },

    /// The unpacked tree contains no eligible Markdown candidate.
    #[error("no Markdown artifact found under '{dir}'")]
    ArtifactNotFound { dir: PathBuf },

    /// I/O error while rewriting image links. Distinct from "zero links
    /// found", which is a success.
    #[error("failed to rewrite image links in '{path}': {source}")]
    RewriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Notification ──────────────────────────────────────────────────────
    /// The webhook did not accept the delivery. Never fatal to a job.
    #[error("notification to '{url}' failed: {detail}")]
    NotificationFailed { url: String, detail: String },

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Could not create or write an output file or directory.
    #[error("failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable lowercase token identifying the error kind, used when tagging
    /// entries in the batch failure log.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceNotFound { .. } => "source_not_found",
            PipelineError::ExportUnavailable { .. } => "export_unavailable",
            PipelineError::ConversionFailed { .. } => "conversion_failed",
            PipelineError::ExtractionRequestFailed { .. } => "extraction_request_failed",
            PipelineError::ExtractionRejected { .. } => "extraction_rejected",
            PipelineError::ArchiveEmpty { .. } => "archive_empty",
            PipelineError::UnpackFailed { .. } => "unpack_failed",
            PipelineError::ArtifactNotFound { .. } => "artifact_not_found",
            PipelineError::RewriteFailed { .. } => "rewrite_failed",
            PipelineError::NotificationFailed { .. } => "notification_failed",
            PipelineError::OutputWriteFailed { .. } => "output_write_failed",
            PipelineError::InvalidConfig(_) => "invalid_config",
            PipelineError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_rejected_display() {
        let e = PipelineError::ExtractionRejected {
            status: 500,
            body_excerpt: "mineru crashed".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("500"), "got: {msg}");
        assert!(msg.contains("mineru crashed"));
    }

    #[test]
    fn source_not_found_display() {
        let e = PipelineError::SourceNotFound {
            path: PathBuf::from("/tmp/missing.pdf"),
        };
        assert!(e.to_string().contains("/tmp/missing.pdf"));
    }

    #[test]
    fn artifact_not_found_display() {
        let e = PipelineError::ArtifactNotFound {
            dir: PathBuf::from("/out/doc/extracted"),
        };
        assert!(e.to_string().contains("extracted"));
    }

    #[test]
    fn kind_is_stable() {
        let e = PipelineError::ExportUnavailable {
            reference: "https://wiki/x".into(),
            detail: "401".into(),
        };
        assert_eq!(e.kind(), "export_unavailable");
    }
}
