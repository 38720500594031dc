//! Source resolution: normalise a worklist reference to a local PDF.
//!
//! A reference is either a wiki page URL or a local file path, discriminated
//! by a URL-scheme check. Both branches end in the same place — an existing
//! `.pdf` on local disk — because the extraction service only accepts PDFs
//! and every later path-derived identifier (most importantly the
//! idempotency key) is computed from that file.
//!
//! The wiki-export and office-conversion capabilities are external
//! collaborators, injected as trait objects so tests can stub them and so
//! deployments can swap the wiki flavour without touching the pipeline.

use crate::error::PipelineError;
use crate::pipeline::sanitize::{safe_filename, sanitize_existing};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Check if a worklist reference looks like a URL.
pub fn is_url(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Export capability: turn a wiki page reference into a local PDF.
#[async_trait]
pub trait PageExporter: Send + Sync {
    /// Export the page behind `page_url` as a PDF under `out_dir` and
    /// return the written path.
    async fn export_pdf(&self, page_url: &str, out_dir: &Path) -> Result<PathBuf, PipelineError>;
}

/// Conversion capability: turn an office document into a sibling PDF.
#[async_trait]
pub trait OfficeToPdf: Send + Sync {
    /// Convert `input` to PDF, writing `<stem>.pdf` next to the input, and
    /// return the written path.
    async fn to_pdf(&self, input: &Path) -> Result<PathBuf, PipelineError>;
}

/// Resolve a worklist reference to a local PDF path.
///
/// * URL reference — delegate to the exporter; on export failure fall back
///   to the deterministic local filename derived from the URL (a previous
///   run may have left the PDF behind); if neither works the job fails
///   with [`PipelineError::ExportUnavailable`].
/// * Local reference — must exist; the file is renamed in place to a
///   sanitized name, and non-PDF extensions go through the office
///   converter.
pub async fn resolve_source(
    reference: &str,
    output_root: &Path,
    exporter: &dyn PageExporter,
    converter: &dyn OfficeToPdf,
) -> Result<PathBuf, PipelineError> {
    if is_url(reference) {
        resolve_wiki(reference, output_root, exporter).await
    } else {
        resolve_local(reference, converter).await
    }
}

async fn resolve_wiki(
    page_url: &str,
    output_root: &Path,
    exporter: &dyn PageExporter,
) -> Result<PathBuf, PipelineError> {
    info!("exporting wiki page: {}", page_url);
    match exporter.export_pdf(page_url, output_root).await {
        Ok(pdf) => Ok(pdf),
        Err(e) => {
            // A previous run may have exported this page already; the
            // derived filename is stable for display-style URLs.
            if let Some(candidate) = expected_export_path(page_url, output_root) {
                if candidate.is_file() {
                    warn!(
                        "export failed ({e}); using existing local PDF: {}",
                        candidate.display()
                    );
                    return Ok(candidate);
                }
            }
            Err(PipelineError::ExportUnavailable {
                reference: page_url.to_string(),
                detail: e.to_string(),
            })
        }
    }
}

async fn resolve_local(
    path_str: &str,
    converter: &dyn OfficeToPdf,
) -> Result<PathBuf, PipelineError> {
    let path = PathBuf::from(path_str);
    if !path.is_file() {
        return Err(PipelineError::SourceNotFound { path });
    }

    // Normalise the filename first so the idempotency key derived from the
    // PDF stem is stable and filesystem-safe.
    let path = sanitize_existing(&path).map_err(|e| PipelineError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    })?;

    if has_pdf_extension(&path) {
        return Ok(path);
    }

    info!("converting office document to PDF: {}", path.display());
    let pdf = converter.to_pdf(&path).await?;
    if !pdf.is_file() {
        return Err(PipelineError::ConversionFailed {
            path,
            detail: format!("converter reported '{}' but the file is missing", pdf.display()),
        });
    }
    Ok(pdf)
}

/// The local PDF path a display-style wiki URL would have been exported to.
///
/// Derived from the URL's last path segment: `+` becomes a space, percent
/// escapes are decoded, and the result is sanitized with a `.pdf` suffix.
/// Returns `None` when the last segment is unusable (empty, or an opaque
/// `viewpage.action` id whose page title is unknowable without the wiki).
pub fn expected_export_path(page_url: &str, output_root: &Path) -> Option<PathBuf> {
    let parsed = url::Url::parse(page_url).ok()?;
    // pageId-style links carry no title; the export name cannot be derived.
    if parsed.query_pairs().any(|(k, _)| k == "pageId") {
        return None;
    }
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    if last.is_empty() || last.ends_with(".action") {
        return None;
    }
    let title = urlencoding::decode(last).ok()?.replace('+', " ");
    Some(output_root.join(format!("{}.pdf", safe_filename(&title))))
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
