//! Office-to-PDF conversion via headless LibreOffice.
//!
//! The extraction service only accepts PDFs, so `.doc`/`.docx` (and
//! anything else LibreOffice can open) is converted first. The converter
//! writes `<stem>.pdf` next to the input — keeping source and PDF siblings
//! means the idempotency key derived from the PDF path stays inside the
//! job's own directory.

use crate::error::PipelineError;
use crate::pipeline::source::OfficeToPdf;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// How much child-process stderr is kept in [`PipelineError::ConversionFailed`].
const STDERR_EXCERPT_LEN: usize = 300;

/// Headless LibreOffice wrapper.
pub struct LibreOffice {
    binary: String,
}

impl LibreOffice {
    /// Use the `libreoffice` binary from `PATH`.
    pub fn new() -> Self {
        Self {
            binary: "libreoffice".to_string(),
        }
    }

    /// Use an explicit binary (e.g. `soffice` on some distributions).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for LibreOffice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OfficeToPdf for LibreOffice {
    async fn to_pdf(&self, input: &Path) -> Result<PathBuf, PipelineError> {
        let out_dir = input.parent().unwrap_or_else(|| Path::new("."));
        let expected = input.with_extension("pdf");

        debug!(
            "{} --headless --convert-to pdf --outdir {} {}",
            self.binary,
            out_dir.display(),
            input.display()
        );
        let output = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input)
            .output()
            .await
            .map_err(|e| PipelineError::ConversionFailed {
                path: input.to_path_buf(),
                detail: format!("failed to spawn '{}': {e}", self.binary),
            })?;

        if !output.status.success() || !expected.is_file() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let detail = [stderr.trim(), stdout.trim()]
                .iter()
                .find(|s| !s.is_empty())
                .map(|s| {
                    let mut end = s.len().min(STDERR_EXCERPT_LEN);
                    while !s.is_char_boundary(end) {
                        end -= 1;
                    }
                    s[..end].to_string()
                })
                .unwrap_or_else(|| format!("exit status {}", output.status));
            return Err(PipelineError::ConversionFailed {
                path: input.to_path_buf(),
                detail,
            });
        }

        info!("converted '{}' -> '{}'", input.display(), expected.display());
        Ok(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_conversion_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = tmp.path().join("report.docx");
        std::fs::write(&doc, b"word").unwrap();

        let converter = LibreOffice::with_binary("definitely-not-a-real-office-binary");
        let err = converter.to_pdf(&doc).await.unwrap_err();
        assert!(matches!(err, PipelineError::ConversionFailed { .. }));
    }
}
