//! Per-job orchestration: one document reference through every stage.
//!
//! ## Job state machine
//!
//! ```text
//! Init ──▶ SourceResolved ──▶ Submitted ──▶ Extracted ──▶ ArtifactLocated ──▶ Rewritten ──▶ Done
//!   │             │               │              │                │                │
//!   └─────────────┴───────────────┴──────────────┴────────────────┴────────────────┴──▶ Failed
//!                 └──▶ Skipped (idempotency gate)
//! ```
//!
//! Every stage error is caught at this boundary and becomes
//! [`JobOutcome::Failed`] with the typed error preserved — a bad job never
//! aborts the batch. Notification is deliberately *not* part of `run()`:
//! the batch driver fans it out after the outcome lists are persisted, so a
//! flaky webhook can never reclassify a finished document.
//!
//! ## Idempotency gate
//!
//! The expected output directory is `{pdf_dir}/{pdf_stem}`. If it already
//! exists the job is already processed and transitions straight to
//! `Skipped` — the primary resumability mechanism for batches interrupted
//! mid-run. For references whose PDF filename is derivable without the
//! wiki (local paths, display-style URLs) the gate also runs before source
//! resolution, so a resumed batch performs zero network calls for pages it
//! has already converted.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::job::{Job, JobOutcome};
use crate::office::LibreOffice;
use crate::pipeline::extract::{ExtractionClient, ExtractionService};
use crate::pipeline::locate::{locate_markdown, unpack_archive};
use crate::pipeline::notify::{NotificationSink, WebhookSink};
use crate::pipeline::rewrite::rewrite_image_links;
use crate::pipeline::sanitize::safe_filename;
use crate::pipeline::source::{
    expected_export_path, is_url, resolve_source, OfficeToPdf, PageExporter,
};
use crate::wiki::WikiClient;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Drives a single [`Job`] through the full ingestion pipeline.
pub struct JobPipeline {
    config: PipelineConfig,
    exporter: Arc<dyn PageExporter>,
    converter: Arc<dyn OfficeToPdf>,
    extractor: Arc<dyn ExtractionService>,
    notifier: Option<Arc<dyn NotificationSink>>,
}

impl JobPipeline {
    /// Wire up the pipeline, resolving each collaborator from most-specific
    /// to least-specific: an injected trait object wins, otherwise the
    /// HTTP/process-backed default is built from the config.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let exporter: Arc<dyn PageExporter> = match config.exporter.clone() {
            Some(exporter) => exporter,
            None => match config.wiki.clone() {
                Some(wiki) => Arc::new(WikiClient::new(wiki, config.export_timeout_secs)?),
                None => Arc::new(NoWikiConfigured),
            },
        };

        let converter: Arc<dyn OfficeToPdf> = config
            .converter
            .clone()
            .unwrap_or_else(|| Arc::new(LibreOffice::new()));

        let extractor: Arc<dyn ExtractionService> = match config.extractor.clone() {
            Some(extractor) => extractor,
            None => Arc::new(ExtractionClient::new(
                config.endpoint.clone(),
                config.extraction_timeout_secs,
                config.backend.clone(),
            )?),
        };

        let notifier: Option<Arc<dyn NotificationSink>> = match config.notifier.clone() {
            Some(notifier) => Some(notifier),
            None => match config.webhook_url.clone() {
                Some(url) => Some(Arc::new(WebhookSink::new(url, config.notify_timeout_secs)?)),
                None => None,
            },
        };

        Ok(Self {
            config,
            exporter,
            converter,
            extractor,
            notifier,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Whether a notification sink is configured.
    pub fn notifier_configured(&self) -> bool {
        self.notifier.is_some()
    }

    /// Run one job to a terminal outcome. Never returns an error — failures
    /// are data, captured in [`JobOutcome::Failed`].
    pub async fn run(&self, job: &Job) -> JobOutcome {
        // ── Early idempotency gate (no I/O beyond a stat) ────────────────
        if let Some(output_dir) = self.early_gate(job) {
            info!("output directory exists, skipping: {}", output_dir.display());
            return JobOutcome::Skipped { output_dir };
        }

        match self.run_stages(job).await {
            Ok(outcome) => outcome,
            Err(error) => JobOutcome::Failed { error },
        }
    }

    async fn run_stages(&self, job: &Job) -> Result<JobOutcome, PipelineError> {
        // ── Stage 1: Resolve the source to a local PDF ───────────────────
        let pdf_path = resolve_source(
            &job.reference,
            &job.output_root,
            self.exporter.as_ref(),
            self.converter.as_ref(),
        )
        .await?;
        debug!("source resolved: {}", pdf_path.display());

        // ── Stage 2: Authoritative idempotency gate ──────────────────────
        let save_dir = output_dir_for(&pdf_path);
        if save_dir.is_dir() {
            info!("output directory exists, skipping: {}", save_dir.display());
            return Ok(JobOutcome::Skipped { output_dir: save_dir });
        }
        // Plain create_dir: if two runs race, the loser fails loudly here
        // instead of both writing into the same directory.
        fs::create_dir(&save_dir).map_err(|e| PipelineError::OutputWriteFailed {
            path: save_dir.clone(),
            source: e,
        })?;

        // ── Stage 3: Submit to the extraction service ────────────────────
        let archive_path = save_dir.join(&self.config.archive_name);
        let archive = self
            .extractor
            .submit(&pdf_path, job.processor, Some(&archive_path))
            .await?;

        // ── Stage 4: Unpack and locate the canonical Markdown ────────────
        let extract_dir = unpack_archive(&archive)?;
        let md_path = locate_markdown(&extract_dir)?;

        // ── Stage 5: Rewrite image links ─────────────────────────────────
        let (count, final_md) = rewrite_image_links(
            &md_path,
            &self.config.base_host,
            &self.config.workspace_root,
        )?;
        info!(
            "job done ({count} image links rewritten): {}",
            final_md.display()
        );

        Ok(JobOutcome::Succeeded {
            markdown_path: final_md,
        })
    }

    /// Deliver a finished document path to the notification sink.
    ///
    /// A no-op `Ok(())` when notification is disabled.
    pub async fn notify(&self, md_path: &Path) -> Result<(), PipelineError> {
        match self.notifier {
            Some(ref sink) => sink.notify(md_path).await,
            None => Ok(()),
        }
    }

    /// Pre-resolution idempotency check for references whose PDF filename
    /// is derivable without touching the network. Returns the existing
    /// output directory when the job is already processed.
    fn early_gate(&self, job: &Job) -> Option<PathBuf> {
        let expected_pdf = if is_url(&job.reference) {
            expected_export_path(&job.reference, &job.output_root)?
        } else {
            let path = Path::new(&job.reference);
            let name = safe_filename(path.file_name()?.to_str()?);
            path.parent()?.join(Path::new(&name).with_extension("pdf"))
        };
        let dir = output_dir_for(&expected_pdf);
        dir.is_dir().then_some(dir)
    }
}

/// The idempotency key: a job's output directory is `{pdf_dir}/{pdf_stem}`.
pub fn output_dir_for(pdf_path: &Path) -> PathBuf {
    let stem = pdf_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    pdf_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(stem)
}

/// Placeholder exporter used when no wiki access is configured; URL
/// references still work if the export fallback finds a local PDF.
struct NoWikiConfigured;

#[async_trait]
impl PageExporter for NoWikiConfigured {
    async fn export_pdf(&self, page_url: &str, _out_dir: &Path) -> Result<PathBuf, PipelineError> {
        Err(PipelineError::ExportUnavailable {
            reference: page_url.to_string(),
            detail: "no wiki access configured (set wiki base URL and credentials)".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_is_pdf_dir_plus_stem() {
        assert_eq!(
            output_dir_for(Path::new("/srv/docs/guide.pdf")),
            PathBuf::from("/srv/docs/guide")
        );
        assert_eq!(
            output_dir_for(Path::new("/srv/docs/How_to_dump_decoded_YUV_data.pdf")),
            PathBuf::from("/srv/docs/How_to_dump_decoded_YUV_data")
        );
    }

    #[test]
    fn pipeline_builds_without_wiki_or_webhook() {
        let pipeline = JobPipeline::new(PipelineConfig::default()).unwrap();
        assert!(!pipeline.notifier_configured());
    }
}
