//! # doc2kb
//!
//! Batch-convert internal wiki pages and office documents into Markdown
//! knowledge-base articles with rewritten image links, then notify a
//! downstream automation hook.
//!
//! ## Why this crate?
//!
//! Feeding a wiki into a knowledge base by hand means exporting pages one
//! at a time, pushing each PDF through an OCR/layout service, fishing the
//! real Markdown out of the result, and fixing every image link so the
//! article renders outside the wiki. This crate automates that as a list of
//! independent, idempotent jobs: a job that already produced its output
//! directory is skipped, a job that fails is recorded and retried next run,
//! and the batch always finishes with an audit trail.
//!
//! ## Pipeline Overview
//!
//! ```text
//! reference (wiki URL or local file)
//!  │
//!  ├─ 1. Source    export wiki page / convert office doc → local PDF
//!  ├─ 2. Gate      skip when {pdf_dir}/{pdf_stem}/ already exists
//!  ├─ 3. Extract   multipart upload to the OCR/layout service → archive
//!  ├─ 4. Locate    unpack; deepest .md wins (never *_fix.md)
//!  ├─ 5. Rewrite   ![alt](images/…) → absolute asset-host URLs
//!  └─ 6. Notify    POST {"path": …} to the automation webhook
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2kb::{BatchDriver, Job, JobPipeline, PipelineConfig, ProcessorKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .endpoint("http://127.0.0.1:7890/process/archive")
//!         .base_host("http://127.0.0.1:8081")
//!         .workspace_root("/srv/kb")
//!         .output_root("/srv/kb/docs")
//!         .build()?;
//!
//!     let jobs = vec![Job::new(
//!         "/srv/kb/docs/decoder_guide.pdf",
//!         ProcessorKind::Mineru,
//!         "/srv/kb/docs",
//!     )];
//!
//!     let driver = BatchDriver::new(JobPipeline::new(config)?);
//!     let outcome = driver.run(&jobs).await?;
//!     println!(
//!         "{} succeeded, {} skipped, {} failed",
//!         outcome.succeeded.len(),
//!         outcome.skipped.len(),
//!         outcome.failed.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2kb` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! doc2kb = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod job;
pub mod office;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod wiki;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::BatchDriver;
pub use config::{PipelineConfig, PipelineConfigBuilder, WikiConfig};
pub use error::PipelineError;
pub use job::{read_worklist, BatchOutcome, CompletedJob, FailedJob, Job, JobOutcome, ProcessorKind, SkippedJob};
pub use office::LibreOffice;
pub use pipeline::extract::{ExtractionClient, ExtractionService};
pub use pipeline::notify::{NotificationSink, WebhookSink};
pub use pipeline::source::{OfficeToPdf, PageExporter};
pub use process::JobPipeline;
pub use progress::{BatchProgressCallback, ProgressCallback};
pub use wiki::WikiClient;
