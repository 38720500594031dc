//! Batch driver: apply the job pipeline to a worklist, keep going through
//! failures, and leave an audit trail.
//!
//! ## Why sequential?
//!
//! The extraction service and the wiki are singleton, possibly rate-limited
//! instances. Sequential submission with a fixed inter-job delay throttles
//! load without implementing a rate limiter; hundreds of jobs complete
//! overnight either way, and the idempotency gate makes an interrupted run
//! safely resumable.
//!
//! ## Outcome handling
//!
//! Every job lands in exactly one of three buckets — succeeded, skipped,
//! failed — preserving worklist order. The lists are persisted *before* the
//! notification fan-out and before returning, so even a driver killed
//! mid-notification leaves forensic evidence of what happened.

use crate::error::PipelineError;
use crate::job::{BatchOutcome, Job, JobOutcome};
use crate::process::JobPipeline;
use std::path::{Path, PathBuf};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

/// Runs a worklist of jobs strictly sequentially and records the outcome.
pub struct BatchDriver {
    pipeline: JobPipeline,
    run_dir: PathBuf,
}

impl BatchDriver {
    /// Create a driver whose outcome lists will be persisted under a fresh
    /// per-run timestamped directory below the configured output root.
    pub fn new(pipeline: JobPipeline) -> Self {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let run_dir = pipeline.config().output_root.join(format!("run_{stamp}"));
        Self { pipeline, run_dir }
    }

    /// Where this run's `succeeded.txt` / `skipped.txt` / `failed.txt` go.
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Process every job, classify outcomes, persist the lists, then fan
    /// out notifications over the succeeded jobs.
    ///
    /// A failing job never aborts the loop; the only fatal error here is
    /// failing to persist the outcome lists themselves.
    pub async fn run(&self, jobs: &[Job]) -> Result<BatchOutcome, PipelineError> {
        let mut outcome = BatchOutcome::default();
        let delay = Duration::from_millis(self.pipeline.config().inter_job_delay_ms);
        let callback = self.pipeline.config().progress_callback.clone();

        if let Some(ref cb) = callback {
            cb.on_batch_start(jobs.len());
        }

        for (index, job) in jobs.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                sleep(delay).await;
            }
            info!("job {}/{}: {}", index + 1, jobs.len(), job.reference);
            if let Some(ref cb) = callback {
                cb.on_job_start(index, jobs.len(), &job.reference);
            }

            let result = self.pipeline.run(job).await;
            match &result {
                JobOutcome::Succeeded { markdown_path } => {
                    info!("succeeded: {}", markdown_path.display());
                    if let Some(ref cb) = callback {
                        cb.on_job_succeeded(&job.reference, markdown_path);
                    }
                }
                JobOutcome::Skipped { output_dir } => {
                    info!("skipped (already processed): {}", output_dir.display());
                    if let Some(ref cb) = callback {
                        cb.on_job_skipped(&job.reference, output_dir);
                    }
                }
                JobOutcome::Failed { error } => {
                    warn!("failed [{}]: {}: {error}", error.kind(), job.reference);
                    if let Some(ref cb) = callback {
                        cb.on_job_failed(&job.reference, error);
                    }
                }
            }
            outcome.record(&job.reference, result);
        }

        if let Some(ref cb) = callback {
            cb.on_batch_complete(
                outcome.succeeded.len(),
                outcome.skipped.len(),
                outcome.failed.len(),
            );
        }

        outcome.persist(&self.run_dir)?;
        self.notify_succeeded(&outcome).await;

        info!(
            "batch complete: {} jobs, {} succeeded, {} skipped, {} failed",
            outcome.total(),
            outcome.succeeded.len(),
            outcome.skipped.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    /// Best-effort notification fan-out over the succeeded list. Delivery
    /// failures are logged and swallowed; the classification on disk is
    /// already final.
    async fn notify_succeeded(&self, outcome: &BatchOutcome) {
        if !self.pipeline.notifier_configured() {
            return;
        }
        let mut delivered = 0usize;
        for job in &outcome.succeeded {
            match self.pipeline.notify(&job.markdown_path).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "notification failed for '{}': {e}",
                    job.markdown_path.display()
                ),
            }
        }
        info!(
            "notified {}/{} succeeded documents",
            delivered,
            outcome.succeeded.len()
        );
    }
}
