//! Progress-callback trait for per-job batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! real-time events as the driver works through the worklist.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a terminal progress bar, a log aggregator, or a
//! dashboard without the library knowing anything about how the host
//! application communicates. All methods have default no-op implementations
//! so callers only override what they care about.

use crate::error::PipelineError;
use std::path::Path;
use std::sync::Arc;

/// Called by the batch driver as it processes each job.
///
/// Jobs run strictly sequentially, so implementations are never invoked
/// concurrently; the `Send + Sync` bound exists only because the callback
/// is shared via `Arc` across the driver's lifetime.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first job.
    fn on_batch_start(&self, _total_jobs: usize) {}

    /// Called when a job begins (after the inter-job delay).
    fn on_job_start(&self, _index: usize, _total_jobs: usize, _reference: &str) {}

    /// Called when a job produced its final Markdown document.
    fn on_job_succeeded(&self, _reference: &str, _markdown_path: &Path) {}

    /// Called when the idempotency gate skipped a job.
    fn on_job_skipped(&self, _reference: &str, _output_dir: &Path) {}

    /// Called when a job failed; the batch continues regardless.
    fn on_job_failed(&self, _reference: &str, _error: &PipelineError) {}

    /// Called once after the last job, before notification fan-out.
    fn on_batch_complete(&self, _succeeded: usize, _skipped: usize, _failed: usize) {}
}

/// Convenience alias for the injectable callback.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        completed: AtomicUsize,
    }

    impl BatchProgressCallback for Counting {
        fn on_job_succeeded(&self, _reference: &str, _markdown_path: &Path) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn default_methods_are_no_ops() {
        let cb = Counting {
            completed: AtomicUsize::new(0),
        };
        cb.on_batch_start(3);
        cb.on_job_start(0, 3, "ref");
        cb.on_job_succeeded("ref", Path::new("/out/doc.md"));
        cb.on_batch_complete(1, 0, 0);
        assert_eq!(cb.completed.load(Ordering::SeqCst), 1);
    }
}
