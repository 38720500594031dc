//! Job and outcome types for the batch ingestion pipeline.
//!
//! A [`Job`] is one document-reference-to-knowledge-article conversion
//! request: immutable once constructed, consumed exactly once per run. Its
//! result is a three-way [`JobOutcome`] — succeeded, skipped, or failed —
//! never an overloaded error type, so "already processed" can never be
//! confused with a real failure in the audit trail.
//!
//! [`BatchOutcome`] accumulates the per-job results into three disjoint
//! lists and persists them as newline-delimited text files under a per-run
//! timestamped directory. Those files are both the audit trail and the
//! retry seed: feed `failed.txt` back in as the next worklist.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tracing::info;

/// Which layout engine the extraction service should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    /// MinerU OCR/layout extraction (default).
    #[default]
    Mineru,
    /// The service's plain text-extraction path, no layout model.
    Basic,
}

impl ProcessorKind {
    /// Wire name sent in the multipart `processor` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorKind::Mineru => "mineru",
            ProcessorKind::Basic => "basic",
        }
    }
}

impl std::str::FromStr for ProcessorKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mineru" => Ok(ProcessorKind::Mineru),
            "basic" => Ok(ProcessorKind::Basic),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown processor '{other}' (expected 'mineru' or 'basic')"
            ))),
        }
    }
}

/// One unit of work: a document reference plus where its artifacts go.
#[derive(Debug, Clone)]
pub struct Job {
    /// Wiki page URL or local filesystem path, discriminated by an
    /// URL-scheme check at resolution time.
    pub reference: String,
    /// Layout engine for the extraction service.
    pub processor: ProcessorKind,
    /// Directory under which this job's artifacts live.
    pub output_root: PathBuf,
}

impl Job {
    pub fn new(
        reference: impl Into<String>,
        processor: ProcessorKind,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reference: reference.into(),
            processor,
            output_root: output_root.into(),
        }
    }
}

/// Read a worklist file into jobs: one reference per line, blank lines and
/// `#` comments ignored. Order is preserved.
pub fn read_worklist(
    path: &Path,
    processor: ProcessorKind,
    output_root: &Path,
) -> io::Result<Vec<Job>> {
    let file = fs::File::open(path)?;
    let mut jobs = Vec::new();
    for line in io::BufReader::new(file).lines() {
        let line = line?;
        let reference = line.trim();
        if reference.is_empty() || reference.starts_with('#') {
            continue;
        }
        jobs.push(Job::new(reference, processor, output_root));
    }
    Ok(jobs)
}

/// Terminal state of one job.
#[derive(Debug)]
pub enum JobOutcome {
    /// The job produced a final (possibly rewritten) Markdown document.
    Succeeded { markdown_path: PathBuf },
    /// The job's output directory already existed — already processed.
    Skipped { output_dir: PathBuf },
    /// A stage failed; the typed error is preserved for the audit trail.
    Failed { error: PipelineError },
}

/// A job that completed with a final document.
#[derive(Debug)]
pub struct CompletedJob {
    pub reference: String,
    pub markdown_path: PathBuf,
}

/// A job skipped by the idempotency gate.
#[derive(Debug)]
pub struct SkippedJob {
    pub reference: String,
    pub output_dir: PathBuf,
}

/// A job that failed, with its error preserved.
#[derive(Debug)]
pub struct FailedJob {
    pub reference: String,
    pub error: PipelineError,
}

/// The three disjoint outcome lists of a batch run.
///
/// Invariant: every job of the run appears in exactly one list, and each
/// list preserves the worklist's original order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: Vec<CompletedJob>,
    pub skipped: Vec<SkippedJob>,
    pub failed: Vec<FailedJob>,
}

impl BatchOutcome {
    /// Total number of classified jobs.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }

    /// Route one job's outcome into its bucket.
    pub fn record(&mut self, reference: &str, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Succeeded { markdown_path } => self.succeeded.push(CompletedJob {
                reference: reference.to_string(),
                markdown_path,
            }),
            JobOutcome::Skipped { output_dir } => self.skipped.push(SkippedJob {
                reference: reference.to_string(),
                output_dir,
            }),
            JobOutcome::Failed { error } => self.failed.push(FailedJob {
                reference: reference.to_string(),
                error,
            }),
        }
    }

    /// Persist the three lists under `run_dir` as `succeeded.txt` (final
    /// document paths), `skipped.txt`, and `failed.txt` (references, one
    /// per line — directly reusable as a retry worklist).
    pub fn persist(&self, run_dir: &Path) -> Result<(), PipelineError> {
        fs::create_dir_all(run_dir).map_err(|e| PipelineError::OutputWriteFailed {
            path: run_dir.to_path_buf(),
            source: e,
        })?;

        let write = |name: &str, lines: Vec<String>| -> Result<(), PipelineError> {
            let path = run_dir.join(name);
            let mut body = lines.join("\n");
            if !body.is_empty() {
                body.push('\n');
            }
            fs::write(&path, body).map_err(|e| PipelineError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })
        };

        write(
            "succeeded.txt",
            self.succeeded
                .iter()
                .map(|j| j.markdown_path.display().to_string())
                .collect(),
        )?;
        write(
            "skipped.txt",
            self.skipped.iter().map(|j| j.reference.clone()).collect(),
        )?;
        write(
            "failed.txt",
            self.failed.iter().map(|j| j.reference.clone()).collect(),
        )?;

        info!(
            "persisted batch outcome to '{}' ({} succeeded, {} skipped, {} failed)",
            run_dir.display(),
            self.succeeded.len(),
            self.skipped.len(),
            self.failed.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processor_kind_roundtrip() {
        assert_eq!("mineru".parse::<ProcessorKind>().unwrap(), ProcessorKind::Mineru);
        assert_eq!("BASIC".parse::<ProcessorKind>().unwrap(), ProcessorKind::Basic);
        assert!("magic".parse::<ProcessorKind>().is_err());
        assert_eq!(ProcessorKind::Mineru.as_str(), "mineru");
    }

    #[test]
    fn worklist_skips_blanks_and_comments() {
        let tmp = tempfile::tempdir().unwrap();
        let list = tmp.path().join("worklist.txt");
        fs::write(
            &list,
            "# decoder docs\nhttps://wiki.example.com/display/SW/Page+One\n\n  \n/srv/docs/guide.pdf\n",
        )
        .unwrap();

        let jobs = read_worklist(&list, ProcessorKind::Mineru, Path::new("/out")).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].reference, "https://wiki.example.com/display/SW/Page+One");
        assert_eq!(jobs[1].reference, "/srv/docs/guide.pdf");
        assert_eq!(jobs[1].output_root, PathBuf::from("/out"));
    }

    #[test]
    fn record_routes_to_exactly_one_bucket() {
        let mut outcome = BatchOutcome::default();
        outcome.record(
            "a",
            JobOutcome::Succeeded {
                markdown_path: PathBuf::from("/out/a.md"),
            },
        );
        outcome.record(
            "b",
            JobOutcome::Skipped {
                output_dir: PathBuf::from("/out/b"),
            },
        );
        outcome.record(
            "c",
            JobOutcome::Failed {
                error: PipelineError::SourceNotFound {
                    path: PathBuf::from("c"),
                },
            },
        );

        assert_eq!(outcome.total(), 3);
        assert_eq!(outcome.succeeded.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.failed.len(), 1);
    }

    #[test]
    fn persist_writes_three_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut outcome = BatchOutcome::default();
        outcome.record(
            "https://wiki/p1",
            JobOutcome::Succeeded {
                markdown_path: PathBuf::from("/out/p1/doc.md"),
            },
        );
        outcome.record(
            "https://wiki/p2",
            JobOutcome::Failed {
                error: PipelineError::ArtifactNotFound {
                    dir: PathBuf::from("/out/p2/extracted"),
                },
            },
        );

        let run_dir = tmp.path().join("run_20260807_120000");
        outcome.persist(&run_dir).unwrap();

        assert_eq!(
            fs::read_to_string(run_dir.join("succeeded.txt")).unwrap(),
            "/out/p1/doc.md\n"
        );
        assert_eq!(
            fs::read_to_string(run_dir.join("skipped.txt")).unwrap(),
            ""
        );
        assert_eq!(
            fs::read_to_string(run_dir.join("failed.txt")).unwrap(),
            "https://wiki/p2\n"
        );
    }
}
