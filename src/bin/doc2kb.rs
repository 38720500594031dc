//! CLI binary for doc2kb.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, runs the batch driver, and prints the summary.

use anyhow::{Context, Result};
use clap::Parser;
use doc2kb::{
    read_worklist, BatchDriver, BatchProgressCallback, JobPipeline, PipelineConfig,
    PipelineError, ProcessorKind, ProgressCallback, WikiConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a job-level progress bar anchored at the
/// bottom of the terminal plus one coloured log line per finished job.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} jobs  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_jobs: usize) {
        self.bar.set_length(total_jobs as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_jobs} jobs…"))
        ));
    }

    fn on_job_start(&self, _index: usize, _total_jobs: usize, reference: &str) {
        self.bar.set_message(truncate(reference, 60));
    }

    fn on_job_succeeded(&self, reference: &str, markdown_path: &Path) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            reference,
            dim(&markdown_path.display().to_string())
        ));
        self.bar.inc(1);
    }

    fn on_job_skipped(&self, reference: &str, output_dir: &Path) {
        self.bar.println(format!(
            "  {} {}  {}",
            cyan("↷"),
            reference,
            dim(&format!("already processed: {}", output_dir.display()))
        ));
        self.bar.inc(1);
    }

    fn on_job_failed(&self, reference: &str, error: &PipelineError) {
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            reference,
            red(&truncate(&error.to_string(), 100))
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a worklist of wiki pages and local documents
  doc2kb worklist.txt --output-root /srv/kb/docs

  # Point at a specific extraction service and asset host
  doc2kb worklist.txt \
      --endpoint http://10.0.0.5:7890/process/archive \
      --base-host http://10.0.0.9:8081 \
      --workspace-root /srv/kb

  # Enable the automation webhook
  doc2kb worklist.txt --webhook http://localhost:5678/webhook/kb-ingest

  # Retry last run's failures (failed.txt is a valid worklist)
  doc2kb /srv/kb/docs/run_20260807_101500/failed.txt --output-root /srv/kb/docs

WORKLIST FORMAT:
  One reference per line; blank lines and '#' comments are ignored.
  A reference is either a wiki page URL or a local file path:

    # decoder documentation
    https://wiki.example.com/display/SW/Video+decoder+debug+print+config
    https://wiki.example.com/pages/viewpage.action?pageId=18088204
    /srv/kb/docs/SDK_User_Guide.docx

RESUMABILITY:
  A job whose output directory ({pdf_dir}/{pdf_stem}) already exists is
  skipped without touching the network. Interrupt the batch at any time
  and re-run the same worklist; only unfinished jobs are processed.

ENVIRONMENT VARIABLES:
  DOC2KB_ENDPOINT     Extraction service URL
  DOC2KB_WEBHOOK      Notification webhook URL
  WIKI_BASE_URL       Wiki base URL, e.g. https://wiki.example.com
  WIKI_USER           Wiki basic-auth username
  WIKI_PASS           Wiki basic-auth password
"#;

/// Convert wiki pages and office documents into Markdown knowledge-base articles.
#[derive(Parser, Debug)]
#[command(
    name = "doc2kb",
    version,
    about = "Batch-convert wiki pages and office documents into Markdown knowledge-base articles",
    long_about = "Batch-convert document references (wiki page URLs or local PDF/office files) \
into Markdown knowledge-base articles: export/convert to PDF, run the remote OCR/layout \
extraction service, pick the canonical Markdown, rewrite image links to the asset host, and \
notify a downstream automation hook. Failed jobs are recorded for retry; completed jobs are \
skipped on re-runs.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Worklist file: one wiki URL or local file path per line.
    worklist: PathBuf,

    /// Layout engine run by the extraction service: mineru or basic.
    #[arg(long, env = "DOC2KB_PROCESSOR", default_value = "mineru")]
    processor: String,

    /// Extraction service URL.
    #[arg(
        long,
        env = "DOC2KB_ENDPOINT",
        default_value = "http://localhost:7890/process/archive"
    )]
    endpoint: String,

    /// Extraction-model backend forwarded to the service (e.g. vlm-transformers).
    #[arg(long, env = "DOC2KB_BACKEND")]
    backend: Option<String>,

    /// Archive filename written inside each job's output directory.
    #[arg(long, env = "DOC2KB_OUT", default_value = "output.tar.gz")]
    out: String,

    /// Directory exported PDFs and job output directories live under.
    #[arg(long, env = "DOC2KB_OUTPUT_ROOT", default_value = ".")]
    output_root: PathBuf,

    /// Overall extraction request timeout in seconds.
    #[arg(long, env = "DOC2KB_TIMEOUT", default_value_t = 6000)]
    timeout: u64,

    /// Notification webhook URL; empty string disables notification.
    #[arg(long, env = "DOC2KB_WEBHOOK", default_value = "")]
    webhook: String,

    /// Static asset host rewritten image URLs are rooted at.
    #[arg(long, env = "DOC2KB_BASE_HOST", default_value = "http://localhost:8081")]
    base_host: String,

    /// Workspace root the asset host serves.
    #[arg(long, env = "DOC2KB_WORKSPACE_ROOT", default_value = "/")]
    workspace_root: PathBuf,

    /// Fixed delay between job submissions in milliseconds.
    #[arg(long, env = "DOC2KB_DELAY_MS", default_value_t = 3000)]
    delay_ms: u64,

    /// Wiki base URL (enables exporting wiki page references).
    #[arg(long, env = "WIKI_BASE_URL")]
    wiki_base_url: Option<String>,

    /// Wiki basic-auth username.
    #[arg(long, env = "WIKI_USER")]
    wiki_user: Option<String>,

    /// Wiki basic-auth password.
    #[arg(long, env = "WIKI_PASS", hide_env_values = true)]
    wiki_pass: Option<String>,

    /// Disable the progress bar.
    #[arg(long, env = "DOC2KB_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2KB_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2KB_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the per-job log lines provide all the feedback that matters.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config and jobs ────────────────────────────────────────────
    let processor: ProcessorKind = cli.processor.parse().map_err(|e| anyhow::anyhow!("{e}"))?;

    let progress: Option<Arc<CliProgressCallback>> = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };

    let mut builder = PipelineConfig::builder()
        .endpoint(&cli.endpoint)
        .archive_name(&cli.out)
        .output_root(&cli.output_root)
        .base_host(&cli.base_host)
        .workspace_root(&cli.workspace_root)
        .webhook_url(&cli.webhook)
        .extraction_timeout_secs(cli.timeout)
        .inter_job_delay_ms(cli.delay_ms);

    if let Some(backend) = cli.backend.clone() {
        builder = builder.backend(backend);
    }
    if let (Some(base_url), Some(username), Some(password)) = (
        cli.wiki_base_url.clone(),
        cli.wiki_user.clone(),
        cli.wiki_pass.clone(),
    ) {
        builder = builder.wiki(WikiConfig {
            base_url,
            username,
            password,
        });
    }
    if let Some(ref cb) = progress {
        builder = builder.progress_callback(Arc::clone(cb) as ProgressCallback);
    }

    let config = builder.build().context("Invalid configuration")?;

    let jobs = read_worklist(&cli.worklist, processor, &cli.output_root)
        .with_context(|| format!("Failed to read worklist {:?}", cli.worklist))?;
    if jobs.is_empty() {
        anyhow::bail!("worklist {:?} contains no references", cli.worklist);
    }

    // ── Run the batch ────────────────────────────────────────────────────
    let pipeline = JobPipeline::new(config).context("Failed to build pipeline")?;
    let driver = BatchDriver::new(pipeline);
    let outcome = driver.run(&jobs).await.context("Batch run failed")?;

    if let Some(ref cb) = progress {
        cb.finish();
    }

    // ── Summary ──────────────────────────────────────────────────────────
    if !cli.quiet {
        let failed = outcome.failed.len();
        eprintln!(
            "{} {} jobs  —  {} succeeded, {} skipped, {} failed",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&outcome.total().to_string()),
            green(&outcome.succeeded.len().to_string()),
            cyan(&outcome.skipped.len().to_string()),
            if failed == 0 {
                dim("0")
            } else {
                red(&failed.to_string())
            },
        );
        eprintln!(
            "   outcome lists: {}",
            dim(&driver.run_dir().display().to_string())
        );
        if failed > 0 {
            eprintln!("{}", red("Failed references (re-submit via failed.txt):"));
            for job in &outcome.failed {
                eprintln!("   {}  {}", job.reference, dim(&job.error.to_string()));
            }
        }
    }

    Ok(())
}

/// Truncate a message to fit on one progress line.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}
