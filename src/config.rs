//! Configuration for the ingestion pipeline.
//!
//! All behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config across a whole batch, log it, and diff two
//! runs to understand why their outcomes differ.
//!
//! The external collaborators — wiki export, office conversion, extraction
//! service, notification sink — are injectable as `Arc<dyn Trait>` fields.
//! Production runs leave them unset and get the HTTP/process-backed
//! defaults; tests inject stubs. Credentials live here too, passed in at
//! construction: there are no process-wide singletons and nothing is
//! hard-coded.

use crate::error::PipelineError;
use crate::pipeline::extract::ExtractionService;
use crate::pipeline::notify::NotificationSink;
use crate::pipeline::source::{OfficeToPdf, PageExporter};
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Access details for the wiki's REST API.
#[derive(Clone)]
pub struct WikiConfig {
    /// Base URL, e.g. `https://wiki.example.com`.
    pub base_url: String,
    /// Basic-auth username.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
}

impl fmt::Debug for WikiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WikiConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for a batch ingestion run.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use doc2kb::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .endpoint("http://127.0.0.1:7890/process/archive")
///     .base_host("http://127.0.0.1:8081")
///     .workspace_root("/srv/kb")
///     .output_root("/srv/kb/docs")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Extraction service URL the PDFs are submitted to.
    pub endpoint: String,

    /// Optional extraction-model backend, forwarded verbatim in the
    /// multipart `backend` field (e.g. `vlm-transformers`).
    pub backend: Option<String>,

    /// Filename for the archive saved inside each job's output directory.
    /// Default: `output.tar.gz`.
    pub archive_name: String,

    /// Directory exported PDFs land in and under which each job's output
    /// directory is created. Default: `.`.
    pub output_root: PathBuf,

    /// Host serving the workspace tree as static assets; rewritten image
    /// URLs are rooted here. Default: `http://localhost:8081`.
    pub base_host: String,

    /// Root the asset host exports. `rel_dir` in rewritten URLs is the
    /// Markdown directory relative to this. Default: `/`.
    pub workspace_root: PathBuf,

    /// Webhook receiving finished document paths. `None` disables
    /// notification entirely.
    pub webhook_url: Option<String>,

    /// Overall timeout for one extraction request, in seconds.
    ///
    /// Extraction is minutes-per-document on a busy GPU service, so the
    /// default is deliberately generous: 6000.
    pub extraction_timeout_secs: u64,

    /// Timeout for a single wiki export download. Default: 120.
    pub export_timeout_secs: u64,

    /// Timeout for one webhook delivery. Default: 10.
    pub notify_timeout_secs: u64,

    /// Fixed delay inserted between job submissions, in milliseconds.
    ///
    /// The extraction service and the wiki are singleton, rate-sensitive
    /// instances; pacing submissions avoids overload without a rate
    /// limiter. Default: 3000.
    pub inter_job_delay_ms: u64,

    /// Wiki access details for the default exporter. Required only when
    /// the worklist contains URL references and no custom `exporter` is
    /// injected.
    pub wiki: Option<WikiConfig>,

    /// Pre-constructed wiki exporter. Takes precedence over `wiki`.
    pub exporter: Option<Arc<dyn PageExporter>>,

    /// Pre-constructed office-to-PDF converter. Defaults to LibreOffice.
    pub converter: Option<Arc<dyn OfficeToPdf>>,

    /// Pre-constructed extraction service client. Defaults to the HTTP
    /// client against `endpoint`.
    pub extractor: Option<Arc<dyn ExtractionService>>,

    /// Pre-constructed notification sink. Takes precedence over
    /// `webhook_url`.
    pub notifier: Option<Arc<dyn NotificationSink>>,

    /// Per-job progress events, e.g. for a terminal progress bar.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:7890/process/archive".to_string(),
            backend: None,
            archive_name: "output.tar.gz".to_string(),
            output_root: PathBuf::from("."),
            base_host: "http://localhost:8081".to_string(),
            workspace_root: PathBuf::from("/"),
            webhook_url: None,
            extraction_timeout_secs: 6000,
            export_timeout_secs: 120,
            notify_timeout_secs: 10,
            inter_job_delay_ms: 3000,
            wiki: None,
            exporter: None,
            converter: None,
            extractor: None,
            notifier: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("endpoint", &self.endpoint)
            .field("backend", &self.backend)
            .field("archive_name", &self.archive_name)
            .field("output_root", &self.output_root)
            .field("base_host", &self.base_host)
            .field("workspace_root", &self.workspace_root)
            .field("webhook_url", &self.webhook_url)
            .field("extraction_timeout_secs", &self.extraction_timeout_secs)
            .field("export_timeout_secs", &self.export_timeout_secs)
            .field("notify_timeout_secs", &self.notify_timeout_secs)
            .field("inter_job_delay_ms", &self.inter_job_delay_ms)
            .field("wiki", &self.wiki)
            .field("exporter", &self.exporter.as_ref().map(|_| "<dyn PageExporter>"))
            .field("converter", &self.converter.as_ref().map(|_| "<dyn OfficeToPdf>"))
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn ExtractionService>"))
            .field("notifier", &self.notifier.as_ref().map(|_| "<dyn NotificationSink>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into();
        self
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.config.backend = Some(backend.into());
        self
    }

    pub fn archive_name(mut self, name: impl Into<String>) -> Self {
        self.config.archive_name = name.into();
        self
    }

    pub fn output_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_root = dir.into();
        self
    }

    pub fn base_host(mut self, host: impl Into<String>) -> Self {
        self.config.base_host = host.into();
        self
    }

    pub fn workspace_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = dir.into();
        self
    }

    /// Set the webhook URL; an empty string disables notification.
    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.config.webhook_url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    pub fn extraction_timeout_secs(mut self, secs: u64) -> Self {
        self.config.extraction_timeout_secs = secs;
        self
    }

    pub fn export_timeout_secs(mut self, secs: u64) -> Self {
        self.config.export_timeout_secs = secs;
        self
    }

    pub fn notify_timeout_secs(mut self, secs: u64) -> Self {
        self.config.notify_timeout_secs = secs;
        self
    }

    pub fn inter_job_delay_ms(mut self, ms: u64) -> Self {
        self.config.inter_job_delay_ms = ms;
        self
    }

    pub fn wiki(mut self, wiki: WikiConfig) -> Self {
        self.config.wiki = Some(wiki);
        self
    }

    pub fn exporter(mut self, exporter: Arc<dyn PageExporter>) -> Self {
        self.config.exporter = Some(exporter);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn OfficeToPdf>) -> Self {
        self.config.converter = Some(converter);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ExtractionService>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.config.notifier = Some(notifier);
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.endpoint.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "extraction endpoint must not be empty".into(),
            ));
        }
        if c.archive_name.trim().is_empty() || c.archive_name.contains('/') {
            return Err(PipelineError::InvalidConfig(format!(
                "archive name must be a bare filename, got '{}'",
                c.archive_name
            )));
        }
        if c.extraction_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "extraction timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.archive_name, "output.tar.gz");
        assert_eq!(config.inter_job_delay_ms, 3000);
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn empty_webhook_disables_notification() {
        let config = PipelineConfig::builder().webhook_url("").build().unwrap();
        assert!(config.webhook_url.is_none());
        let config = PipelineConfig::builder()
            .webhook_url("http://localhost:5678/webhook/kb")
            .build()
            .unwrap();
        assert_eq!(
            config.webhook_url.as_deref(),
            Some("http://localhost:5678/webhook/kb")
        );
    }

    #[test]
    fn rejects_pathy_archive_name() {
        let err = PipelineConfig::builder()
            .archive_name("out/output.tar.gz")
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_empty_endpoint() {
        let err = PipelineConfig::builder().endpoint("  ").build().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_wiki_password() {
        let config = PipelineConfig::builder()
            .wiki(WikiConfig {
                base_url: "https://wiki.example.com".into(),
                username: "svc-kb".into(),
                password: "hunter2".into(),
            })
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
