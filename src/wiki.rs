//! Wiki REST client: resolve page references and export pages as PDF.
//!
//! Confluence-style servers expose several generations of export endpoints
//! depending on edition (Server/DC vs Cloud) and deployment prefix. Rather
//! than probing the server version, the exporter simply tries the known
//! candidates in order and takes the first 2xx — the same strategy a human
//! operator uses, and robust across upgrades.
//!
//! Two link shapes are accepted:
//!
//! * `…/pages/viewpage.action?pageId=123456` — the id is right in the URL
//! * `…/display/{SPACE}/{Page+Title}` (optionally `/wiki`-prefixed) — the
//!   id is looked up via `rest/api/content?title=&spaceKey=`

use crate::config::WikiConfig;
use crate::error::PipelineError;
use crate::pipeline::sanitize::safe_filename;
use crate::pipeline::source::PageExporter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A page reference resolved to what the export endpoints need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub id: String,
    pub title: String,
}

/// HTTP client for a Confluence-style wiki.
pub struct WikiClient {
    http: reqwest::Client,
    config: WikiConfig,
}

impl WikiClient {
    /// Build a client with the given per-request timeout.
    pub fn new(config: WikiConfig, timeout_secs: u64) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PipelineError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Resolve a full page URL to its id and title.
    pub async fn resolve_page(&self, page_url: &str) -> Result<PageRef, PipelineError> {
        if let Some(id) = page_id_param(page_url) {
            return self.page_by_id(&id).await;
        }
        if let Some((space, title)) = display_reference(page_url) {
            return self.page_by_title(&space, &title).await;
        }
        Err(export_error(page_url, "unsupported wiki link format"))
    }

    /// Export a page as PDF into `out_dir`, returning the written path.
    ///
    /// The filename comes from the response's `Content-Disposition` header,
    /// falling back to the sanitized page title.
    pub async fn export_page_pdf(
        &self,
        page_url: &str,
        out_dir: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let page = self.resolve_page(page_url).await?;
        debug!("resolved '{}' -> page id {}", page_url, page.id);

        let base = self.config.base_url.trim_end_matches('/');
        let candidates = [
            format!("{base}/spaces/flyingpdf/pdfpageexport.action?pageId={}", page.id),
            format!("{base}/pages/pdfpageexport.action?pageId={}", page.id),
            format!("{base}/wiki/spaces/flyingpdf/pdfpageexport.action?pageId={}", page.id),
            format!("{base}/wiki/pages/pdfpageexport.action?pageId={}", page.id),
        ];

        let mut last_error = String::from("no export endpoint candidates");
        for endpoint in &candidates {
            match self.try_export(endpoint, &page, out_dir).await {
                Ok(path) => {
                    info!("exported page {} -> '{}'", page.id, path.display());
                    return Ok(path);
                }
                Err(detail) => {
                    warn!("export endpoint failed: {endpoint}: {detail}");
                    last_error = detail;
                }
            }
        }
        Err(export_error(page_url, &last_error))
    }

    async fn try_export(
        &self,
        endpoint: &str,
        page: &PageRef,
        out_dir: &Path,
    ) -> Result<PathBuf, String> {
        let response = self
            .http
            .get(endpoint)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(reqwest::header::ACCEPT, "application/pdf")
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }

        let filename = crate::pipeline::extract::disposition_filename(
            response
                .headers()
                .get(reqwest::header::CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok()),
        )
        .map(|n| safe_filename(&n))
        .unwrap_or_else(|| format!("{}.pdf", safe_filename(&page.title)));

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        if bytes.is_empty() {
            return Err("empty PDF body".to_string());
        }

        std::fs::create_dir_all(out_dir).map_err(|e| e.to_string())?;
        let target = out_dir.join(filename);
        std::fs::write(&target, &bytes).map_err(|e| e.to_string())?;
        Ok(target)
    }

    async fn page_by_id(&self, id: &str) -> Result<PageRef, PipelineError> {
        let base = self.config.base_url.trim_end_matches('/');
        let url = format!("{base}/rest/api/content/{id}");
        let body: serde_json::Value = self
            .get_json(&url, &[])
            .await
            .map_err(|detail| export_error(id, &detail))?;
        let title = body
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or("wiki_page")
            .to_string();
        Ok(PageRef {
            id: id.to_string(),
            title,
        })
    }

    async fn page_by_title(&self, space: &str, title: &str) -> Result<PageRef, PipelineError> {
        let base = self.config.base_url.trim_end_matches('/');
        let url = format!("{base}/rest/api/content");
        let body: serde_json::Value = self
            .get_json(&url, &[("title", title), ("spaceKey", space)])
            .await
            .map_err(|detail| export_error(title, &detail))?;

        let first = body
            .get("results")
            .and_then(|r| r.as_array())
            .and_then(|r| r.first())
            .ok_or_else(|| export_error(title, "page not found in space"))?;
        let id = first
            .get("id")
            .and_then(|i| i.as_str())
            .ok_or_else(|| export_error(title, "content lookup returned no id"))?;
        let resolved_title = first
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or(title);
        Ok(PageRef {
            id: id.to_string(),
            title: resolved_title.to_string(),
        })
    }

    async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, String> {
        let response = self
            .http
            .get(url)
            .query(query)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status} from {url}"));
        }
        response.json().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl PageExporter for WikiClient {
    async fn export_pdf(&self, page_url: &str, out_dir: &Path) -> Result<PathBuf, PipelineError> {
        self.export_page_pdf(page_url, out_dir).await
    }
}

fn export_error(reference: &str, detail: &str) -> PipelineError {
    PipelineError::ExportUnavailable {
        reference: reference.to_string(),
        detail: detail.to_string(),
    }
}

/// Extract the `pageId` query parameter from a page URL, if present.
pub fn page_id_param(page_url: &str) -> Option<String> {
    let parsed = url::Url::parse(page_url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "pageId")
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Extract `(space_key, page_title)` from a display-style link, handling
/// the optional `/wiki` prefix. The title is `+`- and percent-decoded;
/// stray slashes inside the title are kept.
pub fn display_reference(page_url: &str) -> Option<(String, String)> {
    let parsed = url::Url::parse(page_url).ok()?;
    let path = parsed.path();
    let marker = if path.contains("/wiki/display/") {
        "/wiki/display/"
    } else {
        "/display/"
    };
    let rest = &path[path.find(marker)? + marker.len()..];
    let (space, title_part) = rest.split_once('/')?;
    if space.is_empty() || title_part.is_empty() {
        return None;
    }
    let title = urlencoding::decode(title_part).ok()?.replace('+', " ");
    Some((space.to_string(), title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_id_from_viewpage_url() {
        assert_eq!(
            page_id_param("https://wiki.example.com/pages/viewpage.action?pageId=18088204"),
            Some("18088204".to_string())
        );
        // Fragments after the id do not confuse the parser.
        assert_eq!(
            page_id_param(
                "https://wiki.example.com/pages/viewpage.action?pageId=364792684#anchor/sub"
            ),
            Some("364792684".to_string())
        );
        assert_eq!(
            page_id_param("https://wiki.example.com/display/SW/Some+Page"),
            None
        );
    }

    #[test]
    fn display_reference_parsing() {
        assert_eq!(
            display_reference("https://wiki.example.com/display/SW/Video+decoder+debug+print+config"),
            Some(("SW".to_string(), "Video decoder debug print config".to_string()))
        );
        assert_eq!(
            display_reference("https://wiki.example.com/wiki/display/DOC/Page%20Title"),
            Some(("DOC".to_string(), "Page Title".to_string()))
        );
        assert_eq!(
            display_reference("https://wiki.example.com/pages/viewpage.action?pageId=1"),
            None
        );
    }

    #[test]
    fn display_reference_keeps_title_slashes() {
        // Titles occasionally contain slashes; everything after the space
        // key belongs to the title.
        assert_eq!(
            display_reference("https://wiki.example.com/display/SW/AudioHal+dump/debug+introduction"),
            Some(("SW".to_string(), "AudioHal dump/debug introduction".to_string()))
        );
    }
}
