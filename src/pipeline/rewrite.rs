//! Image-link rewriting: turn relative `images/` references into absolute
//! HTTP URLs served by the static asset host.
//!
//! The extraction service writes Markdown whose figures live in a sibling
//! `images/` directory. Knowledge-base consumers fetch the article by path
//! over HTTP, so those relative links must become absolute URLs under the
//! asset host that exports the workspace tree. The host serves files by raw
//! path, so the rewritten URL intentionally keeps spaces and unicode
//! unencoded.
//!
//! Only the exact `![alt](images/…)` / `![alt](./images/…)` inline form is
//! recognised; anything else (absolute URLs, reference-style links, other
//! directories) passes through untouched. The input file is never modified:
//! a rewrite produces a sibling `<stem>_with_img.md` so the original stays
//! available for debugging.

use crate::error::PipelineError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

static RE_IMAGE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[(?P<alt>[^\]]*)\]\((?P<url>(?:\./)?images/[^)]+)\)").unwrap());

/// Suffix appended to the stem of a rewritten document.
const REWRITTEN_SUFFIX: &str = "_with_img";

/// Rewrite relative image links in `md_path` to absolute URLs under
/// `base_host`.
///
/// Returns the number of rewritten links and the output path. With zero
/// matches no file is written and the original path is returned — callers
/// must treat that as success.
pub fn rewrite_image_links(
    md_path: &Path,
    base_host: &str,
    workspace_root: &Path,
) -> Result<(usize, PathBuf), PipelineError> {
    if !md_path.is_file() {
        return Err(PipelineError::RewriteFailed {
            path: md_path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "markdown file not found"),
        });
    }

    let md_dir = md_path.parent().unwrap_or_else(|| Path::new(""));
    let http_base = http_base_for(md_dir, base_host, workspace_root);

    let content = fs::read_to_string(md_path).map_err(|e| PipelineError::RewriteFailed {
        path: md_path.to_path_buf(),
        source: e,
    })?;

    let mut count = 0usize;
    let rewritten = RE_IMAGE_LINK.replace_all(&content, |caps: &Captures<'_>| {
        count += 1;
        let alt = &caps["alt"];
        let url = caps["url"].trim_start_matches("./");
        format!("![{alt}]({http_base}/{url})")
    });

    if count == 0 {
        debug!("no relative image links in '{}'", md_path.display());
        return Ok((0, md_path.to_path_buf()));
    }

    let stem = md_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let out_path = md_dir.join(format!("{stem}{REWRITTEN_SUFFIX}.md"));
    fs::write(&out_path, rewritten.as_bytes()).map_err(|e| PipelineError::RewriteFailed {
        path: out_path.clone(),
        source: e,
    })?;

    info!(
        "rewrote {} image links in '{}' -> '{}'",
        count,
        md_path.display(),
        out_path.display()
    );
    Ok((count, out_path))
}

/// `base_host + "/" + rel_dir`, where `rel_dir` is the markdown directory
/// relative to `workspace_root`. A directory outside the root falls back to
/// its own path with the leading separator stripped; no error is raised.
/// Backslashes become forward slashes so Windows paths form valid URLs.
fn http_base_for(md_dir: &Path, base_host: &str, workspace_root: &Path) -> String {
    let rel = md_dir
        .strip_prefix(workspace_root)
        .unwrap_or(md_dir)
        .to_string_lossy()
        .replace('\\', "/");
    let rel = rel.trim_start_matches('/');

    let base = base_host.trim_end_matches('/');
    if rel.is_empty() || rel == "." {
        base.to_string()
    } else {
        format!("{base}/{rel}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_md(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn rewrites_relative_image_links() {
        let tmp = tempfile::tempdir().unwrap();
        let doc_dir = tmp.path().join("debug_doc");
        fs::create_dir_all(&doc_dir).unwrap();
        let md = write_md(
            &doc_dir,
            "guide.md",
            "intro\n![x](images/a.jpg)\ntext ![fig 2](./images/b.png) end\n",
        );

        let (count, out) = rewrite_image_links(&md, "http://h", tmp.path()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(out, doc_dir.join("guide_with_img.md"));

        let rewritten = fs::read_to_string(&out).unwrap();
        assert!(rewritten.contains("![x](http://h/debug_doc/images/a.jpg)"));
        assert!(rewritten.contains("![fig 2](http://h/debug_doc/images/b.png)"));
        // The original is preserved byte-for-byte.
        assert!(fs::read_to_string(&md).unwrap().contains("![x](images/a.jpg)"));
    }

    #[test]
    fn zero_matches_returns_original_path() {
        let tmp = tempfile::tempdir().unwrap();
        let md = write_md(tmp.path(), "plain.md", "no images here\n![x](http://a/b.png)\n");

        let (count, out) = rewrite_image_links(&md, "http://h", tmp.path()).unwrap();
        assert_eq!(count, 0);
        assert_eq!(out, md);
        assert!(!tmp.path().join("plain_with_img.md").exists());
    }

    #[test]
    fn rewriting_a_rewritten_file_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let doc_dir = tmp.path().join("doc");
        fs::create_dir_all(&doc_dir).unwrap();
        let md = write_md(&doc_dir, "page.md", "![x](images/a.jpg)\n");

        let (count, out) = rewrite_image_links(&md, "http://h", tmp.path()).unwrap();
        assert_eq!(count, 1);

        // The rewritten file now contains only absolute URLs.
        let (count2, out2) = rewrite_image_links(&out, "http://h", tmp.path()).unwrap();
        assert_eq!(count2, 0);
        assert_eq!(out2, out);
    }

    #[test]
    fn outside_workspace_root_strips_leading_separator() {
        let base = http_base_for(
            Path::new("/srv/other/docs"),
            "http://h",
            Path::new("/home/kb"),
        );
        assert_eq!(base, "http://h/srv/other/docs");
    }

    #[test]
    fn spaces_and_unicode_stay_unencoded() {
        let tmp = tempfile::tempdir().unwrap();
        let doc_dir = tmp.path().join("WiFi 调试 方法");
        fs::create_dir_all(&doc_dir).unwrap();
        let md = write_md(&doc_dir, "page.md", "![](images/信号.png)\n");

        let (count, out) = rewrite_image_links(&md, "http://h", tmp.path()).unwrap();
        assert_eq!(count, 1);
        let rewritten = fs::read_to_string(out).unwrap();
        assert!(rewritten.contains("![](http://h/WiFi 调试 方法/images/信号.png)"));
    }

    #[test]
    fn other_relative_dirs_are_not_recognised() {
        let tmp = tempfile::tempdir().unwrap();
        let md = write_md(tmp.path(), "page.md", "![x](assets/a.jpg) ![y](../images/b.png)\n");

        let (count, out) = rewrite_image_links(&md, "http://h", tmp.path()).unwrap();
        assert_eq!(count, 0);
        assert_eq!(out, md);
    }
}
