//! Artifact location: unpack an extraction archive and pick the canonical
//! Markdown file.
//!
//! ## Why "deepest path wins"?
//!
//! The extraction service nests its final output under per-backend
//! subdirectories (e.g. `<doc>/vlm/<doc>.md`) while shallower `.md` files
//! are intermediate or index artifacts. The service also emits a secondary
//! `*_fix.md` draft next to the real document; it must never be selected.
//! Depth plus a lexicographic tie-break gives a total order, so the same
//! archive always yields the same canonical path on every platform —
//! directory walk order never leaks into the result.

use crate::error::PipelineError;
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Unpack `archive` into a sibling `extracted/` directory and return it.
///
/// Re-unpacking an already-extracted archive overwrites the previous
/// contents, so the operation is idempotent.
pub fn unpack_archive(archive: &Path) -> Result<PathBuf, PipelineError> {
    if !archive.is_file() {
        return Err(PipelineError::UnpackFailed {
            path: archive.to_path_buf(),
            detail: "archive file does not exist".into(),
        });
    }

    let base_dir = archive.parent().unwrap_or_else(|| Path::new("."));
    let extract_dir = base_dir.join("extracted");
    fs::create_dir_all(&extract_dir).map_err(|e| PipelineError::OutputWriteFailed {
        path: extract_dir.clone(),
        source: e,
    })?;

    let file = fs::File::open(archive).map_err(|e| PipelineError::UnpackFailed {
        path: archive.to_path_buf(),
        detail: e.to_string(),
    })?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball.set_overwrite(true);
    tarball
        .unpack(&extract_dir)
        .map_err(|e| PipelineError::UnpackFailed {
            path: archive.to_path_buf(),
            detail: e.to_string(),
        })?;

    info!("unpacked '{}' -> '{}'", archive.display(), extract_dir.display());
    Ok(extract_dir)
}

/// Select the canonical Markdown file under an extraction directory.
///
/// Eligible candidates are files whose lowercased name ends in `.md` but not
/// `_fix.md`. Among them the greatest path depth below `extract_dir` wins;
/// a depth tie goes to the lexicographically smallest full path. Returns an
/// absolute path.
pub fn locate_markdown(extract_dir: &Path) -> Result<PathBuf, PipelineError> {
    let mut candidates = Vec::new();
    collect_markdown(extract_dir, &mut candidates);

    // Total order: depth first, then lexicographically smallest path, so
    // the selection never depends on directory walk order.
    let mut best: Option<(usize, PathBuf)> = None;
    for path in candidates {
        let depth = depth_below(&path, extract_dir);
        let better = match best {
            None => true,
            Some((best_depth, ref best_path)) => {
                depth > best_depth || (depth == best_depth && path < *best_path)
            }
        };
        if better {
            best = Some((depth, path));
        }
    }

    let (depth, chosen) = best.ok_or_else(|| PipelineError::ArtifactNotFound {
        dir: extract_dir.to_path_buf(),
    })?;
    debug!("canonical markdown: '{}' (depth {})", chosen.display(), depth);

    let abs = fs::canonicalize(&chosen).map_err(|e| PipelineError::Internal(format!(
        "failed to canonicalize '{}': {e}",
        chosen.display()
    )))?;
    Ok(abs)
}

/// Recursively collect eligible `.md` files (skipping `*_fix.md`).
fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_markdown(&path, out);
        } else if is_eligible_markdown(&path) {
            out.push(path);
        }
    }
}

fn is_eligible_markdown(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => {
            let lower = name.to_lowercase();
            lower.ends_with(".md") && !lower.ends_with("_fix.md")
        }
        None => false,
    }
}

/// Number of path components separating `path` from `root`.
fn depth_below(path: &Path, root: &Path) -> usize {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"# doc\n").unwrap();
    }

    #[test]
    fn deepest_markdown_wins_and_fix_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a/b/x.md"));
        touch(&root.join("a/x_fix.md"));
        touch(&root.join("a/b/c/y.md"));

        let chosen = locate_markdown(root).unwrap();
        assert!(chosen.ends_with("a/b/c/y.md"), "got {}", chosen.display());
    }

    #[test]
    fn fix_suffix_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a/b/doc_FIX.md"));
        touch(&root.join("a/doc.md"));

        let chosen = locate_markdown(root).unwrap();
        assert!(chosen.ends_with("a/doc.md"), "got {}", chosen.display());
    }

    #[test]
    fn depth_tie_breaks_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("a/b/zeta.md"));
        touch(&root.join("a/b/alpha.md"));

        let chosen = locate_markdown(root).unwrap();
        assert!(chosen.ends_with("a/b/alpha.md"), "got {}", chosen.display());
    }

    #[test]
    fn empty_tree_is_artifact_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/notes.txt"), b"not markdown").unwrap();

        let err = locate_markdown(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactNotFound { .. }));
    }

    #[test]
    fn unpack_roundtrip_and_reunpack() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("output.tar.gz");

        // Build a small gzipped tarball: doc/vlm/doc.md + doc/index.md
        let gz = GzEncoder::new(fs::File::create(&archive).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(gz);
        let content = b"# hello\n";
        for name in ["doc/index.md", "doc/vlm/doc.md"] {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, &content[..]).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();

        let extract_dir = unpack_archive(&archive).unwrap();
        assert_eq!(extract_dir, dir.path().join("extracted"));
        let chosen = locate_markdown(&extract_dir).unwrap();
        assert!(chosen.ends_with("doc/vlm/doc.md"), "got {}", chosen.display());

        // Second unpack overwrites instead of erroring.
        let again = unpack_archive(&archive).unwrap();
        assert_eq!(again, extract_dir);
    }

    #[test]
    fn missing_archive_is_unpack_failed() {
        let dir = tempfile::tempdir().unwrap();
        let err = unpack_archive(&dir.path().join("nope.tar.gz")).unwrap_err();
        assert!(matches!(err, PipelineError::UnpackFailed { .. }));
    }
}
