//! Filesystem-safe name normalisation.
//!
//! Page titles and exported filenames routinely contain characters that are
//! illegal on at least one filesystem (`:` on Windows, `/` everywhere) or
//! that break downstream tooling (spaces in shell one-liners). Everything a
//! job later derives from the PDF path — most importantly the idempotency
//! key, which is the PDF's stem — must therefore be normalised *before* the
//! first output directory is created, or a re-run would compute a different
//! key and re-process the document.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Characters replaced by `_` in [`safe_filename`].
const UNSAFE_CHARS: [char; 10] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', ' '];

/// Turn an arbitrary title into a filesystem-safe file name.
///
/// Leading/trailing whitespace is trimmed; path separators, Windows-reserved
/// punctuation, and spaces all become `_`. The result is stable: applying
/// the function twice yields the same string.
pub fn safe_filename(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Rename `path` in place so its file name is sanitized.
///
/// Returns the (possibly unchanged) path. When the sanitized name is
/// already taken by a *different* file, a numeric suffix `_2`, `_3`, … is
/// appended to the stem until a free name is found, so an existing document
/// is never overwritten.
pub fn sanitize_existing(path: &Path) -> io::Result<PathBuf> {
    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return Ok(path.to_path_buf()),
    };

    let clean = safe_filename(file_name);
    if clean == file_name {
        return Ok(path.to_path_buf());
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let target = free_sibling_name(parent, &clean);
    std::fs::rename(path, &target)?;
    debug!("sanitized '{}' -> '{}'", path.display(), target.display());
    Ok(target)
}

/// First non-existing path under `parent` for `name`, suffixing the stem
/// with `_2`, `_3`, … on collision.
fn free_sibling_name(parent: &Path, name: &str) -> PathBuf {
    let candidate = parent.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s.to_string(), format!(".{e}")),
        _ => (name.to_string(), String::new()),
    };

    let mut n = 2u32;
    loop {
        let candidate = parent.join(format!("{stem}_{n}{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_unsafe_characters() {
        assert_eq!(safe_filename("a/b\\c:d"), "a_b_c_d");
        assert_eq!(safe_filename("How to debug?"), "How_to_debug_");
        assert_eq!(safe_filename("  spaced name  "), "spaced_name");
        assert_eq!(safe_filename("video<dec>|odd\"*"), "video_dec__odd__");
    }

    #[test]
    fn safe_filename_is_idempotent() {
        let once = safe_filename("SDK使用指南(Android S).docx");
        assert_eq!(safe_filename(&once), once);
        // Parentheses and unicode are allowed; only the space changes.
        assert_eq!(once, "SDK使用指南(Android_S).docx");
    }

    #[test]
    fn rename_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let messy = dir.path().join("my doc: draft.pdf");
        std::fs::write(&messy, b"%PDF").unwrap();

        let clean = sanitize_existing(&messy).unwrap();
        assert_eq!(clean, dir.path().join("my_doc__draft.pdf"));
        assert!(!messy.exists());
        assert!(clean.exists());
    }

    #[test]
    fn clean_name_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("already_clean.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let out = sanitize_existing(&path).unwrap();
        assert_eq!(out, path);
    }

    #[test]
    fn collision_appends_numeric_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.pdf"), b"occupied").unwrap();
        std::fs::write(dir.path().join("doc_2.pdf"), b"also occupied").unwrap();
        let messy = dir.path().join("doc .pdf");
        std::fs::write(&messy, b"%PDF").unwrap();

        let out = sanitize_existing(&messy).unwrap();
        assert_eq!(out, dir.path().join("doc_3.pdf"));
        // Neither occupant was clobbered.
        assert_eq!(std::fs::read(dir.path().join("doc.pdf")).unwrap(), b"occupied");
    }
}
