//! Pipeline stages for document-to-knowledge-base ingestion.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different wiki flavour or extraction backend)
//! without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ extract ──▶ locate ──▶ rewrite ──▶ notify
//! (PDF)     (archive)   (canonical .md)  (_with_img.md)  (webhook)
//! ```
//!
//! 1. [`sanitize`] — filesystem-safe names; the leaf utility everything
//!    path-derived depends on
//! 2. [`source`]   — resolve a worklist reference (wiki URL or local path)
//!    to a local PDF, converting office formats on the way
//! 3. [`extract`]  — stream the PDF to the remote extraction service and
//!    save the returned archive; the only stage talking to the service
//! 4. [`locate`]   — unpack the archive and deterministically pick the
//!    canonical Markdown artifact
//! 5. [`rewrite`]  — rewrite relative `images/` links to absolute URLs,
//!    writing a sibling document
//! 6. [`notify`]   — best-effort webhook delivery of the finished path

pub mod extract;
pub mod locate;
pub mod notify;
pub mod rewrite;
pub mod sanitize;
pub mod source;
