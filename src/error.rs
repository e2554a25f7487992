//! Fatal error kinds that abort a run.
//!
//! Per-file soft failures (unreadable files, command timeouts) and blame
//! lookup failures are recovered locally and never surface here; they are
//! carried as data in `models::SkippedFile` or resolved to the "Unknown"
//! attribution sentinel.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors that legitimately stop a run before any gating decision.
pub enum RatchetError {
    /// No ancestor of the start directory carried a project marker.
    #[error("project root not found: no marker in any ancestor directory")]
    RootNotFound,

    /// A config or rule file exists but cannot be used.
    #[error("invalid configuration in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Blame cache store failure (open, schema, or statement).
    #[error("blame cache error: {0}")]
    Cache(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, RatchetError>;
