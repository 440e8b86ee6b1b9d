use thiserror::Error;

/// Errors produced by entry-source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Per-entry read failure (permission denied, broken symlink, raced
    /// deletion). Non-fatal: the diff builder downgrades it to an
    /// `Unreadable` delta and continues.
    #[error("unreadable entry: {path}")]
    Unreadable { path: String },

    #[error("entry not found: {path}")]
    NotFound { path: String },

    #[error("invalid pathspec pattern {pattern:?}: {reason}")]
    InvalidPathspec { pattern: String, reason: String },

    #[error("ignore rules error: {0}")]
    IgnoreRules(String),

    #[error("workdir walk failed: {0}")]
    Walk(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    /// Returns `true` for the per-entry, non-fatal read failure.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::Unreadable { .. })
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
