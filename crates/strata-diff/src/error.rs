use thiserror::Error;

/// Errors produced while building or refining a diff list.
#[derive(Debug, Error)]
pub enum DiffError {
    /// Option validation failed before any comparison ran.
    #[error("invalid diff options: {0}")]
    InvalidOptions(String),

    /// Reading entries or content from one of the sources failed.
    #[error("source error: {0}")]
    Source(#[from] strata_source::SourceError),
}

pub type DiffResult<T> = Result<T, DiffError>;
