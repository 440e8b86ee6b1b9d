use thiserror::Error;

/// Errors produced while generating or rendering a patch.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The requested delta index does not exist in the diff list.
    #[error("delta index {0} out of bounds")]
    IndexOutOfBounds(usize),

    /// Building the diff list or loading content failed.
    #[error("diff error: {0}")]
    Diff(#[from] strata_diff::DiffError),
}

pub type PatchResult<T> = Result<T, PatchError>;
