//! Patch generation for Strata.
//!
//! Turns the deltas produced by `strata-diff` into git-compatible unified
//! diffs: file headers, hunks with configurable context, end-of-file
//! newline markers, and binary short-circuits. Output can be taken as one
//! structured [`Patch`] per delta, streamed line by line, or reduced to
//! aggregate stats.
//!
//! # Key Types
//!
//! - [`Patch`] -- one delta rendered as header, hunks, and lines
//! - [`Hunk`] -- a contiguous run of changes with its `@@` header
//! - [`PatchLine`] / [`LineOrigin`] -- a single output line and its role
//! - [`PatchOptions`] -- context width, path prefixes, and id abbreviation
//! - [`DiffStats`] -- files changed / insertions / deletions for a list

pub mod error;
pub mod line;
pub mod options;
pub mod patch;
pub mod render;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{PatchError, PatchResult};
pub use line::{LineOrigin, PatchLine};
pub use options::{PatchOptions, DEFAULT_ABBREV, DEFAULT_CONTEXT_LINES};
pub use patch::{Hunk, LineStats, Patch};
pub use render::{diff_to_bytes, foreach, print, DiffStats};
