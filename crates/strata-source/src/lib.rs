//! Entry sources for Strata.
//!
//! A diff compares two "sides", each normalized into an ordered sequence of
//! [`FileEntry`](strata_types::FileEntry) records by an adapter in this
//! crate. Three adapters are provided: an in-memory tree snapshot, a staging
//! index with conflict stages, and a working-directory walker. All of them
//! implement [`EntrySource`], which is the only surface the diff engine
//! sees; embedders with their own storage implement the same trait.
//!
//! # Key Types
//!
//! - [`EntrySource`] -- Side contract: enumerate entries, read content,
//!   report submodule status
//! - [`Pathspec`] -- Glob-based path filter applied during enumeration
//! - [`SnapshotSource`] / [`IndexSource`] / [`WorkdirSource`] -- The three
//!   side adapters

pub mod error;
pub mod index;
pub mod pathspec;
pub mod snapshot;
pub mod traits;
pub mod workdir;

pub use error::{SourceError, SourceResult};
pub use index::{ConflictEntry, IndexSource};
pub use pathspec::Pathspec;
pub use snapshot::SnapshotSource;
pub use traits::{submodule_content, EntrySource, SourceKind, SubmoduleIgnore, SubmoduleStatus};
pub use workdir::WorkdirSource;
