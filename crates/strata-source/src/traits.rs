use serde::{Deserialize, Serialize};
use strata_types::{ContentId, FileEntry};

use crate::error::SourceResult;
use crate::pathspec::Pathspec;

/// Which kind of side an adapter represents.
///
/// The diff builder uses this to pick one-sided semantics: a path present
/// only on a workdir side becomes `Untracked` (or `Ignored`), while the same
/// situation against a tree or index side is a plain `Added`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Tree,
    Index,
    Workdir,
}

/// Dirty-state of a submodule entry, as resolved by the side that owns it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmoduleStatus {
    /// Checked-out head matches the recorded pointer, working tree clean.
    Clean,
    /// Working tree (or head) of the submodule has local changes.
    Dirty,
    /// Per-submodule configuration says to hide all changes.
    Ignored,
}

/// Diff-level submodule reporting policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmoduleIgnore {
    /// Report head moves and dirty state.
    #[default]
    None,
    /// Report head moves only; dirty state is treated as clean.
    Dirty,
    /// Drop submodule entries from the diff entirely.
    All,
}

/// One side of a diff.
///
/// Contract, relied on by the diff builder:
///
/// - `enumerate` returns entries sorted by path bytes ascending, already
///   filtered by the pathspec when one is given.
/// - `read_content` returns the raw bytes for an entry this source emitted;
///   a per-entry failure is reported as `SourceError::Unreadable`, anything
///   else is fatal for the pass.
/// - Submodule entries read as the synthetic `Subproject commit <hex>` line
///   (see [`submodule_content`]), never as the submodule's own files.
/// - `is_ignored` / `is_conflicted` answer for paths this source emitted;
///   both default to `false` for sides without that concept.
pub trait EntrySource: Send + Sync {
    /// Which kind of side this is.
    fn kind(&self) -> SourceKind;

    /// Ordered entries for this side, filtered by `pathspec` when given.
    fn enumerate(&self, pathspec: Option<&Pathspec>) -> SourceResult<Vec<FileEntry>>;

    /// Raw bytes for an entry previously returned by [`enumerate`].
    ///
    /// [`enumerate`]: EntrySource::enumerate
    fn read_content(&self, entry: &FileEntry) -> SourceResult<Vec<u8>>;

    /// Dirty-state for a submodule entry. Non-workdir sides are always
    /// clean: their recorded pointer is the whole truth.
    fn submodule_status(&self, entry: &FileEntry) -> SourceResult<SubmoduleStatus> {
        let _ = entry;
        Ok(SubmoduleStatus::Clean)
    }

    /// Whether `path` matches this side's ignore rules.
    fn is_ignored(&self, path: &str) -> bool {
        let _ = path;
        false
    }

    /// Whether `path` has unresolved merge stages on this side.
    fn is_conflicted(&self, path: &str) -> bool {
        let _ = path;
        false
    }
}

/// The synthetic content a submodule entry diffs as.
///
/// Matches git's projection: `Subproject commit <hex>`, with `-dirty`
/// appended when the submodule working tree has local changes. The trailing
/// newline is part of the content so clean-vs-dirty diffs as a single line
/// replacement without EOFNL markers.
pub fn submodule_content(head: ContentId, dirty: bool) -> Vec<u8> {
    let suffix = if dirty { "-dirty" } else { "" };
    format!("Subproject commit {}{}\n", head.to_hex(), suffix).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submodule_content_is_one_terminated_line() {
        let head = ContentId::from_bytes(b"submodule head");
        let clean = submodule_content(head, false);
        let dirty = submodule_content(head, true);
        assert_eq!(
            String::from_utf8(clean).unwrap(),
            format!("Subproject commit {}\n", head.to_hex())
        );
        assert_eq!(
            String::from_utf8(dirty).unwrap(),
            format!("Subproject commit {}-dirty\n", head.to_hex())
        );
    }

    #[test]
    fn submodule_ignore_defaults_to_none() {
        assert_eq!(SubmoduleIgnore::default(), SubmoduleIgnore::None);
    }
}
