use std::fmt;

use serde::{Deserialize, Serialize};
use strata_types::FileEntry;

/// Classification of a single delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeltaStatus {
    /// Present on both sides with identical content and mode.
    Unmodified,
    /// Present only on the new side.
    Added,
    /// Present only on the old side.
    Deleted,
    /// Present on both sides with differing content or mode.
    Modified,
    /// Matched as a rename by the similarity pass.
    Renamed,
    /// Matched as a copy by the similarity pass.
    Copied,
    /// New-side-only entry that matches an ignore rule.
    Ignored,
    /// New-side-only entry in a working directory.
    Untracked,
    /// The entry changed kind, for example from a blob to a symlink.
    TypeChange,
    /// Content could not be read while resolving the delta.
    Unreadable,
    /// The entry carries unresolved merge conflicts.
    Conflicted,
}

impl DeltaStatus {
    /// One-character tag used by name-status output.
    pub fn as_char(&self) -> char {
        match self {
            DeltaStatus::Unmodified => ' ',
            DeltaStatus::Added => 'A',
            DeltaStatus::Deleted => 'D',
            DeltaStatus::Modified => 'M',
            DeltaStatus::Renamed => 'R',
            DeltaStatus::Copied => 'C',
            DeltaStatus::Ignored => 'I',
            DeltaStatus::Untracked => '?',
            DeltaStatus::TypeChange => 'T',
            DeltaStatus::Unreadable => 'X',
            DeltaStatus::Conflicted => 'U',
        }
    }
}

impl fmt::Display for DeltaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeltaStatus::Unmodified => "unmodified",
            DeltaStatus::Added => "added",
            DeltaStatus::Deleted => "deleted",
            DeltaStatus::Modified => "modified",
            DeltaStatus::Renamed => "renamed",
            DeltaStatus::Copied => "copied",
            DeltaStatus::Ignored => "ignored",
            DeltaStatus::Untracked => "untracked",
            DeltaStatus::TypeChange => "typechange",
            DeltaStatus::Unreadable => "unreadable",
            DeltaStatus::Conflicted => "conflicted",
        })
    }
}

/// One pairing of an old-side entry with a new-side entry.
///
/// One-sided statuses leave the missing side as `None`. Renames and copies
/// carry the similarity score that produced them; rewrites keep their
/// self-similarity when the scoring pass was asked to record it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delta {
    pub status: DeltaStatus,
    pub old: Option<FileEntry>,
    pub new: Option<FileEntry>,
    /// Similarity score (0..=100) when the similarity pass set one.
    pub similarity: Option<u16>,
}

impl Delta {
    pub fn new(status: DeltaStatus, old: Option<FileEntry>, new: Option<FileEntry>) -> Self {
        Self {
            status,
            old,
            new,
            similarity: None,
        }
    }

    pub fn added(entry: FileEntry) -> Self {
        Self::new(DeltaStatus::Added, None, Some(entry))
    }

    pub fn deleted(entry: FileEntry) -> Self {
        Self::new(DeltaStatus::Deleted, Some(entry), None)
    }

    pub fn untracked(entry: FileEntry) -> Self {
        Self::new(DeltaStatus::Untracked, None, Some(entry))
    }

    pub fn ignored(entry: FileEntry) -> Self {
        Self::new(DeltaStatus::Ignored, None, Some(entry))
    }

    pub fn pair(status: DeltaStatus, old: FileEntry, new: FileEntry) -> Self {
        Self::new(status, Some(old), Some(new))
    }

    /// Path the delta is filed under: the new side when present, otherwise
    /// the old side.
    pub fn path(&self) -> &str {
        match (&self.new, &self.old) {
            (Some(entry), _) => &entry.path,
            (None, Some(entry)) => &entry.path,
            (None, None) => "",
        }
    }

    pub fn old_path(&self) -> Option<&str> {
        self.old.as_ref().map(|entry| entry.path.as_str())
    }

    pub fn new_path(&self) -> Option<&str> {
        self.new.as_ref().map(|entry| entry.path.as_str())
    }

    /// Old path when set, otherwise the delta path. Canonical sort key.
    pub fn sort_path(&self) -> &str {
        match &self.old {
            Some(entry) => &entry.path,
            None => self.path(),
        }
    }
}
