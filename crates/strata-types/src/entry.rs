use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::content_id::ContentId;
use crate::mode::EntryMode;

/// One path on one diff side: the unit a source adapter emits.
///
/// Entries are immutable once built. A side is always an ordered sequence of
/// entries, sorted by path bytes ascending, and the diff builder relies on
/// that ordering for its two-pointer merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Repository-relative path, `/`-separated.
    pub path: String,
    /// File mode on this side.
    pub mode: EntryMode,
    /// Content id, or null if not yet hashed (workdir entries).
    pub id: ContentId,
    /// Content size in bytes.
    pub size: u64,
}

impl FileEntry {
    /// Create a new entry.
    pub fn new(path: impl Into<String>, mode: EntryMode, id: ContentId, size: u64) -> Self {
        Self {
            path: path.into(),
            mode,
            id,
            size,
        }
    }

    /// Entry with an unhashed (null) id, for workdir enumeration.
    pub fn unhashed(path: impl Into<String>, mode: EntryMode, size: u64) -> Self {
        Self::new(path, mode, ContentId::null(), size)
    }
}

impl PartialOrd for FileEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_by_path_bytes() {
        let a = FileEntry::new("a.txt", EntryMode::Regular, ContentId::null(), 0);
        let b = FileEntry::new("b.txt", EntryMode::Regular, ContentId::null(), 0);
        let upper = FileEntry::new("B.txt", EntryMode::Regular, ContentId::null(), 0);
        assert!(a < b);
        // Uppercase sorts before lowercase in byte order.
        assert!(upper < a);
    }

    #[test]
    fn unhashed_entries_carry_null_id() {
        let e = FileEntry::unhashed("x", EntryMode::Regular, 42);
        assert!(e.id.is_null());
        assert_eq!(e.size, 42);
    }
}
