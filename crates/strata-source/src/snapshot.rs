use std::collections::BTreeMap;

use strata_types::{ContentId, EntryMode, FileEntry};

use crate::error::{SourceError, SourceResult};
use crate::pathspec::Pathspec;
use crate::traits::{submodule_content, EntrySource, SourceKind};

/// In-memory tree snapshot: one committed side of a diff.
///
/// Content ids are computed at insertion, so exact-match rename detection
/// works without further reads. Embedders backed by a real object store
/// implement [`EntrySource`] themselves; this adapter is the reference
/// implementation and the test workhorse.
#[derive(Default)]
pub struct SnapshotSource {
    entries: BTreeMap<String, StoredEntry>,
}

struct StoredEntry {
    entry: FileEntry,
    content: Vec<u8>,
}

impl SnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a blob or symlink entry; returns its computed content id.
    pub fn insert(
        &mut self,
        path: impl Into<String>,
        mode: EntryMode,
        content: impl Into<Vec<u8>>,
    ) -> ContentId {
        let path = path.into();
        let content = content.into();
        let id = ContentId::from_bytes(&content);
        let entry = FileEntry::new(path.clone(), mode, id, content.len() as u64);
        self.entries.insert(path, StoredEntry { entry, content });
        id
    }

    /// Insert a regular file (mode 100644).
    pub fn insert_file(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> ContentId {
        self.insert(path, EntryMode::Regular, content)
    }

    /// Record a submodule pointer at `path`.
    pub fn insert_submodule(&mut self, path: impl Into<String>, head: ContentId) {
        let path = path.into();
        let entry = FileEntry::new(path.clone(), EntryMode::Submodule, head, 0);
        self.entries.insert(
            path,
            StoredEntry {
                entry,
                content: Vec::new(),
            },
        );
    }

    /// Remove an entry; returns `true` if it existed.
    pub fn remove(&mut self, path: &str) -> bool {
        self.entries.remove(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EntrySource for SnapshotSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Tree
    }

    fn enumerate(&self, pathspec: Option<&Pathspec>) -> SourceResult<Vec<FileEntry>> {
        Ok(self
            .entries
            .values()
            .filter(|stored| pathspec.map_or(true, |spec| spec.contains(&stored.entry.path)))
            .map(|stored| stored.entry.clone())
            .collect())
    }

    fn read_content(&self, entry: &FileEntry) -> SourceResult<Vec<u8>> {
        let stored = self
            .entries
            .get(&entry.path)
            .ok_or_else(|| SourceError::NotFound {
                path: entry.path.clone(),
            })?;
        if stored.entry.mode.is_submodule() {
            return Ok(submodule_content(stored.entry.id, false));
        }
        Ok(stored.content.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_is_path_sorted() {
        let mut snap = SnapshotSource::new();
        snap.insert_file("b.txt", "two");
        snap.insert_file("a.txt", "one");
        snap.insert_file("a/nested.txt", "three");
        let paths: Vec<String> = snap
            .enumerate(None)
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, ["a.txt", "a/nested.txt", "b.txt"]);
    }

    #[test]
    fn insertion_computes_id_and_size() {
        let mut snap = SnapshotSource::new();
        let id = snap.insert_file("f.txt", "hello\n");
        let entries = snap.enumerate(None).unwrap();
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].size, 6);
        assert_eq!(snap.read_content(&entries[0]).unwrap(), b"hello\n");
    }

    #[test]
    fn pathspec_filters_enumeration() {
        let mut snap = SnapshotSource::new();
        snap.insert_file("keep/a.txt", "a");
        snap.insert_file("drop/b.txt", "b");
        let spec = Pathspec::new(["keep"]).unwrap();
        let entries = snap.enumerate(Some(&spec)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "keep/a.txt");
    }

    #[test]
    fn submodules_read_as_subproject_line() {
        let mut snap = SnapshotSource::new();
        let head = ContentId::from_bytes(b"sub head");
        snap.insert_submodule("vendor/lib", head);
        let entries = snap.enumerate(None).unwrap();
        assert_eq!(entries[0].mode, EntryMode::Submodule);
        let content = snap.read_content(&entries[0]).unwrap();
        assert_eq!(content, submodule_content(head, false));
    }

    #[test]
    fn reading_unknown_entry_is_not_found() {
        let snap = SnapshotSource::new();
        let ghost = FileEntry::unhashed("ghost.txt", EntryMode::Regular, 0);
        assert!(matches!(
            snap.read_content(&ghost),
            Err(SourceError::NotFound { .. })
        ));
    }
}
