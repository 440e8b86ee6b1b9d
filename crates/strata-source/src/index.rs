use std::collections::BTreeMap;

use strata_types::{ContentId, EntryMode, FileEntry};

use crate::error::{SourceError, SourceResult};
use crate::pathspec::Pathspec;
use crate::traits::{submodule_content, EntrySource, SourceKind};

/// Staging-index side of a diff: staged entries plus unresolved merge
/// stages.
///
/// A conflicted path never contributes a normal staged entry; enumeration
/// projects the first available stage (ours, theirs, ancestor) so the
/// builder has an entry to pair with, and [`EntrySource::is_conflicted`]
/// tells it to mark the delta `Conflicted` instead of comparing content.
#[derive(Default)]
pub struct IndexSource {
    entries: BTreeMap<String, StagedEntry>,
    conflicts: BTreeMap<String, ConflictEntry>,
}

struct StagedEntry {
    entry: FileEntry,
    content: Vec<u8>,
}

/// The three merge stages recorded for one conflicted path.
#[derive(Clone, Debug, Default)]
pub struct ConflictEntry {
    pub ancestor: Option<FileEntry>,
    pub ours: Option<FileEntry>,
    pub theirs: Option<FileEntry>,
}

impl ConflictEntry {
    /// The stage entry enumeration projects for this path.
    fn projected(&self) -> Option<&FileEntry> {
        self.ours
            .as_ref()
            .or(self.theirs.as_ref())
            .or(self.ancestor.as_ref())
    }
}

impl IndexSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a blob or symlink entry; returns its computed content id.
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
        self.conflicts.remove(&path);
        self.entries.insert(path, StagedEntry { entry, content });
        id
    }

    /// Stage a regular file (mode 100644).
    pub fn insert_file(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> ContentId {
        self.insert(path, EntryMode::Regular, content)
    }

    /// Record a submodule pointer at `path`.
    pub fn insert_submodule(&mut self, path: impl Into<String>, head: ContentId) {
        let path = path.into();
        let entry = FileEntry::new(path.clone(), EntryMode::Submodule, head, 0);
        self.conflicts.remove(&path);
        self.entries.insert(
            path,
            StagedEntry {
                entry,
                content: Vec::new(),
            },
        );
    }

    /// Remove a staged entry; returns `true` if it existed.
    pub fn remove(&mut self, path: &str) -> bool {
        self.entries.remove(path).is_some()
    }

    /// Mark `path` as conflicted with the given merge stages. Replaces any
    /// staged entry at that path.
    pub fn mark_conflict(&mut self, path: impl Into<String>, stages: ConflictEntry) {
        let path = path.into();
        self.entries.remove(&path);
        self.conflicts.insert(path, stages);
    }

    /// Clear the conflict at `path`; returns `true` if one existed.
    pub fn resolve_conflict(&mut self, path: &str) -> bool {
        self.conflicts.remove(path).is_some()
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn conflict_paths(&self) -> Vec<String> {
        self.conflicts.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.conflicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.conflicts.is_empty()
    }
}

impl EntrySource for IndexSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Index
    }

    fn enumerate(&self, pathspec: Option<&Pathspec>) -> SourceResult<Vec<FileEntry>> {
        let selected = |path: &str| pathspec.map_or(true, |spec| spec.contains(path));
        let mut entries: Vec<FileEntry> = self
            .entries
            .values()
            .filter(|stored| selected(&stored.entry.path))
            .map(|stored| stored.entry.clone())
            .collect();
        for stages in self.conflicts.values() {
            if let Some(entry) = stages.projected() {
                if selected(&entry.path) {
                    entries.push(entry.clone());
                }
            }
        }
        entries.sort();
        Ok(entries)
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

    fn is_conflicted(&self, path: &str) -> bool {
        self.conflicts.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_entries_enumerate_sorted() {
        let mut index = IndexSource::new();
        index.insert_file("z.txt", "z");
        index.insert_file("a.txt", "a");
        let paths: Vec<String> = index
            .enumerate(None)
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, ["a.txt", "z.txt"]);
    }

    #[test]
    fn conflicts_project_ours_stage() {
        let mut index = IndexSource::new();
        let ours = FileEntry::new(
            "clash.txt",
            EntryMode::Regular,
            ContentId::from_bytes(b"ours"),
            4,
        );
        let theirs = FileEntry::new(
            "clash.txt",
            EntryMode::Regular,
            ContentId::from_bytes(b"theirs"),
            6,
        );
        index.mark_conflict(
            "clash.txt",
            ConflictEntry {
                ancestor: None,
                ours: Some(ours.clone()),
                theirs: Some(theirs),
            },
        );
        assert!(index.has_conflicts());
        assert!(index.is_conflicted("clash.txt"));
        let entries = index.enumerate(None).unwrap();
        assert_eq!(entries, vec![ours]);
    }

    #[test]
    fn staging_clears_a_conflict() {
        let mut index = IndexSource::new();
        index.mark_conflict("clash.txt", ConflictEntry::default());
        index.insert_file("clash.txt", "resolved");
        assert!(!index.has_conflicts());
        assert!(!index.is_conflicted("clash.txt"));
    }

    #[test]
    fn resolve_conflict_reports_presence() {
        let mut index = IndexSource::new();
        index.mark_conflict("clash.txt", ConflictEntry::default());
        assert!(index.resolve_conflict("clash.txt"));
        assert!(!index.resolve_conflict("clash.txt"));
        assert_eq!(index.conflict_paths(), Vec::<String>::new());
    }
}
