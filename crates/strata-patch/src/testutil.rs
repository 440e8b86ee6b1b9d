//! Minimal in-memory entry source for tests that generate patches from a
//! diff list rather than from raw buffers.

use std::collections::{BTreeMap, BTreeSet};

use strata_source::{
    submodule_content, EntrySource, Pathspec, SourceError, SourceKind, SourceResult,
    SubmoduleStatus,
};
use strata_types::{ContentId, EntryMode, FileEntry};

pub(crate) struct MemSource {
    kind: SourceKind,
    entries: Vec<FileEntry>,
    contents: BTreeMap<String, Vec<u8>>,
    dirty_submodules: BTreeSet<String>,
}

impl MemSource {
    fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            contents: BTreeMap::new(),
            dirty_submodules: BTreeSet::new(),
        }
    }

    pub(crate) fn tree() -> Self {
        Self::new(SourceKind::Tree)
    }

    pub(crate) fn workdir() -> Self {
        Self::new(SourceKind::Workdir)
    }

    pub(crate) fn file(mut self, path: &str, content: &[u8]) -> Self {
        self.entries.push(FileEntry::new(
            path,
            EntryMode::Regular,
            ContentId::from_bytes(content),
            content.len() as u64,
        ));
        self.contents.insert(path.to_string(), content.to_vec());
        self
    }

    /// Regular file whose id is left null, as a workdir walk would emit it.
    pub(crate) fn unhashed_file(mut self, path: &str, content: &[u8]) -> Self {
        self.entries
            .push(FileEntry::unhashed(path, EntryMode::Regular, content.len() as u64));
        self.contents.insert(path.to_string(), content.to_vec());
        self
    }

    pub(crate) fn submodule(mut self, path: &str, head: ContentId, dirty: bool) -> Self {
        self.entries
            .push(FileEntry::new(path, EntryMode::Submodule, head, 0));
        if dirty {
            self.dirty_submodules.insert(path.to_string());
        }
        self
    }
}

impl EntrySource for MemSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn enumerate(&self, pathspec: Option<&Pathspec>) -> SourceResult<Vec<FileEntry>> {
        let mut entries: Vec<FileEntry> = self
            .entries
            .iter()
            .filter(|entry| pathspec.map_or(true, |spec| spec.contains(&entry.path)))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));
        Ok(entries)
    }

    fn read_content(&self, entry: &FileEntry) -> SourceResult<Vec<u8>> {
        if entry.mode.is_submodule() {
            let dirty = self.dirty_submodules.contains(&entry.path);
            return Ok(submodule_content(entry.id, dirty));
        }
        self.contents
            .get(&entry.path)
            .cloned()
            .ok_or_else(|| SourceError::Unreadable {
                path: entry.path.clone(),
            })
    }

    fn submodule_status(&self, entry: &FileEntry) -> SourceResult<SubmoduleStatus> {
        if self.dirty_submodules.contains(&entry.path) {
            Ok(SubmoduleStatus::Dirty)
        } else {
            Ok(SubmoduleStatus::Clean)
        }
    }
}
