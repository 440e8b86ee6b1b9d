//! In-memory entry source with scriptable side behavior, for tests that
//! need workdir or index semantics without touching the filesystem.

use std::collections::{BTreeMap, BTreeSet};

use strata_source::{
    submodule_content, EntrySource, Pathspec, SourceError, SourceKind, SourceResult,
    SubmoduleStatus,
};
use strata_types::{ContentId, EntryMode, FileEntry};

pub(crate) struct TestSource {
    kind: SourceKind,
    entries: Vec<FileEntry>,
    contents: BTreeMap<String, Vec<u8>>,
    ignored: BTreeSet<String>,
    conflicted: BTreeSet<String>,
    dirty_submodules: BTreeSet<String>,
    ignored_submodules: BTreeSet<String>,
    fail_reads: bool,
}

impl TestSource {
    fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            contents: BTreeMap::new(),
            ignored: BTreeSet::new(),
            conflicted: BTreeSet::new(),
            dirty_submodules: BTreeSet::new(),
            ignored_submodules: BTreeSet::new(),
            fail_reads: false,
        }
    }

    pub(crate) fn tree() -> Self {
        Self::new(SourceKind::Tree)
    }

    pub(crate) fn index() -> Self {
        Self::new(SourceKind::Index)
    }

    pub(crate) fn workdir() -> Self {
        Self::new(SourceKind::Workdir)
    }

    /// Regular file with a precomputed content id.
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

    /// Entry that enumerates but fails every content read.
    pub(crate) fn missing_file(mut self, path: &str, size: u64) -> Self {
        self.entries
            .push(FileEntry::unhashed(path, EntryMode::Regular, size));
        self
    }

    /// Fail every content read with a fatal error, not a per-entry one.
    pub(crate) fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub(crate) fn submodule(mut self, path: &str, head: ContentId) -> Self {
        self.entries
            .push(FileEntry::new(path, EntryMode::Submodule, head, 0));
        self
    }

    pub(crate) fn dirty_submodule(self, path: &str, head: ContentId) -> Self {
        let mut source = self.submodule(path, head);
        source.dirty_submodules.insert(path.to_string());
        source
    }

    pub(crate) fn ignored_submodule(self, path: &str, head: ContentId) -> Self {
        let mut source = self.submodule(path, head);
        source.ignored_submodules.insert(path.to_string());
        source
    }

    pub(crate) fn ignored_path(mut self, path: &str) -> Self {
        self.ignored.insert(path.to_string());
        self
    }

    pub(crate) fn conflicted_path(mut self, path: &str) -> Self {
        self.conflicted.insert(path.to_string());
        self
    }
}

impl EntrySource for TestSource {
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
        if self.fail_reads {
            return Err(std::io::Error::other("source went away").into());
        }
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
        if self.ignored_submodules.contains(&entry.path) {
            Ok(SubmoduleStatus::Ignored)
        } else if self.dirty_submodules.contains(&entry.path) {
            Ok(SubmoduleStatus::Dirty)
        } else {
            Ok(SubmoduleStatus::Clean)
        }
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignored.contains(path)
    }

    fn is_conflicted(&self, path: &str) -> bool {
        self.conflicted.contains(path)
    }
}
