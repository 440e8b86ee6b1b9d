use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use strata_source::{EntrySource, Pathspec, SourceKind, SubmoduleIgnore, SubmoduleStatus};
use strata_types::{ContentId, FileEntry};

use crate::delta::{Delta, DeltaStatus};
use crate::error::DiffResult;
use crate::options::{DiffOptions, FindOptions};

/// Which side of a diff list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffSide {
    Old,
    New,
}

/// An ordered list of deltas between two entry sources.
///
/// Built by [`DiffList::between`]; refined in place by
/// [`DiffList::find_similar`]. The list keeps handles to both sources so
/// later passes can read entry content on demand.
pub struct DiffList {
    old_source: Arc<dyn EntrySource>,
    new_source: Arc<dyn EntrySource>,
    options: DiffOptions,
    deltas: Vec<Delta>,
}

impl DiffList {
    /// Compare two sources and record one delta per differing path.
    pub fn between(
        old_source: Arc<dyn EntrySource>,
        new_source: Arc<dyn EntrySource>,
        options: DiffOptions,
    ) -> DiffResult<DiffList> {
        let pathspec = if options.pathspec.is_empty() {
            None
        } else {
            Some(Pathspec::new(options.pathspec.clone())?)
        };

        let mut old_entries = old_source.enumerate(pathspec.as_ref())?;
        let mut new_entries = new_source.enumerate(pathspec.as_ref())?;

        if options.ignore_submodules == SubmoduleIgnore::All {
            old_entries.retain(|entry| !entry.mode.is_submodule());
            new_entries.retain(|entry| !entry.mode.is_submodule());
        }

        let case_sensitive = options.case_sensitive;
        old_entries.sort_by(|a, b| compare_paths(&a.path, &b.path, case_sensitive));
        new_entries.sort_by(|a, b| compare_paths(&a.path, &b.path, case_sensitive));

        let mut list = DiffList {
            old_source,
            new_source,
            options,
            deltas: Vec::new(),
        };

        let mut i = 0;
        let mut j = 0;
        while i < old_entries.len() || j < new_entries.len() {
            let ord = if i >= old_entries.len() {
                Ordering::Greater
            } else if j >= new_entries.len() {
                Ordering::Less
            } else {
                compare_paths(&old_entries[i].path, &new_entries[j].path, case_sensitive)
            };
            match ord {
                Ordering::Less => {
                    list.record_old_only(old_entries[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    list.record_new_only(new_entries[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    list.record_pair(old_entries[i].clone(), new_entries[j].clone())?;
                    i += 1;
                    j += 1;
                }
            }
        }

        debug!(deltas = list.deltas.len(), "diff list built");
        Ok(list)
    }

    /// Refine the list in place: detect renames, copies and rewrites
    /// according to `find_options`.
    pub fn find_similar(&mut self, find_options: &FindOptions) -> DiffResult<()> {
        crate::find::run(self, find_options)
    }

    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    pub fn options(&self) -> &DiffOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Number of deltas with the given status.
    pub fn count(&self, status: DeltaStatus) -> usize {
        self.deltas
            .iter()
            .filter(|delta| delta.status == status)
            .count()
    }

    /// Raw content of an entry on the given side. `Ok(None)` means the entry
    /// exists but its content cannot be read.
    pub fn content(&self, side: DiffSide, entry: &FileEntry) -> DiffResult<Option<Vec<u8>>> {
        let source = match side {
            DiffSide::Old => &self.old_source,
            DiffSide::New => &self.new_source,
        };
        match source.read_content(entry) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.is_unreadable() => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// One line per delta in git's name-status shape: a status tag, then the
    /// path, with renames and copies listing both paths and their score.
    pub fn name_status(&self) -> String {
        let mut out = String::new();
        for delta in &self.deltas {
            match delta.status {
                DeltaStatus::Renamed | DeltaStatus::Copied => {
                    let score = delta.similarity.unwrap_or(0);
                    out.push_str(&format!(
                        "{}{:03}\t{}\t{}\n",
                        delta.status.as_char(),
                        score,
                        delta.old_path().unwrap_or(""),
                        delta.new_path().unwrap_or(""),
                    ));
                }
                _ => {
                    out.push_str(&format!(
                        "{}\t{}\n",
                        delta.status.as_char(),
                        delta.path()
                    ));
                }
            }
        }
        out
    }

    /// Merge `other` into this list.
    ///
    /// Paths present in both lists are re-paired old-side-from-self with
    /// new-side-from-other and their status re-derived; one-sided paths are
    /// carried over unchanged. The list is only replaced once the whole
    /// merge has been computed.
    pub fn merge(&mut self, other: &DiffList) {
        let case_sensitive = self.options.case_sensitive;
        let mut merged: Vec<Delta> = Vec::with_capacity(self.deltas.len() + other.deltas.len());

        let mut i = 0;
        let mut j = 0;
        while i < self.deltas.len() || j < other.deltas.len() {
            let ord = if i >= self.deltas.len() {
                Ordering::Greater
            } else if j >= other.deltas.len() {
                Ordering::Less
            } else {
                compare_paths(
                    self.deltas[i].path(),
                    other.deltas[j].path(),
                    case_sensitive,
                )
            };
            match ord {
                Ordering::Less => {
                    merged.push(self.deltas[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push(other.deltas[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    if let Some(delta) =
                        merge_pair(&self.deltas[i], &other.deltas[j], &self.options)
                    {
                        merged.push(delta);
                    }
                    i += 1;
                    j += 1;
                }
            }
        }

        self.deltas = merged;
    }

    pub(crate) fn replace_deltas(&mut self, deltas: Vec<Delta>) {
        self.deltas = deltas;
    }

    pub(crate) fn new_side_kind(&self) -> SourceKind {
        self.new_source.kind()
    }

    fn record_old_only(&mut self, entry: FileEntry) {
        if self.old_source.is_conflicted(&entry.path) {
            self.deltas
                .push(Delta::new(DeltaStatus::Conflicted, Some(entry), None));
            return;
        }
        self.deltas.push(Delta::deleted(entry));
    }

    fn record_new_only(&mut self, entry: FileEntry) {
        if self.new_source.is_conflicted(&entry.path) {
            self.deltas
                .push(Delta::new(DeltaStatus::Conflicted, None, Some(entry)));
            return;
        }
        match self.new_source.kind() {
            SourceKind::Workdir => {
                if self.new_source.is_ignored(&entry.path) {
                    if self.options.include_ignored {
                        self.deltas.push(Delta::ignored(entry));
                    }
                } else if self.options.include_untracked {
                    self.deltas.push(Delta::untracked(entry));
                }
            }
            SourceKind::Tree | SourceKind::Index => {
                self.deltas.push(Delta::added(entry));
            }
        }
    }

    fn record_pair(&mut self, old: FileEntry, new: FileEntry) -> DiffResult<()> {
        if self.old_source.is_conflicted(&old.path) || self.new_source.is_conflicted(&new.path) {
            self.deltas
                .push(Delta::pair(DeltaStatus::Conflicted, old, new));
            return Ok(());
        }

        if !old.mode.same_class(&new.mode) {
            self.deltas
                .push(Delta::pair(DeltaStatus::TypeChange, old, new));
            return Ok(());
        }

        if old.mode.is_submodule() {
            return self.record_submodule_pair(old, new);
        }

        // A size mismatch already proves the content differs. The null id
        // stays until a later pass reads the bytes anyway.
        if (old.id.is_null() || new.id.is_null()) && old.size != new.size {
            self.deltas.push(Delta::pair(DeltaStatus::Modified, old, new));
            return Ok(());
        }

        let old = match self.resolve_entry_id(DiffSide::Old, old) {
            Resolved::Entry(entry) => entry,
            Resolved::Unreadable(entry) => {
                self.deltas
                    .push(Delta::pair(DeltaStatus::Unreadable, entry, new));
                return Ok(());
            }
            Resolved::Failed(err) => return Err(err),
        };
        let new = match self.resolve_entry_id(DiffSide::New, new) {
            Resolved::Entry(entry) => entry,
            Resolved::Unreadable(entry) => {
                self.deltas
                    .push(Delta::pair(DeltaStatus::Unreadable, old, entry));
                return Ok(());
            }
            Resolved::Failed(err) => return Err(err),
        };

        if old.id == new.id && old.mode == new.mode {
            if self.options.include_unmodified {
                self.deltas
                    .push(Delta::pair(DeltaStatus::Unmodified, old, new));
            }
        } else {
            self.deltas.push(Delta::pair(DeltaStatus::Modified, old, new));
        }
        Ok(())
    }

    fn record_submodule_pair(&mut self, old: FileEntry, new: FileEntry) -> DiffResult<()> {
        let old_status = self.old_source.submodule_status(&old)?;
        let new_status = self.new_source.submodule_status(&new)?;

        // Per-submodule configuration hides every change, head moves included.
        if old_status == SubmoduleStatus::Ignored || new_status == SubmoduleStatus::Ignored {
            if self.options.include_unmodified {
                self.deltas
                    .push(Delta::pair(DeltaStatus::Unmodified, old, new));
            }
            return Ok(());
        }

        let dirty = self.options.ignore_submodules == SubmoduleIgnore::None
            && (old_status == SubmoduleStatus::Dirty || new_status == SubmoduleStatus::Dirty);

        if old.id != new.id || dirty {
            self.deltas.push(Delta::pair(DeltaStatus::Modified, old, new));
        } else if self.options.include_unmodified {
            self.deltas
                .push(Delta::pair(DeltaStatus::Unmodified, old, new));
        }
        Ok(())
    }

    /// Fill in a null content id by hashing the entry's bytes.
    fn resolve_entry_id(&self, side: DiffSide, mut entry: FileEntry) -> Resolved {
        if !entry.id.is_null() {
            return Resolved::Entry(entry);
        }
        let source = match side {
            DiffSide::Old => &self.old_source,
            DiffSide::New => &self.new_source,
        };
        match source.read_content(&entry) {
            Ok(bytes) => {
                entry.id = ContentId::from_bytes(&bytes);
                entry.size = bytes.len() as u64;
                Resolved::Entry(entry)
            }
            Err(err) if err.is_unreadable() => Resolved::Unreadable(entry),
            Err(err) => Resolved::Failed(err.into()),
        }
    }
}

enum Resolved {
    Entry(FileEntry),
    Unreadable(FileEntry),
    Failed(crate::error::DiffError),
}

impl<'a> IntoIterator for &'a DiffList {
    type Item = &'a Delta;
    type IntoIter = std::slice::Iter<'a, Delta>;

    fn into_iter(self) -> Self::IntoIter {
        self.deltas.iter()
    }
}

/// Path ordering used everywhere a list is walked or merged.
pub(crate) fn compare_paths(a: &str, b: &str, case_sensitive: bool) -> Ordering {
    if case_sensitive {
        a.as_bytes().cmp(b.as_bytes())
    } else {
        a.bytes()
            .map(|byte| byte.to_ascii_lowercase())
            .cmp(b.bytes().map(|byte| byte.to_ascii_lowercase()))
    }
}

fn merge_pair(ours: &Delta, theirs: &Delta, options: &DiffOptions) -> Option<Delta> {
    let old = ours.old.clone();
    let new = theirs.new.clone();

    let conflicted =
        ours.status == DeltaStatus::Conflicted || theirs.status == DeltaStatus::Conflicted;

    match (old, new) {
        (None, None) => None,
        (Some(old), None) => {
            let status = if conflicted {
                DeltaStatus::Conflicted
            } else {
                DeltaStatus::Deleted
            };
            Some(Delta::new(status, Some(old), None))
        }
        (None, Some(new)) => {
            let status = if conflicted {
                DeltaStatus::Conflicted
            } else {
                // One-sided-new semantics come from the list that saw it.
                match theirs.status {
                    DeltaStatus::Untracked | DeltaStatus::Ignored => theirs.status,
                    _ => DeltaStatus::Added,
                }
            };
            Some(Delta::new(status, None, Some(new)))
        }
        (Some(old), Some(new)) => {
            let status = if conflicted {
                DeltaStatus::Conflicted
            } else if !old.mode.same_class(&new.mode) {
                DeltaStatus::TypeChange
            } else if old.id == new.id && old.mode == new.mode && !old.id.is_null() {
                DeltaStatus::Unmodified
            } else {
                DeltaStatus::Modified
            };
            if status == DeltaStatus::Unmodified && !options.include_unmodified {
                return None;
            }
            Some(Delta::pair(status, old, new))
        }
    }
}
