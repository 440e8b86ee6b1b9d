use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use strata_types::{ContentId, EntryMode, FileEntry};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{SourceError, SourceResult};
use crate::pathspec::Pathspec;
use crate::traits::{submodule_content, EntrySource, SourceKind, SubmoduleStatus};

/// Working-directory side of a diff.
///
/// Walks the filesystem under a root, classifying paths against the root's
/// `.gitignore` (plus programmatic patterns) and skipping `.git` and
/// registered submodule directories. Entries are emitted with null content
/// ids; the diff builder hashes lazily, one read per file per pass, and only
/// when a comparison actually needs the id.
pub struct WorkdirSource {
    root: PathBuf,
    ignore: Gitignore,
    ignore_lines: Vec<String>,
    submodules: BTreeMap<String, SubmoduleState>,
}

struct SubmoduleState {
    head: ContentId,
    status: SubmoduleStatus,
}

impl WorkdirSource {
    /// Open a working directory. Reads `<root>/.gitignore` if present.
    pub fn open(root: impl Into<PathBuf>) -> SourceResult<Self> {
        let root = root.into();
        let meta = fs::metadata(&root)?;
        if !meta.is_dir() {
            return Err(SourceError::Walk(format!(
                "not a directory: {}",
                root.display()
            )));
        }
        let ignore = build_ignore(&root, &[])?;
        Ok(Self {
            root,
            ignore,
            ignore_lines: Vec::new(),
            submodules: BTreeMap::new(),
        })
    }

    /// Add one gitignore-syntax pattern on top of the on-disk rules.
    pub fn add_ignore_pattern(&mut self, pattern: impl Into<String>) -> SourceResult<()> {
        self.ignore_lines.push(pattern.into());
        self.ignore = build_ignore(&self.root, &self.ignore_lines)?;
        Ok(())
    }

    /// Register a submodule at `path` with its recorded head and resolved
    /// dirty status. The directory's own files are never enumerated.
    pub fn register_submodule(
        &mut self,
        path: impl Into<String>,
        head: ContentId,
        status: SubmoduleStatus,
    ) {
        self.submodules
            .insert(path.into(), SubmoduleState { head, status });
    }

    /// The workdir root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let mut out = String::new();
        for component in rel.components() {
            let part = component.as_os_str().to_str()?;
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(part);
        }
        Some(out)
    }
}

fn build_ignore(root: &Path, extra_lines: &[String]) -> SourceResult<Gitignore> {
    let mut builder = GitignoreBuilder::new(root);
    let file = root.join(".gitignore");
    if file.exists() {
        if let Some(e) = builder.add(&file) {
            return Err(SourceError::IgnoreRules(e.to_string()));
        }
    }
    for line in extra_lines {
        builder
            .add_line(None, line)
            .map_err(|e| SourceError::IgnoreRules(e.to_string()))?;
    }
    builder
        .build()
        .map_err(|e| SourceError::IgnoreRules(e.to_string()))
}

#[cfg(unix)]
fn blob_mode(meta: &fs::Metadata) -> EntryMode {
    use std::os::unix::fs::PermissionsExt;
    if meta.permissions().mode() & 0o111 != 0 {
        EntryMode::Executable
    } else {
        EntryMode::Regular
    }
}

#[cfg(not(unix))]
fn blob_mode(_meta: &fs::Metadata) -> EntryMode {
    EntryMode::Regular
}

impl EntrySource for WorkdirSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Workdir
    }

    fn enumerate(&self, pathspec: Option<&Pathspec>) -> SourceResult<Vec<FileEntry>> {
        let mut entries = Vec::new();
        let mut walker = WalkDir::new(&self.root).into_iter();
        while let Some(next) = walker.next() {
            let dirent = next.map_err(|e| SourceError::Walk(e.to_string()))?;
            if dirent.depth() == 0 {
                continue;
            }
            let Some(rel) = self.relative(dirent.path()) else {
                warn!(path = %dirent.path().display(), "skipping non-utf8 path");
                if dirent.file_type().is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            };
            if dirent.file_type().is_dir() {
                if dirent.file_name() == ".git" {
                    walker.skip_current_dir();
                    continue;
                }
                if let Some(sub) = self.submodules.get(&rel) {
                    entries.push(FileEntry::new(rel, EntryMode::Submodule, sub.head, 0));
                    walker.skip_current_dir();
                }
                continue;
            }
            let (mode, size) = if dirent.file_type().is_symlink() {
                match dirent.metadata() {
                    Ok(meta) => (EntryMode::Symlink, meta.len()),
                    Err(_) => (EntryMode::Symlink, 0),
                }
            } else {
                match dirent.metadata() {
                    Ok(meta) => (blob_mode(&meta), meta.len()),
                    // Leave size zero; the content read will mark it
                    // unreadable later.
                    Err(_) => (EntryMode::Regular, 0),
                }
            };
            entries.push(FileEntry::unhashed(rel, mode, size));
        }
        if let Some(spec) = pathspec {
            entries.retain(|e| spec.contains(&e.path));
        }
        entries.sort();
        debug!(count = entries.len(), root = %self.root.display(), "workdir enumerated");
        Ok(entries)
    }

    fn read_content(&self, entry: &FileEntry) -> SourceResult<Vec<u8>> {
        if entry.mode.is_submodule() {
            let dirty = matches!(
                self.submodules.get(&entry.path).map(|s| s.status),
                Some(SubmoduleStatus::Dirty)
            );
            return Ok(submodule_content(entry.id, dirty));
        }
        let full = self.root.join(&entry.path);
        if entry.mode == EntryMode::Symlink {
            let target = fs::read_link(&full).map_err(|_| SourceError::Unreadable {
                path: entry.path.clone(),
            })?;
            return Ok(target.as_os_str().as_encoded_bytes().to_vec());
        }
        fs::read(&full).map_err(|_| SourceError::Unreadable {
            path: entry.path.clone(),
        })
    }

    fn submodule_status(&self, entry: &FileEntry) -> SourceResult<SubmoduleStatus> {
        Ok(self
            .submodules
            .get(&entry.path)
            .map(|s| s.status)
            .unwrap_or(SubmoduleStatus::Clean))
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignore
            .matched_path_or_any_parents(path, false)
            .is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(root: &Path, rel: &str, content: &str) {
        let full = root.join(rel);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut f = fs::File::create(full).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn enumerates_files_sorted_with_null_ids() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b.txt", "bee");
        write_file(dir.path(), "a.txt", "ay");
        write_file(dir.path(), "sub/c.txt", "sea");
        let wd = WorkdirSource::open(dir.path()).unwrap();
        let entries = wd.enumerate(None).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["a.txt", "b.txt", "sub/c.txt"]);
        assert!(entries.iter().all(|e| e.id.is_null()));
        assert_eq!(entries[1].size, 3);
    }

    #[test]
    fn git_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), ".git/config", "[core]");
        write_file(dir.path(), "tracked.txt", "x");
        let wd = WorkdirSource::open(dir.path()).unwrap();
        let entries = wd.enumerate(None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "tracked.txt");
    }

    #[test]
    fn gitignore_rules_classify_paths() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), ".gitignore", "*.log\nbuild/\n");
        write_file(dir.path(), "app.log", "log");
        write_file(dir.path(), "build/out.bin", "bin");
        write_file(dir.path(), "keep.txt", "k");
        let wd = WorkdirSource::open(dir.path()).unwrap();
        assert!(wd.is_ignored("app.log"));
        assert!(wd.is_ignored("build/out.bin"));
        assert!(!wd.is_ignored("keep.txt"));
        // Ignored files still enumerate; the diff builder decides their fate.
        let paths: Vec<String> = wd
            .enumerate(None)
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert!(paths.contains(&"app.log".to_string()));
    }

    #[test]
    fn programmatic_ignore_patterns_stack() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "scratch.tmp", "t");
        let mut wd = WorkdirSource::open(dir.path()).unwrap();
        assert!(!wd.is_ignored("scratch.tmp"));
        wd.add_ignore_pattern("*.tmp").unwrap();
        assert!(wd.is_ignored("scratch.tmp"));
    }

    #[test]
    fn registered_submodules_replace_their_subtree() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "vendor/lib/inner.c", "int x;");
        write_file(dir.path(), "main.c", "int main;");
        let mut wd = WorkdirSource::open(dir.path()).unwrap();
        let head = ContentId::from_bytes(b"submodule head");
        wd.register_submodule("vendor/lib", head, SubmoduleStatus::Dirty);
        let entries = wd.enumerate(None).unwrap();
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["main.c", "vendor/lib"]);
        let sub = &entries[1];
        assert_eq!(sub.mode, EntryMode::Submodule);
        assert_eq!(sub.id, head);
        assert_eq!(
            wd.submodule_status(sub).unwrap(),
            SubmoduleStatus::Dirty
        );
        assert_eq!(wd.read_content(sub).unwrap(), submodule_content(head, true));
    }

    #[test]
    fn missing_file_reads_as_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let wd = WorkdirSource::open(dir.path()).unwrap();
        let ghost = FileEntry::unhashed("ghost.txt", EntryMode::Regular, 0);
        let err = wd.read_content(&ghost).unwrap_err();
        assert!(err.is_unreadable());
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_maps_to_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "run.sh", "#!/bin/sh\n");
        let full = dir.path().join("run.sh");
        let mut perms = fs::metadata(&full).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&full, perms).unwrap();
        let wd = WorkdirSource::open(dir.path()).unwrap();
        let entries = wd.enumerate(None).unwrap();
        assert_eq!(entries[0].mode, EntryMode::Executable);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_read_as_target_path() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "real.txt", "content");
        std::os::unix::fs::symlink("real.txt", dir.path().join("link")).unwrap();
        let wd = WorkdirSource::open(dir.path()).unwrap();
        let entries = wd.enumerate(None).unwrap();
        let link = entries.iter().find(|e| e.path == "link").unwrap();
        assert_eq!(link.mode, EntryMode::Symlink);
        assert_eq!(wd.read_content(link).unwrap(), b"real.txt");
    }
}
