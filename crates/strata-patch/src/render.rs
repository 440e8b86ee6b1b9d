//! Whole-list output: callback iteration, line-oriented printing, and
//! aggregate change stats.
//!
//! [`foreach`] hands structured pieces (delta, hunk, line) to separate
//! callbacks; [`print`] flattens everything, headers included, into one
//! line-oriented sink so a caller can stream unified-diff text without
//! assembling it. Any callback returning `false` ends the walk early.

use std::fmt;

use strata_diff::{Delta, DiffList};
use tracing::debug;

use crate::error::PatchResult;
use crate::line::{LineOrigin, PatchLine};
use crate::options::PatchOptions;
use crate::patch::{Hunk, Patch};

/// Generate the patch for every delta in the list and walk its pieces.
///
/// `on_file` runs once per delta, including ones that render nothing.
/// Binary markers arrive through `on_line` with [`LineOrigin::Binary`].
pub fn foreach<F, H, L>(
    list: &DiffList,
    options: &PatchOptions,
    mut on_file: F,
    mut on_hunk: H,
    mut on_line: L,
) -> PatchResult<()>
where
    F: FnMut(&Delta) -> bool,
    H: FnMut(&Delta, &Hunk) -> bool,
    L: FnMut(&Delta, &PatchLine) -> bool,
{
    for index in 0..list.len() {
        let patch = Patch::from_list(list, index, options)?;
        let delta = patch.delta();
        if !on_file(delta) {
            return Ok(());
        }
        if let Some(line) = patch.binary_line() {
            if !on_line(delta, line) {
                return Ok(());
            }
        }
        for hunk in patch.hunks() {
            if !on_hunk(delta, hunk) {
                return Ok(());
            }
            for line in &hunk.lines {
                if !on_line(delta, line) {
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

/// Stream every non-empty patch through one line sink, file and hunk
/// headers included as [`LineOrigin::FileHeader`] and
/// [`LineOrigin::HunkHeader`] lines.
pub fn print<S>(list: &DiffList, options: &PatchOptions, mut sink: S) -> PatchResult<()>
where
    S: FnMut(&PatchLine) -> bool,
{
    for index in 0..list.len() {
        let patch = Patch::from_list(list, index, options)?;
        if patch.is_empty() {
            continue;
        }
        let header = PatchLine {
            origin: LineOrigin::FileHeader,
            old_lineno: -1,
            new_lineno: -1,
            content: patch.file_header().as_bytes().to_vec(),
        };
        if !sink(&header) {
            return Ok(());
        }
        if let Some(line) = patch.binary_line() {
            if !sink(line) {
                return Ok(());
            }
        }
        for hunk in patch.hunks() {
            let header = PatchLine {
                origin: LineOrigin::HunkHeader,
                old_lineno: -1,
                new_lineno: -1,
                content: hunk.header.as_bytes().to_vec(),
            };
            if !sink(&header) {
                return Ok(());
            }
            for line in &hunk.lines {
                if !sink(line) {
                    return Ok(());
                }
            }
        }
    }
    Ok(())
}

/// Render the whole list as one unified-diff buffer, patches in list order.
pub fn diff_to_bytes(list: &DiffList, options: &PatchOptions) -> PatchResult<Vec<u8>> {
    let mut out = Vec::new();
    for index in 0..list.len() {
        let patch = Patch::from_list(list, index, options)?;
        out.extend_from_slice(&patch.to_bytes());
    }
    Ok(out)
}

/// Aggregate change counts across a diff list.
///
/// A file counts as changed when its patch renders anything, so pure
/// renames and mode changes are included while untracked and unmodified
/// entries are not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

impl DiffStats {
    /// Tally every content-bearing delta in the list.
    pub fn from_list(list: &DiffList, options: &PatchOptions) -> PatchResult<DiffStats> {
        let mut stats = DiffStats::default();
        for index in 0..list.len() {
            let patch = Patch::from_list(list, index, options)?;
            if patch.is_empty() {
                continue;
            }
            let lines = patch.line_stats();
            stats.files_changed += 1;
            stats.insertions += lines.additions;
            stats.deletions += lines.deletions;
        }
        debug!(
            files = stats.files_changed,
            insertions = stats.insertions,
            deletions = stats.deletions,
            "diff stats tallied"
        );
        Ok(stats)
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file{} changed",
            self.files_changed,
            plural(self.files_changed)
        )?;
        if self.insertions > 0 {
            write!(f, ", {} insertion{}(+)", self.insertions, plural(self.insertions))?;
        }
        if self.deletions > 0 {
            write!(f, ", {} deletion{}(-)", self.deletions, plural(self.deletions))?;
        }
        Ok(())
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_diff::DiffOptions;

    use super::*;
    use crate::testutil::MemSource;

    fn two_file_list() -> DiffList {
        let old = Arc::new(MemSource::tree().file("a.txt", b"one\ntwo\n"));
        let new = Arc::new(
            MemSource::tree()
                .file("a.txt", b"one\ntwo fixed\n")
                .file("b.txt", b"fresh\nlines\n"),
        );
        DiffList::between(old, new, DiffOptions::default()).unwrap()
    }

    #[test]
    fn print_reassembles_the_full_text() {
        let list = two_file_list();
        let options = PatchOptions::default();

        let mut origins = Vec::new();
        let mut assembled = Vec::new();
        print(&list, &options, |line| {
            origins.push(line.origin);
            if line.origin.is_prefixed() {
                assembled.push(line.origin.as_char() as u8);
            }
            assembled.extend_from_slice(&line.content);
            true
        })
        .unwrap();

        assert_eq!(
            origins,
            vec![
                LineOrigin::FileHeader,
                LineOrigin::HunkHeader,
                LineOrigin::Context,
                LineOrigin::Deletion,
                LineOrigin::Addition,
                LineOrigin::FileHeader,
                LineOrigin::HunkHeader,
                LineOrigin::Addition,
                LineOrigin::Addition,
            ]
        );
        assert_eq!(assembled, diff_to_bytes(&list, &options).unwrap());
    }

    #[test]
    fn foreach_visits_files_hunks_and_lines() {
        let list = two_file_list();
        let mut files = 0;
        let mut hunks = 0;
        let mut lines = 0;
        foreach(
            &list,
            &PatchOptions::default(),
            |_| {
                files += 1;
                true
            },
            |_, _| {
                hunks += 1;
                true
            },
            |_, _| {
                lines += 1;
                true
            },
        )
        .unwrap();

        assert_eq!(files, 2);
        assert_eq!(hunks, 2);
        // a.txt: context, deletion, addition; b.txt: two additions.
        assert_eq!(lines, 5);
    }

    #[test]
    fn foreach_stops_when_a_callback_declines() {
        let list = two_file_list();
        let mut files = 0;
        let mut hunks = 0;
        foreach(
            &list,
            &PatchOptions::default(),
            |_| {
                files += 1;
                false
            },
            |_, _| {
                hunks += 1;
                true
            },
            |_, _| true,
        )
        .unwrap();

        assert_eq!(files, 1);
        assert_eq!(hunks, 0);
    }

    #[test]
    fn stats_tally_insertions_and_deletions() {
        let list = two_file_list();
        let stats = DiffStats::from_list(&list, &PatchOptions::default()).unwrap();
        assert_eq!(stats.files_changed, 2);
        assert_eq!(stats.insertions, 3);
        assert_eq!(stats.deletions, 1);
        assert_eq!(
            stats.to_string(),
            "2 files changed, 3 insertions(+), 1 deletion(-)"
        );
    }

    #[test]
    fn stats_for_an_unchanged_list_read_clean() {
        let source = MemSource::tree().file("same.txt", b"steady\n");
        let other = MemSource::tree().file("same.txt", b"steady\n");
        let list =
            DiffList::between(Arc::new(source), Arc::new(other), DiffOptions::default()).unwrap();
        let stats = DiffStats::from_list(&list, &PatchOptions::default()).unwrap();
        assert_eq!(stats, DiffStats::default());
        assert_eq!(stats.to_string(), "0 files changed");
    }
}
