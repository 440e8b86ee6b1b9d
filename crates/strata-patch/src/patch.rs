//! Patch computation: line-level diffing of one delta into hunks.
//!
//! A [`Patch`] is a derived view over a single [`Delta`]: a rendered file
//! header, the hunks a Myers line diff produced for the two sides, and
//! per-line records carrying origin and 1-based line numbers. Binary
//! content short-circuits hunk computation into a one-line marker. Deltas
//! that carry no content change (unmodified, untracked, ignored,
//! unreadable, conflicted) produce an empty patch.

use similar::{ChangeTag, TextDiff};
use strata_diff::{Delta, DeltaStatus, DiffList, DiffSide};
use strata_types::{ContentId, FileEntry};
use tracing::debug;

use crate::error::{PatchError, PatchResult};
use crate::line::{LineOrigin, PatchLine};
use crate::options::PatchOptions;

/// Rendered after an unterminated final line. The leading newline closes
/// that line, so rendering stays a plain concatenation.
const EOFNL_MARKER: &[u8] = b"\n\\ No newline at end of file\n";

/// How many leading bytes are scanned for a null byte when deciding
/// whether content is binary.
const BINARY_SCAN_LIMIT: usize = 8000;

/// Longest function-context suffix carried in a hunk header.
const FUNC_CONTEXT_MAX: usize = 80;

const DEV_NULL: &str = "/dev/null";

/// One contiguous change region plus its surrounding context.
///
/// `old_start`/`new_start` are 1-based; a side with zero lines reports the
/// line number just before the region instead, matching `@@ -1,2 +0,0 @@`
/// style headers. The header string includes its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    pub header: String,
    pub lines: Vec<PatchLine>,
}

/// Per-patch line counts. EOFNL markers and headers are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineStats {
    pub context: usize,
    pub additions: usize,
    pub deletions: usize,
}

/// A generated patch for one delta.
///
/// Owns everything it renders, so the list it came from can be dropped or
/// refined afterwards without invalidating the patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    delta: Delta,
    file_header: String,
    binary: Option<PatchLine>,
    hunks: Vec<Hunk>,
}

impl Patch {
    /// Generate the patch for one delta of a diff list, loading content
    /// from the list's sources.
    pub fn from_list(list: &DiffList, index: usize, options: &PatchOptions) -> PatchResult<Patch> {
        let delta = list
            .deltas()
            .get(index)
            .ok_or(PatchError::IndexOutOfBounds(index))?;
        if !status_generates(delta.status) {
            return Ok(Self::empty(delta.clone()));
        }
        let old = match &delta.old {
            Some(entry) => list.content(DiffSide::Old, entry)?,
            None => None,
        };
        let new = match &delta.new {
            Some(entry) => list.content(DiffSide::New, entry)?,
            None => None,
        };
        Self::from_delta(delta, old.as_deref(), new.as_deref(), options)
    }

    /// Generate a patch from a delta and its two sides' content. A missing
    /// side diffs as empty, which is what add and delete patches want.
    pub fn from_delta(
        delta: &Delta,
        old: Option<&[u8]>,
        new: Option<&[u8]>,
        options: &PatchOptions,
    ) -> PatchResult<Patch> {
        if !status_generates(delta.status) {
            return Ok(Self::empty(delta.clone()));
        }
        let mut delta = delta.clone();
        fill_null_id(delta.old.as_mut(), old);
        fill_null_id(delta.new.as_mut(), new);
        let old = old.unwrap_or(&[]);
        let new = new.unwrap_or(&[]);
        let binary = is_binary(old) || is_binary(new);
        let hunks = if binary {
            Vec::new()
        } else {
            build_hunks(old, new, options.context_lines)
        };
        let file_header = build_header(&delta, options, binary, !hunks.is_empty());
        let binary_line = binary.then(|| binary_marker(&delta, options));
        debug!(path = %delta.path(), hunks = hunks.len(), binary, "patch generated");
        Ok(Patch {
            delta,
            file_header,
            binary: binary_line,
            hunks,
        })
    }

    fn empty(delta: Delta) -> Patch {
        Patch {
            delta,
            file_header: String::new(),
            binary: None,
            hunks: Vec::new(),
        }
    }

    pub fn delta(&self) -> &Delta {
        &self.delta
    }

    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    pub fn num_hunks(&self) -> usize {
        self.hunks.len()
    }

    pub fn hunk(&self, index: usize) -> Option<&Hunk> {
        self.hunks.get(index)
    }

    /// The rendered file header, empty for empty patches.
    pub fn file_header(&self) -> &str {
        &self.file_header
    }

    /// The binary-difference marker, when hunk computation was skipped.
    pub fn binary_line(&self) -> Option<&PatchLine> {
        self.binary.as_ref()
    }

    pub fn is_binary(&self) -> bool {
        self.binary.is_some()
    }

    /// Returns `true` when the patch renders to nothing at all.
    pub fn is_empty(&self) -> bool {
        self.file_header.is_empty() && self.binary.is_none() && self.hunks.is_empty()
    }

    /// Count context, addition, and deletion lines across all hunks.
    pub fn line_stats(&self) -> LineStats {
        let mut stats = LineStats::default();
        for line in self.hunks.iter().flat_map(|hunk| &hunk.lines) {
            match line.origin {
                LineOrigin::Context => stats.context += 1,
                LineOrigin::Addition => stats.additions += 1,
                LineOrigin::Deletion => stats.deletions += 1,
                _ => {}
            }
        }
        stats
    }

    /// Rendered byte size of the selected parts.
    ///
    /// Addition and deletion lines always count, origin byte and EOFNL
    /// markers included, as does a binary marker. Context lines join under
    /// `include_context`, hunk headers under `include_hunk_headers`, the
    /// file header under `include_file_headers`. With everything enabled
    /// the result equals the length of [`Patch::to_bytes`].
    pub fn size(
        &self,
        include_context: bool,
        include_hunk_headers: bool,
        include_file_headers: bool,
    ) -> usize {
        let mut total = 0;
        if include_file_headers {
            total += self.file_header.len();
        }
        if let Some(line) = &self.binary {
            total += line.content.len();
        }
        for hunk in &self.hunks {
            if include_hunk_headers {
                total += hunk.header.len();
            }
            for line in &hunk.lines {
                match line.origin {
                    LineOrigin::Addition | LineOrigin::Deletion => {
                        total += 1 + line.content.len();
                    }
                    LineOrigin::AddEofnl | LineOrigin::DelEofnl => {
                        total += line.content.len();
                    }
                    LineOrigin::Context if include_context => {
                        total += 1 + line.content.len();
                    }
                    LineOrigin::ContextEofnl if include_context => {
                        total += line.content.len();
                    }
                    _ => {}
                }
            }
        }
        total
    }

    /// Render the full unified-diff text.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size(true, true, true));
        out.extend_from_slice(self.file_header.as_bytes());
        if let Some(line) = &self.binary {
            out.extend_from_slice(&line.content);
        }
        for hunk in &self.hunks {
            out.extend_from_slice(hunk.header.as_bytes());
            for line in &hunk.lines {
                if line.origin.is_prefixed() {
                    out.push(line.origin.as_char() as u8);
                }
                out.extend_from_slice(&line.content);
            }
        }
        out
    }
}

fn status_generates(status: DeltaStatus) -> bool {
    matches!(
        status,
        DeltaStatus::Added
            | DeltaStatus::Deleted
            | DeltaStatus::Modified
            | DeltaStatus::Renamed
            | DeltaStatus::Copied
            | DeltaStatus::TypeChange
    )
}

/// Workdir deltas may arrive with a null id when a size mismatch already
/// settled their status. The header needs the real id, so hash it here.
fn fill_null_id(entry: Option<&mut FileEntry>, content: Option<&[u8]>) {
    if let (Some(entry), Some(bytes)) = (entry, content) {
        if entry.id.is_null() {
            entry.id = ContentId::from_bytes(bytes);
            entry.size = bytes.len() as u64;
        }
    }
}

fn is_binary(content: &[u8]) -> bool {
    content[..content.len().min(BINARY_SCAN_LIMIT)].contains(&0)
}

fn prefixed(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_string()
    } else {
        format!("{prefix}/{path}")
    }
}

fn side_label(entry: Option<&FileEntry>, prefix: &str) -> String {
    match entry {
        Some(entry) => prefixed(prefix, &entry.path),
        None => DEV_NULL.to_string(),
    }
}

/// Build the `diff --git` header block.
///
/// Mode lines come before the `index` line. The `index` line appears only
/// when the ids differ or the patch carries changes; its trailing mode is
/// present only when both sides share one. `---`/`+++` labels appear only
/// ahead of actual hunks, so mode-only and binary patches match git's
/// layout.
fn build_header(delta: &Delta, options: &PatchOptions, binary: bool, has_hunks: bool) -> String {
    let old_path = delta.old_path().or_else(|| delta.new_path()).unwrap_or("");
    let new_path = delta.new_path().or_else(|| delta.old_path()).unwrap_or("");
    let mut header = format!(
        "diff --git {} {}\n",
        prefixed(&options.old_prefix, old_path),
        prefixed(&options.new_prefix, new_path)
    );

    match (&delta.old, &delta.new) {
        (None, Some(new)) => header.push_str(&format!("new file mode {}\n", new.mode)),
        (Some(old), None) => header.push_str(&format!("deleted file mode {}\n", old.mode)),
        (Some(old), Some(new)) if old.mode != new.mode => {
            header.push_str(&format!("old mode {}\nnew mode {}\n", old.mode, new.mode));
        }
        _ => {}
    }

    let old_id = delta.old.as_ref().map_or(ContentId::null(), |entry| entry.id);
    let new_id = delta.new.as_ref().map_or(ContentId::null(), |entry| entry.id);
    if old_id != new_id || binary || has_hunks {
        header.push_str(&format!(
            "index {}..{}",
            old_id.abbrev(options.abbrev),
            new_id.abbrev(options.abbrev)
        ));
        if let (Some(old), Some(new)) = (&delta.old, &delta.new) {
            if old.mode == new.mode {
                header.push_str(&format!(" {}", old.mode));
            }
        }
        header.push('\n');
    }

    if has_hunks {
        header.push_str(&format!(
            "--- {}\n+++ {}\n",
            side_label(delta.old.as_ref(), &options.old_prefix),
            side_label(delta.new.as_ref(), &options.new_prefix)
        ));
    }
    header
}

fn binary_marker(delta: &Delta, options: &PatchOptions) -> PatchLine {
    PatchLine {
        origin: LineOrigin::Binary,
        old_lineno: -1,
        new_lineno: -1,
        content: format!(
            "Binary files {} and {} differ\n",
            side_label(delta.old.as_ref(), &options.old_prefix),
            side_label(delta.new.as_ref(), &options.new_prefix)
        )
        .into_bytes(),
    }
}

/// Diff the two sides line by line and group changes into hunks.
///
/// Change regions separated by at most twice the context width share a
/// hunk. Line content keeps its trailing newline; an unterminated final
/// line is followed by the matching EOFNL marker, which repeats its line
/// numbers and counts toward neither side.
fn build_hunks(old: &[u8], new: &[u8], context_lines: usize) -> Vec<Hunk> {
    let diff = TextDiff::from_lines(old, new);
    let old_slices = diff.old_slices();
    let mut hunks = Vec::new();

    for group in diff.grouped_ops(context_lines) {
        let Some(first) = group.first() else { continue };
        let old_origin = first.old_range().start;
        let new_origin = first.new_range().start;
        let mut lines = Vec::new();
        let mut old_count = 0usize;
        let mut new_count = 0usize;

        for op in &group {
            for change in diff.iter_changes(op) {
                let content: &[u8] = change.value();
                let old_lineno = lineno(change.old_index());
                let new_lineno = lineno(change.new_index());
                let origin = match change.tag() {
                    ChangeTag::Equal => {
                        old_count += 1;
                        new_count += 1;
                        LineOrigin::Context
                    }
                    ChangeTag::Delete => {
                        old_count += 1;
                        LineOrigin::Deletion
                    }
                    ChangeTag::Insert => {
                        new_count += 1;
                        LineOrigin::Addition
                    }
                };
                let terminated = content.ends_with(b"\n");
                lines.push(PatchLine {
                    origin,
                    old_lineno,
                    new_lineno,
                    content: content.to_vec(),
                });
                if !terminated {
                    lines.push(PatchLine {
                        origin: eofnl_origin(origin),
                        old_lineno,
                        new_lineno,
                        content: EOFNL_MARKER.to_vec(),
                    });
                }
            }
        }

        let old_start = display_start(old_origin, old_count);
        let new_start = display_start(new_origin, new_count);
        let header = hunk_header(
            old_start,
            old_count,
            new_start,
            new_count,
            function_context(old_slices, old_origin),
        );
        hunks.push(Hunk {
            old_start,
            old_lines: old_count,
            new_start,
            new_lines: new_count,
            header,
            lines,
        });
    }
    hunks
}

fn eofnl_origin(origin: LineOrigin) -> LineOrigin {
    match origin {
        LineOrigin::Addition => LineOrigin::AddEofnl,
        LineOrigin::Deletion => LineOrigin::DelEofnl,
        _ => LineOrigin::ContextEofnl,
    }
}

/// A zero-count side reports the line number just before the region, so an
/// insertion at the top of the file renders `-0,0`.
fn display_start(origin: usize, count: usize) -> usize {
    if count == 0 {
        origin
    } else {
        origin + 1
    }
}

fn lineno(index: Option<usize>) -> i64 {
    index.map_or(-1, |value| (value + 1) as i64)
}

fn hunk_header(
    old_start: usize,
    old_count: usize,
    new_start: usize,
    new_count: usize,
    context: Option<String>,
) -> String {
    let mut header = format!(
        "@@ -{} +{} @@",
        range_part(old_start, old_count),
        range_part(new_start, new_count)
    );
    if let Some(context) = context {
        header.push(' ');
        header.push_str(&context);
    }
    header.push('\n');
    header
}

/// Single-line ranges elide their count, `@@ -1 +1,2 @@` style.
fn range_part(start: usize, count: usize) -> String {
    if count == 1 {
        start.to_string()
    } else {
        format!("{start},{count}")
    }
}

/// The nearest line above the hunk whose first byte looks like the start
/// of an identifier, trimmed and capped. Mirrors the default funcname
/// heuristic in `diff --git` output.
fn function_context(old_slices: &[&[u8]], hunk_start: usize) -> Option<String> {
    for line in old_slices[..hunk_start].iter().rev() {
        let Some(&first) = line.first() else { continue };
        if first.is_ascii_alphanumeric() || first == b'_' || first == b'$' {
            let capped = &line[..line.len().min(FUNC_CONTEXT_MAX)];
            return Some(String::from_utf8_lossy(capped).trim_end().to_string());
        }
    }
    None
}
