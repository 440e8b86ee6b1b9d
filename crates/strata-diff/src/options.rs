use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strata_source::SubmoduleIgnore;

use crate::error::{DiffError, DiffResult};

/// Current version of [`FindOptions`]. Callers constructing the struct by
/// hand must set this; anything else is rejected up front.
pub const FIND_OPTIONS_VERSION: u32 = 1;

const DEFAULT_RENAME_THRESHOLD: u16 = 50;
const DEFAULT_RENAME_FROM_REWRITE_THRESHOLD: u16 = 50;
const DEFAULT_COPY_THRESHOLD: u16 = 50;
const DEFAULT_BREAK_REWRITE_THRESHOLD: u16 = 60;
const DEFAULT_RENAME_LIMIT: usize = 200;

/// Options controlling which deltas a diff list records and how entries from
/// the two sources are paired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffOptions {
    /// Record a delta for entries that are identical on both sides.
    pub include_unmodified: bool,
    /// Record new-side-only workdir entries instead of skipping them.
    pub include_untracked: bool,
    /// Record new-side-only workdir entries that match ignore rules.
    pub include_ignored: bool,
    /// Compare paths byte-for-byte; when false, ASCII case is folded.
    pub case_sensitive: bool,
    /// How submodule entries participate in the comparison.
    pub ignore_submodules: SubmoduleIgnore,
    /// Limit the comparison to paths matching these patterns.
    pub pathspec: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            include_unmodified: false,
            include_untracked: false,
            include_ignored: false,
            case_sensitive: true,
            ignore_submodules: SubmoduleIgnore::default(),
            pathspec: Vec::new(),
        }
    }
}

bitflags! {
    /// Flags selecting which refinement passes [`crate::DiffList::find_similar`]
    /// runs and how file content is fingerprinted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FindFlags: u32 {
        /// Pair deleted entries with added entries of similar content.
        const RENAMES = 1 << 0;
        /// Let heavily edited entries give up their old side to a rename.
        const RENAMES_FROM_REWRITES = 1 << 1;
        /// Pair added entries with similar modified entries left in place.
        const COPIES = 1 << 2;
        /// Also consider unmodified entries as copy origins.
        const COPIES_FROM_UNMODIFIED = 1 << 3;
        /// Score each modified entry against its own old side.
        const REWRITES = 1 << 4;
        /// Split heavily edited entries into a delete plus an add.
        const BREAK_REWRITES = 1 << 5;
        /// Split and rematch heavily edited entries.
        const AND_BREAK_REWRITES = Self::REWRITES.bits() | Self::BREAK_REWRITES.bits();
        /// Every refinement pass at once.
        const ALL = 0x3f;

        /// Drop all whitespace before fingerprinting content.
        const IGNORE_WHITESPACE = 1 << 12;
        /// Fingerprint content exactly as stored.
        const DONT_IGNORE_WHITESPACE = 1 << 13;
        /// Only pair entries whose content is byte-identical.
        const EXACT_MATCH_ONLY = 1 << 14;
    }
}

/// Options for the similarity pass. `..Default::default()` fills in the
/// version and the stock thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FindOptions {
    /// Must be [`FIND_OPTIONS_VERSION`].
    pub version: u32,
    pub flags: FindFlags,
    /// Similarity (0..=100) for a delete/add pair to become a rename.
    pub rename_threshold: u16,
    /// Self-similarity below which a modified entry may surrender its old
    /// side to a rename.
    pub rename_from_rewrite_threshold: u16,
    /// Similarity for an add to become a copy of a surviving entry.
    pub copy_threshold: u16,
    /// Self-similarity below which a modified entry counts as a rewrite.
    pub break_rewrite_threshold: u16,
    /// Once sources times targets exceeds the square of this, only exact
    /// matches are tried.
    pub rename_limit: usize,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            version: FIND_OPTIONS_VERSION,
            flags: FindFlags::RENAMES,
            rename_threshold: DEFAULT_RENAME_THRESHOLD,
            rename_from_rewrite_threshold: DEFAULT_RENAME_FROM_REWRITE_THRESHOLD,
            copy_threshold: DEFAULT_COPY_THRESHOLD,
            break_rewrite_threshold: DEFAULT_BREAK_REWRITE_THRESHOLD,
            rename_limit: DEFAULT_RENAME_LIMIT,
        }
    }
}

impl FindOptions {
    /// Validate the options and resolve every zero or implied field to its
    /// effective value. Refinement always runs against the result of this.
    pub fn normalized(&self) -> DiffResult<FindOptions> {
        if self.version != FIND_OPTIONS_VERSION {
            return Err(DiffError::InvalidOptions(format!(
                "unsupported find options version {}",
                self.version
            )));
        }

        for (name, value) in [
            ("rename_threshold", self.rename_threshold),
            ("rename_from_rewrite_threshold", self.rename_from_rewrite_threshold),
            ("copy_threshold", self.copy_threshold),
            ("break_rewrite_threshold", self.break_rewrite_threshold),
        ] {
            if value > 100 {
                return Err(DiffError::InvalidOptions(format!(
                    "{name} {value} is out of range (max 100)"
                )));
            }
        }

        if self
            .flags
            .contains(FindFlags::IGNORE_WHITESPACE | FindFlags::DONT_IGNORE_WHITESPACE)
        {
            return Err(DiffError::InvalidOptions(
                "ignore-whitespace and dont-ignore-whitespace are mutually exclusive".into(),
            ));
        }

        let mut flags = self.flags;
        if (flags & FindFlags::ALL).is_empty() {
            flags |= FindFlags::RENAMES;
        }
        if flags.contains(FindFlags::COPIES_FROM_UNMODIFIED) {
            flags |= FindFlags::COPIES;
        }
        if flags.contains(FindFlags::BREAK_REWRITES) {
            flags |= FindFlags::REWRITES;
        }
        // Exact matching never computes self-similarity, so rewrite handling
        // is moot and would otherwise split every modified entry.
        if flags.contains(FindFlags::EXACT_MATCH_ONLY) {
            flags &= !(FindFlags::REWRITES | FindFlags::BREAK_REWRITES);
        }

        let or_default = |value: u16, default: u16| if value == 0 { default } else { value };

        Ok(FindOptions {
            version: self.version,
            flags,
            rename_threshold: or_default(self.rename_threshold, DEFAULT_RENAME_THRESHOLD),
            rename_from_rewrite_threshold: or_default(
                self.rename_from_rewrite_threshold,
                DEFAULT_RENAME_FROM_REWRITE_THRESHOLD,
            ),
            copy_threshold: or_default(self.copy_threshold, DEFAULT_COPY_THRESHOLD),
            break_rewrite_threshold: or_default(
                self.break_rewrite_threshold,
                DEFAULT_BREAK_REWRITE_THRESHOLD,
            ),
            rename_limit: if self.rename_limit == 0 {
                DEFAULT_RENAME_LIMIT
            } else {
                self.rename_limit
            },
        })
    }
}
