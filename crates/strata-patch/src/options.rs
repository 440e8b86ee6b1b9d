use serde::{Deserialize, Serialize};

/// Context lines shown before and after each changed region.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Hex digits shown for each content id in `index` lines.
pub const DEFAULT_ABBREV: usize = 7;

/// Options controlling how a patch is laid out and rendered.
///
/// The defaults reproduce stock `diff --git` output: `a/` and `b/` path
/// prefixes, three context lines, seven-digit abbreviated ids. An empty
/// prefix joins the path bare, with no slash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOptions {
    /// Context lines around each change. Regions separated by at most twice
    /// this many unchanged lines collapse into one hunk.
    pub context_lines: usize,
    /// Prefix for old-side paths in headers.
    pub old_prefix: String,
    /// Prefix for new-side paths in headers.
    pub new_prefix: String,
    /// Hex digits per content id in `index` lines, clamped to the full
    /// 64-character width.
    pub abbrev: usize,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
            old_prefix: "a".to_string(),
            new_prefix: "b".to_string(),
            abbrev: DEFAULT_ABBREV,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_git_output() {
        let options = PatchOptions::default();
        assert_eq!(options.context_lines, 3);
        assert_eq!(options.old_prefix, "a");
        assert_eq!(options.new_prefix, "b");
        assert_eq!(options.abbrev, 7);
    }
}
