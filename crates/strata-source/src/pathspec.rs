use std::fmt;

use ignore::overrides::{Override, OverrideBuilder};

use crate::error::{SourceError, SourceResult};

/// Glob-based path filter.
///
/// Patterns use gitignore glob syntax. A bare directory name matches
/// everything beneath it, and a leading `!` excludes paths matched so far.
/// An empty pattern set matches every path.
pub struct Pathspec {
    patterns: Vec<String>,
    /// Compiled matcher; `None` for the match-everything empty set.
    matcher: Option<Override>,
}

impl Pathspec {
    /// Compile a pattern set. Fails fast on a malformed glob.
    pub fn new<I, S>(patterns: I) -> SourceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        if patterns.is_empty() {
            return Ok(Self {
                patterns,
                matcher: None,
            });
        }
        let mut builder = OverrideBuilder::new("");
        for pattern in &patterns {
            builder
                .add(pattern)
                .map_err(|e| SourceError::InvalidPathspec {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            // A pattern naming a directory also selects its whole subtree.
            if !pattern.starts_with('!') {
                let subtree = format!("{}/**", pattern.trim_end_matches('/'));
                builder
                    .add(&subtree)
                    .map_err(|e| SourceError::InvalidPathspec {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })?;
            }
        }
        let matcher = builder.build().map_err(|e| SourceError::InvalidPathspec {
            pattern: patterns.join(" "),
            reason: e.to_string(),
        })?;
        Ok(Self {
            patterns,
            matcher: Some(matcher),
        })
    }

    /// The empty pathspec (matches everything).
    pub fn all() -> Self {
        Self {
            patterns: Vec::new(),
            matcher: None,
        }
    }

    /// Returns `true` if no patterns were given.
    pub fn matches_all(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `path` is selected by this pathspec.
    pub fn contains(&self, path: &str) -> bool {
        match &self.matcher {
            None => true,
            Some(matcher) => matcher.matched(path, false).is_whitelist(),
        }
    }

    /// The original patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for Pathspec {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for Pathspec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pathspec")
            .field("patterns", &self.patterns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pathspec_matches_everything() {
        let spec = Pathspec::all();
        assert!(spec.matches_all());
        assert!(spec.contains("anything/at/all.txt"));
    }

    #[test]
    fn glob_patterns_select_files() {
        let spec = Pathspec::new(["*.txt"]).unwrap();
        assert!(spec.contains("notes.txt"));
        assert!(spec.contains("sub/dir/notes.txt"));
        assert!(!spec.contains("image.png"));
    }

    #[test]
    fn directory_name_selects_subtree() {
        let spec = Pathspec::new(["subdir"]).unwrap();
        assert!(spec.contains("subdir/file.txt"));
        assert!(spec.contains("subdir/nested/deeper.txt"));
        assert!(!spec.contains("other/file.txt"));
    }

    #[test]
    fn negated_patterns_exclude() {
        let spec = Pathspec::new(["*.txt", "!secret.txt"]).unwrap();
        assert!(spec.contains("notes.txt"));
        assert!(!spec.contains("secret.txt"));
    }

    #[test]
    fn malformed_glob_is_rejected() {
        let err = Pathspec::new(["a[".to_string()]).unwrap_err();
        assert!(matches!(err, SourceError::InvalidPathspec { .. }));
    }
}
