//! Per-entry path filtering.
//!
//! A [`PathFilter`] is built once from a [`FileEntry`]'s `only` and
//! `exclude` lists and then consulted for every path below the entry root.
//! Paths are always relative to the entry root as written in the recipe.

use crate::error::DotkeepError;
use crate::error::Result;
use crate::recipe::FileEntry;
use regex::Regex;
use std::collections::HashSet;
use std::path::Component;
use std::path::Path;

/// Outcome of a filter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Keep the path.
    Include,

    /// Drop this file.
    Skip,

    /// Drop this directory and everything below it.
    SkipSubtree,
}

impl FilterDecision {
    /// Returns `true` for either skip variant.
    #[must_use]
    pub const fn is_skip(self) -> bool {
        !matches!(self, Self::Include)
    }

    const fn skip(is_directory: bool) -> Self {
        if is_directory {
            Self::SkipSubtree
        } else {
            Self::Skip
        }
    }
}

/// Compiled `only` / `exclude` rules for one entry.
#[derive(Debug, Clone)]
pub struct PathFilter {
    only: HashSet<String>,
    exclude: Vec<Regex>,
}

impl PathFilter {
    /// Compiles the filter for `entry`.
    ///
    /// # Errors
    ///
    /// Returns `ConflictingFilters` when both lists are populated and
    /// `FilterCompile` for an invalid exclude pattern.
    pub fn new(entry: &FileEntry) -> Result<Self> {
        let only: HashSet<String> = entry
            .only
            .iter()
            .filter(|name| !name.is_empty())
            .cloned()
            .collect();

        if !only.is_empty() && !entry.exclude.is_empty() {
            return Err(DotkeepError::ConflictingFilters {
                name: entry.name.clone(),
            });
        }

        let exclude = entry
            .exclude
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| DotkeepError::FilterCompile {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { only, exclude })
    }

    /// A filter that keeps everything.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            only: HashSet::new(),
            exclude: Vec::new(),
        }
    }

    /// Decides whether `relative` (relative to the entry root) is skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use dotkeep_core::filter::{FilterDecision, PathFilter};
    /// use dotkeep_core::recipe::FileEntry;
    /// use std::path::Path;
    ///
    /// let entry = FileEntry {
    ///     exclude: vec!["fish_variables".into()],
    ///     ..FileEntry::new("fish", "~/.config/fish")
    /// };
    /// let filter = PathFilter::new(&entry).unwrap();
    ///
    /// assert_eq!(filter.should_skip(Path::new(""), true), FilterDecision::Include);
    /// assert_eq!(
    ///     filter.should_skip(Path::new("fish_variables"), false),
    ///     FilterDecision::Skip
    /// );
    /// assert_eq!(
    ///     filter.should_skip(Path::new("config.fish"), false),
    ///     FilterDecision::Include
    /// );
    /// ```
    #[must_use]
    pub fn should_skip(&self, relative: &Path, is_directory: bool) -> FilterDecision {
        if relative.as_os_str().is_empty() {
            return FilterDecision::Include;
        }

        if !self.only.is_empty() {
            let top = relative.components().find_map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            });
            return match top {
                Some(name) if self.only.contains(name) => FilterDecision::Include,
                _ => FilterDecision::skip(is_directory),
            };
        }

        if !self.exclude.is_empty() {
            let normalized = to_slash(relative);
            if self.exclude.iter().any(|re| re.is_match(&normalized)) {
                return FilterDecision::skip(is_directory);
            }
        }

        FilterDecision::Include
    }
}

/// Renders a relative path with `/` separators.
pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn only(names: &[&str]) -> PathFilter {
        let entry = FileEntry {
            only: names.iter().map(ToString::to_string).collect(),
            ..FileEntry::new("ssh", "~/.ssh")
        };
        PathFilter::new(&entry).unwrap()
    }

    fn exclude(patterns: &[&str]) -> PathFilter {
        let entry = FileEntry {
            exclude: patterns.iter().map(ToString::to_string).collect(),
            ..FileEntry::new("nvim", "~/.config/nvim")
        };
        PathFilter::new(&entry).unwrap()
    }

    #[test]
    fn test_root_never_skipped() {
        assert_eq!(only(&["x"]).should_skip(Path::new(""), true), FilterDecision::Include);
        assert_eq!(exclude(&[".*"]).should_skip(Path::new(""), true), FilterDecision::Include);
    }

    #[test]
    fn test_only_matches_top_level_component() {
        let filter = only(&["config", "keys"]);

        assert_eq!(filter.should_skip(Path::new("config"), false), FilterDecision::Include);
        assert_eq!(filter.should_skip(Path::new("keys"), true), FilterDecision::Include);
        assert_eq!(filter.should_skip(Path::new("keys/id_ed25519"), false), FilterDecision::Include);
        assert_eq!(filter.should_skip(Path::new("known_hosts"), false), FilterDecision::Skip);
        assert_eq!(filter.should_skip(Path::new("sockets"), true), FilterDecision::SkipSubtree);
        // A nested `config` under another top-level dir is not allowed.
        assert_eq!(filter.should_skip(Path::new("other/config"), false), FilterDecision::Skip);
    }

    #[test]
    fn test_only_ignores_empty_names() {
        let filter = only(&[""]);
        assert_eq!(filter.should_skip(Path::new("anything"), false), FilterDecision::Include);
    }

    #[test]
    fn test_exclude_is_unanchored() {
        let filter = exclude(&["\\.log$", "cache"]);

        assert_eq!(filter.should_skip(Path::new("lsp.log"), false), FilterDecision::Skip);
        assert_eq!(filter.should_skip(Path::new("a/b/lsp.log"), false), FilterDecision::Skip);
        assert_eq!(filter.should_skip(Path::new("plugin/cache"), true), FilterDecision::SkipSubtree);
        assert_eq!(filter.should_skip(Path::new("init.vim"), false), FilterDecision::Include);
    }

    #[test]
    fn test_exclude_sees_forward_slashes() {
        let filter = exclude(&["^lua/plugins/"]);
        assert!(filter.should_skip(Path::new("lua/plugins/x.lua"), false).is_skip());
        assert!(!filter.should_skip(Path::new("lua/init.lua"), false).is_skip());
    }

    #[test]
    fn test_invalid_pattern() {
        let entry = FileEntry {
            exclude: vec!["(".into()],
            ..FileEntry::new("bad", "~/bad")
        };
        let err = PathFilter::new(&entry).unwrap_err();
        assert!(matches!(err, DotkeepError::FilterCompile { pattern, .. } if pattern == "("));
    }

    #[test]
    fn test_conflicting_filters() {
        let entry = FileEntry {
            only: vec!["a".into()],
            exclude: vec!["b".into()],
            ..FileEntry::new("both", "~/both")
        };
        assert!(matches!(
            PathFilter::new(&entry),
            Err(DotkeepError::ConflictingFilters { .. })
        ));
    }

    #[test]
    fn test_allow_all() {
        let filter = PathFilter::allow_all();
        assert_eq!(filter.should_skip(Path::new("a/b/c"), false), FilterDecision::Include);
    }

    #[test]
    fn test_to_slash() {
        assert_eq!(to_slash(Path::new("a/b/c")), "a/b/c");
        assert_eq!(to_slash(Path::new("./a")), "a");
    }
}
