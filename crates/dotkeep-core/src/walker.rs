//! Filtered traversal of a file entry's source tree.
//!
//! Symlinks inside the tree are dereferenced. Paths reported to callers stay
//! relative to the entry root as the user sees it, even when traversal has
//! continued through a link into another part of the filesystem, so filter
//! rules keep matching the logical layout.

use crate::error::DotkeepError;
use crate::error::Result;
use crate::filter::FilterDecision;
use crate::filter::PathFilter;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::warn;
use walkdir::WalkDir;

/// What an entry's source path points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A regular file.
    RegularFile,

    /// A directory.
    Directory,

    /// A symbolic link; `target` is the fully resolved path, or `None` when
    /// the link dangles.
    Symlink {
        /// Canonical resolution target.
        target: Option<PathBuf>,
    },
}

impl SourceKind {
    /// Classifies `path` without following a final symlink.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `path` does not exist.
    pub fn resolve(path: &Path) -> Result<Self> {
        let meta = fs::symlink_metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DotkeepError::not_found(path)
            } else {
                DotkeepError::Io(e)
            }
        })?;

        let kind = if meta.file_type().is_symlink() {
            Self::Symlink {
                target: fs::canonicalize(path).ok(),
            }
        } else if meta.is_dir() {
            Self::Directory
        } else {
            Self::RegularFile
        };
        Ok(kind)
    }
}

/// An item produced by [`walk_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    /// An included directory below the root.
    Dir {
        /// Path relative to the entry root.
        relative: PathBuf,
    },

    /// An included regular file. `relative` is empty when the entry itself
    /// is a single file.
    File {
        /// Where to read the content from (symlinks already resolved).
        source: PathBuf,
        /// Path relative to the entry root.
        relative: PathBuf,
    },
}

/// Walks the entry rooted at `root`, calling `visit` for every included
/// directory and regular file, in file-name order.
///
/// Dangling symlinks and symlinks that lead back into their own ancestry are
/// skipped with a warning.
///
/// # Errors
///
/// Returns `NotFound` if `root` is missing, or the first error returned by
/// `visit` or the filesystem.
pub fn walk_entry<F>(root: &Path, filter: &PathFilter, mut visit: F) -> Result<()>
where
    F: FnMut(WalkEvent) -> Result<()>,
{
    match SourceKind::resolve(root)? {
        SourceKind::RegularFile => visit(WalkEvent::File {
            source: root.to_path_buf(),
            relative: PathBuf::new(),
        }),
        SourceKind::Directory => {
            let real = fs::canonicalize(root)?;
            let mut active = vec![real];
            walk_dir(root, Path::new(""), filter, &mut active, &mut visit)
        }
        SourceKind::Symlink { target: None } => {
            warn!(path = %root.display(), "skipping dangling symlink");
            Ok(())
        }
        SourceKind::Symlink {
            target: Some(target),
        } => {
            if target.is_dir() {
                let mut active = vec![target.clone()];
                walk_dir(&target, Path::new(""), filter, &mut active, &mut visit)
            } else {
                visit(WalkEvent::File {
                    source: target,
                    relative: PathBuf::new(),
                })
            }
        }
    }
}

/// Walks `dir`, whose logical location below the entry root is `prefix`.
/// `active` holds the real paths of every directory traversal is currently
/// inside through a root or a followed link.
fn walk_dir<F>(
    dir: &Path,
    prefix: &Path,
    filter: &PathFilter,
    active: &mut Vec<PathBuf>,
    visit: &mut F,
) -> Result<()>
where
    F: FnMut(WalkEvent) -> Result<()>,
{
    let mut entries = WalkDir::new(dir)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        let relative = match path.strip_prefix(dir) {
            Ok(rest) => prefix.join(rest),
            Err(_) => continue,
        };
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if filter.should_skip(&relative, true).is_skip() {
                debug!(path = %relative.display(), "skipping directory");
                entries.skip_current_dir();
                continue;
            }
            visit(WalkEvent::Dir { relative })?;
        } else if file_type.is_file() {
            if filter.should_skip(&relative, false) == FilterDecision::Include {
                visit(WalkEvent::File {
                    source: path.to_path_buf(),
                    relative,
                })?;
            } else {
                debug!(path = %relative.display(), "skipping file");
            }
        } else if file_type.is_symlink() {
            follow_link(path, relative, filter, active, visit)?;
        } else {
            debug!(path = %path.display(), "skipping special file");
        }
    }

    Ok(())
}

fn follow_link<F>(
    link: &Path,
    relative: PathBuf,
    filter: &PathFilter,
    active: &mut Vec<PathBuf>,
    visit: &mut F,
) -> Result<()>
where
    F: FnMut(WalkEvent) -> Result<()>,
{
    let Ok(target) = fs::canonicalize(link) else {
        warn!(path = %link.display(), "skipping dangling symlink");
        return Ok(());
    };

    if target.is_dir() {
        if is_cycle(link, &target, active) {
            warn!(
                path = %link.display(),
                target = %target.display(),
                "skipping symlink cycle"
            );
            return Ok(());
        }
        if filter.should_skip(&relative, true).is_skip() {
            debug!(path = %relative.display(), "skipping linked directory");
            return Ok(());
        }

        visit(WalkEvent::Dir {
            relative: relative.clone(),
        })?;
        active.push(target.clone());
        let result = walk_dir(&target, &relative, filter, active, visit);
        active.pop();
        result
    } else if filter.should_skip(&relative, false) == FilterDecision::Include {
        visit(WalkEvent::File {
            source: target,
            relative,
        })
    } else {
        debug!(path = %relative.display(), "skipping linked file");
        Ok(())
    }
}

/// A directory link is a cycle when its target contains the link itself or
/// any directory traversal is already inside.
fn is_cycle(link: &Path, target: &Path, active: &[PathBuf]) -> bool {
    let link_home = link
        .parent()
        .and_then(|parent| fs::canonicalize(parent).ok());

    link_home.is_some_and(|home| home.starts_with(target))
        || active.iter().any(|dir| dir.starts_with(target))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::recipe::FileEntry;
    use tempfile::TempDir;

    fn collect(root: &Path, filter: &PathFilter) -> Vec<WalkEvent> {
        let mut events = Vec::new();
        walk_entry(root, filter, |event| {
            events.push(event);
            Ok(())
        })
        .unwrap();
        events
    }

    fn file_paths(events: &[WalkEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                WalkEvent::File { relative, .. } => Some(relative.to_string_lossy().into_owned()),
                WalkEvent::Dir { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_single_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("vimrc");
        fs::write(&file, "set nu").unwrap();

        let events = collect(&file, &PathFilter::allow_all());
        assert_eq!(
            events,
            vec![WalkEvent::File {
                source: file,
                relative: PathBuf::new()
            }]
        );
    }

    #[test]
    fn test_directory_walk_ordered() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/c.txt"), "c").unwrap();

        let events = collect(root, &PathFilter::allow_all());
        assert_eq!(file_paths(&events), vec!["a.txt", "b.txt", "sub/c.txt"]);
        assert!(events.contains(&WalkEvent::Dir {
            relative: PathBuf::from("sub")
        }));
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let result = walk_entry(&temp.path().join("nope"), &PathFilter::allow_all(), |_| Ok(()));
        assert!(matches!(result, Err(DotkeepError::NotFound { .. })));
    }

    #[test]
    fn test_filter_skips_subtree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("cache")).unwrap();
        fs::write(root.join("cache/blob"), "x").unwrap();
        fs::write(root.join("init.vim"), "x").unwrap();

        let entry = FileEntry {
            exclude: vec!["^cache$".into()],
            ..FileEntry::new("nvim", "unused")
        };
        let events = collect(root, &PathFilter::new(&entry).unwrap());
        assert_eq!(file_paths(&events), vec!["init.vim"]);
        assert!(!events.iter().any(|e| matches!(e, WalkEvent::Dir { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_follows_links_with_logical_paths() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("real");
        let root = temp.path().join("root");
        fs::create_dir(&real).unwrap();
        fs::create_dir(&root).unwrap();
        fs::write(real.join("theme.lua"), "x").unwrap();
        std::os::unix::fs::symlink(&real, root.join("colors")).unwrap();
        std::os::unix::fs::symlink(real.join("theme.lua"), root.join("alias.lua")).unwrap();

        let events = collect(&root, &PathFilter::allow_all());
        assert_eq!(file_paths(&events), vec!["alias.lua", "colors/theme.lua"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_linked_root_directory() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("real");
        fs::create_dir(&real).unwrap();
        fs::write(real.join("config"), "x").unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let events = collect(&link, &PathFilter::allow_all());
        assert_eq!(file_paths(&events), vec!["config"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_cycle_and_dangling_skipped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/file"), "x").unwrap();
        std::os::unix::fs::symlink(&root, root.join("sub/loop")).unwrap();
        std::os::unix::fs::symlink(root.join("missing"), root.join("dangling")).unwrap();

        let events = collect(&root, &PathFilter::allow_all());
        assert_eq!(file_paths(&events), vec!["sub/file"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(temp.path().join("missing"), &link).unwrap();

        assert_eq!(
            SourceKind::resolve(&link).unwrap(),
            SourceKind::Symlink { target: None }
        );
        assert!(collect(&link, &PathFilter::allow_all()).is_empty());
    }

    #[test]
    fn test_visit_error_propagates() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "a").unwrap();
        let result = walk_entry(temp.path(), &PathFilter::allow_all(), |_| {
            Err(DotkeepError::InvalidArchive("stop".into()))
        });
        assert!(matches!(result, Err(DotkeepError::InvalidArchive(_))));
    }
}
