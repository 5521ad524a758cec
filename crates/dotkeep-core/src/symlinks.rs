//! Recreating an entry's declared symlinks after a restore.

use crate::error::Result;
use crate::recipe::FileEntry;
use crate::recipe::expand_home;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;

/// Creates every `(link_name, link_target)` symlink of `entry`: a link at
/// `link_target` pointing to `<restored>/<link_name>`.
///
/// An existing symlink at the link location is replaced. Any other existing
/// file there is an error. Returns the number of links created.
pub fn materialize(entry: &FileEntry, restored: &Path, home: Option<&Path>) -> Result<usize> {
    for (link_name, link_target) in &entry.symlinks {
        let link = expand_home(link_target, home)?;
        let pointee = pointee(restored, link_name);

        match fs::symlink_metadata(&link) {
            Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(&link)?,
            Ok(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("cannot create symlink {}: file exists", link.display()),
                )
                .into());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent)?;
        }
        create_link(&pointee, &link)?;
        debug!(link = %link.display(), pointee = %pointee.display(), "symlink created");
    }

    Ok(entry.symlinks.len())
}

fn pointee(restored: &Path, link_name: &str) -> PathBuf {
    match link_name {
        "" | "." => restored.to_path_buf(),
        name => restored.join(name),
    }
}

#[cfg(unix)]
fn create_link(pointee: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(pointee, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_link(_pointee: &Path, link: &Path) -> Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("cannot create symlink {}: unsupported platform", link.display()),
    )
    .into())
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::DotkeepError;
    use tempfile::TempDir;

    fn neovim() -> FileEntry {
        FileEntry {
            symlinks: vec![
                (".".into(), "~/.neovim".into()),
                ("init.vim".into(), "~/.vimrc".into()),
            ],
            ..FileEntry::new("neovim", "~/.config/nvim")
        }
    }

    #[test]
    fn test_creates_links() {
        let home = TempDir::new().unwrap();
        let restored = home.path().join(".config/nvim");
        fs::create_dir_all(&restored).unwrap();
        fs::write(restored.join("init.vim"), "set nu").unwrap();

        let created = materialize(&neovim(), &restored, Some(home.path())).unwrap();
        assert_eq!(created, 2);
        assert_eq!(fs::read_link(home.path().join(".neovim")).unwrap(), restored);
        assert_eq!(
            fs::read_to_string(home.path().join(".vimrc")).unwrap(),
            "set nu"
        );
    }

    #[test]
    fn test_replaces_existing_symlink() {
        let home = TempDir::new().unwrap();
        let restored = home.path().join("nvim");
        fs::create_dir_all(&restored).unwrap();
        std::os::unix::fs::symlink("/nowhere", home.path().join(".neovim")).unwrap();

        let entry = FileEntry {
            symlinks: vec![(".".into(), "~/.neovim".into())],
            ..FileEntry::new("neovim", "~/nvim")
        };
        materialize(&entry, &restored, Some(home.path())).unwrap();
        assert_eq!(fs::read_link(home.path().join(".neovim")).unwrap(), restored);
    }

    #[test]
    fn test_refuses_to_clobber_regular_file() {
        let home = TempDir::new().unwrap();
        fs::write(home.path().join(".vimrc"), "mine").unwrap();

        let err = materialize(&neovim(), &home.path().join("nvim"), Some(home.path())).unwrap_err();
        assert!(matches!(err, DotkeepError::Io(e) if e.kind() == std::io::ErrorKind::AlreadyExists));
        assert_eq!(fs::read_to_string(home.path().join(".vimrc")).unwrap(), "mine");
    }
}
