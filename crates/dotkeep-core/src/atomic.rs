//! Write-aside-then-rename replacement of backup outputs.

use crate::error::Result;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;

/// A temporary sibling of `target` that replaces it on [`commit`].
///
/// The temporary path is removed on drop unless committed, so an aborted
/// run leaves the previous output untouched.
///
/// [`commit`]: PendingSwap::commit
#[derive(Debug)]
pub struct PendingSwap {
    temp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl PendingSwap {
    /// Prepares a staging directory `<target>-tmp`, clearing any leftover
    /// from an earlier aborted run.
    pub fn directory(target: &Path) -> Result<Self> {
        let swap = Self::new(target, "-tmp");
        remove_path(&swap.temp)?;
        fs::create_dir_all(&swap.temp)?;
        Ok(swap)
    }

    /// Writes `content` to `<target>.tmp`, readable by the owner only.
    pub fn file(target: &Path, content: &[u8]) -> Result<Self> {
        let swap = Self::new(target, ".tmp");
        remove_path(&swap.temp)?;
        write_private(&swap.temp, content)?;
        Ok(swap)
    }

    fn new(target: &Path, suffix: &str) -> Self {
        let mut temp = target.as_os_str().to_os_string();
        temp.push(suffix);
        Self {
            temp: PathBuf::from(temp),
            target: target.to_path_buf(),
            committed: false,
        }
    }

    /// The temporary path being prepared.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.temp
    }

    /// Replaces the target with the temporary path.
    ///
    /// A file target is overwritten by the rename itself; a directory or a
    /// target of a different kind is removed first.
    pub fn commit(mut self) -> Result<()> {
        if !same_kind(&self.temp, &self.target) {
            remove_path(&self.target)?;
        }
        fs::rename(&self.temp, &self.target)?;
        self.committed = true;
        debug!(target = %self.target.display(), "output replaced");
        Ok(())
    }
}

impl Drop for PendingSwap {
    fn drop(&mut self) {
        if !self.committed {
            let _ = remove_path(&self.temp);
        }
    }
}

/// Whether a rename of `temp` onto `target` can replace it in one step.
fn same_kind(temp: &Path, target: &Path) -> bool {
    match (fs::symlink_metadata(temp), fs::symlink_metadata(target)) {
        (Ok(temp), Ok(target)) => temp.is_file() && target.is_file(),
        _ => false,
    }
}

/// Writes `content` to a new or truncated file with mode 0600.
#[cfg(unix)]
pub(crate) fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(content)?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(content)?;
    Ok(())
}

/// Removes a file, symlink or directory tree. A missing path is not an
/// error.
pub fn remove_path(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path)?,
        Ok(_) => fs::remove_file(path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
