//! Unencrypted backups: entries mirrored as plain files and folders.

use crate::archive::EntryStats;
use crate::error::Result;
use crate::filter::PathFilter;
use crate::walker::WalkEvent;
use crate::walker::walk_entry;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Copies the entry at `source` to `dest`, applying `filter`.
///
/// A single file is copied to `dest` itself; a directory is recreated at
/// `dest` with its included children. Permission bits are preserved.
///
/// # Errors
///
/// Returns `NotFound` if `source` is missing, or the first I/O error.
pub fn copy_tree(source: &Path, dest: &Path, filter: &PathFilter) -> Result<EntryStats> {
    let mut stats = EntryStats::default();

    if source.is_dir() {
        fs::create_dir_all(dest)?;
    }

    walk_entry(source, filter, |event| {
        match event {
            WalkEvent::Dir { relative } => fs::create_dir_all(dest.join(relative))?,
            WalkEvent::File { source, relative } => {
                let target = if relative.as_os_str().is_empty() {
                    dest.to_path_buf()
                } else {
                    dest.join(&relative)
                };
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let bytes = fs::copy(&source, &target)?;
                debug!(from = %source.display(), to = %target.display(), bytes, "copied");
                stats.files += 1;
                stats.bytes += bytes;
            }
        }
        Ok(())
    })?;

    Ok(stats)
}
