//! Tar framing for archive records.

use super::Record;
use super::RecordSink;
use crate::atomic::write_private;
use crate::error::DotkeepError;
use crate::error::Result;
use crate::filter::PathFilter;
use crate::filter::to_slash;
use crate::walker::WalkEvent;
use crate::walker::walk_entry;
use std::fs;
use std::io::Cursor;
use std::io::Read;
use std::path::Component;
use std::path::Path;
use tar::Archive;
use tar::Builder;
use tar::Header;
use tracing::debug;

/// Mode of every record written to an archive.
const RECORD_MODE: u32 = 0o600;

/// Counters for files added from or unpacked to the filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryStats {
    /// Number of regular files.
    pub files: usize,

    /// Total payload bytes.
    pub bytes: u64,
}

impl EntryStats {
    fn record(&mut self, len: usize) {
        self.files += 1;
        self.bytes += len as u64;
    }
}

/// Append-only archive builder over an in-memory buffer.
pub struct ArchiveWriter {
    builder: Builder<Vec<u8>>,
    records: usize,
}

impl ArchiveWriter {
    /// Creates an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builder: Builder::new(Vec::new()),
            records: 0,
        }
    }

    /// Number of records appended so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records
    }

    /// Returns whether no records have been appended.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Appends one record. Paths longer than the classic tar limit are
    /// stored with GNU long-name extensions.
    pub fn add_payload(&mut self, path: &str, payload: &[u8]) -> Result<()> {
        let mut header = Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(RECORD_MODE);
        header.set_entry_type(tar::EntryType::Regular);

        self.builder.append_data(&mut header, path, payload)?;
        self.records += 1;
        Ok(())
    }

    /// Adds the file or directory at `source` under `name`.
    ///
    /// A single file becomes one record named `name`. A directory becomes one
    /// record `name/<relative path>` per included regular file.
    pub fn add_entry(&mut self, name: &str, source: &Path, filter: &PathFilter) -> Result<EntryStats> {
        let mut stats = EntryStats::default();

        walk_entry(source, filter, |event| {
            let WalkEvent::File { source, relative } = event else {
                return Ok(());
            };
            let path = if relative.as_os_str().is_empty() {
                name.to_string()
            } else {
                format!("{name}/{}", to_slash(&relative))
            };

            let content = fs::read(&source)?;
            debug!(record = %path, size = content.len(), "adding record");
            self.add_payload(&path, &content)?;
            stats.record(content.len());
            Ok(())
        })?;

        Ok(stats)
    }

    /// Finishes the archive and returns its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.builder.into_inner()?)
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordSink for ArchiveWriter {
    fn push_record(&mut self, record: Record) -> Result<()> {
        self.add_payload(&record.path, &record.payload)
    }
}

/// Sequential reader over archive bytes.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveReader<'a> {
    data: &'a [u8],
}

impl<'a> ArchiveReader<'a> {
    /// Wraps archive bytes.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Calls `f` for each record in order until it returns `false`.
    fn scan<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(Record) -> Result<bool>,
    {
        let mut archive = Archive::new(Cursor::new(self.data));
        let entries = archive.entries().map_err(invalid)?;

        for entry in entries {
            let mut entry = entry.map_err(invalid)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let mut payload = Vec::new();
            entry.read_to_end(&mut payload).map_err(invalid)?;

            if !f(Record { path, payload })? {
                break;
            }
        }
        Ok(())
    }

    /// Every record, in order.
    pub fn records(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        self.scan(|record| {
            records.push(record);
            Ok(true)
        })?;
        Ok(records)
    }

    /// Payload of the first record whose path is exactly `name`.
    pub fn read_payload(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut found = None;
        self.scan(|record| {
            if record.path == name {
                found = Some(record.payload);
                return Ok(false);
            }
            Ok(true)
        })?;
        Ok(found)
    }

    /// Streams every record not under one of `excluded` into `dest`.
    /// Returns the number of records copied.
    pub fn copy_forward<S, N>(&self, dest: &mut S, excluded: &[N]) -> Result<usize>
    where
        S: RecordSink + ?Sized,
        N: AsRef<str>,
    {
        let mut copied = 0;
        self.scan(|record| {
            if excluded.iter().any(|name| record.is_under(name.as_ref())) {
                return Ok(true);
            }
            dest.push_record(record)?;
            copied += 1;
            Ok(true)
        })?;
        Ok(copied)
    }

    /// Writes every record under `root_name` into `dest`, stripping the
    /// `root_name` prefix. A record named exactly `root_name` is written to
    /// `dest` itself. Files are created with mode 0600.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArchive` if a record path would land outside `dest`.
    pub fn unpack_all(&self, root_name: &str, dest: &Path) -> Result<EntryStats> {
        let mut stats = EntryStats::default();

        self.scan(|record| {
            let target = if record.path == root_name {
                dest.to_path_buf()
            } else if let Some(rest) = record
                .path
                .strip_prefix(root_name)
                .and_then(|rest| rest.strip_prefix('/'))
            {
                let rest = Path::new(rest);
                if !rest.components().all(|c| matches!(c, Component::Normal(_))) {
                    return Err(DotkeepError::InvalidArchive(format!(
                        "record {} escapes its entry",
                        record.path
                    )));
                }
                dest.join(rest)
            } else {
                return Ok(true);
            };

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            write_private(&target, &record.payload)?;
            stats.record(record.payload.len());
            Ok(true)
        })?;

        Ok(stats)
    }
}

fn invalid(e: std::io::Error) -> DotkeepError {
    DotkeepError::InvalidArchive(e.to_string())
}
