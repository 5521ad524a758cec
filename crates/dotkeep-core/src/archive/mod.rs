//! Sequential named-blob container used for encrypted backups.
//!
//! An archive is an ordered list of `(path, payload)` records framed as tar.
//! Lookups are linear scans; [`MergeSet`] provides the name index needed to
//! refresh part of an existing archive.

mod codec;
mod merge;

pub use codec::ArchiveReader;
pub use codec::ArchiveWriter;
pub use codec::EntryStats;
pub use merge::MergeSet;

use crate::error::Result;

/// One archive record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Record path: a top-level entry name, optionally followed by
    /// `/relative/path`.
    pub path: String,

    /// Record content.
    pub payload: Vec<u8>,
}

impl Record {
    /// Creates a record.
    pub fn new(path: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            payload,
        }
    }

    /// The top-level entry name this record belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// use dotkeep_core::archive::Record;
    ///
    /// assert_eq!(Record::new("fish/config.fish", vec![]).top_level(), "fish");
    /// assert_eq!(Record::new("brew", vec![]).top_level(), "brew");
    /// ```
    #[must_use]
    pub fn top_level(&self) -> &str {
        self.path.split('/').next().unwrap_or(&self.path)
    }

    /// Returns whether this record is `name` itself or lies below it.
    #[must_use]
    pub fn is_under(&self, name: &str) -> bool {
        self.path == name
            || self
                .path
                .strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Destination for records streamed out of an archive.
pub trait RecordSink {
    /// Accepts one record.
    fn push_record(&mut self, record: Record) -> Result<()>;
}

impl RecordSink for Vec<Record> {
    fn push_record(&mut self, record: Record) -> Result<()> {
        self.push(record);
        Ok(())
    }
}
