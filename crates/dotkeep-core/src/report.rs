//! Run reporting and progress callbacks.

use crate::archive::EntryStats;
use std::fmt;
use std::sync::mpsc::SyncSender;
use std::time::Duration;

/// Which operation a run performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Copying entries into the backup.
    Backup,

    /// Copying entries back from the backup.
    Restore,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
        })
    }
}

/// Whether a run covered the whole recipe or a named subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Every entry of the recipe.
    Full,

    /// Only the requested entries.
    Partial,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Full => "full",
            Self::Partial => "partial",
        })
    }
}

/// Summary of a finished run.
///
/// # Examples
///
/// ```
/// use dotkeep_core::report::{Operation, RunMode, RunReport};
///
/// let mut report = RunReport::new(Operation::Backup, RunMode::Full, false);
/// report.entries = 3;
/// report.files = 12;
/// report.bytes = 2048;
/// assert_eq!(report.to_string(), "backup (full): 3 entries, 12 files, 2048 bytes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Operation performed.
    pub operation: Operation,

    /// Full or partial run.
    pub mode: RunMode,

    /// Whether the backup is encrypted.
    pub encrypted: bool,

    /// Number of entries processed.
    pub entries: usize,

    /// Number of regular files copied, archived or unpacked.
    pub files: usize,

    /// Payload bytes moved, including command output.
    pub bytes: u64,

    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl RunReport {
    /// Creates an empty report.
    #[must_use]
    pub const fn new(operation: Operation, mode: RunMode, encrypted: bool) -> Self {
        Self {
            operation,
            mode,
            encrypted,
            entries: 0,
            files: 0,
            bytes: 0,
            duration: Duration::ZERO,
        }
    }

    /// Adds the counters of one file entry.
    pub fn add_entry_stats(&mut self, stats: EntryStats) {
        self.files += stats.files;
        self.bytes += stats.bytes;
    }

    /// Adds the payload size of one command entry.
    pub fn add_command_output(&mut self, len: usize) {
        self.bytes += len as u64;
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} entries, {} files, {} bytes",
            self.operation, self.mode, self.entries, self.files, self.bytes
        )
    }
}

/// A progress notification, published before each entry is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// 1-based position of the entry in the run.
    pub count: usize,

    /// Number of entries in the run.
    pub total: usize,

    /// Entry name.
    pub name: String,
}

/// Callback trait for progress reporting during a run.
///
/// The trait requires `Send` so a run can execute on a worker thread.
///
/// # Examples
///
/// ```
/// use dotkeep_core::report::ProgressCallback;
///
/// struct PrintProgress;
///
/// impl ProgressCallback for PrintProgress {
///     fn on_entry_start(&mut self, name: &str, total: usize, current: usize) {
///         println!("[{current}/{total}] {name}");
///     }
///
///     fn on_entry_complete(&mut self, _name: &str) {}
///
///     fn on_complete(&mut self) {}
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called before an entry is processed. `current` is 1-based and runs
    /// across files then commands.
    fn on_entry_start(&mut self, name: &str, total: usize, current: usize);

    /// Called after an entry was processed successfully.
    fn on_entry_complete(&mut self, name: &str);

    /// Called once after the last entry.
    fn on_complete(&mut self);
}

/// Progress callback that ignores every notification.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry_start(&mut self, _name: &str, _total: usize, _current: usize) {}

    fn on_entry_complete(&mut self, _name: &str) {}

    fn on_complete(&mut self) {}
}

/// Publishes [`ProgressEvent`]s on a bounded channel.
///
/// Dropping this value drops the sender, which is how consumers learn the
/// run is over.
#[derive(Debug)]
pub struct ChannelProgress {
    sender: SyncSender<ProgressEvent>,
}

impl ChannelProgress {
    /// Wraps the sending half of a channel.
    #[must_use]
    pub const fn new(sender: SyncSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgress {
    fn on_entry_start(&mut self, name: &str, total: usize, current: usize) {
        // A consumer that stopped listening must not abort the run.
        let _ = self.sender.send(ProgressEvent {
            count: current,
            total,
            name: name.to_string(),
        });
    }

    fn on_entry_complete(&mut self, _name: &str) {}

    fn on_complete(&mut self) {}
}
