//! Running a backup or restore on a dedicated thread.
//!
//! The worker publishes [`ProgressEvent`]s on a bounded channel and drops the
//! sender when the run ends, successfully or not. Consumers read events until
//! the channel closes, then [`RunHandle::join`] the worker for its result.

use crate::engine::Engine;
use crate::engine::PasswordProvider;
use crate::error::DotkeepError;
use crate::error::Result;
use crate::recipe::RecipeStore;
use crate::report::ChannelProgress;
use crate::report::Operation;
use crate::report::ProgressEvent;
use crate::report::RunReport;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::sync_channel;
use std::thread::JoinHandle;

/// Number of progress events buffered before the worker blocks.
pub const PROGRESS_CAPACITY: usize = 16;

/// A run executing on a worker thread.
#[derive(Debug)]
pub struct RunHandle {
    events: Receiver<ProgressEvent>,
    worker: JoinHandle<Result<RunReport>>,
}

impl RunHandle {
    /// Progress events; the iterator ends when the run is over.
    #[must_use]
    pub const fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Drains any remaining events and waits for the run's result.
    ///
    /// # Errors
    ///
    /// Returns the run's error, or `Io` if the worker panicked.
    pub fn join(self) -> Result<RunReport> {
        for _ in self.events.iter() {}
        self.worker
            .join()
            .map_err(|_| DotkeepError::Io(std::io::Error::other("worker thread panicked")))?
    }
}

/// Starts `operation` on a new thread.
///
/// # Errors
///
/// Returns `Io` if the thread cannot be spawned.
pub fn spawn<S, P>(
    engine: Engine,
    operation: Operation,
    store: S,
    names: Vec<String>,
    mut passwords: P,
) -> Result<RunHandle>
where
    S: RecipeStore + Send + 'static,
    P: PasswordProvider + 'static,
{
    let (sender, events) = sync_channel(PROGRESS_CAPACITY);

    let worker = std::thread::Builder::new()
        .name(format!("dotkeep-{operation}"))
        .spawn(move || {
            // Owned here so the channel closes exactly when the run returns.
            let mut progress = ChannelProgress::new(sender);
            let names = names.as_slice();
            match operation {
                Operation::Backup => engine.backup(&store, names, &mut passwords, &mut progress),
                Operation::Restore => engine.restore(&store, names, &mut passwords, &mut progress),
            }
        })?;

    Ok(RunHandle { events, worker })
}
