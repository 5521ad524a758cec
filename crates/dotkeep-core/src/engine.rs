//! Backup and restore orchestration.
//!
//! A run moves through `Init → Selecting → PlainSync | EncryptedSync →
//! Finalizing → Done`; the first error moves it to `Failed` and is returned
//! unchanged. Every transition is traced at debug level.

use crate::archive::ArchiveReader;
use crate::archive::ArchiveWriter;
use crate::archive::EntryStats;
use crate::archive::MergeSet;
use crate::archive::Record;
use crate::atomic::PendingSwap;
use crate::atomic::remove_path;
use crate::command::ShellRunner;
use crate::config::RunConfig;
use crate::crypto;
use crate::error::DotkeepError;
use crate::error::Result;
use crate::filter::PathFilter;
use crate::plain::copy_tree;
use crate::recipe::Recipe;
use crate::recipe::RecipeStore;
use crate::report::Operation;
use crate::report::ProgressCallback;
use crate::report::RunMode;
use crate::report::RunReport;
use crate::selection::Selection;
use crate::selection::select;
use crate::symlinks;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;
use tracing::info;
use zeroize::Zeroizing;

/// Source of the encryption password.
///
/// Only consulted when the run is encrypted.
pub trait PasswordProvider: Send {
    /// Returns the password. `confirm` is set for backups, where a typo
    /// would lock the user out of the new archive.
    ///
    /// # Errors
    ///
    /// Returns `PasswordRequired` when no password is available and
    /// `PasswordMismatch` when a confirmation differs.
    fn password(&mut self, confirm: bool) -> Result<Zeroizing<String>>;
}

/// A password known up front.
#[derive(Debug, Clone)]
pub struct StaticPassword(Zeroizing<String>);

impl StaticPassword {
    /// Wraps `password`.
    pub fn new(password: impl Into<String>) -> Self {
        Self(Zeroizing::new(password.into()))
    }
}

impl PasswordProvider for StaticPassword {
    fn password(&mut self, _confirm: bool) -> Result<Zeroizing<String>> {
        Ok(self.0.clone())
    }
}

/// Provider for runs that must not be encrypted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPassword;

impl PasswordProvider for NoPassword {
    fn password(&mut self, _confirm: bool) -> Result<Zeroizing<String>> {
        Err(DotkeepError::PasswordRequired)
    }
}

#[derive(Debug, Clone, Copy)]
enum RunState {
    Init,
    Selecting,
    PlainSync,
    EncryptedSync,
    Finalizing,
    Done,
    Failed,
}

/// Counts entries across files then commands and forwards them to the
/// progress callback.
struct Steps<'a> {
    progress: &'a mut dyn ProgressCallback,
    total: usize,
    current: usize,
}

impl<'a> Steps<'a> {
    fn new(progress: &'a mut dyn ProgressCallback, total: usize) -> Self {
        Self {
            progress,
            total,
            current: 0,
        }
    }

    fn start(&mut self, name: &str) {
        self.current += 1;
        self.progress.on_entry_start(name, self.total, self.current);
    }

    fn complete(&mut self, name: &str) {
        self.progress.on_entry_complete(name);
    }

    fn finish(&mut self) {
        self.progress.on_complete();
    }
}

/// Runs backups and restores of a recipe.
#[derive(Debug, Clone)]
pub struct Engine {
    config: RunConfig,
    runner: ShellRunner,
}

impl Engine {
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate.
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let runner = ShellRunner::new(&config.shell);
        Ok(Self { config, runner })
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Location of the backup output for recipes held by `store`.
    pub fn output_path(&self, store: &dyn RecipeStore) -> PathBuf {
        store.base_dir().join(&self.config.output_name)
    }

    fn home(&self) -> Option<&Path> {
        self.config.home_dir.as_deref()
    }

    /// Backs up the entries named in `names`, or the whole recipe when
    /// `names` is empty.
    ///
    /// # Errors
    ///
    /// Returns the first error met. A failed full backup leaves the previous
    /// output in place; a failed partial plain backup keeps the entries
    /// already refreshed.
    pub fn backup<S: AsRef<str>>(
        &self,
        store: &dyn RecipeStore,
        names: &[S],
        passwords: &mut dyn PasswordProvider,
        progress: &mut dyn ProgressCallback,
    ) -> Result<RunReport> {
        info!(version = %self.config.version, "starting backup");
        let start = Instant::now();
        let result = self.backup_inner(store, names, passwords, progress);
        finish_run(result, start)
    }

    /// Restores the entries named in `names`, or the whole recipe when
    /// `names` is empty.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the backup or one of the selected entries is
    /// missing from it, `Authentication` for a wrong password, or the first
    /// filesystem or command error.
    pub fn restore<S: AsRef<str>>(
        &self,
        store: &dyn RecipeStore,
        names: &[S],
        passwords: &mut dyn PasswordProvider,
        progress: &mut dyn ProgressCallback,
    ) -> Result<RunReport> {
        info!(version = %self.config.version, "starting restore");
        let start = Instant::now();
        let result = self.restore_inner(store, names, passwords, progress);
        finish_run(result, start)
    }

    fn load_selection<S: AsRef<str>>(
        store: &dyn RecipeStore,
        names: &[S],
    ) -> Result<(Recipe, Selection)> {
        transition(RunState::Init);
        let recipe = store.load()?;

        transition(RunState::Selecting);
        recipe.validate()?;
        let selection = select(&recipe, names)?;
        debug!(mode = %selection.mode, entries = selection.len(), "entries selected");
        Ok((recipe, selection))
    }

    fn backup_inner<S: AsRef<str>>(
        &self,
        store: &dyn RecipeStore,
        names: &[S],
        passwords: &mut dyn PasswordProvider,
        progress: &mut dyn ProgressCallback,
    ) -> Result<RunReport> {
        let (recipe, selection) = Self::load_selection(store, names)?;
        let output = self.output_path(store);
        let encrypted = recipe.is_encrypted() || self.config.encrypt;

        let mut report = RunReport::new(Operation::Backup, selection.mode, encrypted);
        report.entries = selection.len();
        let mut steps = Steps::new(progress, selection.len());

        if encrypted {
            let password = passwords.password(true)?;
            transition(RunState::EncryptedSync);
            let plaintext =
                self.build_encrypted(&recipe, &selection, &output, &password, &mut steps, &mut report)?;

            let (key, salt) = crypto::derive_key(&password, "");
            let (ciphertext, nonce) = crypto::encrypt(&key, &plaintext)?;

            transition(RunState::Finalizing);
            let swap = PendingSwap::file(&output, &ciphertext)?;
            let updated = Recipe {
                encryption_key_salt: salt,
                encryption_nonce: nonce,
                ..recipe
            };
            store.save(&updated)?;
            swap.commit()?;
        } else {
            transition(RunState::PlainSync);
            match selection.mode {
                RunMode::Full => {
                    let swap = PendingSwap::directory(&output)?;
                    self.sync_plain(&selection, swap.path(), &mut steps, &mut report)?;
                    transition(RunState::Finalizing);
                    swap.commit()?;
                }
                RunMode::Partial => {
                    fs::create_dir_all(&output)?;
                    self.sync_plain(&selection, &output, &mut steps, &mut report)?;
                    transition(RunState::Finalizing);
                }
            }
        }

        steps.finish();
        Ok(report)
    }

    /// Mirrors each selected entry into `dest`, replacing what was there.
    fn sync_plain(
        &self,
        selection: &Selection,
        dest: &Path,
        steps: &mut Steps<'_>,
        report: &mut RunReport,
    ) -> Result<()> {
        for file in &selection.recipe.files {
            steps.start(&file.name);
            let source = file.resolve_path(self.home())?;
            let filter = PathFilter::new(file)?;
            let target = dest.join(&file.name);

            remove_path(&target)?;
            let stats = copy_tree(&source, &target, &filter)?;
            report.add_entry_stats(stats);
            steps.complete(&file.name);
        }

        for command in &selection.recipe.commands {
            steps.start(&command.name);
            let output = self.runner.capture(&command.backup)?;
            fs::write(dest.join(&command.name), &output)?;
            report.add_command_output(output.len());
            steps.complete(&command.name);
        }

        Ok(())
    }

    /// Builds the plaintext outer archive: records carried over from the
    /// previous backup for unselected names, then freshly generated records
    /// for the selection.
    fn build_encrypted(
        &self,
        recipe: &Recipe,
        selection: &Selection,
        output: &Path,
        password: &str,
        steps: &mut Steps<'_>,
        report: &mut RunReport,
    ) -> Result<Vec<u8>> {
        let mut merge = MergeSet::new();
        let selected = selection.names();

        if selection.mode == RunMode::Partial && recipe.is_encrypted() && output.is_file() {
            let ciphertext = fs::read(output)?;
            let (key, _) = crypto::derive_key(password, &recipe.encryption_key_salt);
            let previous = crypto::decrypt(&key, &recipe.encryption_nonce, &ciphertext)?;
            let carried = ArchiveReader::new(&previous).copy_forward(&mut merge, &selected)?;
            debug!(records = carried, "carried forward from previous backup");
        }

        for file in &selection.recipe.files {
            steps.start(&file.name);
            let source = file.resolve_path(self.home())?;
            let filter = PathFilter::new(file)?;

            let mut inner = ArchiveWriter::new();
            let stats = inner.add_entry(&file.name, &source, &filter)?;
            merge.replace(&file.name, vec![Record::new(&file.name, inner.finish()?)]);
            report.add_entry_stats(stats);
            steps.complete(&file.name);
        }

        for command in &selection.recipe.commands {
            steps.start(&command.name);
            let output = self.runner.capture(&command.backup)?;
            report.add_command_output(output.len());
            merge.replace(&command.name, vec![Record::new(&command.name, output)]);
            steps.complete(&command.name);
        }

        let order: Vec<&str> = recipe.entry_names().collect();
        let mut writer = ArchiveWriter::new();
        merge.write_to(&mut writer, &order)?;
        writer.finish()
    }

    fn restore_inner<S: AsRef<str>>(
        &self,
        store: &dyn RecipeStore,
        names: &[S],
        passwords: &mut dyn PasswordProvider,
        progress: &mut dyn ProgressCallback,
    ) -> Result<RunReport> {
        let (recipe, selection) = Self::load_selection(store, names)?;
        let output = self.output_path(store);
        let encrypted = recipe.is_encrypted();

        let mut report = RunReport::new(Operation::Restore, selection.mode, encrypted);
        report.entries = selection.len();
        let mut steps = Steps::new(progress, selection.len());

        if encrypted {
            transition(RunState::EncryptedSync);
            if !output.is_file() {
                return Err(DotkeepError::not_found(&output));
            }
            let ciphertext = fs::read(&output)?;
            let password = passwords.password(false)?;
            let (key, _) = crypto::derive_key(&password, &recipe.encryption_key_salt);
            let plaintext = crypto::decrypt(&key, &recipe.encryption_nonce, &ciphertext)?;
            self.restore_encrypted(&selection, &plaintext, &mut steps, &mut report)?;
        } else {
            transition(RunState::PlainSync);
            self.restore_plain(&selection, &output, &mut steps, &mut report)?;
        }

        transition(RunState::Finalizing);
        steps.finish();
        Ok(report)
    }

    fn restore_plain(
        &self,
        selection: &Selection,
        output: &Path,
        steps: &mut Steps<'_>,
        report: &mut RunReport,
    ) -> Result<()> {
        for file in &selection.recipe.files {
            steps.start(&file.name);
            let stored = output.join(&file.name);
            if fs::symlink_metadata(&stored).is_err() {
                return Err(DotkeepError::not_found(stored));
            }
            let target = file.resolve_path(self.home())?;
            let filter = PathFilter::new(file)?;

            remove_path(&target)?;
            let stats = copy_tree(&stored, &target, &filter)?;
            report.add_entry_stats(stats);
            symlinks::materialize(file, &target, self.home())?;
            steps.complete(&file.name);
        }

        for command in &selection.recipe.commands {
            steps.start(&command.name);
            let stored = output.join(&command.name);
            let payload = fs::read(&stored).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DotkeepError::not_found(&stored)
                } else {
                    DotkeepError::Io(e)
                }
            })?;
            self.runner.feed(&command.restore, &payload)?;
            report.add_command_output(payload.len());
            steps.complete(&command.name);
        }

        Ok(())
    }

    fn restore_encrypted(
        &self,
        selection: &Selection,
        plaintext: &[u8],
        steps: &mut Steps<'_>,
        report: &mut RunReport,
    ) -> Result<()> {
        let archive = ArchiveReader::new(plaintext);

        for file in &selection.recipe.files {
            steps.start(&file.name);
            let payload = stored_payload(&archive, &file.name)?;
            let target = file.resolve_path(self.home())?;

            remove_path(&target)?;
            let stats = ArchiveReader::new(&payload).unpack_all(&file.name, &target)?;
            if stats == EntryStats::default() {
                // A folder without files still comes back as a folder.
                fs::create_dir_all(&target)?;
            }
            report.add_entry_stats(stats);
            symlinks::materialize(file, &target, self.home())?;
            steps.complete(&file.name);
        }

        for command in &selection.recipe.commands {
            steps.start(&command.name);
            let payload = stored_payload(&archive, &command.name)?;
            self.runner.feed(&command.restore, &payload)?;
            report.add_command_output(payload.len());
            steps.complete(&command.name);
        }

        Ok(())
    }
}

fn stored_payload(archive: &ArchiveReader<'_>, name: &str) -> Result<Vec<u8>> {
    archive
        .read_payload(name)?
        .ok_or_else(|| DotkeepError::not_found(name))
}

fn transition(state: RunState) {
    debug!(?state, "run state");
}

fn finish_run(result: Result<RunReport>, start: Instant) -> Result<RunReport> {
    match result {
        Ok(mut report) => {
            report.duration = start.elapsed();
            transition(RunState::Done);
            info!(%report, "run finished");
            Ok(report)
        }
        Err(e) => {
            transition(RunState::Failed);
            debug!(error = %e, "run failed");
            Err(e)
        }
    }
}
