//! Progress bar for backup and restore runs.

use console::Term;
use dotkeep_core::Operation;
use dotkeep_core::ProgressEvent;
use indicatif::ProgressBar;
use indicatif::ProgressStyle;

/// Progress bar fed from a run's event stream.
///
/// The bar is created on the first event, so a password prompt issued
/// before any entry is processed is not drawn over. Cleans up on drop.
pub struct CliProgress {
    bar: Option<ProgressBar>,
    verb: &'static str,
}

impl CliProgress {
    #[must_use]
    pub const fn new(operation: Operation) -> Self {
        let verb = match operation {
            Operation::Backup => "Backing up",
            Operation::Restore => "Restoring",
        };
        Self { bar: None, verb }
    }

    /// Checks if we should show progress (TTY detection).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stdout().is_term()
    }

    /// Moves the bar to the entry announced by `event`.
    pub fn update(&mut self, event: &ProgressEvent) {
        let bar = self.bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(event.total as u64);
            // Template: "Backing up fish [████████░░░░] 2/5"
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓░"),
            );
            bar
        });

        bar.set_length(event.total as u64);
        bar.set_position(event.count.saturating_sub(1) as u64);
        bar.set_message(format!("{} {}", self.verb, event.name));
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
