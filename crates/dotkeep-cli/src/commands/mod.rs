//! Subcommand implementations.

pub mod add;
pub mod backup;
pub mod completion;
pub mod init;
pub mod list;
pub mod remove;
pub mod restore;

use crate::error::add_recipe_context;
use crate::output::OutputFormatter;
use crate::password::TerminalPassword;
use crate::progress::CliProgress;
use anyhow::Result;
use dotkeep_core::Engine;
use dotkeep_core::Operation;
use dotkeep_core::RunConfig;
use dotkeep_core::TomlRecipeStore;
use dotkeep_core::worker;
use std::path::Path;

/// Engine configuration shared by `backup` and `restore`.
fn run_config() -> RunConfig {
    RunConfig::new(env!("CARGO_PKG_VERSION")).with_home_dir(dirs::home_dir())
}

/// Runs `operation` on a worker thread, drawing progress while it runs.
fn run_operation(
    operation: Operation,
    config: RunConfig,
    recipe: &Path,
    names: Vec<String>,
    formatter: &dyn OutputFormatter,
    interactive: bool,
) -> Result<()> {
    let engine = add_recipe_context(Engine::new(config), recipe)?;
    let store = TomlRecipeStore::new(recipe);
    let output = engine.output_path(&store);

    let passwords = TerminalPassword::from_env();
    let handle = add_recipe_context(
        worker::spawn(engine, operation, store, names, passwords),
        recipe,
    )?;

    // Use progress bar if TTY is detected (not quiet, not JSON, is terminal)
    if interactive && CliProgress::should_show() {
        let mut progress = CliProgress::new(operation);
        for event in handle.events() {
            progress.update(&event);
        }
    }

    let report = add_recipe_context(handle.join(), recipe)?;
    formatter.format_run_report(&output, &report)
}
