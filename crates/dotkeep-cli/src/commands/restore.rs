//! Restore command implementation.

use crate::cli::RestoreArgs;
use crate::cli::split_recipe_and_names;
use crate::output::OutputFormatter;
use anyhow::Result;
use dotkeep_core::Operation;

pub fn execute(
    args: &RestoreArgs,
    formatter: &dyn OutputFormatter,
    interactive: bool,
) -> Result<()> {
    let (recipe, names) = split_recipe_and_names(&args.args);

    super::run_operation(
        Operation::Restore,
        super::run_config(),
        &recipe,
        names,
        formatter,
        interactive,
    )
}
