//! Backup command implementation.

use crate::cli::BackupArgs;
use crate::cli::split_recipe_and_names;
use crate::output::OutputFormatter;
use anyhow::Result;
use dotkeep_core::Operation;

pub fn execute(args: &BackupArgs, formatter: &dyn OutputFormatter, interactive: bool) -> Result<()> {
    let (recipe, names) = split_recipe_and_names(&args.args);
    let config = super::run_config().with_encrypt(args.encrypt);

    super::run_operation(
        Operation::Backup,
        config,
        &recipe,
        names,
        formatter,
        interactive,
    )
}
