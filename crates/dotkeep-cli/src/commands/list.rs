//! List command implementation

use crate::cli::DEFAULT_RECIPE;
use crate::cli::ListArgs;
use crate::error::add_recipe_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use dotkeep_core::RecipeStore;
use dotkeep_core::TomlRecipeStore;
use std::path::PathBuf;

pub fn execute(args: &ListArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let path = args
        .recipe
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RECIPE));

    let recipe = add_recipe_context(TomlRecipeStore::new(&path).load(), &path)?;

    formatter.format_recipe(&path, &recipe, args.machine)
}
