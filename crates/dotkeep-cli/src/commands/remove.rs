//! Remove command implementation.

use crate::cli::RemoveArgs;
use crate::error::add_recipe_context;
use crate::error::convert_error;
use crate::output::OutputFormatter;
use anyhow::Result;
use dotkeep_core::DotkeepError;
use dotkeep_core::RecipeStore;
use dotkeep_core::TomlRecipeStore;

pub fn execute(args: &RemoveArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let store = TomlRecipeStore::new(&args.recipe);
    let mut recipe = add_recipe_context(store.load(), &args.recipe)?;

    let removed = recipe.remove(&args.names);
    if removed.is_empty() {
        let name = args.names.first().cloned().unwrap_or_default();
        return Err(convert_error(
            DotkeepError::UnknownEntry { name },
            &args.recipe,
        ));
    }

    for name in args.names.iter().filter(|n| !removed.contains(*n)) {
        formatter.format_warning(&format!("No entry named '{name}' in the recipe"));
    }

    add_recipe_context(store.save(&recipe), &args.recipe)?;
    formatter.format_recipe_change("remove", &args.recipe, &removed)
}
