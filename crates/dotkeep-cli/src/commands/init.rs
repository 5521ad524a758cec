//! Init command implementation.

use crate::cli::InitArgs;
use crate::error::add_recipe_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use anyhow::bail;
use dotkeep_core::Recipe;
use dotkeep_core::RecipeStore;
use dotkeep_core::TomlRecipeStore;

pub fn execute(args: &InitArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    if args.recipe.exists() {
        bail!(
            "Recipe already exists: {}\n\
             HINT: Edit it with `dotkeep add` and `dotkeep remove` instead.",
            args.recipe.display()
        );
    }

    let recipe = if args.example {
        Recipe::example()
    } else if args.encrypt {
        Recipe::with_encryption_marker()
    } else {
        Recipe::default()
    };

    add_recipe_context(TomlRecipeStore::new(&args.recipe).save(&recipe), &args.recipe)?;

    let names: Vec<String> = recipe.entry_names().map(String::from).collect();
    formatter.format_recipe_change("init", &args.recipe, &names)
}
