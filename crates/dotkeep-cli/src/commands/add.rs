//! Add command implementation.

use crate::cli::AddArgs;
use crate::error::add_recipe_context;
use crate::error::convert_error;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use dotkeep_core::CommandEntry;
use dotkeep_core::DotkeepError;
use dotkeep_core::FileEntry;
use dotkeep_core::Recipe;
use dotkeep_core::RecipeStore;
use dotkeep_core::TomlRecipeStore;
use dotkeep_core::filter::PathFilter;
use std::path::Path;

pub fn execute(args: &AddArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let store = TomlRecipeStore::new(&args.recipe);
    let mut recipe = add_recipe_context(store.load(), &args.recipe)?;

    let added = match &args.command {
        Some(name) => {
            let (Some(backup), Some(restore)) = (&args.backup, &args.restore) else {
                bail!("--backup and --restore are required when --command is given");
            };
            add_recipe_context(
                recipe.add_command(CommandEntry::new(name, backup, restore)),
                &args.recipe,
            )?;
            vec![name.clone()]
        }
        None => add_paths(args, &mut recipe, formatter)?,
    };

    if added.is_empty() {
        bail!(
            "Nothing was added to {}\n\
             HINT: Every PATH was skipped; see the warnings above.",
            args.recipe.display()
        );
    }

    add_recipe_context(store.save(&recipe), &args.recipe)?;
    formatter.format_recipe_change("add", &args.recipe, &added)
}

fn add_paths(
    args: &AddArgs,
    recipe: &mut Recipe,
    formatter: &dyn OutputFormatter,
) -> Result<Vec<String>> {
    let filtered = !args.only.is_empty() || !args.exclude.is_empty() || !args.symlinks.is_empty();
    if filtered && args.paths.len() > 1 {
        bail!(
            "Filters and symlinks apply to a single PATH\n\
             HINT: Add the paths one at a time."
        );
    }

    let symlinks = pair_symlinks(&args.symlinks)?;
    let home = dirs::home_dir();
    let mut added = Vec::new();

    for path in &args.paths {
        let source = std::path::absolute(path)
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        if !source.exists() {
            formatter.format_warning(&format!(
                "Skipping {}: file does not exist",
                source.display()
            ));
            continue;
        }

        let entry = FileEntry {
            only: args.only.clone(),
            exclude: args.exclude.clone(),
            symlinks: symlinks.clone(),
            ..add_recipe_context(FileEntry::from_source(&source, home.as_deref()), &args.recipe)?
        };
        // Reject bad patterns now rather than at the next backup.
        add_recipe_context(PathFilter::new(&entry).map(drop), &args.recipe)?;

        let name = entry.name.clone();
        match recipe.add_file(entry) {
            Ok(()) => added.push(name),
            Err(DotkeepError::DuplicateEntry { name }) => {
                formatter.format_warning(&format!(
                    "Skipping {}: name '{name}' already exists in the recipe",
                    display_relative(&source, home.as_deref())
                ));
            }
            Err(err) => return Err(convert_error(err, &args.recipe)),
        }
    }

    Ok(added)
}

/// Groups `--symlinks` values into `(name, target)` pairs.
fn pair_symlinks(values: &[String]) -> Result<Vec<(String, String)>> {
    if values.len() % 2 != 0 {
        bail!(
            "--symlinks takes TARGET,LINK pairs but got {} values\n\
             HINT: Example: --symlinks .,~/.nvim,init.vim,~/.vimrc",
            values.len()
        );
    }

    Ok(values
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect())
}

fn display_relative(path: &Path, home: Option<&Path>) -> String {
    match home.and_then(|home| path.strip_prefix(home).ok()) {
        Some(rest) => format!("~/{}", rest.display()),
        None => path.display().to_string(),
    }
}
