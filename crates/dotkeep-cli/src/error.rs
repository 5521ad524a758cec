//! Error conversion utilities for CLI.
//!
//! Converts dotkeep-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use crate::cli::PASSWORD_ENV;
use anyhow::anyhow;
use dotkeep_core::DotkeepError;
use std::path::Path;

/// Converts `DotkeepError` to user-friendly anyhow error with context
pub fn convert_error(err: DotkeepError, recipe: &Path) -> anyhow::Error {
    match err {
        DotkeepError::NotFound { path } if path == recipe => {
            anyhow!(
                "Recipe not found: {}\n\
                 HINT: Run `dotkeep init` to create one, or pass the recipe path.",
                recipe.display()
            )
        }
        DotkeepError::NotFound { path } => {
            anyhow!(
                "Not found: {}\n\
                 HINT: Check the entry paths in '{}', or run `dotkeep backup` before restoring.",
                path.display(),
                recipe.display()
            )
        }
        DotkeepError::UnknownEntry { name } => {
            anyhow!(
                "Entry '{name}' is not in recipe '{}'\n\
                 HINT: Run `dotkeep list` to see the available entries.",
                recipe.display()
            )
        }
        DotkeepError::DuplicateEntry { name } => {
            anyhow!(
                "Entry '{name}' already exists in recipe '{}'\n\
                 HINT: Remove it first with `dotkeep remove {name}`.",
                recipe.display()
            )
        }
        DotkeepError::InvalidEntryName { name } => {
            anyhow!(
                "Entry name {name:?} in recipe '{}' is not a plain file name\n\
                 HINT: Names must be non-empty, not `.` or `..`, and free of `/` and `\\`.",
                recipe.display()
            )
        }
        DotkeepError::ConflictingFilters { name } => {
            anyhow!(
                "Entry '{name}' in '{}' sets both `only` and `exclude`\n\
                 HINT: Keep only one of the two filters.",
                recipe.display()
            )
        }
        DotkeepError::FilterCompile { pattern, source } => {
            anyhow!(
                "Invalid exclude pattern {pattern:?} in '{}': {source}\n\
                 HINT: Exclude patterns are regular expressions; escape literal dots as `\\.`.",
                recipe.display()
            )
        }
        DotkeepError::Authentication { reason } => {
            anyhow!(
                "Could not decrypt the backup of '{}': {reason}\n\
                 HINT: Check the password. The archive may also be corrupted.",
                recipe.display()
            )
        }
        DotkeepError::PasswordRequired => {
            anyhow!(
                "A password is required for the encrypted recipe '{}'\n\
                 HINT: Run from a terminal or set {PASSWORD_ENV}.",
                recipe.display()
            )
        }
        DotkeepError::HomeDirUnavailable { path } => {
            anyhow!(
                "Cannot expand '{path}': home directory is unknown\n\
                 HINT: Set the HOME environment variable."
            )
        }
        DotkeepError::RecipeParse(source) => {
            anyhow!(
                "Invalid recipe '{}': {source}\n\
                 HINT: The recipe must be TOML with [[files]] and [[commands]] tables.",
                recipe.display()
            )
        }
        process @ DotkeepError::Process { .. } => {
            anyhow!(
                "{process}\n\
                 HINT: Run the command by hand to see why it fails."
            )
        }
        DotkeepError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                recipe.display(),
                io_err
            )
        }
        _ => anyhow::Error::from(err)
            .context(format!("Error processing recipe '{}'", recipe.display())),
    }
}

/// Adds recipe context to a core result
pub fn add_recipe_context<T>(
    result: Result<T, DotkeepError>,
    recipe: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_error(e, recipe))
}
