//! Narrowing a recipe to the entries a run should touch.

use crate::error::DotkeepError;
use crate::error::Result;
use crate::recipe::Recipe;
use crate::report::RunMode;
use std::collections::HashSet;

/// The entries selected for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The recipe restricted to the selected entries, in recipe order.
    pub recipe: Recipe,

    /// Full when no names were requested.
    pub mode: RunMode,
}

impl Selection {
    /// Number of selected entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recipe.len()
    }

    /// Returns whether nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipe.is_empty()
    }

    /// Selected names, files first.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.recipe.entry_names().map(ToString::to_string).collect()
    }
}

/// Selects `names` from `recipe`.
///
/// An empty `names` selects everything. Otherwise every name must exist;
/// the result keeps the recipe's order and ignores repeated names.
///
/// # Errors
///
/// Returns `UnknownEntry` for the first requested name not in the recipe.
///
/// # Examples
///
/// ```
/// use dotkeep_core::recipe::Recipe;
/// use dotkeep_core::report::RunMode;
/// use dotkeep_core::selection::select;
///
/// let recipe = Recipe::example();
/// let selection = select(&recipe, &["brew", "fish", "brew"]).unwrap();
/// assert_eq!(selection.mode, RunMode::Partial);
/// assert_eq!(selection.names(), vec!["fish", "brew"]);
///
/// assert!(select(&recipe, &["emacs"]).is_err());
/// ```
pub fn select<S: AsRef<str>>(recipe: &Recipe, names: &[S]) -> Result<Selection> {
    if names.is_empty() {
        return Ok(Selection {
            recipe: recipe.clone(),
            mode: RunMode::Full,
        });
    }

    let wanted: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
    if let Some(unknown) = names.iter().map(AsRef::as_ref).find(|n| !recipe.contains(n)) {
        return Err(DotkeepError::UnknownEntry {
            name: unknown.to_string(),
        });
    }

    let narrowed = Recipe {
        encryption_key_salt: recipe.encryption_key_salt.clone(),
        encryption_nonce: recipe.encryption_nonce.clone(),
        files: recipe
            .files
            .iter()
            .filter(|f| wanted.contains(f.name.as_str()))
            .cloned()
            .collect(),
        commands: recipe
            .commands
            .iter()
            .filter(|c| wanted.contains(c.name.as_str()))
            .cloned()
            .collect(),
    };

    Ok(Selection {
        recipe: narrowed,
        mode: RunMode::Partial,
    })
}
