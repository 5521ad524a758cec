//! Output formatter trait for CLI results.

use anyhow::Result;
use dotkeep_core::Recipe;
use dotkeep_core::RunReport;
use serde::Serialize;
use std::path::Path;

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format the summary of a backup or restore run
    fn format_run_report(&self, output: &Path, report: &RunReport) -> Result<()>;

    /// Format the entries of a recipe
    fn format_recipe(&self, path: &Path, recipe: &Recipe, machine: bool) -> Result<()>;

    /// Format the outcome of a recipe edit (`init`, `add`, `remove`)
    fn format_recipe_change(&self, operation: &str, path: &Path, names: &[String]) -> Result<()>;

    /// Format error message
    fn format_error(&self, error: &anyhow::Error);

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Envelope shared by every `--json` document.
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a, T> {
    pub operation: &'a str,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<'a, T: Serialize> JsonOutput<'a, T> {
    pub const fn success(operation: &'a str, data: T) -> Self {
        Self {
            operation,
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }
}

impl<'a> JsonOutput<'a, ()> {
    pub const fn failure(operation: &'a str, error: String) -> Self {
        Self {
            operation,
            status: Status::Error,
            data: None,
            error: Some(error),
        }
    }
}
