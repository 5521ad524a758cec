//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use dotkeep_core::CommandEntry;
use dotkeep_core::FileEntry;
use dotkeep_core::Recipe;
use dotkeep_core::RunReport;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct RunOutput {
    output_path: String,
    mode: String,
    encrypted: bool,
    entries: usize,
    files: usize,
    bytes: u64,
    duration_ms: u128,
}

impl RunOutput {
    fn new(output: &Path, report: &RunReport) -> Self {
        Self {
            output_path: output.display().to_string(),
            mode: report.mode.to_string(),
            encrypted: report.encrypted,
            entries: report.entries,
            files: report.files,
            bytes: report.bytes,
            duration_ms: report.duration.as_millis(),
        }
    }
}

#[derive(Serialize)]
struct RecipeOutput<'a> {
    recipe: String,
    encrypted: bool,
    files: &'a [FileEntry],
    commands: &'a [CommandEntry],
}

#[derive(Serialize)]
struct ChangeOutput<'a> {
    recipe: String,
    entries: &'a [String],
}

impl OutputFormatter for JsonFormatter {
    fn format_run_report(&self, output: &Path, report: &RunReport) -> Result<()> {
        let data = RunOutput::new(output, report);
        let operation = report.operation.to_string();
        Self::output(&JsonOutput::success(&operation, data))
    }

    fn format_recipe(&self, path: &Path, recipe: &Recipe, _machine: bool) -> Result<()> {
        let data = RecipeOutput {
            recipe: path.display().to_string(),
            encrypted: recipe.is_encrypted(),
            files: &recipe.files,
            commands: &recipe.commands,
        };
        Self::output(&JsonOutput::success("list", data))
    }

    fn format_recipe_change(&self, operation: &str, path: &Path, names: &[String]) -> Result<()> {
        let data = ChangeOutput {
            recipe: path.display().to_string(),
            entries: names,
        };
        Self::output(&JsonOutput::success(operation, data))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::failure("dotkeep", format!("{error:#}"));
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
