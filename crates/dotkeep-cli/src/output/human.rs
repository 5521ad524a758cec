//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Alignment;
use console::Term;
use console::measure_text_width;
use console::pad_str;
use console::style;
use dotkeep_core::CommandEntry;
use dotkeep_core::FileEntry;
use dotkeep_core::Operation;
use dotkeep_core::Recipe;
use dotkeep_core::RunReport;
use std::path::Path;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let digits = n.to_string();
        let mut result = String::with_capacity(digits.len() + digits.len() / 3);

        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                result.push(',');
            }
            result.push(c);
        }

        result
    }

    fn check_mark(&self, message: &str) -> String {
        if self.use_colors {
            format!("{} {message}", style("✓").green().bold())
        } else {
            message.to_string()
        }
    }

    fn heading(&self, title: &str) -> String {
        if self.use_colors {
            style(title).bold().to_string()
        } else {
            title.to_string()
        }
    }

    fn write_table(&self, title: &str, headers: &[&str], rows: &[Vec<String>]) {
        if rows.is_empty() {
            return;
        }

        let mut widths: Vec<usize> = headers.iter().map(|h| measure_text_width(h)).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(measure_text_width(cell));
            }
        }

        let _ = self.term.write_line(&self.heading(title));
        let header = render_row(headers.iter().copied(), &widths);
        let header = if self.use_colors {
            style(header).dim().to_string()
        } else {
            header
        };
        let _ = self.term.write_line(&format!("  {header}"));
        for row in rows {
            let line = render_row(row.iter().map(String::as_str), &widths);
            let _ = self.term.write_line(&format!("  {line}"));
        }
    }
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| pad_str(cell, *width, Alignment::Left, None).into_owned())
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn file_row(file: &FileEntry) -> Vec<String> {
    vec![
        file.name.clone(),
        file.path.clone(),
        file.only.join(" "),
        file.exclude.join(" "),
        symlink_summary(file),
    ]
}

fn command_row(command: &CommandEntry) -> Vec<String> {
    vec![
        command.name.clone(),
        command.backup.clone(),
        command.restore.clone(),
    ]
}

fn symlink_summary(file: &FileEntry) -> String {
    file.symlinks
        .iter()
        .map(|(name, target)| format!("{name} -> {target}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Tab-separated line for `list --machine`.
fn machine_file_line(file: &FileEntry) -> String {
    let mut fields = vec![file.name.clone(), file.path.clone()];

    if !file.only.is_empty() {
        fields.push(format!("Only: {}", file.only.join(" ")));
    } else if !file.exclude.is_empty() {
        fields.push(format!("Excluding: {}", file.exclude.join(" ")));
    }
    if !file.symlinks.is_empty() {
        fields.push(format!("Symlinks: {}", symlink_summary(file)));
    }

    fields.join("\t")
}

fn machine_command_line(command: &CommandEntry) -> String {
    [
        command.name.as_str(),
        command.backup.as_str(),
        command.restore.as_str(),
    ]
    .join("\t")
}

impl OutputFormatter for HumanFormatter {
    fn format_run_report(&self, output: &Path, report: &RunReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let headline = match report.operation {
            Operation::Backup => format!("Backup complete: {}", output.display()),
            Operation::Restore => format!("Restore complete from {}", output.display()),
        };
        let _ = self.term.write_line(&self.check_mark(&headline));

        let _ = self.term.write_line(&format!(
            "  Entries:     {} ({})",
            Self::format_number(report.entries),
            report.mode
        ));
        let _ = self.term.write_line(&format!(
            "  Files:       {}",
            Self::format_number(report.files)
        ));
        let _ = self.term.write_line(&format!(
            "  Total size:  {}",
            Self::format_size(report.bytes)
        ));
        let _ = self.term.write_line(&format!(
            "  Encrypted:   {}",
            if report.encrypted { "yes" } else { "no" }
        ));

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Duration:    {:?}", report.duration));
        }

        Ok(())
    }

    fn format_recipe(&self, path: &Path, recipe: &Recipe, machine: bool) -> Result<()> {
        let encryption = if recipe.is_encrypted() {
            "Encryption enabled"
        } else {
            "Encryption disabled"
        };

        if machine {
            let _ = self.term.write_line(encryption);
            for file in &recipe.files {
                let _ = self.term.write_line(&machine_file_line(file));
            }
            for command in &recipe.commands {
                let _ = self.term.write_line(&machine_command_line(command));
            }
            return Ok(());
        }

        if self.quiet {
            return Ok(());
        }

        let _ = self
            .term
            .write_line(&format!("Recipe: {} ({encryption})", path.display()));

        if recipe.is_empty() {
            let _ = self.term.write_line("  No entries");
            return Ok(());
        }

        let files: Vec<_> = recipe.files.iter().map(file_row).collect();
        let commands: Vec<_> = recipe.commands.iter().map(command_row).collect();

        let _ = self.term.write_line("");
        self.write_table(
            "Files",
            &["NAME", "PATH", "ONLY", "EXCLUDE", "SYMLINKS"],
            &files,
        );
        if !files.is_empty() && !commands.is_empty() {
            let _ = self.term.write_line("");
        }
        self.write_table("Commands", &["NAME", "BACKUP", "RESTORE"], &commands);

        Ok(())
    }

    fn format_recipe_change(&self, operation: &str, path: &Path, names: &[String]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let message = match operation {
            "init" => format!("Created recipe {}", path.display()),
            "add" => format!("Added {} to {}", names.join(", "), path.display()),
            "remove" => format!("Removed {} from {}", names.join(", "), path.display()),
            _ => format!("Updated {}", path.display()),
        };
        let _ = self.term.write_line(&self.check_mark(&message));

        if self.verbose && operation == "init" && !names.is_empty() {
            let _ = self
                .term
                .write_line(&format!("  Entries: {}", names.join(", ")));
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        let term = Term::stderr();
        if self.use_colors {
            let _ = term.write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let term = Term::stderr();
        if self.use_colors {
            let _ = term.write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = term.write_line(&format!("WARNING: {message}"));
        }
    }
}
