//! dotkeep - declarative, selective and optionally encrypted dotfiles
//! backup.

mod cli;
mod commands;
mod error;
mod output;
mod password;
mod progress;

use anyhow::Result;
use clap::Parser;
use output::OutputFormatter;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    match run(&cli, &*formatter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.format_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &cli::Cli, formatter: &dyn OutputFormatter) -> Result<()> {
    // Progress bars are suppressed whenever stdout is not for humans.
    let interactive = !cli.quiet && !cli.json;

    match &cli.command {
        cli::Commands::Init(args) => commands::init::execute(args, formatter),
        cli::Commands::Add(args) => commands::add::execute(args, formatter),
        cli::Commands::Remove(args) => commands::remove::execute(args, formatter),
        cli::Commands::List(args) => commands::list::execute(args, formatter),
        cli::Commands::Backup(args) => commands::backup::execute(args, formatter, interactive),
        cli::Commands::Restore(args) => commands::restore::execute(args, formatter, interactive),
        cli::Commands::Completion(args) => {
            commands::completion::execute(args.shell);
            Ok(())
        }
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the level picked from the flags.
fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
