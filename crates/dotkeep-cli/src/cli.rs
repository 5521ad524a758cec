//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::Path;
use std::path::PathBuf;

/// Recipe file looked up in the current directory when none is given.
pub const DEFAULT_RECIPE: &str = "dotkeep.toml";

/// Environment variable read instead of prompting for the password.
pub const PASSWORD_ENV: &str = "DOTKEEP_PASSWORD";

#[derive(Parser)]
#[command(name = "dotkeep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a recipe in the current directory
    Init(InitArgs),
    /// Add files, folders or a command to the recipe
    Add(AddArgs),
    /// Remove entries from the recipe
    Remove(RemoveArgs),
    /// List the entries of a recipe
    List(ListArgs),
    /// Back up every entry, or only the named ones
    Backup(BackupArgs),
    /// Restore every entry, or only the named ones
    Restore(RestoreArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

#[derive(clap::Args)]
pub struct InitArgs {
    /// Write an example recipe instead of an empty one
    #[arg(long, conflicts_with = "encrypt")]
    pub example: bool,

    /// Enable encryption for this backup
    #[arg(long)]
    pub encrypt: bool,

    /// Recipe file to create
    #[arg(long, value_name = "RECIPE", default_value = DEFAULT_RECIPE)]
    pub recipe: PathBuf,
}

#[derive(clap::Args)]
pub struct AddArgs {
    /// Files or folders to add
    #[arg(
        value_name = "PATH",
        required_unless_present = "command",
        conflicts_with = "command"
    )]
    pub paths: Vec<PathBuf>,

    /// Only back up these top-level children (comma separated)
    #[arg(short, long, value_delimiter = ',', conflicts_with = "exclude")]
    pub only: Vec<String>,

    /// Skip paths matching these regular expressions (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Symlinks to create on restore, as TARGET,LINK pairs (e.g. .,~/.nvim,init.vim,~/.vimrc)
    #[arg(short, long, value_delimiter = ',')]
    pub symlinks: Vec<String>,

    /// Add a command entry with this name instead of a path
    #[arg(
        short,
        long,
        value_name = "NAME",
        requires_all = ["backup", "restore"],
        conflicts_with_all = ["only", "exclude", "symlinks"]
    )]
    pub command: Option<String>,

    /// Command whose output is saved on backup
    #[arg(short, long, value_name = "CMD", requires = "command")]
    pub backup: Option<String>,

    /// Command fed the saved output on restore
    #[arg(short, long, value_name = "CMD", requires = "command")]
    pub restore: Option<String>,

    /// Recipe file to update
    #[arg(long, value_name = "RECIPE", default_value = DEFAULT_RECIPE)]
    pub recipe: PathBuf,
}

#[derive(clap::Args)]
pub struct RemoveArgs {
    /// Names of the entries to remove
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,

    /// Recipe file to update
    #[arg(long, value_name = "RECIPE", default_value = DEFAULT_RECIPE)]
    pub recipe: PathBuf,
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the recipe (default: ./dotkeep.toml)
    #[arg(value_name = "RECIPE")]
    pub recipe: Option<PathBuf>,

    /// Machine-readable output using tab separators
    #[arg(short, long)]
    pub machine: bool,
}

#[derive(clap::Args)]
pub struct BackupArgs {
    /// Optional recipe path followed by entry names
    #[arg(value_name = "RECIPE|NAME")]
    pub args: Vec<String>,

    /// Encrypt the backup even if the recipe is not encrypted yet
    #[arg(long)]
    pub encrypt: bool,
}

#[derive(clap::Args)]
pub struct RestoreArgs {
    /// Optional recipe path followed by entry names
    #[arg(value_name = "RECIPE|NAME")]
    pub args: Vec<String>,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Splits backup/restore positionals into the recipe path and entry names.
///
/// The first argument is the recipe when it ends in `.toml` or names an
/// existing file; otherwise every argument is an entry name and the recipe
/// is `./dotkeep.toml`.
pub fn split_recipe_and_names(args: &[String]) -> (PathBuf, Vec<String>) {
    match args.split_first() {
        Some((first, rest)) if looks_like_recipe(first) => (PathBuf::from(first), rest.to_vec()),
        _ => (PathBuf::from(DEFAULT_RECIPE), args.to_vec()),
    }
}

fn looks_like_recipe(arg: &str) -> bool {
    let path = Path::new(arg);
    path.extension().is_some_and(|ext| ext == "toml") || path.is_file()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_split_no_args() {
        let (recipe, names) = split_recipe_and_names(&[]);
        assert_eq!(recipe, PathBuf::from(DEFAULT_RECIPE));
        assert!(names.is_empty());
    }

    #[test]
    fn test_split_toml_first() {
        let (recipe, names) = split_recipe_and_names(&strings(&["other.toml", "fish"]));
        assert_eq!(recipe, PathBuf::from("other.toml"));
        assert_eq!(names, vec!["fish"]);
    }

    #[test]
    fn test_split_names_only() {
        let (recipe, names) = split_recipe_and_names(&strings(&["fish", "brew"]));
        assert_eq!(recipe, PathBuf::from(DEFAULT_RECIPE));
        assert_eq!(names, vec!["fish", "brew"]);
    }

    #[test]
    fn test_split_existing_file_first() {
        let temp = TempDir::new().unwrap();
        let recipe_path = temp.path().join("recipe");
        std::fs::write(&recipe_path, "").unwrap();
        let first = recipe_path.display().to_string();

        let (recipe, names) = split_recipe_and_names(&[first, "fish".into()]);
        assert_eq!(recipe, recipe_path);
        assert_eq!(names, vec!["fish"]);
    }

    #[test]
    fn test_add_symlinks_split_on_commas() {
        let cli = Cli::try_parse_from([
            "dotkeep",
            "add",
            "/tmp/nvim",
            "--symlinks",
            ".,~/.nvim,init.vim,~/.vimrc",
        ])
        .unwrap();
        let Commands::Add(args) = cli.command else {
            panic!("expected add");
        };
        assert_eq!(args.symlinks, vec![".", "~/.nvim", "init.vim", "~/.vimrc"]);
    }

    #[test]
    fn test_add_command_requires_backup_and_restore() {
        assert!(Cli::try_parse_from(["dotkeep", "add", "--command", "brew"]).is_err());
        assert!(
            Cli::try_parse_from([
                "dotkeep",
                "add",
                "--command",
                "brew",
                "--backup",
                "brew leaves",
                "--restore",
                "xargs brew install",
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_add_only_conflicts_with_exclude() {
        assert!(
            Cli::try_parse_from(["dotkeep", "add", "/tmp/x", "--only", "a", "--exclude", "b"])
                .is_err()
        );
    }
}
