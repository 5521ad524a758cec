//! Recipe model: the declarative list of entries plus encryption metadata.
//!
//! A recipe is a TOML document. Entry names are unique across files and
//! commands because they double as top-level names in the backup output.
//!
//! ```toml
//! encryption_key_salt = ""
//! encryption_nonce = ""
//!
//! [[files]]
//! name = "fish"
//! path = "~/.config/fish"
//! exclude = ["fish_variables"]
//!
//! [[commands]]
//! name = "brew"
//! backup = "brew leaves"
//! restore = "xargs brew install"
//! ```

use crate::crypto;
use crate::error::DotkeepError;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// A file or folder to back up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Unique name; also the top-level name inside the backup.
    pub name: String,

    /// Source path on the filesystem. May start with `~/`.
    pub path: String,

    /// When non-empty, only these top-level children of a folder are kept.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub only: Vec<String>,

    /// Regular expressions matched against paths relative to the entry root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// `(link_name, link_target)` pairs: after restoring, a symlink is created
    /// at `link_target` pointing to `<path>/<link_name>`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symlinks: Vec<(String, String)>,
}

/// A pair of shell commands whose output is backed up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    /// Unique name; also the top-level name inside the backup.
    pub name: String,

    /// Command whose standard output is stored.
    pub backup: String,

    /// Command that receives the stored output on standard input.
    pub restore: String,
}

/// The full backup description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Hex-encoded PBKDF2 salt. Non-empty means encryption is enabled.
    #[serde(default)]
    pub encryption_key_salt: String,

    /// Hex-encoded AES-GCM nonce of the stored archive.
    #[serde(default)]
    pub encryption_nonce: String,

    /// File and folder entries, in backup order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileEntry>,

    /// Command entries, in backup order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandEntry>,
}

impl FileEntry {
    /// Creates an entry with no filters or symlinks.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Builds an entry for an existing path the way `add` names it: the final
    /// path component with one leading `.` removed, and a home-relative path
    /// rewritten to `~/...`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dotkeep_core::recipe::FileEntry;
    /// use std::path::Path;
    ///
    /// let entry = FileEntry::from_source(
    ///     Path::new("/home/me/.config/fish"),
    ///     Some(Path::new("/home/me")),
    /// )
    /// .unwrap();
    /// assert_eq!(entry.name, "fish");
    /// assert_eq!(entry.path, "~/.config/fish");
    ///
    /// let entry = FileEntry::from_source(Path::new("/home/me/.vimrc"), None).unwrap();
    /// assert_eq!(entry.name, "vimrc");
    /// ```
    pub fn from_source(source: &Path, home: Option<&Path>) -> Result<Self> {
        let file_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                DotkeepError::Io(std::io::Error::other(format!(
                    "cannot determine entry name for {}",
                    source.display()
                )))
            })?;
        let name = file_name.strip_prefix('.').unwrap_or(file_name);

        let path = match home.and_then(|home| source.strip_prefix(home).ok()) {
            Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
            Some(rest) => format!("~/{}", rest.display()),
            None => source.display().to_string(),
        };

        Ok(Self::new(name, path))
    }

    /// Resolves `path`, expanding the `~` shorthand against `home`.
    ///
    /// # Errors
    ///
    /// Returns `HomeDirUnavailable` if the path uses `~` and no home
    /// directory is known.
    pub fn resolve_path(&self, home: Option<&Path>) -> Result<PathBuf> {
        expand_home(&self.path, home)
    }
}

impl CommandEntry {
    /// Creates a command entry.
    pub fn new(
        name: impl Into<String>,
        backup: impl Into<String>,
        restore: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            backup: backup.into(),
            restore: restore.into(),
        }
    }
}

impl Recipe {
    /// Returns whether backups of this recipe are encrypted.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        !self.encryption_key_salt.is_empty()
    }

    /// Returns a recipe with no entries whose salt and nonce are filled with
    /// fresh random values, which marks it as encrypted before the first
    /// backup.
    #[must_use]
    pub fn with_encryption_marker() -> Self {
        Self {
            encryption_key_salt: crypto::random_salt_hex(),
            encryption_nonce: crypto::random_nonce_hex(),
            ..Self::default()
        }
    }

    /// The recipe written by `init --example`.
    #[must_use]
    pub fn example() -> Self {
        let neovim = FileEntry {
            symlinks: vec![
                (".".into(), "~/.neovim".into()),
                ("init.vim".into(), "~/.vimrc".into()),
            ],
            ..FileEntry::new("neovim", "~/.config/nvim")
        };
        let fish = FileEntry {
            exclude: vec!["fish_variables".into()],
            ..FileEntry::new("fish", "~/.config/fish")
        };
        let ssh = FileEntry {
            only: vec!["config".into(), "key".into(), "key.pub".into()],
            ..FileEntry::new("ssh", "~/.ssh")
        };

        Self {
            files: vec![FileEntry::new("doom", "~/.config/doom"), neovim, fish, ssh],
            commands: vec![
                CommandEntry::new("brew", "brew leaves", "xargs brew install"),
                CommandEntry::new(
                    "flatpak",
                    "flatpak list --columns=ref --app | tail -n +1",
                    "xargs flatpak install",
                ),
            ],
            ..Self::default()
        }
    }

    /// All entry names, files first, in recipe order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.commands.iter().map(|c| c.name.as_str()))
    }

    /// Returns whether an entry named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entry_names().any(|n| n == name)
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len() + self.commands.len()
    }

    /// Returns whether the recipe has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.commands.is_empty()
    }

    /// Checks recipe invariants: names are plain file names, unique, and no
    /// entry sets both `only` and `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntryName`, `DuplicateEntry` or `ConflictingFilters`.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in self.entry_names() {
            check_entry_name(name)?;
            if !seen.insert(name) {
                return Err(DotkeepError::DuplicateEntry {
                    name: name.to_string(),
                });
            }
        }

        if let Some(file) = self
            .files
            .iter()
            .find(|f| !f.only.is_empty() && !f.exclude.is_empty())
        {
            return Err(DotkeepError::ConflictingFilters {
                name: file.name.clone(),
            });
        }

        Ok(())
    }

    /// Appends a file entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntryName` for a name that is not a plain file name,
    /// `DuplicateEntry` if the name is taken and `ConflictingFilters` if both
    /// `only` and `exclude` are set.
    pub fn add_file(&mut self, entry: FileEntry) -> Result<()> {
        check_entry_name(&entry.name)?;
        if self.contains(&entry.name) {
            return Err(DotkeepError::DuplicateEntry { name: entry.name });
        }
        if !entry.only.is_empty() && !entry.exclude.is_empty() {
            return Err(DotkeepError::ConflictingFilters { name: entry.name });
        }
        self.files.push(entry);
        Ok(())
    }

    /// Appends a command entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntryName` for a name that is not a plain file name
    /// and `DuplicateEntry` if the name is taken.
    pub fn add_command(&mut self, entry: CommandEntry) -> Result<()> {
        check_entry_name(&entry.name)?;
        if self.contains(&entry.name) {
            return Err(DotkeepError::DuplicateEntry { name: entry.name });
        }
        self.commands.push(entry);
        Ok(())
    }

    /// Removes every entry whose name is in `names` and returns the removed
    /// names in recipe order.
    pub fn remove<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let doomed: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
        let mut removed = Vec::new();

        self.files.retain(|f| {
            let keep = !doomed.contains(f.name.as_str());
            if !keep {
                removed.push(f.name.clone());
            }
            keep
        });
        self.commands.retain(|c| {
            let keep = !doomed.contains(c.name.as_str());
            if !keep {
                removed.push(c.name.clone());
            }
            keep
        });

        removed
    }

    /// Parses a recipe from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `RecipeParse` for malformed TOML.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Serializes the recipe to TOML text.
    ///
    /// # Errors
    ///
    /// Returns `RecipeSerialize` if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Expands a leading `~` in `path` against `home`.
///
/// # Errors
///
/// Returns `HomeDirUnavailable` if `path` starts with `~` and `home` is
/// `None`.
pub fn expand_home(path: &str, home: Option<&Path>) -> Result<PathBuf> {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };

    match (rest, home) {
        (None, _) => Ok(PathBuf::from(path)),
        (Some(rest), Some(home)) => Ok(home.join(rest)),
        (Some(_), None) => Err(DotkeepError::HomeDirUnavailable {
            path: path.to_string(),
        }),
    }
}

/// Durable storage for a recipe.
pub trait RecipeStore {
    /// Loads the recipe.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the recipe does not exist.
    fn load(&self) -> Result<Recipe>;

    /// Persists the recipe, replacing the stored one.
    fn save(&self, recipe: &Recipe) -> Result<()>;

    /// Directory the backup output is written to.
    fn base_dir(&self) -> &Path;
}

/// Recipe stored as a TOML file.
#[derive(Debug, Clone)]
pub struct TomlRecipeStore {
    path: PathBuf,
}

impl TomlRecipeStore {
    /// Creates a store backed by the TOML file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecipeStore for TomlRecipeStore {
    fn load(&self) -> Result<Recipe> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DotkeepError::not_found(&self.path)
            } else {
                DotkeepError::Io(e)
            }
        })?;
        Recipe::from_toml(&text)
    }

    fn save(&self, recipe: &Recipe) -> Result<()> {
        let text = recipe.to_toml()?;
        // Write-then-rename so a crash never leaves a truncated recipe.
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn base_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Entry names become a single path component in the backup output.
fn check_entry_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(DotkeepError::InvalidEntryName {
            name: name.to_string(),
        });
    }
    Ok(())
}
