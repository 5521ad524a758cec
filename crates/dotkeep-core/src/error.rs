//! Error types for backup and restore operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `DotkeepError`.
pub type Result<T> = std::result::Result<T, DotkeepError>;

/// Errors that can occur while resolving, backing up or restoring a recipe.
#[derive(Error, Debug)]
pub enum DotkeepError {
    /// A required file is missing (recipe, stored archive, stored entry).
    #[error("not found: {path}")]
    NotFound {
        /// The path or archive record that could not be located.
        path: PathBuf,
    },

    /// A requested entry name does not exist in the recipe.
    #[error("unknown entry name: {name}")]
    UnknownEntry {
        /// The unknown name.
        name: String,
    },

    /// Two entries share the same name.
    #[error("duplicate entry name: {name}")]
    DuplicateEntry {
        /// The repeated name.
        name: String,
    },

    /// An entry name cannot be used as a single path component.
    #[error("invalid entry name {name:?}: names must be plain file names")]
    InvalidEntryName {
        /// The rejected name.
        name: String,
    },

    /// An exclude pattern is not a valid regular expression.
    #[error("invalid exclude pattern {pattern:?}: {source}")]
    FilterCompile {
        /// The offending pattern.
        pattern: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// An entry populates both `only` and `exclude`.
    #[error("entry {name} sets both `only` and `exclude`; they are mutually exclusive")]
    ConflictingFilters {
        /// The entry name.
        name: String,
    },

    /// An external command failed to start or exited unsuccessfully.
    #[error("command `{command}` failed ({})\n{stderr}", describe_status(.status))]
    Process {
        /// The command line passed to the shell.
        command: String,
        /// Exit status, `None` when killed by a signal or not started.
        status: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// Decryption failed: wrong password, bad nonce, or corrupted data.
    #[error("authentication failed: {reason}")]
    Authentication {
        /// Why authentication failed.
        reason: String,
    },

    /// Encryption is active but no password was supplied.
    #[error("a password is required for encrypted recipes")]
    PasswordRequired,

    /// The password confirmation did not match.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The archive container is structurally invalid.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),

    /// The recipe file could not be parsed.
    #[error("invalid recipe: {0}")]
    RecipeParse(#[from] toml::de::Error),

    /// The recipe could not be serialized.
    #[error("cannot serialize recipe: {0}")]
    RecipeSerialize(#[from] toml::ser::Error),

    /// A `~/` path was used but the home directory is unknown.
    #[error("home directory is not available to expand {path}")]
    HomeDirUnavailable {
        /// The unexpanded path.
        path: String,
    },

    /// The run configuration is invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[allow(clippy::ref_option)]
fn describe_status(status: &Option<i32>) -> String {
    status.map_or_else(
        || "terminated without exit status".to_string(),
        |code| format!("exit status {code}"),
    )
}

impl DotkeepError {
    /// Returns `true` if the error stems from user input (recipe contents,
    /// requested names, password) rather than the environment.
    ///
    /// # Examples
    ///
    /// ```
    /// use dotkeep_core::DotkeepError;
    ///
    /// let err = DotkeepError::UnknownEntry { name: "vim".into() };
    /// assert!(err.is_user_error());
    ///
    /// let err = DotkeepError::Io(std::io::Error::other("disk full"));
    /// assert!(!err.is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownEntry { .. }
                | Self::DuplicateEntry { .. }
                | Self::InvalidEntryName { .. }
                | Self::FilterCompile { .. }
                | Self::ConflictingFilters { .. }
                | Self::Authentication { .. }
                | Self::PasswordRequired
                | Self::PasswordMismatch
                | Self::RecipeParse(_)
                | Self::InvalidConfig { .. }
        )
    }

    /// Returns the entry name this error refers to, if any.
    #[must_use]
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Self::UnknownEntry { name }
            | Self::DuplicateEntry { name }
            | Self::InvalidEntryName { name }
            | Self::ConflictingFilters { name } => Some(name),
            _ => None,
        }
    }

    pub(crate) fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub(crate) fn authentication(reason: impl Into<String>) -> Self {
        Self::Authentication {
            reason: reason.into(),
        }
    }
}
