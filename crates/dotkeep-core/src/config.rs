//! Run configuration.

use crate::error::DotkeepError;
use crate::error::Result;
use std::path::PathBuf;

/// Default name of the backup output next to the recipe.
pub const DEFAULT_OUTPUT_NAME: &str = "dotkeep";

/// Settings shared by every backup and restore run.
///
/// # Examples
///
/// ```
/// use dotkeep_core::RunConfig;
///
/// let config = RunConfig::new(env!("CARGO_PKG_VERSION"))
///     .with_home_dir(Some("/home/me".into()))
///     .with_encrypt(true);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.output_name, "dotkeep");
/// ```
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Version of the calling application, used in logs and reports.
    pub version: String,

    /// Directory `~/` expands to. `None` makes `~/` paths an error.
    pub home_dir: Option<PathBuf>,

    /// Shell used to run command entries as `<shell> -c <command>`.
    ///
    /// Default: `sh`.
    pub shell: PathBuf,

    /// Name of the backup output, created next to the recipe.
    ///
    /// Default: `dotkeep`.
    pub output_name: String,

    /// Encrypt the backup even if the recipe has no salt yet.
    ///
    /// Default: `false`.
    pub encrypt: bool,
}

impl RunConfig {
    /// Creates a configuration with defaults for everything but the version.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            home_dir: None,
            shell: PathBuf::from("sh"),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            encrypt: false,
        }
    }

    /// Sets the home directory.
    #[must_use]
    pub fn with_home_dir(mut self, home: Option<PathBuf>) -> Self {
        self.home_dir = home;
        self
    }

    /// Sets the shell.
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Sets the output name.
    #[must_use]
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    /// Sets whether to force encryption.
    #[must_use]
    pub fn with_encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the output name is empty, contains a path
    /// separator or is a relative path component, or if the shell is empty.
    pub fn validate(&self) -> Result<()> {
        let name = self.output_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(DotkeepError::InvalidConfig {
                reason: format!("output name {name:?} must be a plain file name"),
            });
        }

        if self.shell.as_os_str().is_empty() {
            return Err(DotkeepError::InvalidConfig {
                reason: "shell must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
