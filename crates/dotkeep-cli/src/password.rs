//! Password source for encrypted recipes.

use crate::cli::PASSWORD_ENV;
use dotkeep_core::DotkeepError;
use dotkeep_core::PasswordProvider;
use std::env;
use tracing::debug;
use zeroize::Zeroizing;

/// Reads the password from `DOTKEEP_PASSWORD`, or prompts on the terminal.
///
/// Prompting asks twice when a confirmation is requested.
pub struct TerminalPassword {
    preset: Option<Zeroizing<String>>,
}

impl TerminalPassword {
    pub fn from_env() -> Self {
        let preset = env::var(PASSWORD_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .map(Zeroizing::new);
        Self { preset }
    }

    fn prompt(message: &str) -> dotkeep_core::Result<Zeroizing<String>> {
        rpassword::prompt_password(message)
            .map(Zeroizing::new)
            .map_err(|e| {
                debug!(error = %e, "password prompt unavailable");
                DotkeepError::PasswordRequired
            })
    }
}

impl PasswordProvider for TerminalPassword {
    fn password(&mut self, confirm: bool) -> dotkeep_core::Result<Zeroizing<String>> {
        if let Some(preset) = &self.preset {
            return Ok(preset.clone());
        }

        let first = Self::prompt("Password: ")?;
        if first.is_empty() {
            return Err(DotkeepError::PasswordRequired);
        }
        if confirm {
            let second = Self::prompt("Type again, for confirmation: ")?;
            check_confirmation(&first, &second)?;
        }
        Ok(first)
    }
}

fn check_confirmation(first: &str, second: &str) -> dotkeep_core::Result<()> {
    if first == second {
        Ok(())
    } else {
        Err(DotkeepError::PasswordMismatch)
    }
}
