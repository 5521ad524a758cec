//! Shell execution for command entries.

use crate::error::DotkeepError;
use crate::error::Result;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::process::Stdio;
use tracing::debug;

/// Runs command lines through `<shell> -c`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: PathBuf,
}

impl ShellRunner {
    /// Creates a runner using `shell`.
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// The shell binary.
    #[must_use]
    pub fn shell(&self) -> &Path {
        &self.shell
    }

    /// Runs `command` and returns its standard output.
    ///
    /// # Errors
    ///
    /// Returns `Process` if the shell cannot start or the command exits
    /// unsuccessfully.
    pub fn capture(&self, command: &str) -> Result<Vec<u8>> {
        debug!(command, "running backup command");
        let output = self
            .base(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_failed(command, &e))?;

        check(command, &output)?;
        Ok(output.stdout)
    }

    /// Runs `command` with `input` on its standard input.
    ///
    /// # Errors
    ///
    /// Returns `Process` if the shell cannot start or the command exits
    /// unsuccessfully.
    pub fn feed(&self, command: &str, input: &[u8]) -> Result<()> {
        debug!(command, input = input.len(), "running restore command");
        let mut child = self
            .base(command)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_failed(command, &e))?;

        // Write from a scoped thread so a child that fills its stdout pipe
        // before draining stdin cannot deadlock us.
        let output = std::thread::scope(|scope| {
            let stdin = child.stdin.take();
            let writer = scope.spawn(move || -> std::io::Result<()> {
                if let Some(mut stdin) = stdin {
                    match stdin.write_all(input) {
                        // The command may legitimately exit without reading.
                        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                        other => other?,
                    }
                }
                Ok(())
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            output.and_then(|output| written.map(|()| output))
        })?;

        check(command, &output)
    }

    fn base(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new("sh")
    }
}

fn spawn_failed(command: &str, e: &std::io::Error) -> DotkeepError {
    DotkeepError::Process {
        command: command.to_string(),
        status: None,
        stderr: e.to_string(),
    }
}

fn check(command: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    Err(DotkeepError::Process {
        command: command.to_string(),
        status: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
    })
}
