//! Process spawning for interpreter calls.
//!
//! Querying the interpreter and byte-compiling the staged payload both go
//! through [`CommandExecutor`], so tests can replay scripted output instead of
//! requiring a Python installation.

use crate::error::{InstallerError, Result};
use camino::Utf8PathBuf;
use log::debug;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Io`] when the command cannot be spawned.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wheelwright_installer::command::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("python3", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), wheelwright_installer::error::InstallerError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        debug!("running {cmd} {}", args.join(" "));
        Command::new(cmd)
            .args(args)
            .output()
            .map_err(|source| InstallerError::io(&Utf8PathBuf::from(cmd), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_an_io_error() {
        let result = SystemCommandExecutor.run("definitely-not-a-real-program-4f1c", &[]);
        assert!(matches!(result, Err(InstallerError::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout() {
        let output = SystemCommandExecutor
            .run("sh", &["-c", "printf hello"])
            .expect("sh is available");
        assert!(output.status.success());
        assert_eq!(output.stdout, b"hello");
    }
}
