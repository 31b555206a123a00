//! External command execution.
//!
//! The installer shells out to the PHP binary to inspect the runtime and, on
//! POSIX hosts, to the SDK install and build scripts shipped in the source
//! archive. All of that goes through [`CommandExecutor`] so tests can stub it.

use log::debug;
use std::io;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ton_client_installer::command::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("php", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    fn run(&self, program: &str, args: &[&str]) -> io::Result<Output>;

    /// Returns true if `program` can be found on `PATH`.
    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<Output> {
        debug!("running {program} {}", args.join(" "));
        Command::new(program).args(args).output()
    }
}

/// Formats a failed command's exit status and trimmed stderr for messages.
#[must_use]
pub fn describe_failure(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        format!("exited with {}: {stderr}", output.status)
    }
}
