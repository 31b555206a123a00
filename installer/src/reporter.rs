//! User-facing progress reporting.
//!
//! Status lines go to stdout unless `--silent` is set, and are always
//! appended to the `--output` file when one is configured. Errors go to stderr
//! (again unless silent) and are appended to the output file with an
//! `[ERROR]` prefix. Sinks are borrowed so tests can capture output.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;

/// Reporting behaviour derived from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReporterSettings {
    /// Suppress console output.
    pub silent: bool,
    /// Emit verbose messages.
    pub verbose: bool,
    /// File that receives a copy of every message.
    pub output_file: Option<Utf8PathBuf>,
}

/// Writes progress, warnings, and errors to the console and output file.
pub struct Reporter<'a> {
    settings: ReporterSettings,
    stdout: &'a mut dyn Write,
    stderr: &'a mut dyn Write,
}

impl<'a> Reporter<'a> {
    /// Create a reporter writing to the given console sinks.
    ///
    /// # Examples
    ///
    /// ```
    /// use ton_client_installer::reporter::{Reporter, ReporterSettings};
    ///
    /// let mut out = Vec::new();
    /// let mut err = Vec::new();
    /// let mut reporter = Reporter::new(ReporterSettings::default(), &mut out, &mut err);
    /// reporter.inform("OK");
    /// reporter.verbose("hidden");
    /// drop(reporter);
    /// assert_eq!(String::from_utf8(out).unwrap(), "OK\n");
    /// ```
    pub fn new(
        settings: ReporterSettings,
        stdout: &'a mut dyn Write,
        stderr: &'a mut dyn Write,
    ) -> Self {
        Self {
            settings,
            stdout,
            stderr,
        }
    }

    /// Report a status line.
    pub fn inform(&mut self, message: impl Display) {
        let message = message.to_string();
        self.append_to_output_file(&message);
        if !self.settings.silent {
            write_line(self.stdout, &message);
        }
    }

    /// Report a status line only in verbose mode.
    pub fn verbose(&mut self, message: impl Display) {
        if self.settings.verbose {
            self.inform(message);
        }
    }

    /// Report a non-fatal problem.
    pub fn warn(&mut self, message: impl Display) {
        self.inform(format!("WARNING: {message}"));
    }

    /// Report a fatal error.
    pub fn error(&mut self, message: impl Display) {
        let message = message.to_string();
        self.append_to_output_file(&format!("[ERROR] {message}"));
        if !self.settings.silent {
            write_line(self.stderr, &message);
        }
    }

    fn append_to_output_file(&self, message: &str) {
        let Some(path) = self.settings.output_file.as_deref() else {
            return;
        };
        if let Err(err) = append_line(path, message) {
            warn!("failed to append to {path}: {err}");
        }
    }
}

fn append_line(path: &Utf8Path, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{message}")
}

fn write_line(sink: &mut dyn Write, message: &str) {
    if let Err(err) = writeln!(sink, "{message}") {
        debug!("failed to write console line: {err}");
    }
}
