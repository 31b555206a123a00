//! Validated installer configuration.
//!
//! [`resolve`] layers command-line overrides over the facts probed from the
//! PHP runtime and computed defaults, then validates the result. The only
//! side effect before validation succeeds is creating the temp directory,
//! and [`Options::temp_dir_created`] records whether this run owns it.

use crate::cli::Cli;
use crate::error::{InstallerError, Result};
use crate::paths::{is_writable_dir, is_writable_file};
use crate::platform::{Architecture, Platform};
use crate::probe::HostFacts;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fmt;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// Where the extension is registered with PHP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigTarget {
    /// Windows `php.ini`, edited in place.
    IniFile(Utf8PathBuf),
    /// POSIX directory scanned for additional ini files.
    ScanDir(Utf8PathBuf),
    /// Configuration editing is skipped on Windows; no ini file is managed.
    Unmanaged,
}

/// Behaviour toggles taken verbatim from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "each flag maps one-to-one onto a command-line switch"
)]
pub struct InstallFlags {
    /// Install even if the same or a newer version is present.
    pub force_install: bool,
    /// Reuse an archive already in the temp directory.
    pub skip_download: bool,
    /// Do not unpack the archive.
    pub skip_unpack: bool,
    /// Keep the archive and the temp directory.
    pub skip_cleanup: bool,
    /// Leave the PHP configuration untouched.
    pub skip_config_edit: bool,
    /// Do not back up `php.ini` before editing it.
    pub skip_backup: bool,
    /// Do not run the build script.
    pub skip_build: bool,
    /// Suppress console output.
    pub silent: bool,
    /// Print extra information.
    pub verbose: bool,
    /// Verify instead of installing.
    pub test_only: bool,
}

/// Fully resolved and validated installer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Extension version to install or verify.
    pub version: String,
    /// OS family of the PHP runtime.
    pub platform: Platform,
    /// Architecture of the PHP build; always set on Windows.
    pub architecture: Option<Architecture>,
    /// Whether thread-safe binaries are required.
    pub thread_safe: bool,
    /// Destination of the extension module.
    pub extension_dir: Utf8PathBuf,
    /// Destination of the runtime libraries (the PHP binary directory).
    pub runtime_bin_dir: Utf8PathBuf,
    /// Working directory for the archive and unpacked files.
    pub temp_dir: Utf8PathBuf,
    /// True if this run created `temp_dir` and may remove it.
    pub temp_dir_created: bool,
    /// TON SDK installation directory used by the POSIX build.
    pub sdk_dir: Utf8PathBuf,
    /// Registration target.
    pub config: ConfigTarget,
    /// Behaviour toggles.
    pub flags: InstallFlags,
    /// File receiving a copy of all output.
    pub output_file: Option<Utf8PathBuf>,
}

impl Options {
    /// Returns the `php.ini` path when one is managed.
    #[must_use]
    pub fn config_file(&self) -> Option<&Utf8Path> {
        match &self.config {
            ConfigTarget::IniFile(path) => Some(path),
            _ => None,
        }
    }

    /// Returns the ini scan directory when one is managed.
    #[must_use]
    pub fn config_dir(&self) -> Option<&Utf8Path> {
        match &self.config {
            ConfigTarget::ScanDir(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let display_opt =
            |value: Option<&Utf8Path>| value.map_or(String::new(), ToString::to_string);
        let flags = &self.flags;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Platform: {}", self.platform)?;
        writeln!(
            f,
            "Arch: {}",
            self.architecture.map_or("", Architecture::as_str)
        )?;
        writeln!(f, "Output file: {}", display_opt(self.output_file.as_deref()))?;
        writeln!(f, "Extension directory: {}", self.extension_dir)?;
        writeln!(f, "PHP binary directory: {}", self.runtime_bin_dir)?;
        writeln!(f, "SDK directory: {}", self.sdk_dir)?;
        writeln!(f, "Temp directory: {}", self.temp_dir)?;
        writeln!(f, "INI file: {}", display_opt(self.config_file()))?;
        writeln!(f, "INI dir: {}", display_opt(self.config_dir()))?;
        writeln!(f, "Thread safety: {}", self.thread_safe)?;
        writeln!(f, "Skip download: {}", flags.skip_download)?;
        writeln!(f, "Skip cleanup: {}", flags.skip_cleanup)?;
        writeln!(f, "Skip unpack: {}", flags.skip_unpack)?;
        writeln!(f, "Skip INI: {}", flags.skip_config_edit)?;
        writeln!(f, "Skip backup: {}", flags.skip_backup)?;
        writeln!(f, "Skip build: {}", flags.skip_build)?;
        writeln!(f, "Force install: {}", flags.force_install)?;
        writeln!(f, "Silent: {}", flags.silent)?;
        writeln!(f, "Verbose: {}", flags.verbose)?;
        write!(f, "Test: {}", flags.test_only)
    }
}

/// Build validated [`Options`] from the command line and probed host facts.
///
/// Command-line overrides win over probed values, which win over computed
/// defaults. Checks run in a fixed order so the first problem reported is
/// stable; the temp directory is created last, after every other check has
/// passed.
///
/// # Errors
///
/// Returns [`InstallerError::InvalidOptions`] describing the first failed
/// check.
pub fn resolve(cli: &Cli, facts: &HostFacts) -> Result<Options> {
    let version = cli
        .module_version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| InstallerError::invalid_options("Version not specified."))?
        .to_owned();

    let platform = facts.platform;
    let config = resolve_config_target(cli, facts)?;
    let architecture = resolve_architecture(cli, facts)?;

    let extension_dir = cli
        .force_ext_dir
        .clone()
        .or_else(|| facts.extension_dir.clone())
        .ok_or_else(|| {
            InstallerError::invalid_options("Cannot determine PHP extension directory.")
        })?;
    let runtime_bin_dir = cli
        .force_exe_dir
        .clone()
        .or_else(|| facts.binary_dir.clone())
        .ok_or_else(|| InstallerError::invalid_options("Cannot determine PHP binary directory."))?;
    let sdk_dir = cli
        .force_sdk_dir
        .clone()
        .unwrap_or_else(|| extension_dir.join("ton-sdk"));

    let temp_dir = match &cli.force_tmp_dir {
        Some(dir) => dir.clone(),
        None => default_temp_dir()?,
    };
    let temp_dir_created = ensure_temp_dir(&temp_dir)?;

    let options = Options {
        version,
        platform,
        architecture,
        thread_safe: cli.force_thread_safe || facts.thread_safe,
        extension_dir,
        runtime_bin_dir,
        temp_dir,
        temp_dir_created,
        sdk_dir,
        config,
        flags: InstallFlags {
            force_install: cli.force_install,
            skip_download: cli.skip_download,
            skip_unpack: cli.skip_unpack,
            skip_cleanup: cli.skip_cleanup,
            skip_config_edit: cli.skip_ini,
            skip_backup: cli.skip_backup,
            skip_build: cli.skip_build,
            silent: cli.silent,
            verbose: cli.verbose,
            test_only: cli.test_only,
        },
        output_file: cli.output.clone(),
    };
    debug!("resolved options: {options:?}");
    Ok(options)
}

fn resolve_config_target(cli: &Cli, facts: &HostFacts) -> Result<ConfigTarget> {
    match facts.platform {
        Platform::Windows => {
            if cli.skip_ini {
                return Ok(ConfigTarget::Unmanaged);
            }
            let file = cli
                .force_ini_file
                .clone()
                .or_else(|| facts.ini_file.clone())
                .ok_or_else(|| {
                    InstallerError::invalid_options("Cannot determine PHP INI file location.")
                })?;
            if !file.is_file() {
                return Err(InstallerError::invalid_options(format!(
                    "PHP ini file doesn't exist: {file}"
                )));
            }
            if !is_writable_file(&file) {
                return Err(InstallerError::invalid_options(format!(
                    "PHP ini file is not writable: {file}"
                )));
            }
            Ok(ConfigTarget::IniFile(file))
        }
        Platform::Posix => {
            let dir = facts.ini_dir.clone().ok_or_else(|| {
                InstallerError::invalid_options("Cannot determine PHP INI files location.")
            })?;
            if !dir.is_dir() {
                return Err(InstallerError::invalid_options(format!(
                    "{dir} is not a directory."
                )));
            }
            if !is_writable_dir(&dir) {
                return Err(InstallerError::invalid_options(format!(
                    "Directory {dir} is not writable."
                )));
            }
            Ok(ConfigTarget::ScanDir(dir))
        }
    }
}

fn resolve_architecture(cli: &Cli, facts: &HostFacts) -> Result<Option<Architecture>> {
    if facts.platform != Platform::Windows {
        return Ok(None);
    }
    let raw = cli
        .force_arch
        .as_deref()
        .or(facts.architecture.as_deref())
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| InstallerError::invalid_options("Cannot determine OS architecture."))?;
    raw.parse().map(Some)
}

/// Returns `<system temp>/ton_client_php_ext.<unix seconds>.tmp`.
///
/// # Errors
///
/// Returns an error if the system temp directory is not valid UTF-8.
pub fn default_temp_dir() -> Result<Utf8PathBuf> {
    let base = Utf8PathBuf::try_from(std::env::temp_dir()).map_err(|err| {
        InstallerError::invalid_options(format!(
            "System temp directory is not valid UTF-8: {}",
            err.as_path().display()
        ))
    })?;
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    Ok(base.join(format!("ton_client_php_ext.{secs}.tmp")))
}

/// Create `dir` if it is missing; returns true if it was created here.
fn ensure_temp_dir(dir: &Utf8Path) -> Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }
    fs::create_dir(dir)
        .map(|()| true)
        .map_err(|_| InstallerError::invalid_options(format!("Failed to create temp dir: {dir}")))
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
