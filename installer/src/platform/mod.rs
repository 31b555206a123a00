//! Platform-specific installation strategies.
//!
//! The orchestrator runs the same sequence on every host; only the download
//! URL, extra pre-install checks, unpacking, and registration differ. Windows
//! ships prebuilt DLLs and a monolithic `php.ini` edited in place. POSIX hosts
//! build from a source snapshot and register through a drop-in ini file in
//! the scan directory.
//!
//! # Sub-modules
//!
//! - [`windows`]: prebuilt zip unpacking and `php.ini` rewriting.
//! - [`posix`]: source build via the bundled scripts and drop-in ini file.

pub mod posix;
pub mod windows;

use crate::error::{InstallerError, Result};
use crate::options::Options;
use crate::orchestrator::InstallContext;
use crate::reporter::Reporter;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::str::FromStr;

pub use posix::PosixStrategy;
pub use windows::WindowsStrategy;

/// OS family of the PHP runtime being provisioned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Platform {
    /// Linux, macOS, and other Unix-like hosts.
    #[default]
    Posix,
    /// Windows hosts.
    Windows,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posix => f.write_str("POSIX"),
            Self::Windows => f.write_str("Windows"),
        }
    }
}

/// CPU architecture of a Windows PHP build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    /// 32-bit build.
    X86,
    /// 64-bit build.
    X64,
}

impl Architecture {
    /// Label used in release archive names and paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = InstallerError;

    /// Parse an architecture label as printed by `phpinfo` or passed on the
    /// command line.
    ///
    /// # Examples
    ///
    /// ```
    /// use ton_client_installer::platform::Architecture;
    ///
    /// assert_eq!("x64".parse::<Architecture>().ok(), Some(Architecture::X64));
    /// assert_eq!("AMD64".parse::<Architecture>().ok(), Some(Architecture::X64));
    /// assert!("arm64".parse::<Architecture>().is_err());
    /// ```
    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "x64" | "x86_64" | "amd64" => Ok(Self::X64),
            "x86" | "i386" | "i686" | "win32" => Ok(Self::X86),
            _ => Err(InstallerError::invalid_options(format!(
                "Unsupported architecture: {value} (expected x86 or x64)."
            ))),
        }
    }
}

/// Per-platform steps of the installation sequence.
pub trait PlatformStrategy {
    /// Build the release archive URL for the requested version.
    ///
    /// # Errors
    ///
    /// Returns an error if a value the URL depends on is unresolved.
    fn download_url(&self, options: &Options) -> Result<String>;

    /// Platform-specific checks run before the shared environment checks.
    ///
    /// # Errors
    ///
    /// Returns an environment error if a prerequisite is missing.
    fn check_before_install(
        &self,
        context: &InstallContext<'_>,
        reporter: &mut Reporter<'_>,
    ) -> Result<()> {
        let _ = (context, reporter);
        Ok(())
    }

    /// Unpack the archive and install the binaries into their destination
    /// directories.
    ///
    /// Returns the path of the installed extension module.
    ///
    /// # Errors
    ///
    /// Returns archive or build errors.
    fn unpack(
        &self,
        context: &InstallContext<'_>,
        archive: &Utf8Path,
        reporter: &mut Reporter<'_>,
    ) -> Result<Utf8PathBuf>;

    /// Register the installed module with the runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns registration errors.
    fn register(
        &self,
        context: &InstallContext<'_>,
        module_path: &Utf8Path,
        reporter: &mut Reporter<'_>,
    ) -> Result<()>;
}

/// Select the strategy for `platform`.
#[must_use]
pub fn strategy_for(platform: Platform) -> &'static dyn PlatformStrategy {
    match platform {
        Platform::Windows => &WindowsStrategy,
        Platform::Posix => &PosixStrategy,
    }
}
