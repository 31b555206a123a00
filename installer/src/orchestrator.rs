//! Installation orchestration.
//!
//! [`Orchestrator`] owns the fixed install sequence (check the installed
//! version, validate the environment, download, unpack, register, report)
//! and the error policy: a fatal error is reported exactly once, and the temp
//! directory guard is released on every exit path. Platform differences are
//! delegated to a [`PlatformStrategy`].

use crate::artefact::download::{ArchiveFetcher, archive_file_name};
use crate::artefact::extraction::ArchiveUnpacker;
use crate::command::CommandExecutor;
use crate::error::{InstallerError, Result};
use crate::options::Options;
use crate::paths::is_writable_dir;
use crate::platform::{PlatformStrategy, strategy_for};
use crate::probe::PhpRuntime;
use crate::reporter::Reporter;
use crate::staging::StagingDir;
use crate::verify::check_transcript;
use crate::version::{compare_versions, should_install};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::cmp::Ordering;
use std::fs;
use std::io;

/// Oldest PHP release the extension supports.
pub const MIN_PHP_VERSION: &str = "7.4";

/// External collaborators borrowed for one run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// The PHP runtime being provisioned.
    pub runtime: &'a dyn PhpRuntime,
    /// Downloads release archives.
    pub fetcher: &'a dyn ArchiveFetcher,
    /// Unpacks release archives.
    pub unpacker: &'a dyn ArchiveUnpacker,
    /// Runs build scripts and locates tools.
    pub executor: &'a dyn CommandExecutor,
}

/// Everything a [`PlatformStrategy`] step needs.
#[derive(Clone, Copy)]
pub struct InstallContext<'a> {
    /// Resolved options.
    pub options: &'a Options,
    /// Borrowed collaborators.
    pub tools: &'a Collaborators<'a>,
}

/// How a successful [`Orchestrator::install`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The extension was installed and registered.
    Installed,
    /// An equal or newer version is already loaded; nothing was changed.
    AlreadyInstalled {
        /// Version reported by the runtime.
        version: String,
    },
}

/// Drives one `install` or `verify` run.
pub struct Orchestrator<'a> {
    options: &'a Options,
    tools: &'a Collaborators<'a>,
    strategy: &'a dyn PlatformStrategy,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator using the strategy for `options.platform`.
    #[must_use]
    pub fn new(options: &'a Options, tools: &'a Collaborators<'a>) -> Self {
        Self::with_strategy(options, tools, strategy_for(options.platform))
    }

    /// Create an orchestrator with an explicit platform strategy.
    #[must_use]
    pub const fn with_strategy(
        options: &'a Options,
        tools: &'a Collaborators<'a>,
        strategy: &'a dyn PlatformStrategy,
    ) -> Self {
        Self {
            options,
            tools,
            strategy,
        }
    }

    /// Install the extension.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error after reporting it. The temp directory is
    /// released whether or not the run succeeds.
    pub fn install(&self, reporter: &mut Reporter<'_>) -> Result<InstallOutcome> {
        let staging = StagingDir::for_options(self.options);
        let result = self.run_install(reporter);
        if let Err(err) = &result {
            reporter.error(err);
        }
        staging.release(reporter);
        result
    }

    /// Check that the installed extension loads and reports the requested
    /// version.
    ///
    /// Returns the version reported by `client.version`.
    ///
    /// # Errors
    ///
    /// Returns a verification error after reporting it.
    pub fn verify(&self, reporter: &mut Reporter<'_>) -> Result<String> {
        let staging = StagingDir::for_options(self.options);
        let result = self.run_verify(reporter);
        if let Err(err) = &result {
            reporter.error(err);
        }
        staging.release(reporter);
        result
    }

    const fn context(&self) -> InstallContext<'a> {
        InstallContext {
            options: self.options,
            tools: self.tools,
        }
    }

    fn run_install(&self, reporter: &mut Reporter<'_>) -> Result<InstallOutcome> {
        let options = self.options;
        let context = self.context();
        let php_version = self.tools.runtime.version()?;
        let url = self.strategy.download_url(options)?;

        reporter.verbose(format!(
            concat!(
                "TON SDK {version} PHP EXTENSION INSTALLER\n",
                "PHP version: {php_version}\n",
                "Download URL: {url}\n",
                "{options}",
            ),
            version = options.version,
            php_version = php_version,
            url = url,
            options = options,
        ));

        if let Some(version) = self.check_installed(reporter)? {
            reporter.inform("OK");
            return Ok(InstallOutcome::AlreadyInstalled { version });
        }

        self.strategy.check_before_install(&context, reporter)?;
        self.check_environment(&php_version, reporter)?;

        let archive = self.download(&url, reporter)?;
        let module_path = self.strategy.unpack(&context, &archive, reporter)?;
        self.remove_archive(&archive, reporter);
        self.strategy.register(&context, &module_path, reporter)?;

        reporter.inform("OK");
        Ok(InstallOutcome::Installed)
    }

    /// Returns the installed version when there is nothing to do.
    fn check_installed(&self, reporter: &mut Reporter<'_>) -> Result<Option<String>> {
        let options = self.options;
        let Some(installed) = self.tools.runtime.extension_version()? else {
            reporter.inform("No extension previously installed");
            return Ok(None);
        };
        reporter.inform(format!("Previously installed version: {installed}"));
        if should_install(&options.version, Some(&installed), options.flags.force_install) {
            reporter.inform(format!("Installing new version: {}", options.version));
            return Ok(None);
        }
        reporter.inform("Nothing to install.");
        Ok(Some(installed))
    }

    fn check_environment(&self, php_version: &str, reporter: &mut Reporter<'_>) -> Result<()> {
        if compare_versions(php_version, MIN_PHP_VERSION) == Ordering::Less {
            return Err(InstallerError::RuntimeTooOld {
                required: MIN_PHP_VERSION,
                found: php_version.to_owned(),
            });
        }
        reporter.verbose(format!("PHP version {php_version} >= {MIN_PHP_VERSION}: OK"));

        for dir in [&self.options.extension_dir, &self.options.runtime_bin_dir] {
            if !is_writable_dir(dir) {
                return Err(InstallerError::DirectoryNotWritable { path: dir.clone() });
            }
            reporter.verbose(format!("Directory {dir} is writable: OK"));
        }
        Ok(())
    }

    fn download(&self, url: &str, reporter: &mut Reporter<'_>) -> Result<Utf8PathBuf> {
        let flags = self.options.flags;
        let archive = self.options.temp_dir.join(archive_file_name(url));

        if !flags.skip_download {
            reporter.inform(format!("Downloading {url}..."));
            self.tools.fetcher.fetch(url, &archive)?;
            reporter.inform(format!("Downloaded to {archive}."));
            return Ok(archive);
        }

        reporter.inform("Skipping download.");
        if !flags.skip_unpack {
            if !archive.is_file() {
                return Err(InstallerError::ArchiveMissing { path: archive });
            }
            reporter.inform(format!("Using existing archive from {archive}."));
        }
        Ok(archive)
    }

    fn remove_archive(&self, archive: &Utf8Path, reporter: &mut Reporter<'_>) {
        if self.options.flags.skip_cleanup {
            reporter.inform(format!("Skip removing archive file {archive}"));
            return;
        }
        match fs::remove_file(archive) {
            Ok(()) => reporter.inform(format!("Removing file {archive}.")),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("archive {archive} already absent");
            }
            Err(err) => {
                warn!("failed to remove {archive}: {err}");
                reporter.warn(format!("Failed to remove file {archive}."));
            }
        }
    }

    fn run_verify(&self, reporter: &mut Reporter<'_>) -> Result<String> {
        reporter.verbose("Running tests...");
        if self.tools.runtime.extension_version()?.is_none() {
            return Err(InstallerError::ModuleNotLoaded);
        }
        let transcript = self.tools.runtime.client_transcript()?;
        let version = check_transcript(&transcript, &self.options.version)?;
        reporter.inform(format!("Version returned by client.version: {version}"));
        reporter.inform("OK");
        Ok(version)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
