//! POSIX installation: source build and drop-in ini registration.
//!
//! The release tarball is a source snapshot carrying `install-sdk.sh` and
//! `build.sh`. Both scripts take the SDK directory as their only argument and
//! leave the built module at `build/modules/ton_client.so`. A non-empty
//! source directory left by an earlier run is reused instead of unpacking
//! again.

use super::PlatformStrategy;
use crate::artefact::download::repository_url;
use crate::command::describe_failure;
use crate::error::{InstallerError, Result};
use crate::options::Options;
use crate::orchestrator::InstallContext;
use crate::paths::is_populated_dir;
use crate::registrar::write_drop_in;
use crate::reporter::Reporter;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;

/// Tool required to build PHP extensions from source.
const BUILD_TOOL: &str = "phpize";

/// File name of the built extension module.
const MODULE_FILE: &str = "ton_client.so";

/// Strategy for Linux, macOS, and other Unix-like PHP builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixStrategy;

impl PosixStrategy {
    /// Directory the source tarball unpacks into.
    fn source_dir(options: &Options) -> Utf8PathBuf {
        options
            .temp_dir
            .join(format!("ton-client-php-ext-{}", options.version))
    }
}

impl PlatformStrategy for PosixStrategy {
    fn download_url(&self, options: &Options) -> Result<String> {
        Ok(format!(
            "{}/archive/{}.tar.gz",
            repository_url(),
            options.version
        ))
    }

    fn check_before_install(
        &self,
        context: &InstallContext<'_>,
        reporter: &mut Reporter<'_>,
    ) -> Result<()> {
        if !context.tools.executor.program_exists(BUILD_TOOL) {
            return Err(InstallerError::ToolMissing {
                tool: BUILD_TOOL,
                hint: "Install php-dev package (on Linux) or php via Homebrew (on Mac)",
            });
        }
        reporter.verbose(format!("{BUILD_TOOL} command exists: OK"));
        Ok(())
    }

    fn unpack(
        &self,
        context: &InstallContext<'_>,
        archive: &Utf8Path,
        reporter: &mut Reporter<'_>,
    ) -> Result<Utf8PathBuf> {
        let options = context.options;
        let source_dir = Self::source_dir(options);

        if is_populated_dir(&source_dir) {
            reporter.inform(format!("Directory {source_dir} already exists."));
        } else if options.flags.skip_unpack {
            reporter.inform("Skipping unpacking and installing files...");
        } else {
            reporter.inform("Unpacking and installing files...");
            let count = context
                .tools
                .unpacker
                .extract_all(archive, &options.temp_dir)
                .map_err(|source| InstallerError::Extraction {
                    archive: archive.to_owned(),
                    source,
                })?;
            debug!("unpacked {count} entries from {archive}");
        }
        if !source_dir.is_dir() {
            return Err(InstallerError::SourceDirMissing { path: source_dir });
        }

        run_script(context, &source_dir.join("install-sdk.sh"), reporter)?;
        if options.flags.skip_build {
            reporter.inform("Skipping build.");
        } else {
            reporter.verbose("Building PHP extension...");
            run_script(context, &source_dir.join("build.sh"), reporter)?;
        }

        install_module(options, &source_dir, reporter)
    }

    fn register(
        &self,
        context: &InstallContext<'_>,
        _module_path: &Utf8Path,
        reporter: &mut Reporter<'_>,
    ) -> Result<()> {
        let options = context.options;
        let Some(config_dir) = options
            .config_dir()
            .filter(|_| !options.flags.skip_config_edit)
        else {
            reporter.inform("Skip updating ini file.");
            return Ok(());
        };
        let ini_file = write_drop_in(config_dir)?;
        reporter.inform(format!("Extension is enabled in {ini_file}."));
        Ok(())
    }
}

/// Run a bundled script with the SDK directory as its argument.
///
/// Script output is shown in verbose mode.
fn run_script(
    context: &InstallContext<'_>,
    script: &Utf8Path,
    reporter: &mut Reporter<'_>,
) -> Result<()> {
    let sdk_dir = &context.options.sdk_dir;
    let failed = |reason: String| InstallerError::ScriptFailed {
        script: script.to_owned(),
        reason,
    };
    let output = context
        .tools
        .executor
        .run(script.as_str(), &[sdk_dir.as_str()])
        .map_err(|err| failed(err.to_string()))?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        reporter.verbose(line);
    }
    if !output.status.success() {
        return Err(failed(describe_failure(&output)));
    }
    Ok(())
}

/// Copy the built module into the extension directory.
fn install_module(
    options: &Options,
    source_dir: &Utf8Path,
    reporter: &mut Reporter<'_>,
) -> Result<Utf8PathBuf> {
    let artifact = source_dir.join("build").join("modules").join(MODULE_FILE);
    if !artifact.is_file() {
        return Err(InstallerError::ArtifactMissing { path: artifact });
    }
    let ext_dir = &options.extension_dir;
    let target = ext_dir.join(MODULE_FILE);
    reporter.verbose(format!("Copying extension file {artifact} into {ext_dir}."));
    fs::copy(&artifact, &target).map_err(|source| InstallerError::CopyFailed {
        from: artifact.clone(),
        to: target.clone(),
        source,
    })?;
    reporter.inform(format!("Extension file {artifact} copied into {ext_dir}."));
    Ok(target)
}

#[cfg(test)]
#[path = "posix_tests.rs"]
mod tests;
