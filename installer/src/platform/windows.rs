//! Windows installation: prebuilt DLLs and in-place `php.ini` edits.

use super::{Architecture, PlatformStrategy};
use crate::artefact::download::repository_url;
use crate::error::{InstallerError, Result};
use crate::options::Options;
use crate::orchestrator::InstallContext;
use crate::paths::{absolute, same_size};
use crate::registrar::{
    BackupOutcome, WINDOWS_MODULE_FILE, backup_config, register_in_config_file,
};
use crate::reporter::Reporter;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use std::fs;

/// Libraries the extension links against, installed next to `php.exe`.
const RUNTIME_LIBRARIES: [&str; 2] = ["pthreadVC2.dll", "ton_client.dll"];

/// Strategy for Windows PHP builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsStrategy;

impl WindowsStrategy {
    fn architecture(options: &Options) -> Result<Architecture> {
        options
            .architecture
            .ok_or_else(|| InstallerError::invalid_options("Cannot determine OS architecture."))
    }
}

impl PlatformStrategy for WindowsStrategy {
    fn download_url(&self, options: &Options) -> Result<String> {
        let arch = Self::architecture(options)?;
        let version = &options.version;
        let suffix = if options.thread_safe { "" } else { "-nts" };
        Ok(format!(
            "{}/releases/download/{version}/ton-client-{version}{suffix}-Win32-vc15-{arch}.zip",
            repository_url()
        ))
    }

    fn unpack(
        &self,
        context: &InstallContext<'_>,
        archive: &Utf8Path,
        reporter: &mut Reporter<'_>,
    ) -> Result<Utf8PathBuf> {
        let options = context.options;
        let module_path = absolute(&options.extension_dir.join(WINDOWS_MODULE_FILE))?;
        if options.flags.skip_unpack {
            reporter.inform("Skipping unpacking and installing files...");
            return Ok(module_path);
        }

        reporter.inform("Unpacking and installing files...");
        let folder = format!("build/release/{}", Self::architecture(options)?);
        let batches: [(&[&str], &Utf8Path); 2] = [
            (&RUNTIME_LIBRARIES, &options.runtime_bin_dir),
            (&[WINDOWS_MODULE_FILE], &options.extension_dir),
        ];
        for (files, dest) in batches {
            install_files(context, archive, &folder, files, dest, reporter)?;
        }
        Ok(module_path)
    }

    fn register(
        &self,
        context: &InstallContext<'_>,
        module_path: &Utf8Path,
        reporter: &mut Reporter<'_>,
    ) -> Result<()> {
        let options = context.options;
        let Some(config) = options
            .config_file()
            .filter(|_| !options.flags.skip_config_edit)
        else {
            reporter.inform("Skip updating ini file.");
            return Ok(());
        };

        reporter.inform(format!("Updating {config}..."));
        if options.flags.skip_backup {
            reporter.inform(format!("Skipping making backup file for {config}."));
        } else {
            match backup_config(config, &options.version)? {
                BackupOutcome::Created(backup) => {
                    reporter.inform(format!("Copying {config} into {backup}"));
                }
                BackupOutcome::AlreadyExists(backup) => {
                    reporter.inform(format!("Backup file {backup} already exists."));
                }
            }
        }

        register_in_config_file(config, module_path)?;
        reporter.inform(format!("Extension location updated in {config}."));
        Ok(())
    }
}

/// Extract `files` from `folder` in the archive into the temp dir, then copy
/// them one at a time into `dest`.
fn install_files(
    context: &InstallContext<'_>,
    archive: &Utf8Path,
    folder: &str,
    files: &[&str],
    dest: &Utf8Path,
    reporter: &mut Reporter<'_>,
) -> Result<()> {
    let temp_dir = &context.options.temp_dir;
    let entries: Vec<String> = files.iter().map(|file| format!("{folder}/{file}")).collect();
    reporter.inform(format!(
        "Extracting files {} into {temp_dir}",
        entries.join(", ")
    ));
    let extracted = context
        .tools
        .unpacker
        .extract_entries(archive, &entries, temp_dir)
        .map_err(|source| InstallerError::Extraction {
            archive: archive.to_owned(),
            source,
        })?;

    for (staged, file) in extracted.iter().zip(files) {
        let target = dest.join(file);
        reporter.inform(format!("Copying {staged} into {target}..."));
        let copied = copy_unless_present(staged, &target, reporter);
        if let Err(err) = fs::remove_file(staged) {
            debug!("failed to remove staged file {staged}: {err}");
        }
        copied?;
    }
    Ok(())
}

fn copy_unless_present(
    source: &Utf8Path,
    target: &Utf8Path,
    reporter: &mut Reporter<'_>,
) -> Result<()> {
    if same_size(source, target) {
        reporter.inform(format!("File {target} already copied."));
        return Ok(());
    }
    fs::copy(source, target).map_err(|source_err| InstallerError::CopyFailed {
        from: source.to_owned(),
        to: target.to_owned(),
        source: source_err,
    })?;
    Ok(())
}

#[cfg(test)]
#[path = "windows_tests.rs"]
mod tests;
