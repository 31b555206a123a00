//! Scoped ownership of the installer's temp directory.
//!
//! Only a directory created by this run is ever removed, and only when
//! cleanup is not skipped. [`StagingDir::release`] performs the removal and
//! reports it; dropping an unreleased guard removes the directory quietly so
//! early returns and panics do not leak it.

use crate::options::Options;
use crate::reporter::Reporter;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use std::fs;
use std::io;

/// Guard over the temp directory used for downloads and unpacking.
#[derive(Debug)]
pub struct StagingDir {
    path: Utf8PathBuf,
    removable: bool,
    released: bool,
}

impl StagingDir {
    /// Create a guard for `path`.
    ///
    /// `owned` records whether this run created the directory; `keep` is the
    /// skip-cleanup flag.
    #[must_use]
    pub fn new(path: Utf8PathBuf, owned: bool, keep: bool) -> Self {
        Self {
            path,
            removable: owned && !keep,
            released: false,
        }
    }

    /// Create a guard for the temp directory described by `options`.
    #[must_use]
    pub fn for_options(options: &Options) -> Self {
        Self::new(
            options.temp_dir.clone(),
            options.temp_dir_created,
            options.flags.skip_cleanup,
        )
    }

    /// Remove the directory if this run owns it, reporting the outcome.
    ///
    /// Failure to remove is a warning, never an error. Returns true if the
    /// directory no longer exists.
    pub fn release(mut self, reporter: &mut Reporter<'_>) -> bool {
        self.released = true;
        if !self.removable {
            debug!("keeping temp dir {}", self.path);
            return false;
        }
        reporter.inform(format!("Removing tmp dir {}.", self.path));
        match remove_tree(&self.path) {
            Ok(()) => true,
            Err(err) => {
                warn!("failed to remove {}: {err}", self.path);
                reporter.warn(format!("Failed to remove tmp dir {}.", self.path));
                false
            }
        }
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.released || !self.removable {
            return;
        }
        if let Err(err) = remove_tree(&self.path) {
            warn!("failed to remove unreleased temp dir {}: {err}", self.path);
        }
    }
}

fn remove_tree(path: &Utf8Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
