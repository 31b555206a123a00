//! Error types for the TON Client extension installer.
//!
//! Every fatal condition the installer can hit is an [`InstallerError`]
//! variant. Variants are grouped into the coarse [`ErrorKind`] taxonomy so
//! callers and tests can reason about the failure class without matching on
//! individual variants. Messages are user-facing and name the offending path
//! or value where one exists.

use crate::artefact::download::DownloadError;
use crate::artefact::extraction::ExtractionError;
use crate::probe::ProbeError;
use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Coarse classification of installer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing options, unwritable config locations.
    Validation,
    /// Host runtime too old, required tool missing, unwritable destinations.
    Environment,
    /// Archive download failed or a reused archive is missing.
    Transport,
    /// Archive could not be opened, extracted, or installed.
    Archive,
    /// SDK install or build script failed, or produced no artifact.
    Build,
    /// Runtime configuration could not be backed up or written.
    Registration,
    /// The installed extension did not pass verification.
    Verification,
    /// Unexpected filesystem failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Validation => "validation",
            Self::Environment => "environment",
            Self::Transport => "transport",
            Self::Archive => "archive",
            Self::Build => "build",
            Self::Registration => "registration",
            Self::Verification => "verification",
            Self::Io => "io",
        };
        f.write_str(label)
    }
}

/// Errors that can occur while installing or verifying the extension.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// Options could not be resolved into a usable configuration.
    #[error("{reason}")]
    InvalidOptions {
        /// User-facing description of the invalid option.
        reason: String,
    },

    /// The PHP runtime could not be queried.
    #[error("failed to inspect PHP runtime: {0}")]
    Probe(#[from] ProbeError),

    /// The host PHP runtime is older than the supported minimum.
    #[error("PHP version {required}+ is required (found {found}).")]
    RuntimeTooOld {
        /// Minimum supported runtime version.
        required: &'static str,
        /// Version reported by the runtime.
        found: String,
    },

    /// A destination directory cannot be written to.
    #[error("Directory {path} is not writable (try running by superuser account?).")]
    DirectoryNotWritable {
        /// The directory that failed the write probe.
        path: Utf8PathBuf,
    },

    /// A tool required to build the extension is not on `PATH`.
    #[error("{tool} command doesn't exist. {hint}")]
    ToolMissing {
        /// Name of the missing executable.
        tool: &'static str,
        /// Installation guidance for the user.
        hint: &'static str,
    },

    /// The release archive could not be downloaded.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Download was skipped but no previously fetched archive exists.
    #[error("File not downloaded and doesn't exist: {path}")]
    ArchiveMissing {
        /// Where the archive was expected.
        path: Utf8PathBuf,
    },

    /// The release archive could not be unpacked.
    #[error("Failed to unpack {archive}: {source}")]
    Extraction {
        /// Path of the archive being unpacked.
        archive: Utf8PathBuf,
        /// The underlying extraction failure.
        #[source]
        source: ExtractionError,
    },

    /// An unpacked file could not be copied to its destination.
    #[error("Failed to copy {from} into {to}: {source}")]
    CopyFailed {
        /// Source file.
        from: Utf8PathBuf,
        /// Destination file.
        to: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The unpacked source tree is not where it was expected.
    #[error("{path} is not a directory")]
    SourceDirMissing {
        /// Expected source directory.
        path: Utf8PathBuf,
    },

    /// An SDK install or build script failed.
    #[error("{script} failed: {reason}")]
    ScriptFailed {
        /// The script that was invoked.
        script: Utf8PathBuf,
        /// Exit status and captured stderr.
        reason: String,
    },

    /// The build finished without producing the extension module.
    #[error("Cannot find TON Client PHP extension file {path}.")]
    ArtifactMissing {
        /// Expected location of the built module.
        path: Utf8PathBuf,
    },

    /// The configuration backup could not be written.
    #[error("Failed to back up {path}: {source}")]
    BackupFailed {
        /// The configuration file being backed up.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The runtime configuration could not be updated.
    #[error("Cannot enable extension by modifying {path}: {source}")]
    ConfigWrite {
        /// The configuration file being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The extension is not loaded by the runtime.
    #[error("No extension installed")]
    ModuleNotLoaded,

    /// A required extension function is missing.
    #[error("Function {name} doesn't exist")]
    MissingEntryPoint {
        /// Name of the missing function.
        name: String,
    },

    /// Context creation returned something other than a context handle.
    #[error("Failed to create TON context: {response}")]
    ContextCreation {
        /// Raw response returned by the runtime.
        response: String,
    },

    /// The version query returned a malformed response.
    #[error("Invalid response returned by client.version: {response}.")]
    InvalidVersionResponse {
        /// Raw response returned by the runtime.
        response: String,
    },

    /// The loaded extension reports a different version than requested.
    #[error("Wrong version returned by client.version: {actual} (expected {expected})")]
    VersionMismatch {
        /// Requested version.
        expected: String,
        /// Version reported by the extension.
        actual: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InstallerError {
    /// Returns the coarse failure class for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8PathBuf;
    /// use ton_client_installer::error::{ErrorKind, InstallerError};
    ///
    /// let err = InstallerError::ArchiveMissing {
    ///     path: Utf8PathBuf::from("/tmp/ton-client-1.2.3.zip"),
    /// };
    /// assert_eq!(err.kind(), ErrorKind::Transport);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOptions { .. } => ErrorKind::Validation,
            Self::Probe(_)
            | Self::RuntimeTooOld { .. }
            | Self::DirectoryNotWritable { .. }
            | Self::ToolMissing { .. } => ErrorKind::Environment,
            Self::Download(_) | Self::ArchiveMissing { .. } => ErrorKind::Transport,
            Self::Extraction { .. } | Self::CopyFailed { .. } | Self::SourceDirMissing { .. } => {
                ErrorKind::Archive
            }
            Self::ScriptFailed { .. } | Self::ArtifactMissing { .. } => ErrorKind::Build,
            Self::BackupFailed { .. } | Self::ConfigWrite { .. } => ErrorKind::Registration,
            Self::ModuleNotLoaded
            | Self::MissingEntryPoint { .. }
            | Self::ContextCreation { .. }
            | Self::InvalidVersionResponse { .. }
            | Self::VersionMismatch { .. } => ErrorKind::Verification,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Shorthand for an [`InstallerError::InvalidOptions`] error.
    pub fn invalid_options(reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            reason: reason.into(),
        }
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
