//! Archive extraction for extension release archives.
//!
//! Windows releases are `.zip` files from which only a handful of named
//! entries are needed; POSIX releases are `.tar.gz` source snapshots that are
//! unpacked whole. Both paths validate entry names to prevent writes outside
//! the destination directory.

use camino::{Utf8Path, Utf8PathBuf};
use log::trace;
use std::fs;
use std::path::{Component, Path};

/// Trait for unpacking release archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use ton_client_installer::artefact::extraction::ReleaseUnpacker;
///
/// let unpacker = ReleaseUnpacker;
/// // Use unpacker.extract_entries(archive, entries, dest) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveUnpacker {
    /// Extract the named `entries` of the zip archive at `archive` into
    /// `dest`, preserving their relative paths.
    ///
    /// Returns the paths of the extracted files, in `entries` order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::EntryNotFound`] if an entry is absent,
    /// [`ExtractionError::PathTraversal`] for entry names escaping `dest`,
    /// and [`ExtractionError::Zip`] or [`ExtractionError::Io`] otherwise.
    fn extract_entries(
        &self,
        archive: &Utf8Path,
        entries: &[String],
        dest: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, ExtractionError>;

    /// Extract every entry of the `.tar.gz` archive at `archive` into `dest`.
    ///
    /// Returns the number of entries unpacked.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::EmptyArchive`] if nothing was unpacked,
    /// [`ExtractionError::PathTraversal`] for entries escaping `dest`, and
    /// [`ExtractionError::Io`] on I/O failures.
    fn extract_all(&self, archive: &Utf8Path, dest: &Utf8Path) -> Result<usize, ExtractionError>;
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error during extraction.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The zip container could not be read.
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A requested entry does not exist in the archive.
    #[error("archive has no entry {name}")]
    EntryNotFound {
        /// The missing entry name.
        name: String,
    },

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive contains no entries.
    #[error("archive contains no files")]
    EmptyArchive,
}

/// Default unpacker using the `zip`, `flate2`, and `tar` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseUnpacker;

impl ArchiveUnpacker for ReleaseUnpacker {
    fn extract_entries(
        &self,
        archive: &Utf8Path,
        entries: &[String],
        dest: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, ExtractionError> {
        let file = fs::File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file)?;
        let mut extracted = Vec::with_capacity(entries.len());

        for name in entries {
            validate_entry_path(Path::new(name))?;
            let mut entry = match zip.by_name(name) {
                Ok(entry) => entry,
                Err(zip::result::ZipError::FileNotFound) => {
                    return Err(ExtractionError::EntryNotFound { name: name.clone() });
                }
                Err(other) => return Err(other.into()),
            };

            let dest_path = dest.join(name);
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&dest_path)?;
            std::io::copy(&mut entry, &mut out)?;
            trace!("extracted {name} -> {dest_path}");
            extracted.push(dest_path);
        }

        Ok(extracted)
    }

    fn extract_all(&self, archive: &Utf8Path, dest: &Utf8Path) -> Result<usize, ExtractionError> {
        let file = fs::File::open(archive)?;
        let decoder = flate2::read::GzDecoder::new(file);
        let mut tarball = tar::Archive::new(decoder);
        tarball.set_preserve_permissions(true);
        let mut count = 0_usize;

        for entry_result in tarball.entries()? {
            let mut entry = entry_result?;
            if entry.header().entry_type().is_pax_global_extensions() {
                continue;
            }
            let entry_path = entry.path()?.into_owned();

            validate_entry_path(&entry_path)?;

            let dest_path = dest.as_std_path().join(&entry_path);
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }

            entry.unpack(&dest_path)?;
            trace!("unpacked {}", entry_path.display());
            count += 1;
        }

        if count == 0 {
            return Err(ExtractionError::EmptyArchive);
        }

        Ok(count)
    }
}

/// Validate that an entry path does not escape the destination directory
/// via `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
