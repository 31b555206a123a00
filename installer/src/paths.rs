//! Filesystem probes shared by validation and the install steps.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, OpenOptions};
use std::io;

/// Make `path` absolute against the current directory without touching the
/// filesystem.
///
/// # Errors
///
/// Returns an error if the current directory is unavailable or not UTF-8.
pub fn absolute(path: &Utf8Path) -> io::Result<Utf8PathBuf> {
    let absolute = std::path::absolute(path)?;
    Utf8PathBuf::try_from(absolute).map_err(camino::FromPathBufError::into_io_error)
}

/// Returns true if a file can be created inside `dir`.
///
/// Permission bits are not consulted; a throwaway temp file is created and
/// removed instead, so ACLs and read-only mounts are handled too.
#[must_use]
pub fn is_writable_dir(dir: &Utf8Path) -> bool {
    dir.is_dir() && tempfile::NamedTempFile::new_in(dir).is_ok()
}

/// Returns true if `file` exists and can be opened for appending.
///
/// The file is not modified.
#[must_use]
pub fn is_writable_file(file: &Utf8Path) -> bool {
    file.is_file() && OpenOptions::new().append(true).open(file).is_ok()
}

/// Returns true if both files exist and have the same length.
///
/// This is the cheap "already done" check used for copies and backups; it
/// does not compare contents.
#[must_use]
pub fn same_size(left: &Utf8Path, right: &Utf8Path) -> bool {
    match (fs::metadata(left), fs::metadata(right)) {
        (Ok(l), Ok(r)) => l.is_file() && r.is_file() && l.len() == r.len(),
        _ => false,
    }
}

/// Returns true if `dir` is a directory with at least one entry.
#[must_use]
pub fn is_populated_dir(dir: &Utf8Path) -> bool {
    fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_some())
}
