//! Release archive download.
//!
//! Provides a trait-based abstraction for fetching the extension release
//! archive, enabling dependency injection for testing. Downloads are a single
//! attempt: any transport failure is returned to the caller unchanged.

use camino::Utf8Path;
use log::debug;
use std::sync::OnceLock;
use std::time::Duration;

/// The GitHub repository that publishes extension releases.
pub const RELEASE_REPO: &str = "radianceteam/ton-client-php-ext";

/// Transport timeout for a whole archive download.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Trait for fetching a remote archive to a local path.
///
/// # Examples
///
/// ```
/// use ton_client_installer::artefact::download::HttpFetcher;
///
/// let fetcher = HttpFetcher;
/// // Use fetcher.fetch(url, dest) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveFetcher {
    /// Download `url` into the file at `dest`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the file cannot be written.
    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<(), DownloadError>;
}

/// Errors arising from archive downloads.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("Cannot download {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The release archive does not exist (HTTP 404).
    #[error("Cannot download {url}: release archive not found")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP-based fetcher using `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpFetcher;

/// Base URL of the release repository.
///
/// # Examples
///
/// ```
/// use ton_client_installer::artefact::download::repository_url;
///
/// assert!(repository_url().ends_with("radianceteam/ton-client-php-ext"));
/// ```
#[must_use]
pub fn repository_url() -> String {
    format!("https://github.com/{RELEASE_REPO}")
}

/// Returns the final path segment of a download URL.
///
/// The archive is stored in the temp directory under this name, so a later
/// run with `--skip-download` finds it at the same location.
///
/// # Examples
///
/// ```
/// use ton_client_installer::artefact::download::archive_file_name;
///
/// let url = "https://github.com/radianceteam/ton-client-php-ext/archive/1.2.3.tar.gz";
/// assert_eq!(archive_file_name(url), "1.2.3.tar.gz");
/// ```
#[must_use]
pub fn archive_file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<(), DownloadError> {
        debug!("GET {url} -> {dest}");
        let response = http_agent()
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        let mut file = std::fs::File::create(dest)?;
        let written = std::io::copy(&mut response.into_body().as_reader(), &mut file)
            .map_err(|e| DownloadError::HttpError {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;
        debug!("downloaded {written} bytes from {url}");
        Ok(())
    }
}

/// Shared `ureq` agent with request timeout configuration.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(DOWNLOAD_TIMEOUT))
            .build();
        ureq::Agent::new_with_config(config)
    })
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn repository_url_points_at_release_repo() {
        let url = repository_url();
        assert!(url.starts_with("https://github.com/"));
        assert!(url.contains(RELEASE_REPO));
    }

    #[rstest]
    #[case::zip(
        "https://github.com/radianceteam/ton-client-php-ext/releases/download/1.2.3/ton-client-1.2.3-nts-Win32-vc15-x64.zip",
        "ton-client-1.2.3-nts-Win32-vc15-x64.zip"
    )]
    #[case::tarball("https://example.test/archive/1.2.3.tar.gz", "1.2.3.tar.gz")]
    #[case::bare("archive.zip", "archive.zip")]
    fn archive_file_name_takes_last_segment(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(archive_file_name(url), expected);
    }

    #[test]
    fn map_ureq_error_maps_404_to_not_found() {
        let err = ureq::Error::StatusCode(404);
        let mapped = map_ureq_error("https://example.test/a.zip", &err);
        assert!(matches!(mapped, DownloadError::NotFound { .. }));
    }

    #[test]
    fn map_ureq_error_maps_other_status_to_http_error() {
        let err = ureq::Error::StatusCode(500);
        let mapped = map_ureq_error("https://example.test/a.zip", &err);
        assert!(matches!(mapped, DownloadError::HttpError { .. }));
        assert!(mapped.to_string().contains("https://example.test/a.zip"));
    }
}
