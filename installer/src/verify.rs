//! Validation of the extension self-test transcript.

use crate::error::{InstallerError, Result};
use crate::probe::ClientTranscript;
use crate::version::compare_versions;
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Deserialize)]
struct VersionResponse {
    result: VersionResult,
}

#[derive(Deserialize)]
struct VersionResult {
    version: String,
}

/// Check a [`ClientTranscript`] and return the version the extension reports.
///
/// # Errors
///
/// Returns a verification error for the first failed check: a missing entry
/// point, a context response without a `result` handle, a malformed
/// `client.version` response, or a version other than `expected`.
///
/// # Examples
///
/// ```
/// use ton_client_installer::probe::ClientTranscript;
/// use ton_client_installer::verify::check_transcript;
///
/// let transcript = ClientTranscript {
///     missing_functions: Vec::new(),
///     context_response: Some(r#"{"result":1}"#.to_owned()),
///     version_response: Some(r#"{"result":{"version":"1.2.3"}}"#.to_owned()),
/// };
/// assert_eq!(check_transcript(&transcript, "1.2.3").ok().as_deref(), Some("1.2.3"));
/// ```
pub fn check_transcript(transcript: &ClientTranscript, expected: &str) -> Result<String> {
    if let Some(name) = transcript.missing_functions.first() {
        return Err(InstallerError::MissingEntryPoint { name: name.clone() });
    }

    let context = transcript.context_response.as_deref().unwrap_or_default();
    let has_handle = serde_json::from_str::<Value>(context)
        .ok()
        .and_then(|value| value.get("result").cloned())
        .is_some_and(|handle| !handle.is_null());
    if !has_handle {
        return Err(InstallerError::ContextCreation {
            response: context.to_owned(),
        });
    }

    let raw = transcript.version_response.as_deref().unwrap_or_default();
    let actual = serde_json::from_str::<VersionResponse>(raw)
        .map_err(|_| InstallerError::InvalidVersionResponse {
            response: raw.to_owned(),
        })?
        .result
        .version;

    if compare_versions(&actual, expected) != Ordering::Equal {
        return Err(InstallerError::VersionMismatch {
            expected: expected.to_owned(),
            actual,
        });
    }
    Ok(actual)
}
