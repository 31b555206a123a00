//! PHP runtime inspection.
//!
//! The installer learns everything about the host from the PHP binary it is
//! installing into: OS family, architecture, thread safety, and ini locations
//! come from `phpinfo` text; directories and versions come from small `php -r`
//! snippets. [`PhpRuntime`] is the seam tests replace.

use crate::command::{CommandExecutor, describe_failure};
use crate::platform::Platform;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Name under which the extension registers itself with PHP.
pub const MODULE_NAME: &str = "ton_client";

/// Functions the extension must export.
pub const ENTRY_POINTS: [&str; 3] = [
    "ton_create_context",
    "ton_destroy_context",
    "ton_request_sync",
];

/// Script run inside PHP to exercise the extension in a single process.
///
/// Context handles are only valid within the process that created them, so
/// creation, the version query, and destruction happen together and the raw
/// responses are returned as JSON for validation. `{entry_points}` is
/// replaced by the quoted [`ENTRY_POINTS`].
const CLIENT_PROBE_TEMPLATE: &str = r#"
$out = ['missing_functions' => [], 'context_response' => null, 'version_response' => null];
foreach ([{entry_points}] as $f) {
    if (!function_exists($f)) {
        $out['missing_functions'][] = $f;
    }
}
if (!$out['missing_functions']) {
    $raw = ton_create_context('{}');
    $out['context_response'] = $raw;
    $ctx = json_decode($raw, true);
    if (is_array($ctx) && isset($ctx['result'])) {
        $out['version_response'] = ton_request_sync($ctx['result'], 'client.version', '');
        ton_destroy_context($ctx['result']);
    }
}
echo json_encode($out);
"#;

/// Errors raised while querying the PHP runtime.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The PHP binary could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// The program that was invoked.
        program: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The PHP binary ran but reported failure.
    #[error("{program} {reason}")]
    CommandFailed {
        /// The program that was invoked.
        program: String,
        /// Exit status and stderr.
        reason: String,
    },

    /// The client probe script printed something other than its transcript.
    #[error("unexpected client probe output: {reason}")]
    MalformedTranscript {
        /// Description of the parse failure.
        reason: String,
    },
}

/// Raw responses captured while exercising the extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientTranscript {
    /// Entry points that `function_exists` reported missing.
    #[serde(default)]
    pub missing_functions: Vec<String>,
    /// Raw result of `ton_create_context("{}")`.
    #[serde(default)]
    pub context_response: Option<String>,
    /// Raw result of the `client.version` request.
    #[serde(default)]
    pub version_response: Option<String>,
}

/// Queries against the PHP runtime being provisioned.
#[cfg_attr(test, mockall::automock)]
pub trait PhpRuntime {
    /// Returns the `phpinfo()` text.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] if PHP cannot be run.
    fn info(&self) -> Result<String, ProbeError>;

    /// Returns the runtime version (`PHP_VERSION`).
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] if PHP cannot be run.
    fn version(&self) -> Result<String, ProbeError>;

    /// Returns the version of the loaded extension, if it is loaded.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] if PHP cannot be run.
    fn extension_version(&self) -> Result<Option<String>, ProbeError>;

    /// Returns the raw `extension_dir` ini setting.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] if PHP cannot be run.
    fn extension_dir_setting(&self) -> Result<String, ProbeError>;

    /// Returns the directory containing the PHP binary.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] if PHP cannot be run.
    fn binary_dir(&self) -> Result<String, ProbeError>;

    /// Exercises the extension and returns the raw responses.
    ///
    /// # Errors
    ///
    /// Returns a [`ProbeError`] if PHP cannot be run or its output is not a
    /// transcript.
    fn client_transcript(&self) -> Result<ClientTranscript, ProbeError>;
}

/// [`PhpRuntime`] backed by a PHP command-line binary.
pub struct PhpCli<'a> {
    program: String,
    executor: &'a dyn CommandExecutor,
}

impl<'a> PhpCli<'a> {
    /// Create a runtime handle for the PHP binary `program`.
    #[must_use]
    pub fn new(program: &str, executor: &'a dyn CommandExecutor) -> Self {
        Self {
            program: program.to_owned(),
            executor,
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, ProbeError> {
        let output = self
            .executor
            .run(&self.program, args)
            .map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ProbeError::CommandFailed {
                program: self.program.clone(),
                reason: describe_failure(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn eval(&self, code: &str) -> Result<String, ProbeError> {
        self.run(&["-r", code]).map(|out| out.trim().to_owned())
    }
}

impl PhpRuntime for PhpCli<'_> {
    fn info(&self) -> Result<String, ProbeError> {
        self.run(&["-i"])
    }

    fn version(&self) -> Result<String, ProbeError> {
        self.eval("echo PHP_VERSION;")
    }

    fn extension_version(&self) -> Result<Option<String>, ProbeError> {
        let version = self.eval(&format!("echo phpversion('{MODULE_NAME}');"))?;
        Ok(Some(version).filter(|v| !v.is_empty()))
    }

    fn extension_dir_setting(&self) -> Result<String, ProbeError> {
        self.eval("echo ini_get('extension_dir');")
    }

    fn binary_dir(&self) -> Result<String, ProbeError> {
        self.eval("echo dirname(PHP_BINARY);")
    }

    fn client_transcript(&self) -> Result<ClientTranscript, ProbeError> {
        let raw = self.eval(&client_probe_script())?;
        trace!("client probe output: {raw}");
        serde_json::from_str(&raw).map_err(|e| ProbeError::MalformedTranscript {
            reason: e.to_string(),
        })
    }
}

/// Host facts gathered from the PHP runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFacts {
    /// OS family the runtime was built for.
    pub platform: Platform,
    /// Raw architecture string (`x64`, `x86`, `x86_64`, ...).
    pub architecture: Option<String>,
    /// Whether the runtime is a thread-safe (ZTS) build.
    pub thread_safe: bool,
    /// Loaded `php.ini` path.
    pub ini_file: Option<Utf8PathBuf>,
    /// Directory scanned for additional ini files.
    pub ini_dir: Option<Utf8PathBuf>,
    /// Resolved extension directory.
    pub extension_dir: Option<Utf8PathBuf>,
    /// Directory containing the PHP binary.
    pub binary_dir: Option<Utf8PathBuf>,
}

impl HostFacts {
    /// Extract facts from `phpinfo()` text.
    ///
    /// Missing lines yield empty values rather than errors; validation
    /// decides later which of them are required.
    ///
    /// # Examples
    ///
    /// ```
    /// use ton_client_installer::platform::Platform;
    /// use ton_client_installer::probe::HostFacts;
    ///
    /// let info = "System => Windows NT PC 10.0\nArchitecture => x64\nThread Safety => enabled\n";
    /// let facts = HostFacts::from_phpinfo(info);
    /// assert_eq!(facts.platform, Platform::Windows);
    /// assert_eq!(facts.architecture.as_deref(), Some("x64"));
    /// assert!(facts.thread_safe);
    /// ```
    #[must_use]
    pub fn from_phpinfo(info: &str) -> Self {
        let Some(patterns) = PhpinfoPatterns::get() else {
            return Self::default();
        };
        let platform = match capture(&patterns.system, info) {
            Some(system) if system.to_lowercase().contains("windows") => Platform::Windows,
            _ => Platform::Posix,
        };
        Self {
            platform,
            architecture: capture(&patterns.architecture, info),
            thread_safe: patterns.thread_safe.is_match(info),
            ini_file: capture_path(&patterns.ini_file, info),
            ini_dir: capture_path(&patterns.ini_dir, info),
            extension_dir: None,
            binary_dir: None,
        }
    }
}

/// Gather [`HostFacts`] from a runtime.
///
/// # Errors
///
/// Returns a [`ProbeError`] if any runtime query fails.
pub fn probe_host(runtime: &dyn PhpRuntime) -> Result<HostFacts, ProbeError> {
    let mut facts = HostFacts::from_phpinfo(&runtime.info()?);
    let binary_dir = non_empty_path(&runtime.binary_dir()?);
    facts.extension_dir =
        resolve_extension_dir(&runtime.extension_dir_setting()?, binary_dir.as_deref());
    facts.binary_dir = binary_dir;
    debug!("probed host facts: {facts:?}");
    Ok(facts)
}

/// Resolve the `extension_dir` setting, which may be relative to the PHP
/// binary directory (the Windows default is `ext`).
fn resolve_extension_dir(setting: &str, binary_dir: Option<&Utf8Path>) -> Option<Utf8PathBuf> {
    let setting = non_empty_path(setting)?;
    if setting.is_dir() {
        return Some(setting);
    }
    binary_dir
        .map(|dir| dir.join(&setting))
        .filter(|candidate| candidate.is_dir())
}

/// The client probe script with the entry point list filled in.
fn client_probe_script() -> String {
    let entry_points = ENTRY_POINTS
        .iter()
        .map(|name| format!("'{name}'"))
        .collect::<Vec<_>>()
        .join(", ");
    CLIENT_PROBE_TEMPLATE.replace("{entry_points}", &entry_points)
}

/// `phpinfo()` line matchers, compiled once.
struct PhpinfoPatterns {
    system: Regex,
    architecture: Regex,
    thread_safe: Regex,
    ini_file: Regex,
    ini_dir: Regex,
}

impl PhpinfoPatterns {
    fn get() -> Option<&'static Self> {
        static PATTERNS: OnceLock<Option<PhpinfoPatterns>> = OnceLock::new();
        PATTERNS
            .get_or_init(|| {
                Self::compile()
                    .inspect_err(|err| debug!("invalid phpinfo pattern: {err}"))
                    .ok()
            })
            .as_ref()
    }

    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            system: Regex::new(r"(?im)^\s*System\s+=>\s+(\w+)")?,
            architecture: Regex::new(r"(?im)^\s*Architecture\s+=>\s+(\w+)")?,
            thread_safe: Regex::new(r"(?im)^\s*Thread\s+Safety\s+=>\s+enabled")?,
            ini_file: Regex::new(r"(?im)^\s*Loaded\s+Configuration\s+File\s+=>\s+(.+)$")?,
            ini_dir: Regex::new(
                r"(?im)^\s*Scan this dir for additional \.ini files\s+=>\s+(.+)$",
            )?,
        })
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    let value = re.captures(text)?.get(1)?.as_str().trim();
    Some(value.to_owned()).filter(|v| !v.is_empty())
}

fn capture_path(re: &Regex, text: &str) -> Option<Utf8PathBuf> {
    capture(re, text).and_then(|value| non_empty_path(&value))
}

fn non_empty_path(value: &str) -> Option<Utf8PathBuf> {
    let value = value.trim();
    if value.is_empty() || value == "(none)" {
        return None;
    }
    Some(Utf8PathBuf::from(value))
}
