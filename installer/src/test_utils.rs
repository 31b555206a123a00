//! Shared test utilities for the installer crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! behaviour tests under `tests/`.

use crate::artefact::download::{ArchiveFetcher, DownloadError};
use crate::command::CommandExecutor;
use crate::options::{ConfigTarget, InstallFlags, Options};
use crate::platform::{Architecture, Platform};
use crate::probe::{ClientTranscript, PhpRuntime, ProbeError};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.unsigned_abs())
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    stdout_output("")
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute (e.g., "php").
    pub program: String,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: io::Result<Output>,
}

impl ExpectedCall {
    /// Expect `program` to be run with `args`, answering with `result`.
    pub fn new(program: impl Into<String>, args: &[&str], result: io::Result<Output>) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            result,
        }
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects.
#[derive(Debug, Default)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    programs: Vec<String>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            programs: Vec::new(),
        }
    }

    /// Report `programs` as present on `PATH`.
    #[must_use]
    pub fn with_programs(mut self, programs: &[&str]) -> Self {
        self.programs = programs.iter().map(|p| (*p).to_owned()).collect();
        self
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<Output> {
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            panic!("unexpected command invocation: {program} {}", args.join(" "));
        };

        assert_eq!(call.program, program);
        assert_eq!(call.args, args);

        call.result
    }

    fn program_exists(&self, program: &str) -> bool {
        self.programs.iter().any(|p| p == program)
    }
}

/// A configurable in-memory PHP runtime.
#[derive(Debug, Clone)]
pub struct StubRuntime {
    /// `phpinfo()` text.
    pub info: String,
    /// `PHP_VERSION`.
    pub php_version: String,
    /// Loaded extension version, if any.
    pub installed: Option<String>,
    /// Raw `extension_dir` setting.
    pub extension_dir: String,
    /// Directory of the PHP binary.
    pub binary_dir: String,
    /// Transcript returned by the client probe.
    pub transcript: ClientTranscript,
}

impl Default for StubRuntime {
    fn default() -> Self {
        Self {
            info: String::new(),
            php_version: "7.4.33".to_owned(),
            installed: None,
            extension_dir: String::new(),
            binary_dir: String::new(),
            transcript: ClientTranscript::default(),
        }
    }
}

impl StubRuntime {
    /// Runtime whose extension reports `version` through a healthy context.
    #[must_use]
    pub fn reporting(version: &str) -> Self {
        Self {
            installed: Some(version.to_owned()),
            transcript: client_transcript(version),
            ..Self::default()
        }
    }
}

impl PhpRuntime for StubRuntime {
    fn info(&self) -> Result<String, ProbeError> {
        Ok(self.info.clone())
    }

    fn version(&self) -> Result<String, ProbeError> {
        Ok(self.php_version.clone())
    }

    fn extension_version(&self) -> Result<Option<String>, ProbeError> {
        Ok(self.installed.clone())
    }

    fn extension_dir_setting(&self) -> Result<String, ProbeError> {
        Ok(self.extension_dir.clone())
    }

    fn binary_dir(&self) -> Result<String, ProbeError> {
        Ok(self.binary_dir.clone())
    }

    fn client_transcript(&self) -> Result<ClientTranscript, ProbeError> {
        Ok(self.transcript.clone())
    }
}

/// A transcript from a working extension reporting `version`.
#[must_use]
pub fn client_transcript(version: &str) -> ClientTranscript {
    ClientTranscript {
        missing_functions: Vec::new(),
        context_response: Some(r#"{"result":1}"#.to_owned()),
        version_response: Some(format!(r#"{{"result":{{"version":"{version}"}}}}"#)),
    }
}

/// A fetcher that writes canned bytes and counts calls.
#[derive(Debug, Default)]
pub struct StubFetcher {
    body: Option<Vec<u8>>,
    calls: Cell<usize>,
}

impl StubFetcher {
    /// Fetcher that "downloads" `body`.
    #[must_use]
    pub fn serving(body: Vec<u8>) -> Self {
        Self {
            body: Some(body),
            calls: Cell::new(0),
        }
    }

    /// Fetcher for which every URL is missing.
    #[must_use]
    pub fn not_found() -> Self {
        Self::default()
    }

    /// Number of fetches performed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ArchiveFetcher for StubFetcher {
    fn fetch(&self, url: &str, dest: &Utf8Path) -> Result<(), DownloadError> {
        self.calls.set(self.calls.get() + 1);
        let Some(body) = &self.body else {
            return Err(DownloadError::NotFound {
                url: url.to_owned(),
            });
        };
        fs::write(dest, body)?;
        Ok(())
    }
}

/// Renders the `phpinfo()` lines the host probe reads.
#[must_use]
pub fn phpinfo(
    system: &str,
    architecture: Option<&str>,
    thread_safe: bool,
    ini_file: Option<&str>,
    ini_dir: Option<&str>,
) -> String {
    let mut info = format!("phpinfo()\nPHP Version => 7.4.33\n\nSystem => {system}\n");
    if let Some(arch) = architecture {
        info.push_str(&format!("Architecture => {arch}\n"));
    }
    info.push_str(&format!(
        "Thread Safety => {}\n",
        if thread_safe { "enabled" } else { "disabled" }
    ));
    info.push_str(&format!(
        "Loaded Configuration File => {}\n",
        ini_file.unwrap_or("(none)")
    ));
    info.push_str(&format!(
        "Scan this dir for additional .ini files => {}\n",
        ini_dir.unwrap_or("(none)")
    ));
    info
}

/// Writes a zip archive containing `entries`.
///
/// # Errors
///
/// Returns any I/O or zip encoding error.
pub fn write_zip(path: &Utf8Path, entries: &[(&str, &[u8])]) -> zip::result::ZipResult<()> {
    let mut writer = zip::ZipWriter::new(fs::File::create(path)?);
    for (name, data) in entries {
        writer.start_file(*name, zip::write::SimpleFileOptions::default())?;
        writer.write_all(data)?;
    }
    writer.finish()?;
    Ok(())
}

/// Writes a gzip-compressed tarball containing `entries` as executable files.
///
/// # Errors
///
/// Returns any I/O error.
pub fn write_source_tarball(path: &Utf8Path, entries: &[(&str, &[u8])]) -> io::Result<()> {
    let encoder =
        flate2::write::GzEncoder::new(fs::File::create(path)?, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, name, *data)?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

/// A disposable host layout: PHP directories, an ini file, and a temp dir.
#[derive(Debug)]
pub struct TempHost {
    _temp: tempfile::TempDir,
    /// Root of the layout.
    pub root: Utf8PathBuf,
}

impl TempHost {
    /// Create an empty layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp directory cannot be created or its path
    /// is not UTF-8.
    pub fn new() -> io::Result<Self> {
        let temp = tempfile::tempdir()?;
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf())
            .map_err(camino::FromPathBufError::into_io_error)?;
        Ok(Self { _temp: temp, root })
    }

    /// Create (if needed) and return `root/name`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error.
    pub fn dir(&self, name: &str) -> io::Result<Utf8PathBuf> {
        let dir = self.root.join(name);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Options for a Windows x64 NTS host with `php.ini` containing `ini`.
    ///
    /// # Errors
    ///
    /// Returns any I/O error.
    pub fn windows_options(&self, version: &str, ini: &str) -> io::Result<Options> {
        let ini_file = self.root.join("php.ini");
        fs::write(&ini_file, ini)?;
        Ok(Options {
            platform: Platform::Windows,
            architecture: Some(Architecture::X64),
            config: ConfigTarget::IniFile(ini_file),
            ..self.base_options(version)?
        })
    }

    /// Options for a POSIX host with an empty ini scan directory.
    ///
    /// # Errors
    ///
    /// Returns any I/O error.
    pub fn posix_options(&self, version: &str) -> io::Result<Options> {
        Ok(Options {
            config: ConfigTarget::ScanDir(self.dir("conf.d")?),
            ..self.base_options(version)?
        })
    }

    fn base_options(&self, version: &str) -> io::Result<Options> {
        let extension_dir = self.dir("ext")?;
        Ok(Options {
            version: version.to_owned(),
            platform: Platform::Posix,
            architecture: None,
            thread_safe: false,
            sdk_dir: extension_dir.join("ton-sdk"),
            extension_dir,
            runtime_bin_dir: self.dir("bin")?,
            temp_dir: self.dir("work")?,
            temp_dir_created: true,
            config: ConfigTarget::Unmanaged,
            flags: InstallFlags::default(),
            output_file: None,
        })
    }
}
