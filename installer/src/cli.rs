//! CLI argument definitions for the TON Client extension installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration. Flags only carry what the user typed; probing and defaults
//! are layered on in [`crate::options::resolve`].

use crate::reporter::ReporterSettings;
use camino::Utf8PathBuf;
use clap::Parser;

/// Install the TON Client PHP extension.
///
/// `-v` selects the extension version and `-V` enables verbose output, so
/// clap's built-in version flag is disabled.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "ton-client-installer", about, disable_version_flag = true)]
#[command(long_about = concat!(
    "Install the TON Client PHP extension.\n\n",
    "The installer inspects the PHP runtime selected with --php, downloads the ",
    "extension release for that runtime, installs the binaries into the PHP ",
    "extension and binary directories, and enables the extension in the PHP ",
    "configuration. Windows hosts receive prebuilt DLLs; other hosts build the ",
    "extension from source.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install version 1.2.3:\n",
    "    $ ton-client-installer -v 1.2.3\n\n",
    "  Reinstall using a previously downloaded archive:\n",
    "    $ ton-client-installer -v 1.2.3 -f -D -t /tmp/ton\n\n",
    "  Check an existing installation:\n",
    "    $ ton-client-installer -v 1.2.3 -T\n\n",
    "For more information, see: https://github.com/radianceteam/ton-client-php-ext",
))]
pub struct Cli {
    /// Extension version to be installed.
    #[arg(short = 'v', long = "version", value_name = "VERSION")]
    pub module_version: Option<String>,

    /// Append all output to the given file.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<Utf8PathBuf>,

    /// Suppress console output.
    #[arg(short = 'S', long)]
    pub silent: bool,

    /// Print extra information.
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Skip downloading the archive and use the one in the temp dir.
    #[arg(short = 'D', long)]
    pub skip_download: bool,

    /// Skip unpacking the downloaded archive.
    #[arg(short = 'U', long)]
    pub skip_unpack: bool,

    /// Keep temporary files.
    #[arg(short = 'C', long)]
    pub skip_cleanup: bool,

    /// Leave the PHP configuration untouched.
    #[arg(short = 'I', long)]
    pub skip_ini: bool,

    /// Do not back up php.ini before editing it (Windows only).
    #[arg(short = 'B', long)]
    pub skip_backup: bool,

    /// Do not build the sources (POSIX only).
    #[arg(short = 'X', long)]
    pub skip_build: bool,

    /// Verify the installation instead of installing.
    #[arg(short = 'T', long)]
    pub test_only: bool,

    /// Install even if the same or a newer version is present.
    #[arg(short = 'f', long)]
    pub force_install: bool,

    /// Use thread-safe (ZTS) binaries.
    #[arg(short = 's', long)]
    pub force_thread_safe: bool,

    /// Use binaries for the given architecture (x86|x64, Windows only).
    #[arg(short = 'a', long, value_name = "ARCH")]
    pub force_arch: Option<String>,

    /// Directory for downloading and unpacking files.
    #[arg(short = 't', long, value_name = "DIR")]
    pub force_tmp_dir: Option<Utf8PathBuf>,

    /// Install the extension module into the given directory.
    #[arg(short = 'e', long, value_name = "DIR")]
    pub force_ext_dir: Option<Utf8PathBuf>,

    /// Install runtime libraries into the given directory.
    #[arg(short = 'x', long, value_name = "DIR")]
    pub force_exe_dir: Option<Utf8PathBuf>,

    /// Edit the given php.ini file (Windows only).
    #[arg(short = 'i', long, value_name = "FILE")]
    pub force_ini_file: Option<Utf8PathBuf>,

    /// TON SDK installation directory (POSIX only) [default: <ext dir>/ton-sdk].
    #[arg(short = 'd', long, value_name = "DIR")]
    pub force_sdk_dir: Option<Utf8PathBuf>,

    /// PHP binary to inspect and install into.
    #[arg(long, value_name = "PATH", env = "TON_INSTALLER_PHP", default_value = "php")]
    pub php: String,
}

impl Default for Cli {
    /// Creates a `Cli` with no version, every flag disabled, and `php` as the
    /// runtime binary.
    ///
    /// # Examples
    ///
    /// ```
    /// use ton_client_installer::cli::Cli;
    ///
    /// let cli = Cli::default();
    /// assert_eq!(cli.php, "php");
    /// assert!(cli.module_version.is_none());
    /// assert!(!cli.test_only);
    /// ```
    fn default() -> Self {
        Self {
            module_version: None,
            output: None,
            silent: false,
            verbose: false,
            skip_download: false,
            skip_unpack: false,
            skip_cleanup: false,
            skip_ini: false,
            skip_backup: false,
            skip_build: false,
            test_only: false,
            force_install: false,
            force_thread_safe: false,
            force_arch: None,
            force_tmp_dir: None,
            force_ext_dir: None,
            force_exe_dir: None,
            force_ini_file: None,
            force_sdk_dir: None,
            php: "php".to_owned(),
        }
    }
}

impl Cli {
    /// Reporter configuration selected by the command line.
    ///
    /// # Examples
    ///
    /// ```
    /// use ton_client_installer::cli::Cli;
    ///
    /// let cli = Cli { silent: true, ..Cli::default() };
    /// assert!(cli.reporter_settings().silent);
    /// ```
    #[must_use]
    pub fn reporter_settings(&self) -> ReporterSettings {
        ReporterSettings {
            silent: self.silent,
            verbose: self.verbose,
            output_file: self.output.clone(),
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
