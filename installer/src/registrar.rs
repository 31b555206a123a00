//! PHP configuration registration.
//!
//! Windows builds read a single `php.ini`, which is backed up and rewritten
//! so exactly one active `extension=` line points at the installed DLL.
//! POSIX builds scan a directory for extra ini files, so a dedicated drop-in
//! file is written instead and the main configuration is never touched.

use crate::error::{InstallerError, Result};
use crate::paths::same_size;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use regex::Regex;
use std::fs;
use std::sync::OnceLock;

/// File name of the extension DLL referenced from `php.ini`.
pub const WINDOWS_MODULE_FILE: &str = "php_ton_client.dll";

/// File name of the POSIX drop-in configuration file.
pub const DROP_IN_FILE: &str = "ton_client.ini";

/// Contents of the POSIX drop-in configuration file.
pub const DROP_IN_DIRECTIVE: &str = "extension=\"ton_client.so\"";

/// Result of [`backup_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// A fresh backup was written.
    Created(Utf8PathBuf),
    /// A backup of the same size already existed and was kept.
    AlreadyExists(Utf8PathBuf),
}

/// Returns the backup location `<config>.<version>.bak`.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use ton_client_installer::registrar::backup_path;
///
/// let path = backup_path(Utf8Path::new("C:/php/php.ini"), "1.2.3");
/// assert_eq!(path.as_str(), "C:/php/php.ini.1.2.3.bak");
/// ```
#[must_use]
pub fn backup_path(config: &Utf8Path, version: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{config}.{version}.bak"))
}

/// Copy `config` to its versioned backup unless an equal-sized backup exists.
///
/// # Errors
///
/// Returns [`InstallerError::BackupFailed`] if the copy fails.
pub fn backup_config(config: &Utf8Path, version: &str) -> Result<BackupOutcome> {
    let backup = backup_path(config, version);
    if same_size(config, &backup) {
        return Ok(BackupOutcome::AlreadyExists(backup));
    }
    fs::copy(config, &backup).map_err(|source| InstallerError::BackupFailed {
        path: config.to_owned(),
        source,
    })?;
    Ok(BackupOutcome::Created(backup))
}

/// Rewrite ini text so it loads the extension from `module_path` exactly once.
///
/// The first `extension=` line naming the DLL, active or commented out, is
/// replaced with `extension="<module_path>"`; later matches are dropped. If
/// no line matches, the directive is appended. `zend_extension` lines are
/// left alone and the file's line ending style is kept.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use ton_client_installer::registrar::rewrite_extension_lines;
///
/// let ini = "[PHP]\n;extension=php_ton_client.dll\nextension=ext/php_ton_client.dll\n";
/// let updated = rewrite_extension_lines(ini, Utf8Path::new("C:/php/ext/php_ton_client.dll"));
/// assert_eq!(updated, "[PHP]\nextension=\"C:/php/ext/php_ton_client.dll\"\n");
/// ```
#[must_use]
pub fn rewrite_extension_lines(text: &str, module_path: &Utf8Path) -> String {
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };
    let directive = format!("extension=\"{module_path}\"");
    let mut replaced = false;
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if !is_module_line(line) {
            lines.push(line);
        } else if !replaced {
            lines.push(&directive);
            replaced = true;
        }
    }
    if !replaced {
        lines.push(&directive);
    }

    let mut updated = lines.join(newline);
    updated.push_str(newline);
    updated
}

/// Point `config` at `module_path`, rewriting the file in place.
///
/// # Errors
///
/// Returns [`InstallerError::ConfigWrite`] if the file cannot be read or
/// written.
pub fn register_in_config_file(config: &Utf8Path, module_path: &Utf8Path) -> Result<()> {
    let config_write = |source| InstallerError::ConfigWrite {
        path: config.to_owned(),
        source,
    };
    let text = fs::read_to_string(config).map_err(config_write)?;
    let updated = rewrite_extension_lines(&text, module_path);
    debug!("rewriting {config} to load {module_path}");
    fs::write(config, updated).map_err(config_write)
}

/// Write the drop-in ini file into `config_dir` and return its path.
///
/// # Errors
///
/// Returns [`InstallerError::ConfigWrite`] if the file cannot be written.
pub fn write_drop_in(config_dir: &Utf8Path) -> Result<Utf8PathBuf> {
    let path = config_dir.join(DROP_IN_FILE);
    fs::write(&path, format!("{DROP_IN_DIRECTIVE}\n")).map_err(|source| {
        InstallerError::ConfigWrite {
            path: path.clone(),
            source,
        }
    })?;
    Ok(path)
}

fn is_module_line(line: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r#"(?i)^\s*;?\s*extension\s*=\s*"?[^";]*php_ton_client\.dll"?\s*(;.*)?$"#,
            )
            .ok()
        })
        .as_ref()
        .is_some_and(|re| re.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MODULE: &str = "C:/php/ext/php_ton_client.dll";

    fn active_lines(text: &str) -> usize {
        text.lines()
            .filter(|line| {
                line.trim_start().starts_with("extension=") && line.contains(WINDOWS_MODULE_FILE)
            })
            .count()
    }

    #[rstest]
    #[case::append(
        "[PHP]\nmemory_limit=128M\n",
        "[PHP]\nmemory_limit=128M\nextension=\"C:/php/ext/php_ton_client.dll\"\n"
    )]
    #[case::replace_active(
        "extension=php_ton_client.dll\n",
        "extension=\"C:/php/ext/php_ton_client.dll\"\n"
    )]
    #[case::replace_commented(
        "; extension=\"D:/old/php_ton_client.dll\"\nextension=curl\n",
        "extension=\"C:/php/ext/php_ton_client.dll\"\nextension=curl\n"
    )]
    #[case::trailing_comment(
        "[PHP]\nextension=C:/old/php_ton_client.dll ; added by installer\n",
        "[PHP]\nextension=\"C:/php/ext/php_ton_client.dll\"\n"
    )]
    #[case::empty("", "extension=\"C:/php/ext/php_ton_client.dll\"\n")]
    fn rewrite_places_single_directive(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(rewrite_extension_lines(input, Utf8Path::new(MODULE)), expected);
    }

    #[test]
    fn rewrite_drops_duplicate_lines() {
        let input = "extension=php_ton_client.dll\n[x]\nextension=\"C:/a/php_ton_client.dll\"\n";
        let output = rewrite_extension_lines(input, Utf8Path::new(MODULE));
        assert_eq!(active_lines(&output), 1);
        assert!(output.contains("[x]"));
    }

    #[test]
    fn rewrite_ignores_zend_extensions_and_other_modules() {
        let input = "zend_extension=php_ton_client.dll\nextension=php_curl.dll\n";
        let output = rewrite_extension_lines(input, Utf8Path::new(MODULE));
        assert!(output.starts_with("zend_extension=php_ton_client.dll\nextension=php_curl.dll\n"));
        assert_eq!(active_lines(&output), 1);
    }

    #[test]
    fn rewrite_preserves_crlf() {
        let output =
            rewrite_extension_lines("[PHP]\r\nshort_open_tag=Off\r\n", Utf8Path::new(MODULE));
        assert_eq!(
            output,
            "[PHP]\r\nshort_open_tag=Off\r\nextension=\"C:/php/ext/php_ton_client.dll\"\r\n"
        );
    }

    #[test]
    fn rewrite_is_idempotent() {
        let once = rewrite_extension_lines("[PHP]\n", Utf8Path::new(MODULE));
        let twice = rewrite_extension_lines(&once, Utf8Path::new(MODULE));
        assert_eq!(once, twice);
    }

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        (temp, root)
    }

    #[test]
    fn backup_is_created_once() {
        let (_temp, root) = temp_root();
        let ini = root.join("php.ini");
        fs::write(&ini, "[PHP]\n").expect("write");

        let first = backup_config(&ini, "1.2.3").expect("backup");
        assert_eq!(first, BackupOutcome::Created(root.join("php.ini.1.2.3.bak")));

        let second = backup_config(&ini, "1.2.3").expect("backup");
        assert_eq!(second, BackupOutcome::AlreadyExists(root.join("php.ini.1.2.3.bak")));
    }

    #[test]
    fn stale_backup_is_refreshed() {
        let (_temp, root) = temp_root();
        let ini = root.join("php.ini");
        fs::write(&ini, "[PHP]\nmemory_limit=1G\n").expect("write");
        fs::write(root.join("php.ini.1.2.3.bak"), "[PHP]\n").expect("write");

        let outcome = backup_config(&ini, "1.2.3").expect("backup");
        assert!(matches!(outcome, BackupOutcome::Created(_)));
        assert_eq!(
            fs::read_to_string(root.join("php.ini.1.2.3.bak")).expect("read"),
            "[PHP]\nmemory_limit=1G\n"
        );
    }

    #[test]
    fn register_rewrites_file_in_place() {
        let (_temp, root) = temp_root();
        let ini = root.join("php.ini");
        fs::write(&ini, "[PHP]\n;extension=php_ton_client.dll\n").expect("write");

        register_in_config_file(&ini, Utf8Path::new(MODULE)).expect("register");
        let text = fs::read_to_string(&ini).expect("read");
        assert_eq!(text, "[PHP]\nextension=\"C:/php/ext/php_ton_client.dll\"\n");
    }

    #[test]
    fn register_reports_missing_file() {
        let (_temp, root) = temp_root();
        let err = register_in_config_file(&root.join("absent.ini"), Utf8Path::new(MODULE))
            .expect_err("expected failure");
        assert!(matches!(err, InstallerError::ConfigWrite { .. }));
    }

    #[test]
    fn drop_in_enables_shared_object() {
        let (_temp, root) = temp_root();
        let path = write_drop_in(&root).expect("write drop-in");
        assert_eq!(path, root.join("ton_client.ini"));
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "extension=\"ton_client.so\"\n"
        );
    }
}
