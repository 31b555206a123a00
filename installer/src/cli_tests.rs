//! Tests for installer CLI parsing and default behaviours.

use super::*;
use clap::error::ErrorKind as ClapErrorKind;
use rstest::rstest;

fn parse(args: &[&str]) -> Cli {
    temp_env::with_var_unset("TON_INSTALLER_PHP", || {
        Cli::parse_from(std::iter::once("ton-client-installer").chain(args.iter().copied()))
    })
}

#[test]
fn cli_parses_defaults() {
    let cli = parse(&[]);
    assert_eq!(cli, Cli::default());
}

#[test]
fn cli_parses_version_and_output() {
    let cli = parse(&["-v", "1.2.3", "-o", "/tmp/install.log"]);
    assert_eq!(cli.module_version.as_deref(), Some("1.2.3"));
    assert_eq!(cli.output, Some(Utf8PathBuf::from("/tmp/install.log")));
}

#[test]
fn cli_parses_long_version_flag() {
    let cli = parse(&["--version", "1.2.3"]);
    assert_eq!(cli.module_version.as_deref(), Some("1.2.3"));
}

#[rstest]
#[case::silent("-S", |c: &Cli| c.silent)]
#[case::verbose("-V", |c: &Cli| c.verbose)]
#[case::skip_download("-D", |c: &Cli| c.skip_download)]
#[case::skip_unpack("-U", |c: &Cli| c.skip_unpack)]
#[case::skip_cleanup("-C", |c: &Cli| c.skip_cleanup)]
#[case::skip_ini("-I", |c: &Cli| c.skip_ini)]
#[case::skip_backup("-B", |c: &Cli| c.skip_backup)]
#[case::skip_build("-X", |c: &Cli| c.skip_build)]
#[case::test_only("-T", |c: &Cli| c.test_only)]
#[case::force_install("-f", |c: &Cli| c.force_install)]
#[case::force_thread_safe("-s", |c: &Cli| c.force_thread_safe)]
fn cli_parses_short_flags(#[case] flag: &str, #[case] is_set: fn(&Cli) -> bool) {
    assert!(!is_set(&parse(&[])));
    assert!(is_set(&parse(&[flag])));
}

#[test]
fn cli_parses_directory_overrides() {
    let cli = parse(&[
        "-a", "x86", "-t", "/tmp/ton", "-e", "/php/ext", "-x", "/php", "-i", "/php/php.ini", "-d",
        "/opt/sdk",
    ]);
    assert_eq!(cli.force_arch.as_deref(), Some("x86"));
    assert_eq!(cli.force_tmp_dir, Some(Utf8PathBuf::from("/tmp/ton")));
    assert_eq!(cli.force_ext_dir, Some(Utf8PathBuf::from("/php/ext")));
    assert_eq!(cli.force_exe_dir, Some(Utf8PathBuf::from("/php")));
    assert_eq!(cli.force_ini_file, Some(Utf8PathBuf::from("/php/php.ini")));
    assert_eq!(cli.force_sdk_dir, Some(Utf8PathBuf::from("/opt/sdk")));
}

#[test]
fn cli_reads_php_binary_from_environment() {
    let cli = temp_env::with_var("TON_INSTALLER_PHP", Some("/opt/php/bin/php"), || {
        Cli::parse_from(["ton-client-installer"])
    });
    assert_eq!(cli.php, "/opt/php/bin/php");
}

#[test]
fn cli_php_flag_overrides_environment() {
    let cli = temp_env::with_var("TON_INSTALLER_PHP", Some("/opt/php/bin/php"), || {
        Cli::parse_from(["ton-client-installer", "--php", "php8.1"])
    });
    assert_eq!(cli.php, "php8.1");
}

#[test]
fn cli_rejects_unknown_flag() {
    let err = Cli::try_parse_from(["ton-client-installer", "--bogus"]).expect_err("should fail");
    assert_eq!(err.kind(), ClapErrorKind::UnknownArgument);
}

#[test]
fn cli_help_is_reported_as_display_help() {
    let err = Cli::try_parse_from(["ton-client-installer", "-h"]).expect_err("help exits early");
    assert_eq!(err.kind(), ClapErrorKind::DisplayHelp);
}

#[test]
fn reporter_settings_follow_flags() {
    let cli = parse(&["-S", "-V", "-o", "out.log"]);
    let settings = cli.reporter_settings();
    assert!(settings.silent);
    assert!(settings.verbose);
    assert_eq!(settings.output_file, Some(Utf8PathBuf::from("out.log")));
}
