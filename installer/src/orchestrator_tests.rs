//! Tests for the install and verify sequences.

use super::*;
use crate::artefact::download::{DownloadError, MockArchiveFetcher};
use crate::artefact::extraction::ReleaseUnpacker;
use crate::error::ErrorKind;
use crate::probe::MockPhpRuntime;
use crate::reporter::ReporterSettings;
use crate::test_utils::{
    ExpectedCall, StubExecutor, StubFetcher, StubRuntime, TempHost, client_transcript,
    success_output, write_source_tarball, write_zip,
};
use rstest::rstest;

struct Captured {
    out: String,
    err: String,
}

fn run<T>(
    options: &Options,
    runtime: &dyn PhpRuntime,
    fetcher: &dyn ArchiveFetcher,
    executor: &dyn CommandExecutor,
    action: impl FnOnce(&Orchestrator<'_>, &mut Reporter<'_>) -> T,
) -> (T, Captured) {
    let tools = Collaborators {
        runtime,
        fetcher,
        unpacker: &ReleaseUnpacker,
        executor,
    };
    let orchestrator = Orchestrator::new(options, &tools);
    let mut out = Vec::new();
    let mut err = Vec::new();
    let mut reporter = Reporter::new(ReporterSettings::default(), &mut out, &mut err);
    let result = action(&orchestrator, &mut reporter);
    drop(reporter);
    let captured = Captured {
        out: String::from_utf8(out).expect("UTF-8 stdout"),
        err: String::from_utf8(err).expect("UTF-8 stderr"),
    };
    (result, captured)
}

fn windows_release_zip(host: &TempHost) -> Vec<u8> {
    let path = host.root.join("fixture.zip");
    write_zip(
        &path,
        &[
            ("build/release/x64/pthreadVC2.dll", b"pthread".as_slice()),
            ("build/release/x64/ton_client.dll", b"client".as_slice()),
            ("build/release/x64/php_ton_client.dll", b"module".as_slice()),
        ],
    )
    .expect("write zip");
    fs::read(&path).expect("read zip")
}

fn never_fetches() -> MockArchiveFetcher {
    let mut fetcher = MockArchiveFetcher::new();
    fetcher.expect_fetch().never();
    fetcher
}

#[test]
fn same_version_is_not_reinstalled() {
    let host = TempHost::new().expect("host");
    let options = host.windows_options("1.2.3", "[PHP]\n").expect("options");
    let mut runtime = MockPhpRuntime::new();
    runtime.expect_version().returning(|| Ok("7.4.33".to_owned()));
    runtime
        .expect_extension_version()
        .times(1)
        .returning(|| Ok(Some("1.2.3".to_owned())));
    let fetcher = never_fetches();

    let (result, captured) = run(
        &options,
        &runtime,
        &fetcher,
        &StubExecutor::default(),
        |o, r| o.install(r),
    );

    assert_eq!(
        result.expect("install"),
        InstallOutcome::AlreadyInstalled {
            version: "1.2.3".to_owned()
        }
    );
    assert!(captured.out.starts_with(
        "Previously installed version: 1.2.3\nNothing to install.\nOK\n"
    ));
    assert_eq!(fs::read_to_string(options.config_file().expect("ini")).expect("read"), "[PHP]\n");
    assert!(!options.temp_dir.exists());
}

#[rstest]
#[case::newer_target("1.2.3", "1.2.2", false)]
#[case::forced("1.2.3", "1.2.3", true)]
#[case::forced_downgrade("1.2.2", "1.2.3", true)]
fn install_proceeds_when_newer_or_forced(
    #[case] target: &str,
    #[case] installed: &str,
    #[case] force: bool,
) {
    let host = TempHost::new().expect("host");
    let mut options = host.windows_options(target, "[PHP]\n").expect("options");
    options.flags.force_install = force;
    let zip = windows_release_zip(&host);
    let runtime = StubRuntime {
        installed: Some(installed.to_owned()),
        ..StubRuntime::default()
    };
    let fetcher = StubFetcher::serving(zip);

    let (result, captured) = run(
        &options,
        &runtime,
        &fetcher,
        &StubExecutor::default(),
        |o, r| o.install(r),
    );

    assert_eq!(result.expect("install"), InstallOutcome::Installed);
    assert_eq!(fetcher.calls(), 1);
    assert!(captured.out.contains(&format!("Installing new version: {target}\n")));
}

#[test]
fn fresh_windows_install_follows_full_sequence() {
    let host = TempHost::new().expect("host");
    let options = host.windows_options("1.2.3", "[PHP]\n").expect("options");
    let fetcher = StubFetcher::serving(windows_release_zip(&host));
    let runtime = StubRuntime::default();

    let (result, captured) = run(
        &options,
        &runtime,
        &fetcher,
        &StubExecutor::default(),
        |o, r| o.install(r),
    );

    assert_eq!(result.expect("install"), InstallOutcome::Installed);
    let archive = options
        .temp_dir
        .join("ton-client-1.2.3-nts-Win32-vc15-x64.zip");
    let lines: Vec<&str> = captured.out.lines().collect();
    assert_eq!(lines.first().copied(), Some("No extension previously installed"));
    assert!(lines.contains(&format!("Downloaded to {archive}.").as_str()));
    assert!(lines.contains(&format!("Removing file {archive}.").as_str()));
    assert_eq!(lines.iter().rev().nth(1).copied(), Some("OK"));
    assert_eq!(
        lines.last().copied(),
        Some(format!("Removing tmp dir {}.", options.temp_dir).as_str())
    );
    assert!(captured.err.is_empty());
    assert!(options.runtime_bin_dir.join("ton_client.dll").is_file());
    assert!(!options.temp_dir.exists());
}

#[test]
fn fresh_posix_install_builds_and_enables_module() {
    let host = TempHost::new().expect("host");
    let options = host.posix_options("1.2.3").expect("options");
    let tarball = host.root.join("fixture.tar.gz");
    write_source_tarball(
        &tarball,
        &[
            ("ton-client-php-ext-1.2.3/install-sdk.sh", b"#!/bin/sh\n".as_slice()),
            ("ton-client-php-ext-1.2.3/build.sh", b"#!/bin/sh\n".as_slice()),
            ("ton-client-php-ext-1.2.3/build/modules/ton_client.so", b"ELF".as_slice()),
        ],
    )
    .expect("write tarball");
    let fetcher = StubFetcher::serving(fs::read(&tarball).expect("read tarball"));
    let source = options.temp_dir.join("ton-client-php-ext-1.2.3");
    let sdk = options.sdk_dir.as_str();
    let executor = StubExecutor::new(vec![
        ExpectedCall::new(source.join("install-sdk.sh").as_str(), &[sdk], Ok(success_output())),
        ExpectedCall::new(source.join("build.sh").as_str(), &[sdk], Ok(success_output())),
    ])
    .with_programs(&["phpize"]);

    let (result, captured) = run(
        &options,
        &StubRuntime::default(),
        &fetcher,
        &executor,
        |o, r| o.install(r),
    );

    assert_eq!(result.expect("install"), InstallOutcome::Installed);
    executor.assert_finished();
    assert!(options.extension_dir.join("ton_client.so").is_file());
    let drop_in = options.config_dir().expect("config dir").join("ton_client.ini");
    assert!(drop_in.is_file());
    assert!(captured.out.contains("OK\n"));
}

#[test]
fn old_php_is_rejected_before_download() {
    let host = TempHost::new().expect("host");
    let options = host.windows_options("1.2.3", "[PHP]\n").expect("options");
    let runtime = StubRuntime {
        php_version: "7.3.9".to_owned(),
        ..StubRuntime::default()
    };

    let (result, captured) = run(
        &options,
        &runtime,
        &never_fetches(),
        &StubExecutor::default(),
        |o, r| o.install(r),
    );

    let err = result.expect_err("expected failure");
    assert_eq!(err.kind(), ErrorKind::Environment);
    assert_eq!(captured.err, "PHP version 7.4+ is required (found 7.3.9).\n");
    assert!(!captured.out.contains("OK\n"));
    assert!(!options.temp_dir.exists());
}

#[test]
fn missing_destination_is_not_writable() {
    let host = TempHost::new().expect("host");
    let mut options = host.windows_options("1.2.3", "[PHP]\n").expect("options");
    options.runtime_bin_dir = host.root.join("no-such-bin");

    let (result, _) = run(
        &options,
        &StubRuntime::default(),
        &never_fetches(),
        &StubExecutor::default(),
        |o, r| o.install(r),
    );

    assert!(matches!(
        result,
        Err(InstallerError::DirectoryNotWritable { path }) if path == host.root.join("no-such-bin")
    ));
}

#[test]
fn skip_download_without_archive_is_a_transport_error() {
    let host = TempHost::new().expect("host");
    let mut options = host.windows_options("1.2.3", "[PHP]\n").expect("options");
    options.flags.skip_download = true;

    let (result, captured) = run(
        &options,
        &StubRuntime::default(),
        &never_fetches(),
        &StubExecutor::default(),
        |o, r| o.install(r),
    );

    let err = result.expect_err("expected failure");
    assert_eq!(err.kind(), ErrorKind::Transport);
    let archive = options.temp_dir.join("ton-client-1.2.3-nts-Win32-vc15-x64.zip");
    assert_eq!(
        captured.err,
        format!("File not downloaded and doesn't exist: {archive}\n")
    );
    assert!(captured.out.contains("Skipping download.\n"));
}

#[test]
fn skip_download_reuses_existing_archive() {
    let host = TempHost::new().expect("host");
    let mut options = host.windows_options("1.2.3", "[PHP]\n").expect("options");
    options.flags.skip_download = true;
    options.flags.skip_cleanup = true;
    let archive = options.temp_dir.join("ton-client-1.2.3-nts-Win32-vc15-x64.zip");
    fs::write(&archive, windows_release_zip(&host)).expect("write archive");

    let (result, captured) = run(
        &options,
        &StubRuntime::default(),
        &never_fetches(),
        &StubExecutor::default(),
        |o, r| o.install(r),
    );

    result.expect("install");
    assert!(captured.out.contains(&format!("Using existing archive from {archive}.\n")));
    assert!(captured.out.contains(&format!("Skip removing archive file {archive}\n")));
    assert!(archive.is_file());
    assert!(options.temp_dir.is_dir());
}

#[test]
fn transport_failure_is_reported_once_and_cleans_up() {
    let host = TempHost::new().expect("host");
    let options = host.windows_options("1.2.3", "[PHP]\n").expect("options");
    let fetcher = StubFetcher::not_found();

    let (result, captured) = run(
        &options,
        &StubRuntime::default(),
        &fetcher,
        &StubExecutor::default(),
        |o, r| o.install(r),
    );

    let err = result.expect_err("expected failure");
    assert!(matches!(err, InstallerError::Download(DownloadError::NotFound { .. })));
    assert_eq!(captured.err.lines().count(), 1);
    assert!(captured.out.ends_with(&format!("Removing tmp dir {}.\n", options.temp_dir)));
    assert!(!options.temp_dir.exists());
}

#[test]
fn temp_dir_not_created_by_run_is_kept() {
    let host = TempHost::new().expect("host");
    let mut options = host.windows_options("1.2.3", "[PHP]\n").expect("options");
    options.temp_dir_created = false;

    let (result, captured) = run(
        &options,
        &StubRuntime::default(),
        &StubFetcher::not_found(),
        &StubExecutor::default(),
        |o, r| o.install(r),
    );

    assert!(result.is_err());
    assert!(options.temp_dir.is_dir());
    assert!(!captured.out.contains("Removing tmp dir"));
}

#[test]
fn failed_cleanup_only_warns() {
    let host = TempHost::new().expect("host");
    let mut options = host.windows_options("1.2.3", "[PHP]\n").expect("options");
    let not_a_dir = host.root.join("not-a-dir");
    fs::write(&not_a_dir, b"file").expect("write");
    options.temp_dir = not_a_dir.clone();
    options.flags.skip_download = true;
    options.flags.skip_unpack = true;
    options.flags.skip_config_edit = true;

    let (result, captured) = run(
        &options,
        &StubRuntime::default(),
        &never_fetches(),
        &StubExecutor::default(),
        |o, r| o.install(r),
    );

    assert_eq!(result.expect("install"), InstallOutcome::Installed);
    assert!(captured.out.contains("OK\n"));
    assert!(
        captured
            .out
            .ends_with(&format!("WARNING: Failed to remove tmp dir {not_a_dir}.\n"))
    );
    assert!(captured.err.is_empty());
}

#[test]
fn verify_accepts_matching_version() {
    let host = TempHost::new().expect("host");
    let options = host.posix_options("1.2.3").expect("options");
    let runtime = StubRuntime::reporting("1.2.3");

    let (result, captured) = run(
        &options,
        &runtime,
        &never_fetches(),
        &StubExecutor::default(),
        |o, r| o.verify(r),
    );

    assert_eq!(result.expect("verify"), "1.2.3");
    assert!(captured.out.starts_with("Version returned by client.version: 1.2.3\nOK\n"));
}

#[test]
fn verify_rejects_other_version() {
    let host = TempHost::new().expect("host");
    let options = host.posix_options("1.2.3").expect("options");
    let runtime = StubRuntime {
        installed: Some("1.2.3".to_owned()),
        transcript: client_transcript("1.2.2"),
        ..StubRuntime::default()
    };

    let (result, captured) = run(
        &options,
        &runtime,
        &never_fetches(),
        &StubExecutor::default(),
        |o, r| o.verify(r),
    );

    let err = result.expect_err("expected failure");
    assert_eq!(err.kind(), ErrorKind::Verification);
    assert_eq!(
        captured.err,
        "Wrong version returned by client.version: 1.2.2 (expected 1.2.3)\n"
    );
}

#[test]
fn verify_requires_loaded_module() {
    let host = TempHost::new().expect("host");
    let options = host.posix_options("1.2.3").expect("options");
    let mut runtime = MockPhpRuntime::new();
    runtime.expect_extension_version().returning(|| Ok(None));
    runtime.expect_client_transcript().never();

    let (result, _) = run(
        &options,
        &runtime,
        &never_fetches(),
        &StubExecutor::default(),
        |o, r| o.verify(r),
    );

    assert!(matches!(result, Err(InstallerError::ModuleNotLoaded)));
}
