//! TON Client PHP extension installer library.
//!
//! This crate provides the core functionality for provisioning the
//! `ton_client` PHP extension: inspecting the PHP runtime, downloading the
//! matching release, installing its binaries, registering the extension with
//! PHP, and verifying the result. It is used by the `ton-client-installer`
//! CLI binary and can be consumed programmatically for testing or custom
//! installation workflows.
//!
//! # Modules
//!
//! - [`artefact`] - Release archive download and extraction
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - External command execution
//! - [`error`] - Error types and failure classification
//! - [`options`] - Layered, validated installer configuration
//! - [`orchestrator`] - The install and verify sequences
//! - [`paths`] - Filesystem probes
//! - [`platform`] - Windows and POSIX installation strategies
//! - [`probe`] - PHP runtime inspection
//! - [`registrar`] - PHP configuration registration
//! - [`reporter`] - User-facing progress reporting
//! - [`staging`] - Scoped temp directory ownership
//! - [`verify`] - Extension self-test validation
//! - [`version`] - Version comparison

pub mod artefact;
pub mod cli;
pub mod command;
pub mod error;
pub mod options;
pub mod orchestrator;
pub mod paths;
pub mod platform;
pub mod probe;
pub mod registrar;
pub mod reporter;
pub mod staging;
pub mod verify;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
