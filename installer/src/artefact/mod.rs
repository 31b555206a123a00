//! Release archive retrieval and unpacking.
//!
//! # Sub-modules
//!
//! - [`download`] - Archive fetch trait and HTTP implementation.
//! - [`extraction`] - Zip and tarball extraction with path traversal
//!   protection.

pub mod download;
pub mod extraction;
