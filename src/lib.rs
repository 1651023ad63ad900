//! Release gating for compliance-coverage evidence.
//!
//! The pipeline validates a coverage table against the fixed requirement
//! code set, derives a constrained spreadsheet and an annotated PDF from it,
//! writes a checksummed manifest and `.tar.zst` bundle, waits for CI on the
//! release branch, and attaches the bundle to a release tagged with the
//! run's UTC timestamp.
//!
//! # Modules
//!
//! - [`artefact`] - Spreadsheet and document builders, manifest, bundle
//! - [`ci`] - Workflow-run client and the polling gate
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration and credentials
//! - [`error`] - Pipeline errors and exit codes
//! - [`http`] - Authenticated JSON client for the hosting API
//! - [`output`] - Progress lines for the terminal
//! - [`pipeline`] - Stage orchestration and the run report
//! - [`release`] - Release tags, the release host, and idempotent publishing
//! - [`stamp`] - The run timestamp every stage derives names from

pub mod artefact;
pub mod ci;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod output;
pub mod pipeline;
pub mod release;
pub mod stamp;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
