//! Derived artefacts, manifest, and release bundle.
//!
//! # Sub-modules
//!
//! - [`document`]: Overlay stamping onto a PDF template.
//! - [`error`]: Error types for building and reopening artefacts.
//! - [`manifest`]: Presence/checksum manifest over expected outputs.
//! - [`naming`]: Bundle naming policy (`BundleName`).
//! - [`packaging`]: Manifest emission and `.tar.zst` bundle creation.
//! - [`packaging_error`]: Error types for packaging operations.
//! - [`record`]: Checksummed artefact records (`Artefact`).
//! - [`sha256_digest`]: SHA-256 digest newtype (`Sha256Digest`).
//! - [`spreadsheet`]: Constrained workbook builder and reader.

pub mod document;
pub mod error;
pub mod manifest;
pub mod naming;
pub mod packaging;
pub mod packaging_error;
pub mod record;
pub mod sha256_digest;
pub mod spreadsheet;

pub use error::ArtefactBuildError;
pub use manifest::{Manifest, ManifestEntry};
pub use packaging::{Bundle, PackageOutcome, PackageParams, package_release};
pub use packaging_error::PackagingError;
pub use record::{Artefact, ArtefactKind};
pub use sha256_digest::Sha256Digest;
