//! Release packaging: manifest over expected outputs, then a `.tar.zst`
//! bundle of the whole output tree.
//!
//! The manifest is always written. The bundle is only produced when every
//! expected output exists; deciding what to do with an incomplete manifest
//! is left to the caller.

use super::manifest::Manifest;
use super::naming::BundleName;
use super::packaging_error::PackagingError;
use super::sha256_digest::Sha256Digest;
use crate::stamp::RunStamp;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;
use walkdir::WalkDir;

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Input parameters for [`package_release`].
#[derive(Debug)]
pub struct PackageParams<'a> {
    /// Every path the run is expected to have produced, in report order.
    pub expected: Vec<Utf8PathBuf>,
    /// Output directory archived into the bundle.
    pub out_dir: &'a Utf8Path,
    /// Directory the bundle is written to. Must not be inside `out_dir`.
    pub bundle_dir: &'a Utf8Path,
    /// Run timestamp the bundle is named after.
    pub stamp: &'a RunStamp,
}

/// A written bundle and its digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Path of the `.tar.zst` archive.
    pub path: Utf8PathBuf,
    /// SHA-256 of the archive.
    pub sha256: Sha256Digest,
    /// Archive size in bytes.
    pub size: u64,
}

/// Output produced by [`package_release`].
#[derive(Debug)]
pub struct PackageOutcome {
    /// The manifest, also written to `manifest.json`.
    pub manifest: Manifest,
    /// Present only when the manifest was `ok`.
    pub bundle: Option<Bundle>,
}

/// Compute the SHA-256 digest of a file.
///
/// Reads the file at `path` in chunks and returns the lowercase hex
/// digest as a validated [`Sha256Digest`].
///
/// # Errors
///
/// Returns [`PackagingError::Io`] if the file cannot be read.
pub fn compute_sha256(path: &Path) -> Result<Sha256Digest, PackagingError> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }
    Sha256Digest::try_from(format!("{:x}", hasher.finalize()))
}

/// Archive the tree under `source_dir` into a `.tar.zst` at `bundle_path`.
///
/// Entries are named relative to `source_dir` and appended in sorted path
/// order. The bundle itself is skipped should it live inside the tree,
/// however either path is spelled.
///
/// # Errors
///
/// Returns [`PackagingError::Walk`] if the tree cannot be traversed and
/// [`PackagingError::Io`] if a file cannot be read or the archive written.
pub fn create_bundle(source_dir: &Utf8Path, bundle_path: &Utf8Path) -> Result<(), PackagingError> {
    let output_file = fs::File::create(bundle_path)?;
    let zstd_encoder = zstd::Encoder::new(output_file, 0)?.auto_finish();
    let mut archive = tar::Builder::new(zstd_encoder);
    let own_path = fs::canonicalize(bundle_path)?;

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if path == source_dir.as_std_path() {
            continue;
        }
        if entry.file_type().is_file() && fs::canonicalize(path).is_ok_and(|p| p == own_path) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(source_dir) else {
            continue;
        };
        if entry.file_type().is_dir() {
            archive.append_dir(relative, path)?;
        } else if entry.file_type().is_file() {
            archive.append_path_with_name(path, relative)?;
        }
    }

    archive.finish()?;
    Ok(())
}

/// Build the manifest, write it, and bundle the output tree when complete.
///
/// # Errors
///
/// Returns [`PackagingError::BundleInsideTree`] when `bundle_dir` resolves
/// to a directory under `out_dir`, and [`PackagingError`] otherwise when an
/// existing output cannot be inspected, the manifest cannot be written, or
/// the bundle cannot be created. A
/// missing output is not an error; it yields `manifest.ok() == false` and no
/// bundle.
pub fn package_release(params: &PackageParams<'_>) -> Result<PackageOutcome, PackagingError> {
    let manifest = Manifest::build(&params.expected)?;
    manifest.write_to(&params.out_dir.join(MANIFEST_FILE_NAME))?;

    if !manifest.ok() {
        log::warn!(
            "manifest incomplete, {} expected output(s) missing; bundle not created",
            manifest.missing().count()
        );
        return Ok(PackageOutcome {
            manifest,
            bundle: None,
        });
    }

    fs::create_dir_all(params.bundle_dir)?;
    reject_nested_bundle_dir(params.out_dir, params.bundle_dir)?;
    let bundle_path = params.bundle_dir.join(BundleName::new(*params.stamp).filename());
    create_bundle(params.out_dir, &bundle_path)?;
    let sha256 = compute_sha256(bundle_path.as_std_path())?;
    let size = fs::metadata(&bundle_path)?.len();
    log::info!("bundled {} into {bundle_path} ({sha256})", params.out_dir);

    Ok(PackageOutcome {
        manifest,
        bundle: Some(Bundle {
            path: bundle_path,
            sha256,
            size,
        }),
    })
}

fn reject_nested_bundle_dir(
    out_dir: &Utf8Path,
    bundle_dir: &Utf8Path,
) -> Result<(), PackagingError> {
    if fs::canonicalize(bundle_dir)?.starts_with(fs::canonicalize(out_dir)?) {
        return Err(PackagingError::BundleInsideTree {
            bundle_dir: bundle_dir.to_string(),
            out_dir: out_dir.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "packaging_tests.rs"]
mod tests;
