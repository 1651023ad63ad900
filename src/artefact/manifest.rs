//! Presence and checksum manifest over a run's expected outputs.
//!
//! ```json
//! {
//!   "ok": true,
//!   "entries": [
//!     { "path": "out/coverage.xlsx", "exists": true, "size": 5120,
//!       "checksum": "e3b0c442..." }
//!   ]
//! }
//! ```

use super::packaging::compute_sha256;
use super::packaging_error::PackagingError;
use super::sha256_digest::Sha256Digest;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// One expected output and what was found at its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// The expected path, as declared.
    pub path: Utf8PathBuf,
    /// Whether anything exists at the path.
    pub exists: bool,
    /// Size in bytes; zero for missing paths and directories.
    pub size: u64,
    /// Content digest of a regular file; `null` otherwise.
    pub checksum: Option<Sha256Digest>,
}

impl ManifestEntry {
    /// Inspect `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::Inspect`] if the path exists but its
    /// metadata cannot be read, or [`PackagingError::Io`] if a regular file
    /// cannot be hashed.
    pub fn inspect(path: &Utf8Path) -> Result<Self, PackagingError> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Self {
                    path: path.to_owned(),
                    exists: false,
                    size: 0,
                    checksum: None,
                });
            }
            Err(source) => {
                return Err(PackagingError::Inspect {
                    path: path.to_string(),
                    source,
                });
            }
        };

        let (size, checksum) = if metadata.is_file() {
            (metadata.len(), Some(compute_sha256(path.as_std_path())?))
        } else {
            (0, None)
        };
        Ok(Self {
            path: path.to_owned(),
            exists: true,
            size,
            checksum,
        })
    }
}

/// Manifest over every expected output, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    ok: bool,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Inspect each of `expected`. A missing path is recorded, not raised.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError`] when an existing path cannot be inspected.
    pub fn build(expected: &[Utf8PathBuf]) -> Result<Self, PackagingError> {
        let entries = expected
            .iter()
            .map(|path| ManifestEntry::inspect(path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_entries(entries))
    }

    /// Assemble a manifest, deriving `ok` from the entries.
    #[must_use]
    pub fn from_entries(entries: Vec<ManifestEntry>) -> Self {
        let ok = entries.iter().all(|entry| entry.exists);
        Self { ok, entries }
    }

    /// `true` when every expected output exists.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.ok
    }

    /// Entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Paths that were expected but not found.
    pub fn missing(&self) -> impl Iterator<Item = &Utf8Path> {
        self.entries
            .iter()
            .filter(|entry| !entry.exists)
            .map(|entry| entry.path.as_path())
    }

    /// Pretty-printed JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::Serialization`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, PackagingError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON form to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError`] on serialisation or write failure.
    pub fn write_to(&self, path: &Utf8Path) -> Result<(), PackagingError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
