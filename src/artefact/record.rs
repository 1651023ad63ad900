//! Checksummed records of derived artefacts.

use super::packaging::compute_sha256;
use super::packaging_error::PackagingError;
use super::sha256_digest::Sha256Digest;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two artefacts derived from a coverage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtefactKind {
    /// The constrained workbook.
    Spreadsheet,
    /// The annotated PDF.
    Document,
}

impl fmt::Display for ArtefactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spreadsheet => f.write_str("spreadsheet"),
            Self::Document => f.write_str("document"),
        }
    }
}

/// A written artefact with its size and content digest.
///
/// Fields are private: once the checksum has been taken the record does not
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artefact {
    kind: ArtefactKind,
    path: Utf8PathBuf,
    size: u64,
    checksum: Sha256Digest,
}

impl Artefact {
    /// Record the artefact at `path`, reading its size and SHA-256.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError`] if the file cannot be read.
    pub fn record(kind: ArtefactKind, path: &Utf8Path) -> Result<Self, PackagingError> {
        let size = std::fs::metadata(path)
            .map_err(|source| PackagingError::Inspect {
                path: path.to_string(),
                source,
            })?
            .len();
        let checksum = compute_sha256(path.as_std_path())?;
        Ok(Self {
            kind,
            path: path.to_owned(),
            size,
            checksum,
        })
    }

    /// Which artefact this is.
    #[must_use]
    pub fn kind(&self) -> ArtefactKind {
        self.kind
    }

    /// Where the artefact was written.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// SHA-256 of the full byte stream.
    #[must_use]
    pub fn checksum(&self) -> &Sha256Digest {
        &self.checksum
    }
}
