//! Error types for manifest and bundle operations.
//!
//! Covers I/O failures, serialisation problems, and validation errors that
//! can occur while checksumming expected outputs and archiving the output
//! tree.

use thiserror::Error;

/// Errors arising from packaging operations.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// An I/O operation failed (reading source files, writing the bundle).
    #[error("I/O error during packaging: {0}")]
    Io(#[from] std::io::Error),

    /// An expected output exists but could not be inspected.
    #[error("cannot inspect {path}: {source}")]
    Inspect {
        /// The path being inspected.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Walking the output tree failed.
    #[error("failed to walk output tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// JSON serialisation of the manifest failed.
    #[error("manifest serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bundle directory resolves to a location inside the output tree.
    #[error("bundle directory {bundle_dir} lies inside output directory {out_dir}")]
    BundleInsideTree {
        /// The configured bundle directory.
        bundle_dir: String,
        /// The output directory being archived.
        out_dir: String,
    },

    /// A digest string is not a valid 64-character lowercase hex value.
    #[error("invalid SHA-256 digest: {reason}")]
    InvalidDigest {
        /// Description of the validation failure.
        reason: String,
    },
}
