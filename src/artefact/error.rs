//! Error types for building and reopening derived artefacts.
//!
//! Each variant names the file involved and the constraint that was
//! violated so that a failed run can be diagnosed from its report alone.

use super::packaging_error::PackagingError;
use thiserror::Error;

/// Errors arising while building the spreadsheet or document artefacts.
#[derive(Debug, Error)]
pub enum ArtefactBuildError {
    /// The document template does not exist.
    #[error("document template not found at {path}")]
    TemplateMissing {
        /// Path where the template was expected.
        path: String,
    },

    /// The document template has no pages to stamp.
    #[error("document template {path} has zero pages")]
    EmptyTemplate {
        /// Path of the empty template.
        path: String,
    },

    /// The document template could not be parsed.
    #[error("document template {path} is unreadable: {reason}")]
    TemplateUnreadable {
        /// Path of the template.
        path: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// Writing an artefact failed.
    #[error("failed to write {path}: {reason}")]
    Write {
        /// Destination path.
        path: String,
        /// Description of the failure.
        reason: String,
    },

    /// A spreadsheet could not be reopened or lacks an expected part.
    #[error("spreadsheet {path} is unreadable: {reason}")]
    SpreadsheetUnreadable {
        /// Path of the workbook.
        path: String,
        /// Description of the failure.
        reason: String,
    },

    /// The reopened spreadsheet does not carry the expected constraint.
    #[error("spreadsheet {path} does not constrain Covered to Y/N: {found}")]
    ConstraintMismatch {
        /// Path of the workbook.
        path: String,
        /// Description of what was found instead.
        found: String,
    },

    /// Checksumming a freshly written artefact failed.
    #[error("failed to record artefact: {0}")]
    Record(#[from] PackagingError),
}

/// Result type alias using [`ArtefactBuildError`].
pub type Result<T> = std::result::Result<T, ArtefactBuildError>;
