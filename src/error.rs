//! Top-level pipeline errors and their exit codes.
//!
//! Each stage's error type converts into [`PipelineError`], which decides
//! the process exit code and which stage the run report blames.

use crate::artefact::{ArtefactBuildError, PackagingError};
use crate::config::ConfigError;
use crate::http::HttpError;
use crate::release::ReleaseError;
use release_gate_common::CoverageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Settings and credentials.
    Configure,
    /// Coverage ingestion and validation.
    Validate,
    /// Spreadsheet and document generation.
    Build,
    /// Manifest and bundle.
    Package,
    /// CI gate.
    Gate,
    /// Release resolution and asset upload.
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Configure => "configure",
            Self::Validate => "validate",
            Self::Build => "build",
            Self::Package => "package",
            Self::Gate => "gate",
            Self::Publish => "publish",
        })
    }
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The coverage table could not be read.
    #[error("cannot read coverage table: {0}")]
    CoverageInput(#[from] CoverageError),

    /// The coverage table failed validation.
    #[error("coverage validation failed with {issues} issue(s); see {report}")]
    ValidationFailed {
        /// Number of issues reported.
        issues: usize,
        /// Where the issue report was written.
        report: String,
    },

    /// An artefact could not be built.
    #[error(transparent)]
    ArtefactBuild(#[from] ArtefactBuildError),

    /// Manifest or bundle creation failed.
    #[error(transparent)]
    Packaging(#[from] PackagingError),

    /// Expected outputs are missing.
    #[error("packaging incomplete; missing: {}", missing.join(", "))]
    PackagingIncomplete {
        /// Paths that were expected but not found.
        missing: Vec<String>,
    },

    /// The CI run concluded unsuccessfully.
    #[error("CI gate failed: {detail}")]
    CiFailure {
        /// The terminal transition line.
        detail: String,
    },

    /// The CI run did not conclude within the budget.
    #[error("CI gate timed out; check {dashboard_url}")]
    CiTimeout {
        /// Workflow history page for manual follow-up.
        dashboard_url: String,
    },

    /// A remote host could not be reached or rejected the request.
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// Publishing failed.
    #[error(transparent)]
    Release(#[from] ReleaseError),

    /// Configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A filesystem operation outside the stage modules failed.
    #[error("{action} {path}: {source}")]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// The path involved.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A report could not be serialised.
    #[error("cannot serialise report: {0}")]
    Report(#[from] serde_json::Error),
}

impl PipelineError {
    /// Process exit code for this failure.
    ///
    /// | code | meaning |
    /// |------|---------|
    /// | 1 | I/O or unexpected |
    /// | 2 | validation failed |
    /// | 3 | artefact build failed |
    /// | 4 | packaging incomplete |
    /// | 5 | CI failure |
    /// | 6 | CI timeout |
    /// | 7 | transport or authentication |
    /// | 8 | configuration |
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CoverageInput(_) | Self::Io { .. } | Self::Report(_) => 1,
            Self::ValidationFailed { .. } => 2,
            Self::ArtefactBuild(_) => 3,
            Self::Packaging(_) | Self::PackagingIncomplete { .. } => 4,
            Self::CiFailure { .. } => 5,
            Self::CiTimeout { .. } => 6,
            Self::Transport(_) | Self::Release(ReleaseError::Transport(_)) => 7,
            Self::Release(ReleaseError::AssetRead { .. }) => 1,
            Self::Config(_) => 8,
        }
    }
}

/// Result type alias using [`PipelineError`].
pub type Result<T> = std::result::Result<T, PipelineError>;
