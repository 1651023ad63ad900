//! Validation findings.
//!
//! An [`Issue`] pairs a machine-readable [`IssueKind`] with a human-readable
//! detail line and the requirement codes it concerns. Issues serialise as
//! `{"type": "...", "detail": "...", "codes": [...]}`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The header does not match the canonical five columns.
    SchemaMismatch,
    /// A cell could not be read as its column type.
    InvalidValue,
    /// One or more required codes have no row.
    ReqMissing,
    /// One or more required codes have more than one row.
    ReqDuplicate,
    /// One or more rows carry a code outside the required set.
    ReqUnknown,
    /// A row claims coverage without a positive count and question ids.
    CoveredWithoutEvidence,
    /// A gap row has no proposed addition.
    GapMissingProposal,
}

impl IssueKind {
    /// Returns the wire name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SchemaMismatch => "schema_mismatch",
            Self::InvalidValue => "invalid_value",
            Self::ReqMissing => "req_missing",
            Self::ReqDuplicate => "req_duplicate",
            Self::ReqUnknown => "req_unknown",
            Self::CoveredWithoutEvidence => "covered_without_evidence",
            Self::GapMissingProposal => "gap_missing_proposal",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// The finding category.
    #[serde(rename = "type")]
    pub kind: IssueKind,
    /// Human-readable description naming the failing check.
    pub detail: String,
    /// Requirement codes the finding concerns, in reporting order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub codes: Vec<String>,
}

impl Issue {
    /// Create an issue that concerns no particular requirement.
    #[must_use]
    pub fn new(kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            codes: Vec::new(),
        }
    }

    /// Attach the requirement codes the issue concerns.
    #[must_use]
    pub fn with_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` when the issue lists `code`.
    #[must_use]
    pub fn concerns(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}
