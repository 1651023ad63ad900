//! Coverage validator.
//!
//! Runs the schema, completeness, and per-row semantic checks over a
//! [`CoverageTable`]. Every check runs regardless of the others and the
//! report orders findings by band: schema (including unreadable cells),
//! then completeness, then rows in input order. The validator is pure; the
//! same table always yields the same report.

use crate::issue::{Issue, IssueKind};
use crate::requirement::{CANONICAL_COLUMNS, REQUIRED_CODES, is_required};
use crate::table::{CoverageRow, CoverageTable, Covered};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The validator's verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pass: bool,
    issues: Vec<Issue>,
}

impl ValidationReport {
    fn new(issues: Vec<Issue>) -> Self {
        Self {
            pass: issues.is_empty(),
            issues,
        }
    }

    /// `true` iff no issue was found.
    #[must_use]
    pub fn pass(&self) -> bool {
        self.pass
    }

    /// Findings in reporting order.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Findings of a single kind, in reporting order.
    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    /// Serialise the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Validate a coverage table.
///
/// # Examples
///
/// ```
/// use release_gate_common::test_support::complete_table;
/// use release_gate_common::validate;
///
/// let report = validate(&complete_table());
/// assert!(report.pass());
/// ```
#[must_use]
pub fn validate(table: &CoverageTable) -> ValidationReport {
    let mut issues = Vec::new();
    issues.extend(check_schema(table.columns()));
    issues.extend(table.cell_issues().iter().cloned());
    issues.extend(check_completeness(table.rows()));
    issues.extend(table.rows().iter().filter_map(check_row));

    log::debug!("validation produced {} issue(s)", issues.len());
    ValidationReport::new(issues)
}

fn check_schema(columns: &[String]) -> Option<Issue> {
    if columns.iter().map(String::as_str).eq(CANONICAL_COLUMNS) {
        return None;
    }
    Some(Issue::new(
        IssueKind::SchemaMismatch,
        format!(
            "columns [{}] do not match expected [{}]",
            columns.join(", "),
            CANONICAL_COLUMNS.join(", ")
        ),
    ))
}

fn check_completeness(rows: &[CoverageRow]) -> Vec<Issue> {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        *occurrences.entry(row.requirement.as_str()).or_default() += 1;
    }
    let seen = |code: &str| occurrences.get(code).copied().unwrap_or(0);

    let missing: Vec<&str> = REQUIRED_CODES
        .iter()
        .copied()
        .filter(|code| seen(code) == 0)
        .collect();
    let duplicated: Vec<&str> = REQUIRED_CODES
        .iter()
        .copied()
        .filter(|code| seen(code) > 1)
        .collect();
    let mut unknown: Vec<&str> = Vec::new();
    for row in rows {
        let code = row.requirement.as_str();
        if !is_required(code) && !unknown.contains(&code) {
            unknown.push(code);
        }
    }

    let mut issues = Vec::new();
    if !missing.is_empty() {
        issues.push(
            Issue::new(
                IssueKind::ReqMissing,
                format!("missing requirement codes: {}", missing.join(", ")),
            )
            .with_codes(missing),
        );
    }
    if !duplicated.is_empty() {
        issues.push(
            Issue::new(
                IssueKind::ReqDuplicate,
                format!("requirement codes listed more than once: {}", duplicated.join(", ")),
            )
            .with_codes(duplicated),
        );
    }
    if !unknown.is_empty() {
        issues.push(
            Issue::new(
                IssueKind::ReqUnknown,
                format!("unknown requirement codes: {}", quoted(&unknown)),
            )
            .with_codes(unknown),
        );
    }
    issues
}

fn check_row(row: &CoverageRow) -> Option<Issue> {
    let code = row.requirement.as_str();
    match row.covered {
        Covered::Yes if row.count == 0 || row.question_ids.is_empty() => Some(
            Issue::new(
                IssueKind::CoveredWithoutEvidence,
                format!(
                    "{code} is marked covered with count {} and {} question id(s)",
                    row.count,
                    row.question_ids.len()
                ),
            )
            .with_codes([code]),
        ),
        Covered::No if row.proposed_add_if_gap.trim().is_empty() => Some(
            Issue::new(
                IssueKind::GapMissingProposal,
                format!("{code} is a gap without a proposed addition"),
            )
            .with_codes([code]),
        ),
        Covered::Yes | Covered::No => None,
    }
}

fn quoted(codes: &[&str]) -> String {
    codes
        .iter()
        .map(|code| format!("\"{code}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
