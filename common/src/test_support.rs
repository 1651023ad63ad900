//! Shared fixtures for coverage tables.
//!
//! Used by unit and behaviour tests across the workspace to build tables
//! and CSV exports without repeating the seventeen-row boilerplate.

use crate::requirement::{CANONICAL_COLUMNS, REQUIRED_CODES};
use crate::table::{CoverageRow, CoverageTable, Covered};

/// A covered row with one linked question.
#[must_use]
pub fn covered_row(code: &str) -> CoverageRow {
    CoverageRow {
        requirement: code.to_owned(),
        covered: Covered::Yes,
        count: 1,
        question_ids: vec![format!("Q-{code}")],
        proposed_add_if_gap: String::new(),
    }
}

/// A gap row carrying a proposed addition.
#[must_use]
pub fn gap_row(code: &str) -> CoverageRow {
    CoverageRow {
        requirement: code.to_owned(),
        covered: Covered::No,
        count: 0,
        question_ids: Vec::new(),
        proposed_add_if_gap: format!("ADD_{code}_QUESTION"),
    }
}

/// Covered rows for every required code, in canonical order.
#[must_use]
pub fn complete_rows() -> Vec<CoverageRow> {
    REQUIRED_CODES.iter().map(|code| covered_row(code)).collect()
}

/// A table that passes validation.
#[must_use]
pub fn complete_table() -> CoverageTable {
    CoverageTable::from_rows(complete_rows())
}

/// Render rows as a CSV export with the canonical header.
#[must_use]
pub fn to_csv(rows: &[CoverageRow]) -> String {
    let mut out = CANONICAL_COLUMNS.join(",");
    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{},{},{},\"{}\",\"{}\"\n",
            row.requirement,
            row.covered,
            row.count,
            row.question_ids_cell(),
            row.proposed_add_if_gap.replace('"', "\"\"")
        ));
    }
    out
}

/// A valid CSV export covering every required code.
#[must_use]
pub fn complete_csv() -> String {
    to_csv(&complete_rows())
}
