//! Coverage table ingestion.
//!
//! Reads the delimited coverage export into typed [`CoverageRow`] values.
//! Columns are located by header name, so a reordered export still yields
//! rows; the header itself is kept verbatim for the schema check. Cells that
//! cannot be read as their column type become `invalid_value` issues and the
//! row keeps a neutral value (`N`, `0`) so the remaining checks still run.

use crate::issue::{Issue, IssueKind};
use crate::requirement::CANONICAL_COLUMNS;
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use thiserror::Error;

/// Errors arising while reading a coverage export.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// The export could not be opened.
    #[error("failed to open coverage table {path}: {source}")]
    Open {
        /// Path that was requested.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The export is not well-formed delimited text.
    #[error("malformed coverage table: {0}")]
    Csv(#[from] csv::Error),
}

/// Whether a requirement is evidenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Covered {
    /// Evidenced by at least one linked question.
    #[serde(rename = "Y")]
    Yes,
    /// Not evidenced; the row should propose an addition.
    #[serde(rename = "N")]
    No,
}

impl Covered {
    /// Parse a `Covered` cell. Only `Y` and `N` are accepted.
    #[must_use]
    pub fn parse(cell: &str) -> Option<Self> {
        match cell.trim() {
            "Y" => Some(Self::Yes),
            "N" => Some(Self::No),
            _ => None,
        }
    }

    /// Returns the cell text for this value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yes => "Y",
            Self::No => "N",
        }
    }
}

impl fmt::Display for Covered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One requirement's coverage record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageRow {
    /// Requirement code, expected to be one of the required codes.
    pub requirement: String,
    /// Whether the requirement is evidenced.
    pub covered: Covered,
    /// Number of linked evidence items.
    pub count: u32,
    /// Linked question identifiers, in export order.
    pub question_ids: Vec<String>,
    /// Proposed addition when the requirement is a gap.
    pub proposed_add_if_gap: String,
}

impl CoverageRow {
    /// Render the question identifiers as a single cell.
    #[must_use]
    pub fn question_ids_cell(&self) -> String {
        self.question_ids.join("; ")
    }
}

/// Split a `QuestionIDs` cell into identifiers.
///
/// Identifiers may be separated by `;`, `,`, `|` or whitespace; empty tokens
/// are dropped and order is preserved.
///
/// # Examples
///
/// ```
/// use release_gate_common::table::split_question_ids;
///
/// assert_eq!(split_question_ids("Q1; Q2,Q3/Q4"), vec!["Q1", "Q2", "Q3", "Q4"]);
/// assert!(split_question_ids("  ").is_empty());
/// ```
#[must_use]
pub fn split_question_ids(cell: &str) -> Vec<String> {
    cell.split(|c: char| matches!(c, ';' | ',' | '|' | '/') || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Aggregate counts used by the document overlay and run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Number of rows.
    pub total: usize,
    /// Rows with `Covered=Y`.
    pub covered: usize,
    /// `total - covered`.
    pub gaps: usize,
}

/// A coverage export as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageTable {
    columns: Vec<String>,
    rows: Vec<CoverageRow>,
    cell_issues: Vec<Issue>,
}

impl CoverageTable {
    /// Build a table with the canonical header from typed rows.
    #[must_use]
    pub fn from_rows(rows: Vec<CoverageRow>) -> Self {
        Self {
            columns: CANONICAL_COLUMNS.iter().map(|c| (*c).to_owned()).collect(),
            rows,
            cell_issues: Vec::new(),
        }
    }

    /// Read a coverage export from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoverageError::Open`] when the file cannot be opened and
    /// [`CoverageError::Csv`] when it is not well-formed delimited text.
    pub fn read(path: &Utf8Path) -> Result<Self, CoverageError> {
        let file = File::open(path).map_err(|source| CoverageError::Open {
            path: path.to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Read a coverage export from any byte source.
    ///
    /// # Errors
    ///
    /// Returns [`CoverageError::Csv`] when the input is not well-formed.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CoverageError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let columns: Vec<String> = csv_reader.headers()?.iter().map(str::to_owned).collect();
        let layout = ColumnLayout::locate(&columns);

        let mut rows = Vec::new();
        let mut cell_issues = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            // Header is line 1.
            let line = index + 2;
            rows.push(layout.row_from(&record, line, &mut cell_issues));
        }

        log::debug!(
            "read coverage table with {} rows and {} cell issues",
            rows.len(),
            cell_issues.len()
        );
        Ok(Self {
            columns,
            rows,
            cell_issues,
        })
    }

    /// The header as read.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Typed rows in input order.
    #[must_use]
    pub fn rows(&self) -> &[CoverageRow] {
        &self.rows
    }

    /// `invalid_value` findings gathered while reading.
    #[must_use]
    pub fn cell_issues(&self) -> &[Issue] {
        &self.cell_issues
    }

    /// Total, covered, and gap counts.
    #[must_use]
    pub fn summary(&self) -> CoverageSummary {
        let total = self.rows.len();
        let covered = self
            .rows
            .iter()
            .filter(|row| row.covered == Covered::Yes)
            .count();
        CoverageSummary {
            total,
            covered,
            gaps: total - covered,
        }
    }
}

/// Header positions of the canonical columns.
struct ColumnLayout {
    requirement: Option<usize>,
    covered: Option<usize>,
    count: Option<usize>,
    question_ids: Option<usize>,
    proposed: Option<usize>,
}

impl ColumnLayout {
    fn locate(columns: &[String]) -> Self {
        let find = |name: &str| columns.iter().position(|c| c.trim() == name);
        Self {
            requirement: find("Requirement"),
            covered: find("Covered"),
            count: find("Count"),
            question_ids: find("QuestionIDs"),
            proposed: find("ProposedAddIfGap"),
        }
    }

    fn row_from(
        &self,
        record: &csv::StringRecord,
        line: usize,
        issues: &mut Vec<Issue>,
    ) -> CoverageRow {
        let cell = |position: Option<usize>| {
            position
                .and_then(|index| record.get(index))
                .map_or("", str::trim)
        };

        let requirement = cell(self.requirement).to_owned();
        let covered_cell = cell(self.covered);
        let covered = Covered::parse(covered_cell).unwrap_or_else(|| {
            issues.push(invalid_value(&requirement, line, "Covered", covered_cell));
            Covered::No
        });
        let count_cell = cell(self.count);
        let count = count_cell.parse::<u32>().unwrap_or_else(|_| {
            issues.push(invalid_value(&requirement, line, "Count", count_cell));
            0
        });

        CoverageRow {
            question_ids: split_question_ids(cell(self.question_ids)),
            proposed_add_if_gap: cell(self.proposed).to_owned(),
            requirement,
            covered,
            count,
        }
    }
}

fn invalid_value(requirement: &str, line: usize, column: &str, value: &str) -> Issue {
    let issue = Issue::new(
        IssueKind::InvalidValue,
        format!("line {line}: column {column} has unreadable value \"{value}\""),
    );
    if requirement.is_empty() {
        issue
    } else {
        issue.with_codes([requirement])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HEADER: &str = "Requirement,Covered,Count,QuestionIDs,ProposedAddIfGap\n";

    fn parse(body: &str) -> CoverageTable {
        CoverageTable::from_reader(format!("{HEADER}{body}").as_bytes()).expect("parse table")
    }

    #[test]
    fn reads_typed_rows() {
        let table = parse("CR1,Y,2,\"Q1;Q2\",\nCR2,N,0,,Add a question\n");
        assert_eq!(table.rows().len(), 2);
        let first = &table.rows()[0];
        assert_eq!(first.covered, Covered::Yes);
        assert_eq!(first.count, 2);
        assert_eq!(first.question_ids, vec!["Q1", "Q2"]);
        assert_eq!(table.rows()[1].proposed_add_if_gap, "Add a question");
        assert!(table.cell_issues().is_empty());
    }

    #[test]
    fn keeps_header_verbatim() {
        let table = CoverageTable::from_reader(
            "Covered,Requirement,Count,QuestionIDs,ProposedAddIfGap\nY,CR1,1,Q1,\n".as_bytes(),
        )
        .expect("parse table");
        assert_eq!(table.columns()[0], "Covered");
        assert_eq!(table.rows()[0].requirement, "CR1");
    }

    #[rstest]
    #[case::lowercase_covered("CR1,y,1,Q1,\n", "Covered")]
    #[case::negative_count("CR1,Y,-1,Q1,\n", "Count")]
    #[case::empty_count("CR1,N,,,Add\n", "Count")]
    fn unreadable_cells_become_issues(#[case] body: &str, #[case] column: &str) {
        let table = parse(body);
        let issues = table.cell_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::InvalidValue);
        assert!(issues[0].detail.contains(column), "{}", issues[0].detail);
        assert!(issues[0].concerns("CR1"));
    }

    #[test]
    fn skips_blank_records() {
        let table = parse("CR1,Y,1,Q1,\n,,,,\n");
        assert_eq!(table.rows().len(), 1);
    }

    #[test]
    fn summary_counts_gaps() {
        let table = parse("CR1,Y,1,Q1,\nCR2,N,0,,Add\nCR3,N,0,,Add\n");
        let summary = table.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.covered, 1);
        assert_eq!(summary.gaps, 2);
    }

    #[test]
    fn read_opens_exported_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("coverage_report.csv");
        std::fs::write(&path, format!("{HEADER}A,Y,1,\"Q7/Q9\",\n")).expect("write export");
        let path = Utf8Path::from_path(&path).expect("utf-8 temp path");

        let table = CoverageTable::read(path).expect("read export");

        assert_eq!(table.rows()[0].question_ids, vec!["Q7", "Q9"]);
    }

    #[test]
    fn read_reports_missing_file() {
        let err = CoverageTable::read(Utf8Path::new("/nonexistent/coverage.csv"))
            .expect_err("missing file should fail");
        assert!(matches!(err, CoverageError::Open { .. }));
    }
}
