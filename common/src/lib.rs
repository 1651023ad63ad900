//! Coverage domain shared by the release-gate pipeline: the fixed
//! requirement code set, typed coverage rows read from the CSV export, and
//! the validator that reports schema, completeness, and per-row issues.

pub mod issue;
pub mod requirement;
pub mod table;
pub mod test_support;
pub mod validator;

pub use issue::{Issue, IssueKind};
pub use requirement::{APPENDIX_CODES, CANONICAL_COLUMNS, CORE_CODES, REQUIRED_CODES, is_required};
pub use table::{CoverageError, CoverageRow, CoverageSummary, CoverageTable, Covered};
pub use validator::{ValidationReport, validate};
