//! The fixed requirement code set and canonical column layout.

/// Core requirement codes, in canonical order.
pub const CORE_CODES: [&str; 10] = [
    "CR1", "CR2", "CR3", "CR4", "CR5", "CR6", "CR7", "CR8", "CR9", "CR10",
];

/// Appendix requirement codes, in canonical order.
pub const APPENDIX_CODES: [&str; 7] = ["A", "B", "C", "D", "E", "F", "G"];

/// Every code a complete coverage table must carry exactly once: the core
/// codes followed by the appendix codes.
pub const REQUIRED_CODES: [&str; 17] = [
    "CR1", "CR2", "CR3", "CR4", "CR5", "CR6", "CR7", "CR8", "CR9", "CR10", "A", "B", "C", "D", "E",
    "F", "G",
];

/// The five columns of the coverage export, in order.
pub const CANONICAL_COLUMNS: [&str; 5] = [
    "Requirement",
    "Covered",
    "Count",
    "QuestionIDs",
    "ProposedAddIfGap",
];

/// Returns `true` when `code` belongs to the required code set.
///
/// # Examples
///
/// ```
/// use release_gate_common::is_required;
///
/// assert!(is_required("CR3"));
/// assert!(is_required("G"));
/// assert!(!is_required("H"));
/// assert!(!is_required("cr3"));
/// ```
#[must_use]
pub fn is_required(code: &str) -> bool {
    REQUIRED_CODES.contains(&code)
}
