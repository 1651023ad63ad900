//! User-facing progress lines for the CLI.
//!
//! Progress goes to stderr so stdout carries only the final manifest.

use crate::artefact::{Artefact, Bundle};
use crate::ci::GateReport;
use crate::release::UploadOutcome;
use release_gate_common::ValidationReport;
use std::io::Write;

/// Write one line; write failures are ignored.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Summary line for a validation report.
#[must_use]
pub fn validation_message(report: &ValidationReport) -> String {
    if report.pass() {
        return "Coverage table valid.".to_owned();
    }
    let mut message = format!("Coverage table has {} issue(s):", report.issues().len());
    for issue in report.issues() {
        message.push_str(&format!("\n  [{}] {}", issue.kind, issue.detail));
    }
    message
}

/// Line for a freshly built artefact.
#[must_use]
pub fn artefact_message(artefact: &Artefact) -> String {
    format!(
        "Built {} {} ({} bytes, sha256 {})",
        artefact.kind(),
        artefact.path(),
        artefact.size(),
        artefact.checksum()
    )
}

/// Line for a written bundle.
#[must_use]
pub fn bundle_message(bundle: &Bundle) -> String {
    format!("Bundled {} (sha256 {})", bundle.path, bundle.sha256)
}

/// Line for the gate's final state.
#[must_use]
pub fn gate_message(report: &GateReport) -> String {
    match &report.run_url {
        Some(url) => format!("CI gate {} after {} poll(s): {url}", report.state, report.polls),
        None => format!("CI gate {} after {} poll(s)", report.state, report.polls),
    }
}

/// Line for one asset publication.
#[must_use]
pub fn upload_message(asset_name: &str, outcome: UploadOutcome) -> String {
    match outcome {
        UploadOutcome::Uploaded => format!("Uploaded {asset_name}"),
        UploadOutcome::AlreadyPresent => format!("Skipped {asset_name} (already attached)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use release_gate_common::test_support::complete_table;
    use release_gate_common::{CoverageTable, validate};

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut stderr = Vec::new();
        write_stderr_line(&mut stderr, "hello");
        assert_eq!(stderr, b"hello\n");
    }

    #[test]
    fn passing_report_is_one_line() {
        let message = validation_message(&validate(&complete_table()));
        assert_eq!(message, "Coverage table valid.");
    }

    #[test]
    fn failing_report_lists_each_issue() {
        let message = validation_message(&validate(&CoverageTable::from_rows(Vec::new())));
        assert!(message.starts_with("Coverage table has 1 issue(s):"));
        assert!(message.contains("[req_missing]"));
    }

    #[test]
    fn upload_outcomes_are_distinguished() {
        assert_eq!(upload_message("a", UploadOutcome::Uploaded), "Uploaded a");
        assert!(upload_message("a", UploadOutcome::AlreadyPresent).starts_with("Skipped a"));
    }
}
