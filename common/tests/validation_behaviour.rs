//! Behaviour-driven coverage for reading and validating coverage exports.

use release_gate_common::test_support::{complete_rows, to_csv};
use release_gate_common::{CoverageRow, CoverageTable, Covered, ValidationReport, validate};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

#[derive(Debug, Default)]
struct ValidationWorld {
    rows: RefCell<Vec<CoverageRow>>,
    report: RefCell<Option<ValidationReport>>,
}

impl ValidationWorld {
    fn report(&self) -> ValidationReport {
        self.report
            .borrow()
            .clone()
            .unwrap_or_else(|| panic!("validation must have run"))
    }

    fn issue_lists(&self, kind: &str, code: &str) -> usize {
        self.report()
            .issues()
            .iter()
            .filter(|issue| issue.kind.as_str() == kind && issue.concerns(code))
            .count()
    }
}

#[fixture]
fn world() -> ValidationWorld {
    ValidationWorld::default()
}

#[given("a coverage export covering every required code")]
fn given_complete_export(world: &ValidationWorld) {
    world.rows.replace(complete_rows());
}

#[given("the row for \"{code}\" is removed")]
fn given_row_removed(world: &ValidationWorld, code: String) {
    world.rows.borrow_mut().retain(|row| row.requirement != code);
}

#[given("a covered row \"{code}\" with count 0 and no question ids")]
fn given_unevidenced_row(world: &ValidationWorld, code: String) {
    world.rows.borrow_mut().push(CoverageRow {
        requirement: code,
        covered: Covered::Yes,
        count: 0,
        question_ids: Vec::new(),
        proposed_add_if_gap: String::new(),
    });
}

#[given("the row for \"{code}\" is a gap without a proposal")]
fn given_gap_without_proposal(world: &ValidationWorld, code: String) {
    for row in world.rows.borrow_mut().iter_mut() {
        if row.requirement == code {
            row.covered = Covered::No;
            row.count = 0;
            row.question_ids.clear();
            row.proposed_add_if_gap.clear();
        }
    }
}

#[when("the coverage table is validated")]
fn when_validated(world: &ValidationWorld) {
    let csv = to_csv(&world.rows.borrow());
    let table = CoverageTable::from_reader(csv.as_bytes())
        .unwrap_or_else(|error| panic!("export should parse: {error}"));
    world.report.replace(Some(validate(&table)));
}

#[then("validation passes")]
fn then_passes(world: &ValidationWorld) {
    let report = world.report();
    assert!(report.pass(), "unexpected issues: {:?}", report.issues());
}

#[then("validation fails")]
fn then_fails(world: &ValidationWorld) {
    assert!(!world.report().pass());
}

#[then("exactly one \"{kind}\" issue lists \"{code}\"")]
fn then_exactly_one(world: &ValidationWorld, kind: String, code: String) {
    let report = world.report();
    let of_kind = report
        .issues()
        .iter()
        .filter(|issue| issue.kind.as_str() == kind)
        .count();
    assert_eq!(of_kind, 1, "issues: {:?}", report.issues());
    assert_eq!(world.issue_lists(&kind, &code), 1);
}

#[then("a \"{kind}\" issue lists \"{code}\"")]
fn then_issue_lists(world: &ValidationWorld, kind: String, code: String) {
    assert!(
        world.issue_lists(&kind, &code) >= 1,
        "issues: {:?}",
        world.report().issues()
    );
}

#[scenario(path = "tests/features/coverage_validation.feature", index = 0)]
fn scenario_complete_table_passes(world: ValidationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/coverage_validation.feature", index = 1)]
fn scenario_missing_requirement(world: ValidationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/coverage_validation.feature", index = 2)]
fn scenario_covered_without_evidence(world: ValidationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/coverage_validation.feature", index = 3)]
fn scenario_gap_without_proposal(world: ValidationWorld) {
    let _ = world;
}
