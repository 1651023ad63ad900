//! Behaviour-driven coverage for end-to-end release runs.

use camino::Utf8PathBuf;
use release_gate::artefact::document::page_count;
use release_gate::artefact::spreadsheet::{read_covered_constraint, read_row_count};
use release_gate::config::PipelineConfig;
use release_gate::pipeline::{Pipeline, Remote, RunReport};
use release_gate::stamp::RunStamp;
use release_gate::test_utils::{
    InMemoryReleaseHost, ManualClock, ScriptedCiClient, workflow_run, write_template_pdf,
};
use release_gate_common::REQUIRED_CODES;
use release_gate_common::test_support::complete_csv;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use tempfile::TempDir;

struct PipelineWorld {
    _dir: TempDir,
    config: PipelineConfig,
    ci: RefCell<Option<ScriptedCiClient>>,
    host: InMemoryReleaseHost,
    report: RefCell<Option<RunReport>>,
}

impl PipelineWorld {
    fn report(&self) -> RunReport {
        self.report
            .borrow()
            .clone()
            .unwrap_or_else(|| panic!("the pipeline must have run"))
    }

    fn run(&self) {
        let ci = self.ci.borrow();
        let ci = ci
            .as_ref()
            .unwrap_or_else(|| panic!("CI behaviour must be scripted"));
        let clock = ManualClock::new();
        let remote = Remote {
            ci,
            releases: &self.host,
            clock: &clock,
        };
        let stamp = RunStamp::parse_compact("20260102030405")
            .unwrap_or_else(|| panic!("fixed stamp parses"));
        let outcome = Pipeline::new(&self.config, stamp).run(Some(&remote), &mut std::io::sink());
        self.report.replace(Some(outcome.report));
    }
}

#[fixture]
fn world() -> PipelineWorld {
    let dir = TempDir::new().unwrap_or_else(|error| panic!("temp dir: {error}"));
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .unwrap_or_else(|path| panic!("non-utf-8 temp path {}", path.display()));
    let mut config = PipelineConfig::default();
    config.paths.out_dir = root.join("out");
    config.paths.bundle_dir = root.join("dist");
    config.paths.coverage = root.join("out/coverage.csv");
    config.paths.template = root.join("templates/coverage_template.pdf");
    config.ci.owner = "o".to_owned();
    config.ci.repo = "r".to_owned();
    PipelineWorld {
        _dir: dir,
        config,
        ci: RefCell::new(None),
        host: InMemoryReleaseHost::default(),
        report: RefCell::new(None),
    }
}

#[given("a valid coverage export with {rows} rows")]
fn given_valid_export(world: &PipelineWorld, rows: usize) {
    assert_eq!(rows, REQUIRED_CODES.len());
    std::fs::create_dir_all(&world.config.paths.out_dir)
        .unwrap_or_else(|error| panic!("create out dir: {error}"));
    std::fs::write(&world.config.paths.coverage, complete_csv())
        .unwrap_or_else(|error| panic!("write coverage: {error}"));
}

#[given("a document template with {pages} pages")]
fn given_template(world: &PipelineWorld, pages: usize) {
    if let Some(parent) = world.config.paths.template.parent() {
        std::fs::create_dir_all(parent).unwrap_or_else(|error| panic!("create dir: {error}"));
    }
    write_template_pdf(&world.config.paths.template, pages);
}

#[given("CI reports in_progress for {polls} polls and then {conclusion}")]
fn given_ci_script(world: &PipelineWorld, polls: usize, conclusion: String) {
    let mut responses: Vec<_> = (0..polls)
        .map(|_| Ok(Some(workflow_run("in_progress", None))))
        .collect();
    responses.push(Ok(Some(workflow_run("completed", Some(&conclusion)))));
    world.ci.replace(Some(ScriptedCiClient::new(responses)));
}

#[when("the release pipeline runs")]
fn when_pipeline_runs(world: &PipelineWorld) {
    world.run();
}

#[when("the release pipeline runs again")]
fn when_pipeline_runs_again(world: &PipelineWorld) {
    world.run();
}

#[then("the run succeeds")]
fn then_run_succeeds(world: &PipelineWorld) {
    let report = world.report();
    assert_eq!(report.exit_code, 0, "run failed: {:?}", report.error);
}

#[then("the run fails with exit code {code}")]
fn then_run_fails(world: &PipelineWorld, code: i32) {
    assert_eq!(world.report().exit_code, code);
}

#[then("the manifest is complete")]
fn then_manifest_complete(world: &PipelineWorld) {
    let manifest = world
        .report()
        .manifest
        .unwrap_or_else(|| panic!("manifest recorded"));
    assert!(manifest.ok());
    assert!(manifest.entries().iter().all(|entry| entry.checksum.is_some()));
}

#[then("the document has at least {pages} pages")]
fn then_document_pages(world: &PipelineWorld, pages: usize) {
    let count = page_count(&world.config.document_path())
        .unwrap_or_else(|error| panic!("document readable: {error}"));
    assert!(count >= pages, "document has {count} page(s)");
}

#[then("the spreadsheet has {rows} rows with Covered constrained to Y and N")]
fn then_spreadsheet_constrained(world: &PipelineWorld, rows: usize) {
    let path = world.config.spreadsheet_path();
    let count = read_row_count(&path).unwrap_or_else(|error| panic!("row count: {error}"));
    assert_eq!(count, rows);
    let constraint =
        read_covered_constraint(&path).unwrap_or_else(|error| panic!("constraint: {error}"));
    assert_eq!(constraint.kind, "list");
    assert_eq!(constraint.values, vec!["Y".to_owned(), "N".to_owned()]);
}

#[then("the release holds {assets} assets")]
fn then_release_assets(world: &PipelineWorld, assets: usize) {
    let release_id = world
        .report()
        .release_id
        .unwrap_or_else(|| panic!("release resolved"));
    assert_eq!(world.host.asset_names(release_id).len(), assets);
}

#[then("exactly {count} release was created")]
fn then_releases_created(world: &PipelineWorld, count: usize) {
    assert_eq!(world.host.create_calls(), count);
    assert_eq!(world.host.release_count(), count);
}

#[then("no release was created")]
fn then_no_release(world: &PipelineWorld) {
    assert_eq!(world.host.create_calls(), 0);
}

#[then("the spreadsheet and document remain on disk")]
fn then_artefacts_remain(world: &PipelineWorld) {
    assert!(world.config.spreadsheet_path().is_file());
    assert!(world.config.document_path().is_file());
}

#[scenario(path = "tests/features/release_pipeline.feature", index = 0)]
fn scenario_clean_run(world: PipelineWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/release_pipeline.feature", index = 1)]
fn scenario_rerun_is_idempotent(world: PipelineWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/release_pipeline.feature", index = 2)]
fn scenario_ci_failure_blocks_publish(world: PipelineWorld) {
    let _ = world;
}
