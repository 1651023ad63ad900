//! Orchestration of the release stages.
//!
//! Stages run strictly in order (validate, build, package, gate, publish)
//! and the first hard failure stops the run. Validation on its own is not a
//! hard failure: artefacts are still built from an invalid table so they can
//! be inspected, but the coverage file is read and validated again
//! immediately before packaging, and a table that fails there aborts the run.
//!
//! Every orchestrated run writes `release_report.json` to the output
//! directory, including runs that fail after the directory was created.

use crate::artefact::document::{DocumentParams, build_document};
use crate::artefact::packaging::MANIFEST_FILE_NAME;
use crate::artefact::spreadsheet::{SpreadsheetParams, build_spreadsheet, read_covered_constraint};
use crate::artefact::{
    Artefact, ArtefactBuildError, Bundle, Manifest, PackageOutcome, PackageParams, package_release,
};
use crate::ci::{CiClient, Clock, GateReport, GateState, await_gate};
use crate::config::{ConfigError, PipelineConfig};
use crate::error::{PipelineError, Result, Stage};
use crate::output::{
    artefact_message, bundle_message, gate_message, upload_message, validation_message,
    write_stderr_line,
};
use crate::release::{ReleaseHost, ReleaseResolver, ReleaseTag, UploadOutcome};
use crate::stamp::RunStamp;
use camino::{Utf8Path, Utf8PathBuf};
use release_gate_common::{CoverageTable, ValidationReport, validate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;

/// Issue report written by the validate stage.
pub const ISSUES_FILE_NAME: &str = "coverage_issues.json";

/// Run report written at the end of every orchestrated run.
pub const REPORT_FILE_NAME: &str = "release_report.json";

/// Remote collaborators needed by the gate and publish stages.
pub struct Remote<'a> {
    /// CI host.
    pub ci: &'a dyn CiClient,
    /// Release host.
    pub releases: &'a dyn ReleaseHost,
    /// Time source for the gate.
    pub clock: &'a dyn Clock,
}

/// One asset publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedAsset {
    /// Asset name on the release.
    pub name: String,
    /// Whether this run uploaded it.
    pub outcome: UploadOutcome,
}

/// Machine-readable summary of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Run start time, RFC 3339.
    pub started_at: String,
    /// Validation of the coverage table.
    pub validation: Option<ValidationReport>,
    /// Artefacts built this run.
    pub artefacts: Vec<Artefact>,
    /// Manifest over expected outputs.
    pub manifest: Option<Manifest>,
    /// Bundle, when the manifest was complete.
    pub bundle: Option<Bundle>,
    /// CI gate outcome.
    pub gate: Option<GateReport>,
    /// Release tag used for publication.
    pub tag: Option<String>,
    /// Id of the resolved release.
    pub release_id: Option<u64>,
    /// Assets published or found already present.
    pub assets: Vec<PublishedAsset>,
    /// Stage that aborted the run.
    pub failed_stage: Option<Stage>,
    /// Message of the aborting error.
    pub error: Option<String>,
    /// Process exit code the run maps to.
    pub exit_code: i32,
}

impl RunReport {
    fn new(stamp: &RunStamp) -> Self {
        Self {
            started_at: stamp.rfc3339(),
            ..Self::default()
        }
    }
}

/// What [`Pipeline::run`] produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// The run report, as written.
    pub report: RunReport,
    /// `Ok` when every selected stage succeeded.
    pub result: Result<()>,
}

/// A validated coverage table.
#[derive(Debug)]
pub struct Validated {
    /// The table as read.
    pub table: CoverageTable,
    /// Its validation report.
    pub report: ValidationReport,
}

/// The release pipeline for one run.
#[derive(Debug)]
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    stamp: RunStamp,
}

impl<'a> Pipeline<'a> {
    /// Pipeline over `config` for a run started at `stamp`.
    #[must_use]
    pub fn new(config: &'a PipelineConfig, stamp: RunStamp) -> Self {
        Self { config, stamp }
    }

    /// The run timestamp.
    #[must_use]
    pub fn stamp(&self) -> &RunStamp {
        &self.stamp
    }

    /// Create the output directory.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if it cannot be created.
    pub fn prepare_out_dir(&self) -> Result<()> {
        let out_dir = &self.config.paths.out_dir;
        fs::create_dir_all(out_dir).map_err(|source| PipelineError::Io {
            action: "cannot create output directory",
            path: out_dir.to_string(),
            source,
        })
    }

    /// The release tag for this run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when the configured prefix does
    /// not yield a parsable tag.
    pub fn release_tag(&self) -> Result<ReleaseTag> {
        ReleaseTag::generate(&self.config.release.tag_prefix, &self.stamp)
            .map_err(|e| ConfigError::from(e).into())
    }

    /// Read and validate the coverage table, writing the issue report.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CoverageInput`] when the table cannot be
    /// read. A failing validation is not an error here.
    pub fn validate(&self) -> Result<Validated> {
        let table = CoverageTable::read(&self.config.paths.coverage)?;
        let report = validate(&table);
        let issues_path = self.config.paths.out_dir.join(ISSUES_FILE_NAME);
        write_file(&issues_path, report.to_json()?.as_bytes())?;
        if report.pass() {
            log::info!("coverage table {} is valid", self.config.paths.coverage);
        } else {
            log::warn!(
                "coverage table {} has {} issue(s); see {issues_path}",
                self.config.paths.coverage,
                report.issues().len()
            );
        }
        Ok(Validated { table, report })
    }

    /// Build both artefacts and confirm the workbook's constraint survives
    /// a re-open.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ArtefactBuild`] when either builder fails or
    /// the reopened workbook does not restrict `Covered` to `Y`/`N`.
    pub fn build(&self, table: &CoverageTable) -> Result<Vec<Artefact>> {
        let spreadsheet_path = self.config.spreadsheet_path();
        let spreadsheet = build_spreadsheet(
            table,
            &SpreadsheetParams {
                output_path: &spreadsheet_path,
                form: self.config.spreadsheet.constraint,
                generated_at: &self.stamp,
            },
        )?;
        let constraint = read_covered_constraint(&spreadsheet_path)?;
        if !constraint.restricts_to_covered_values() {
            return Err(ArtefactBuildError::ConstraintMismatch {
                path: spreadsheet_path.to_string(),
                found: format!(
                    "{} {:?} over {}",
                    constraint.kind, constraint.values, constraint.range
                ),
            }
            .into());
        }

        let document_path = self.config.document_path();
        let source_label = self.config.source_label();
        let document = build_document(
            table,
            &DocumentParams {
                template: &self.config.paths.template,
                output_path: &document_path,
                generated_at: &self.stamp,
                source_label: &source_label,
            },
        )?;
        Ok(vec![spreadsheet, document])
    }

    /// Re-validate the coverage file, then write the manifest and, when
    /// complete, the bundle. A run report left by an earlier run is removed
    /// first so it never lands in the bundle.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ValidationFailed`] when the coverage file no
    /// longer validates and [`PipelineError::Packaging`] on I/O failure. An
    /// incomplete manifest is returned, not raised; see
    /// [`require_bundle`].
    pub fn package(&self) -> Result<PackageOutcome> {
        let Validated { report, .. } = self.validate()?;
        if !report.pass() {
            return Err(PipelineError::ValidationFailed {
                issues: report.issues().len(),
                report: self.config.paths.out_dir.join(ISSUES_FILE_NAME).to_string(),
            });
        }
        remove_stale(&self.config.paths.out_dir.join(REPORT_FILE_NAME))?;
        Ok(package_release(&PackageParams {
            expected: self.config.expected_outputs(),
            out_dir: &self.config.paths.out_dir,
            bundle_dir: &self.config.paths.bundle_dir,
            stamp: &self.stamp,
        })?)
    }

    /// Wait for CI on the configured workflow and branch.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when the repository or workflow is
    /// not configured and [`PipelineError::Transport`] when a poll fails. A
    /// failed or timed-out gate is returned, not raised; see
    /// [`require_gate_success`].
    pub fn await_ci(&self, ci: &dyn CiClient, clock: &dyn Clock) -> Result<GateReport> {
        self.config.repository()?;
        let settings = self.config.gate_settings()?;
        Ok(await_gate(ci, clock, &settings)?)
    }

    /// Resolve (or create) the release for `tag` and attach each asset
    /// under its file name unless already present.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Release`] when the host fails or an asset
    /// cannot be read.
    pub fn publish(
        &self,
        host: &dyn ReleaseHost,
        tag: &ReleaseTag,
        assets: &[Utf8PathBuf],
    ) -> Result<(u64, Vec<PublishedAsset>)> {
        self.config.repository()?;
        let resolver = ReleaseResolver::new(host, self.config.release.target.clone());
        let release_id = resolver.resolve_or_create_release(tag)?;
        let mut published = Vec::with_capacity(assets.len());
        for path in assets {
            let name = asset_name(path)?;
            let outcome = resolver.upload_asset_if_absent(release_id, path, &name)?;
            published.push(PublishedAsset { name, outcome });
        }
        Ok((release_id, published))
    }

    /// Run every stage, writing progress to `stderr` and the run report to
    /// the output directory.
    pub fn run(&self, remote: Option<&Remote<'_>>, stderr: &mut dyn Write) -> RunOutcome {
        let mut report = RunReport::new(&self.stamp);
        let result = self.run_stages(remote, &mut report, stderr);

        if let Err((stage, error)) = &result {
            log::error!("{stage} stage failed: {error}");
            report.failed_stage = Some(*stage);
            report.error = Some(error.to_string());
            report.exit_code = error.exit_code();
        }
        let mut result = result.map_err(|(_, error)| error);
        let written = if self.config.paths.out_dir.is_dir() {
            self.write_report(&report)
        } else {
            Ok(())
        };
        if let Err(error) = written {
            log::warn!("cannot write run report: {error}");
            if result.is_ok() {
                result = Err(error);
            }
        }
        RunOutcome { report, result }
    }

    fn run_stages(
        &self,
        remote: Option<&Remote<'_>>,
        report: &mut RunReport,
        stderr: &mut dyn Write,
    ) -> std::result::Result<(), (Stage, PipelineError)> {
        self.prepare_out_dir().map_err(at(Stage::Configure))?;
        self.clear_previous_outputs().map_err(at(Stage::Configure))?;
        let tag = self.release_tag().map_err(at(Stage::Configure))?;

        let validated = self.validate().map_err(at(Stage::Validate))?;
        write_stderr_line(stderr, validation_message(&validated.report));
        report.validation = Some(validated.report);

        let artefacts = self.build(&validated.table).map_err(at(Stage::Build))?;
        for artefact in &artefacts {
            write_stderr_line(stderr, artefact_message(artefact));
        }
        report.artefacts = artefacts;

        let packaged = self.package().map_err(at(Stage::Package))?;
        report.manifest = Some(packaged.manifest.clone());
        let bundle = require_bundle(&packaged).map_err(at(Stage::Package))?.clone();
        write_stderr_line(stderr, bundle_message(&bundle));
        report.bundle = Some(bundle.clone());

        if self.config.gate.skip_publish {
            log::info!("publish skipped by configuration");
            return Ok(());
        }
        let remote = remote
            .ok_or(PipelineError::Config(ConfigError::MissingCredentials))
            .map_err(at(Stage::Gate))?;

        let gate = self
            .await_ci(remote.ci, remote.clock)
            .map_err(at(Stage::Gate))?;
        write_stderr_line(stderr, gate_message(&gate));
        report.gate = Some(gate.clone());
        require_gate_success(&gate).map_err(at(Stage::Gate))?;

        report.tag = Some(tag.name().to_owned());
        let manifest_path = self.config.paths.out_dir.join(MANIFEST_FILE_NAME);
        let (release_id, assets) = self
            .publish(remote.releases, &tag, &[bundle.path, manifest_path])
            .map_err(at(Stage::Publish))?;
        for asset in &assets {
            write_stderr_line(stderr, upload_message(&asset.name, asset.outcome));
        }
        report.release_id = Some(release_id);
        report.assets = assets;
        Ok(())
    }

    /// Delete what an earlier run wrote into the output directory. Upstream
    /// inputs such as the coverage table are left alone.
    fn clear_previous_outputs(&self) -> Result<()> {
        let out_dir = &self.config.paths.out_dir;
        for path in [
            out_dir.join(REPORT_FILE_NAME),
            out_dir.join(MANIFEST_FILE_NAME),
            out_dir.join(ISSUES_FILE_NAME),
            self.config.spreadsheet_path(),
            self.config.document_path(),
        ] {
            remove_stale(&path)?;
        }
        Ok(())
    }

    fn write_report(&self, report: &RunReport) -> Result<()> {
        let path = self.config.paths.out_dir.join(REPORT_FILE_NAME);
        write_file(&path, serde_json::to_string_pretty(report)?.as_bytes())
    }
}

/// The bundle of a complete manifest.
///
/// # Errors
///
/// Returns [`PipelineError::PackagingIncomplete`] naming every missing
/// output.
pub fn require_bundle(outcome: &PackageOutcome) -> Result<&Bundle> {
    match &outcome.bundle {
        Some(bundle) if outcome.manifest.ok() => Ok(bundle),
        _ => Err(PipelineError::PackagingIncomplete {
            missing: outcome.manifest.missing().map(ToString::to_string).collect(),
        }),
    }
}

/// `Ok` only when the gate reached SUCCESS.
///
/// # Errors
///
/// Returns [`PipelineError::CiFailure`] or [`PipelineError::CiTimeout`].
pub fn require_gate_success(gate: &GateReport) -> Result<()> {
    match gate.state {
        GateState::Success => Ok(()),
        GateState::Timeout => Err(PipelineError::CiTimeout {
            dashboard_url: gate.dashboard_url.clone(),
        }),
        GateState::Failure | GateState::Pending => Err(PipelineError::CiFailure {
            detail: gate
                .transitions
                .last()
                .cloned()
                .unwrap_or_else(|| gate.state.to_string()),
        }),
    }
}

fn at<E: Into<PipelineError>>(stage: Stage) -> impl Fn(E) -> (Stage, PipelineError) {
    move |error| (stage, error.into())
}

fn asset_name(path: &Utf8Path) -> Result<String> {
    path.file_name().map(str::to_owned).ok_or_else(|| PipelineError::Io {
        action: "asset has no file name",
        path: path.to_string(),
        source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
    })
}

fn remove_stale(path: &Utf8Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed {path} from an earlier run");
            Ok(())
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PipelineError::Io {
            action: "cannot remove",
            path: path.to_string(),
            source,
        }),
    }
}

fn write_file(path: &Utf8Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).map_err(|source| PipelineError::Io {
        action: "cannot write",
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
