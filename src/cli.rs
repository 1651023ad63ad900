//! CLI argument definitions for release-gate.

use crate::config::PipelineConfig;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Validate, package, gate, and publish a compliance-coverage release.
#[derive(Parser, Debug)]
#[command(name = "release-gate")]
#[command(version, about)]
#[command(long_about = concat!(
    "Validate, package, gate, and publish a compliance-coverage release.\n\n",
    "The full run validates the coverage table, builds the constrained ",
    "spreadsheet and the annotated document, writes a checksummed manifest and ",
    "bundle, waits for CI on the release branch, and publishes the bundle to a ",
    "release tagged with the run's UTC timestamp. Re-running never creates a ",
    "second release for a tag or a second asset with the same name.",
))]
#[command(after_help = concat!(
    "EXIT CODES:\n",
    "  0  success (manifest printed to stdout)\n",
    "  1  I/O or unexpected failure\n",
    "  2  coverage validation failed\n",
    "  3  artefact build failed\n",
    "  4  packaging incomplete\n",
    "  5  CI failure\n",
    "  6  CI timeout\n",
    "  7  transport or authentication failure\n",
    "  8  configuration error\n\n",
    "ENVIRONMENT:\n",
    "  RELEASE_GATE_TOKEN (or GITHUB_TOKEN)  token for the CI and release hosts\n",
    "  RUST_LOG                              overrides -v/-q log filtering",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Arguments shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run every stage (default when no subcommand given).
    Run,

    /// Validate the coverage table and print the issue report.
    Validate,

    /// Validate (report only) and build both artefacts.
    Build,

    /// Write the manifest and bundle for an existing output tree.
    Package,

    /// Wait for the CI gate only.
    AwaitCi,

    /// Publish assets to an existing or new release.
    Publish(PublishArgs),
}

/// Arguments shared by every subcommand.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Coverage CSV [default: out/coverage.csv].
    #[arg(long, value_name = "FILE", global = true)]
    pub coverage: Option<Utf8PathBuf>,

    /// PDF template [default: templates/coverage_template.pdf].
    #[arg(long, value_name = "FILE", global = true)]
    pub template: Option<Utf8PathBuf>,

    /// Output directory [default: out].
    #[arg(long, value_name = "DIR", global = true)]
    pub out_dir: Option<Utf8PathBuf>,

    /// Stop after packaging.
    #[arg(long, global = true)]
    pub skip_publish: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet",
        global = true
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity", global = true)]
    pub quiet: bool,
}

/// Arguments for the publish command.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct PublishArgs {
    /// Release tag; must end in a separator and a 14-digit UTC timestamp.
    #[arg(long, value_name = "TAG")]
    pub tag: String,

    /// File to attach, under its own file name (repeatable).
    #[arg(long, value_name = "PATH", required = true)]
    pub asset: Vec<Utf8PathBuf>,
}

impl GlobalArgs {
    /// Overlay flags onto file configuration.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(coverage) = &self.coverage {
            config.paths.coverage.clone_from(coverage);
        }
        if let Some(template) = &self.template {
            config.paths.template.clone_from(template);
        }
        if let Some(out_dir) = &self.out_dir {
            config.paths.out_dir.clone_from(out_dir);
        }
        if self.skip_publish {
            config.gate.skip_publish = true;
        }
    }

    /// `log` filter implied by `-v`/`-q`.
    #[must_use]
    pub fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
