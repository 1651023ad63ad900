//! release-gate CLI entrypoint.
//!
//! Runs the whole release pipeline by default, or a single stage when a
//! subcommand is given. Progress goes to stderr; on success the manifest (or
//! the stage's own JSON report) is printed to stdout.

use clap::Parser;
use release_gate::ci::{GithubActionsClient, SystemClock};
use release_gate::cli::{Cli, Command, PublishArgs};
use release_gate::config::{ConfigError, Credentials, PipelineConfig};
use release_gate::error::{PipelineError, Result};
use release_gate::http::GithubApi;
use release_gate::output::{
    artefact_message, bundle_message, gate_message, upload_message, validation_message,
    write_stderr_line,
};
use release_gate::pipeline::{
    ISSUES_FILE_NAME, Pipeline, Remote, require_bundle, require_gate_success,
};
use release_gate::release::{GithubReleaseHost, ReleaseTag};
use release_gate::stamp::RunStamp;
use std::io::Write;

/// Owned remote clients; borrowed into a [`Remote`] per run.
struct Hosts {
    ci: GithubActionsClient,
    releases: GithubReleaseHost,
    clock: SystemClock,
}

impl Hosts {
    fn connect(config: &PipelineConfig, credentials: &Credentials) -> Self {
        let token = credentials.token().clone();
        let (owner, repo) = (config.ci.owner.trim(), config.ci.repo.trim());
        Self {
            ci: GithubActionsClient::new(
                GithubApi::new(&config.ci.api_base, token.clone()),
                owner,
                repo,
            ),
            releases: GithubReleaseHost::new(
                GithubApi::new(&config.release.api_base, token.clone()),
                GithubApi::new(&config.release.uploads_base, token),
                owner,
                repo,
            ),
            clock: SystemClock::start(),
        }
    }

    fn remote(&self) -> Remote<'_> {
        Remote {
            ci: &self.ci,
            releases: &self.releases,
            clock: &self.clock,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.global.log_level())
        .parse_default_env()
        .init();

    let mut stderr = std::io::stderr();
    let run_result = if cli.global.quiet {
        run(&cli, &mut std::io::sink())
    } else {
        run(&cli, &mut stderr)
    };
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, progress: &mut dyn Write) -> Result<()> {
    let mut config = PipelineConfig::load(cli.global.config.as_deref())?;
    cli.global.apply_to(&mut config);
    let hosts = Credentials::from_env().map(|credentials| Hosts::connect(&config, &credentials));
    let pipeline = Pipeline::new(&config, RunStamp::now());

    match cli.command.as_ref().unwrap_or(&Command::Run) {
        Command::Run => {
            let remote = hosts.as_ref().map(Hosts::remote);
            let outcome = pipeline.run(remote.as_ref(), progress);
            outcome.result?;
            if let Some(manifest) = &outcome.report.manifest {
                print_json(manifest)?;
            }
            Ok(())
        }
        Command::Validate => {
            pipeline.prepare_out_dir()?;
            let validated = pipeline.validate()?;
            write_stderr_line(progress, validation_message(&validated.report));
            print_json(&validated.report)?;
            if validated.report.pass() {
                Ok(())
            } else {
                Err(PipelineError::ValidationFailed {
                    issues: validated.report.issues().len(),
                    report: config.paths.out_dir.join(ISSUES_FILE_NAME).to_string(),
                })
            }
        }
        Command::Build => {
            pipeline.prepare_out_dir()?;
            let validated = pipeline.validate()?;
            write_stderr_line(progress, validation_message(&validated.report));
            let artefacts = pipeline.build(&validated.table)?;
            for artefact in &artefacts {
                write_stderr_line(progress, artefact_message(artefact));
            }
            print_json(&artefacts)
        }
        Command::Package => {
            pipeline.prepare_out_dir()?;
            let packaged = pipeline.package()?;
            let bundle = require_bundle(&packaged)?;
            write_stderr_line(progress, bundle_message(bundle));
            print_json(&packaged.manifest)
        }
        Command::AwaitCi => {
            let hosts = require_hosts(hosts.as_ref())?;
            let gate = pipeline.await_ci(&hosts.ci, &hosts.clock)?;
            write_stderr_line(progress, gate_message(&gate));
            print_json(&gate)?;
            require_gate_success(&gate)
        }
        Command::Publish(args) => publish(&pipeline, hosts.as_ref(), args, progress),
    }
}

fn publish(
    pipeline: &Pipeline<'_>,
    hosts: Option<&Hosts>,
    args: &PublishArgs,
    progress: &mut dyn Write,
) -> Result<()> {
    let hosts = require_hosts(hosts)?;
    let tag = ReleaseTag::parse(&args.tag).map_err(ConfigError::from)?;
    let (_, assets) = pipeline.publish(&hosts.releases, &tag, &args.asset)?;
    for asset in &assets {
        write_stderr_line(progress, upload_message(&asset.name, asset.outcome));
    }
    print_json(&assets)
}

fn require_hosts(hosts: Option<&Hosts>) -> Result<&Hosts> {
    hosts.ok_or(PipelineError::Config(ConfigError::MissingCredentials))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").map_err(|source| PipelineError::Io {
        action: "cannot write to",
        path: "stdout".to_owned(),
        source,
    })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {err}"));
            err.exit_code()
        }
    }
}
