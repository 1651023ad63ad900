//! Pipeline configuration.
//!
//! Settings are read from an optional TOML file, grouped by stage, and then
//! overridden by command-line flags. Every field has a default so an empty
//! file (or no file) yields a usable local configuration; the remote stages
//! additionally need a repository and a token.
//!
//! ```toml
//! [paths]
//! coverage = "out/coverage.csv"
//! template = "templates/coverage_template.pdf"
//! out_dir = "out"
//!
//! [ci]
//! owner = "acme"
//! repo = "compliance"
//! workflow = "ci.yml"
//!
//! [release]
//! tag_prefix = "compliance-"
//! ```

use crate::artefact::spreadsheet::ConstraintForm;
use crate::ci::GateSettings;
use crate::http::{DEFAULT_API_BASE, DEFAULT_UPLOADS_BASE, Token};
use crate::release::TagError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Environment variables consulted for the remote token, in order.
pub const TOKEN_VARIABLES: [&str; 2] = ["RELEASE_GATE_TOKEN", "GITHUB_TOKEN"];

/// Errors arising from configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration {path}: {source}")]
    Read {
        /// The configuration path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for this schema.
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// The configuration path.
        path: String,
        /// The TOML diagnostic.
        #[source]
        source: toml::de::Error,
    },

    /// A remote stage is about to run without a token.
    #[error("no release token: set one of {}", TOKEN_VARIABLES.join(" or "))]
    MissingCredentials,

    /// A release tag has no parsable timestamp.
    #[error(transparent)]
    InvalidTag(#[from] TagError),

    /// A setting the remote stages need is empty.
    #[error("missing setting [{section}] {field}")]
    MissingSetting {
        /// TOML section.
        section: &'static str,
        /// Field within the section.
        field: &'static str,
    },
}

/// Complete pipeline configuration.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Input, template, and output locations.
    pub paths: PathsConfig,
    /// Workbook options.
    pub spreadsheet: SpreadsheetConfig,
    /// CI host and gate timing. `owner`/`repo` also name the release
    /// repository.
    pub ci: CiConfig,
    /// Release host and tag naming.
    pub release: ReleaseConfig,
    /// Stage selection.
    pub gate: GateConfig,
}

/// `[paths]`
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Coverage CSV produced upstream.
    pub coverage: Utf8PathBuf,
    /// PDF template stamped by the document builder.
    pub template: Utf8PathBuf,
    /// Directory artefacts are written to and bundled from.
    pub out_dir: Utf8PathBuf,
    /// Directory the bundle is written to; must lie outside `out_dir`.
    pub bundle_dir: Utf8PathBuf,
    /// Workbook file name within `out_dir`.
    pub spreadsheet_name: String,
    /// Annotated document file name within `out_dir`.
    pub document_name: String,
    /// Further outputs other collaborators are expected to have produced.
    pub extra_outputs: Vec<Utf8PathBuf>,
    /// Label printed on the document; defaults to the coverage path.
    pub source_label: Option<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            coverage: Utf8PathBuf::from("out/coverage.csv"),
            template: Utf8PathBuf::from("templates/coverage_template.pdf"),
            out_dir: Utf8PathBuf::from("out"),
            bundle_dir: Utf8PathBuf::from("dist"),
            spreadsheet_name: "coverage.xlsx".to_owned(),
            document_name: "coverage_annotated.pdf".to_owned(),
            extra_outputs: Vec::new(),
            source_label: None,
        }
    }
}

/// `[spreadsheet]`
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SpreadsheetConfig {
    /// `inline` or `range`.
    pub constraint: ConstraintForm,
}

/// `[ci]`
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CiConfig {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Workflow file name or id.
    pub workflow: String,
    /// Branch whose latest run gates the release.
    pub branch: String,
    /// Time budget for the gate, in seconds.
    pub budget_secs: u64,
    /// Pause between polls, in seconds.
    pub interval_secs: u64,
    /// REST endpoint.
    pub api_base: String,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            workflow: "ci.yml".to_owned(),
            branch: "main".to_owned(),
            budget_secs: 900,
            interval_secs: 10,
            api_base: DEFAULT_API_BASE.to_owned(),
        }
    }
}

/// `[release]`
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Prefix the run timestamp is appended to; must end in `-`, `_` or `.`.
    pub tag_prefix: String,
    /// Commitish a newly created tag points at; host default when unset.
    pub target: Option<String>,
    /// REST endpoint.
    pub api_base: String,
    /// Asset upload endpoint.
    pub uploads_base: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            tag_prefix: "compliance-".to_owned(),
            target: None,
            api_base: DEFAULT_API_BASE.to_owned(),
            uploads_base: DEFAULT_UPLOADS_BASE.to_owned(),
        }
    }
}

/// `[gate]`
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Stop after packaging.
    pub skip_publish: bool,
}

impl PipelineConfig {
    /// Load from `path`, or defaults when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Where the workbook is written.
    #[must_use]
    pub fn spreadsheet_path(&self) -> Utf8PathBuf {
        self.paths.out_dir.join(&self.paths.spreadsheet_name)
    }

    /// Where the annotated document is written.
    #[must_use]
    pub fn document_path(&self) -> Utf8PathBuf {
        self.paths.out_dir.join(&self.paths.document_name)
    }

    /// Label printed on the document.
    #[must_use]
    pub fn source_label(&self) -> String {
        self.paths
            .source_label
            .clone()
            .unwrap_or_else(|| self.paths.coverage.to_string())
    }

    /// Every output the manifest checks, in report order.
    #[must_use]
    pub fn expected_outputs(&self) -> Vec<Utf8PathBuf> {
        let mut expected = vec![
            self.paths.coverage.clone(),
            self.spreadsheet_path(),
            self.document_path(),
        ];
        expected.extend(self.paths.extra_outputs.iter().cloned());
        expected
    }

    /// Repository shared by the CI and release hosts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] when owner or repo is blank.
    pub fn repository(&self) -> Result<(&str, &str), ConfigError> {
        let owner = non_blank(&self.ci.owner, "owner")?;
        let repo = non_blank(&self.ci.repo, "repo")?;
        Ok((owner, repo))
    }

    /// Poller settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] when workflow or branch is
    /// blank.
    pub fn gate_settings(&self) -> Result<GateSettings, ConfigError> {
        Ok(GateSettings {
            workflow: non_blank(&self.ci.workflow, "workflow")?.to_owned(),
            branch: non_blank(&self.ci.branch, "branch")?.to_owned(),
            budget: Duration::from_secs(self.ci.budget_secs),
            interval: Duration::from_secs(self.ci.interval_secs),
        })
    }
}

fn non_blank<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingSetting {
            section: "ci",
            field,
        });
    }
    Ok(trimmed)
}

/// Token for the CI and release hosts.
#[derive(Clone, Debug)]
pub struct Credentials {
    token: Token,
}

impl Credentials {
    /// Wrap an explicit token.
    #[must_use]
    pub fn new(token: Token) -> Self {
        Self { token }
    }

    /// First non-blank value among [`TOKEN_VARIABLES`] according to
    /// `lookup`.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        TOKEN_VARIABLES
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_owned())
            .find(|value| !value.is_empty())
            .map(|value| Self::new(Token::new(value)))
    }

    /// Read the token from the process environment.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// The bearer token.
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }
}
