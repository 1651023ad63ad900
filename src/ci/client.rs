//! Workflow-run lookups against the CI host.

use crate::http::{GithubApi, HttpError};
use serde::{Deserialize, Serialize};

/// The most recent run of a workflow, as reported by the CI host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Host-assigned run id.
    pub id: u64,
    /// `queued`, `in_progress`, `completed`, and so on.
    pub status: String,
    /// Set once the run has completed.
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Browser link to the run.
    #[serde(default)]
    pub html_url: String,
}

/// Trait for querying workflow runs.
///
/// Abstractions allow tests to script CI behaviour without network access.
#[cfg_attr(test, mockall::automock)]
pub trait CiClient {
    /// The most recent run of `workflow` on `branch`, or `None` if there is
    /// no run yet.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on transport or authentication failure.
    fn latest_run(&self, workflow: &str, branch: &str) -> Result<Option<WorkflowRun>, HttpError>;

    /// Browser location of the workflow's run history.
    fn dashboard_url(&self, workflow: &str) -> String;
}

#[derive(Deserialize)]
struct RunsPage {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

/// GitHub Actions client.
#[derive(Debug, Clone)]
pub struct GithubActionsClient {
    api: GithubApi,
    owner: String,
    repo: String,
}

impl GithubActionsClient {
    /// Client for `owner/repo`.
    #[must_use]
    pub fn new(api: GithubApi, owner: &str, repo: &str) -> Self {
        Self {
            api,
            owner: owner.to_owned(),
            repo: repo.to_owned(),
        }
    }

    /// Runs endpoint for `workflow` (a file name such as `ci.yml` or a
    /// numeric id).
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::InvalidUrl`] when the API base is unusable.
    pub fn runs_url(&self, workflow: &str) -> Result<String, HttpError> {
        self.api.endpoint(&[
            "repos",
            self.owner.as_str(),
            self.repo.as_str(),
            "actions",
            "workflows",
            workflow,
            "runs",
        ])
    }
}

impl CiClient for GithubActionsClient {
    fn latest_run(&self, workflow: &str, branch: &str) -> Result<Option<WorkflowRun>, HttpError> {
        let url = self.runs_url(workflow)?;
        let page: RunsPage = self
            .api
            .get_json(&url, &[("branch", branch), ("per_page", "1")])?;
        Ok(page.workflow_runs.into_iter().next())
    }

    fn dashboard_url(&self, workflow: &str) -> String {
        format!(
            "https://github.com/{}/{}/actions/workflows/{}",
            self.owner, self.repo, workflow
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Token;

    #[test]
    fn runs_page_decodes_pending_and_completed_runs() {
        let json = r#"{
            "total_count": 2,
            "workflow_runs": [
                {"id": 7, "status": "completed", "conclusion": "success",
                 "html_url": "https://github.com/o/r/actions/runs/7", "name": "CI"},
                {"id": 6, "status": "in_progress", "conclusion": null}
            ]
        }"#;
        let page: RunsPage = serde_json::from_str(json).expect("decodes");
        assert_eq!(page.workflow_runs.len(), 2);
        assert_eq!(page.workflow_runs[0].conclusion.as_deref(), Some("success"));
        assert!(page.workflow_runs[1].conclusion.is_none());
    }

    #[test]
    fn empty_runs_page_means_no_run() {
        let page: RunsPage = serde_json::from_str(r#"{"total_count": 0}"#).expect("decodes");
        assert!(page.workflow_runs.is_empty());
    }

    #[test]
    fn urls_name_repository_and_workflow() {
        let client = GithubActionsClient::new(
            GithubApi::new("https://api.github.com", Token::new("t")),
            "acme",
            "compliance",
        );
        assert_eq!(
            client.runs_url("ci.yml").expect("valid base"),
            "https://api.github.com/repos/acme/compliance/actions/workflows/ci.yml/runs"
        );
        assert_eq!(
            client.dashboard_url("ci.yml"),
            "https://github.com/acme/compliance/actions/workflows/ci.yml"
        );
    }
}
