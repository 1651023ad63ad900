//! Bounded wait for a terminal CI outcome.
//!
//! The gate starts PENDING and polls the most recent run of a workflow on
//! a branch until the run concludes or the time budget is spent. Only three
//! conclusions are terminal; anything else, including a missing run, keeps
//! the gate PENDING.

use super::client::{CiClient, WorkflowRun};
use super::clock::Clock;
use crate::http::HttpError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Log target for gate transitions.
pub const LOG_TARGET: &str = "release_gate::ci";

/// Default time budget.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(900);

/// Default pause between polls.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

const FAILURE_CONCLUSIONS: [&str; 3] = ["failure", "cancelled", "timed_out"];

/// Gate state. PENDING is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateState {
    /// Waiting for a terminal conclusion.
    Pending,
    /// The run concluded `success`.
    Success,
    /// The run concluded `failure`, `cancelled`, or `timed_out`.
    Failure,
    /// The budget elapsed first.
    Timeout,
}

impl GateState {
    /// `true` for every state except PENDING.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Pending
    }
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Timeout => "TIMEOUT",
        })
    }
}

/// Which run to wait for, and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    /// Workflow file name or id.
    pub workflow: String,
    /// Branch whose latest run is inspected.
    pub branch: String,
    /// Total time allowed before TIMEOUT.
    pub budget: Duration,
    /// Pause between polls.
    pub interval: Duration,
}

/// What the gate observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    /// Final state; never PENDING.
    pub state: GateState,
    /// Every transition line that was logged, in order.
    pub transitions: Vec<String>,
    /// Number of queries made.
    pub polls: u32,
    /// Link to the last observed run, if any.
    pub run_url: Option<String>,
    /// Workflow history page for manual follow-up.
    pub dashboard_url: String,
}

impl GateReport {
    /// `true` only for SUCCESS.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.state == GateState::Success
    }
}

/// Poll until the latest run concludes or the budget elapses.
///
/// The budget runs from this call, not from when `clock` was started.
///
/// # Errors
///
/// Returns [`HttpError`] as soon as a query fails; transport and
/// authentication failures are not retried.
pub fn await_gate(
    client: &dyn CiClient,
    clock: &dyn Clock,
    settings: &GateSettings,
) -> Result<GateReport, HttpError> {
    let mut gate = Gate::new(client.dashboard_url(&settings.workflow));
    gate.transition(format!(
        "gate {}: awaiting workflow {} on {} (budget {}s)",
        GateState::Pending,
        settings.workflow,
        settings.branch,
        settings.budget.as_secs()
    ));

    let deadline = clock.elapsed() + settings.budget;
    while clock.elapsed() < deadline {
        let run = client.latest_run(&settings.workflow, &settings.branch)?;
        gate.polls += 1;
        if let Some(state) = gate.observe(run.as_ref()) {
            return Ok(gate.finish(state));
        }
        clock.sleep(settings.interval);
    }

    let dashboard = gate.dashboard_url.clone();
    gate.transition(format!(
        "gate {}: no conclusion within {}s; follow up at {dashboard}",
        GateState::Timeout,
        settings.budget.as_secs()
    ));
    Ok(gate.finish(GateState::Timeout))
}

struct Gate {
    transitions: Vec<String>,
    polls: u32,
    last_status: Option<String>,
    run_url: Option<String>,
    dashboard_url: String,
}

impl Gate {
    fn new(dashboard_url: String) -> Self {
        Self {
            transitions: Vec::new(),
            polls: 0,
            last_status: None,
            run_url: None,
            dashboard_url,
        }
    }

    fn transition(&mut self, line: String) {
        log::info!(target: LOG_TARGET, "{line}");
        self.transitions.push(line);
    }

    /// Record one poll result; `Some` when it is terminal.
    fn observe(&mut self, run: Option<&WorkflowRun>) -> Option<GateState> {
        let Some(run) = run else {
            self.note_status("no run yet".to_owned());
            return None;
        };
        if !run.html_url.is_empty() {
            self.run_url = Some(run.html_url.clone());
        }

        match run.conclusion.as_deref() {
            Some("success") => {
                self.transition(format!(
                    "gate {}: run {} concluded success",
                    GateState::Success,
                    run.id
                ));
                Some(GateState::Success)
            }
            Some(conclusion) if FAILURE_CONCLUSIONS.contains(&conclusion) => {
                self.transition(format!(
                    "gate {}: run {} concluded {conclusion}",
                    GateState::Failure,
                    run.id
                ));
                Some(GateState::Failure)
            }
            Some(conclusion) => {
                self.note_status(format!("run {} {}/{conclusion}", run.id, run.status));
                None
            }
            None => {
                self.note_status(format!("run {} {}", run.id, run.status));
                None
            }
        }
    }

    fn note_status(&mut self, status: String) {
        if self.last_status.as_deref() == Some(status.as_str()) {
            log::debug!(target: LOG_TARGET, "gate {}: unchanged ({status})", GateState::Pending);
            return;
        }
        self.transition(format!("gate {}: {status}", GateState::Pending));
        self.last_status = Some(status);
    }

    fn finish(self, state: GateState) -> GateReport {
        GateReport {
            state,
            transitions: self.transitions,
            polls: self.polls,
            run_url: self.run_url,
            dashboard_url: self.dashboard_url,
        }
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
