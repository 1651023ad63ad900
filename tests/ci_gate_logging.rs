//! Log output of the CI gate.
//!
//! Kept in its own test binary: `logtest` installs a process-wide logger.

use logtest::Logger;
use release_gate::ci::{GateSettings, GateState, await_gate};
use release_gate::test_utils::{ManualClock, ScriptedCiClient, workflow_run};
use std::time::Duration;

#[test]
fn three_polls_in_progress_then_success_logs_three_transitions() {
    let mut logger = Logger::start();
    let client = ScriptedCiClient::new(vec![
        Ok(Some(workflow_run("in_progress", None))),
        Ok(Some(workflow_run("in_progress", None))),
        Ok(Some(workflow_run("in_progress", None))),
        Ok(Some(workflow_run("completed", Some("success")))),
    ]);
    let settings = GateSettings {
        workflow: "ci.yml".to_owned(),
        branch: "main".to_owned(),
        budget: Duration::from_secs(900),
        interval: Duration::from_secs(10),
    };

    let report = await_gate(&client, &ManualClock::new(), &settings)
        .unwrap_or_else(|error| panic!("gate should complete: {error}"));

    let mut transitions = Vec::new();
    while let Some(record) = logger.pop() {
        if record.target() == "release_gate::ci" && record.level() == log::Level::Info {
            transitions.push(record.args().to_owned());
        }
    }
    assert_eq!(report.state, GateState::Success);
    assert_eq!(client.polls(), 4);
    assert_eq!(transitions.len(), 3, "{transitions:#?}");
    assert_eq!(transitions, report.transitions);
}
