//! Unit tests for the CI gate state machine.

use super::*;
use crate::ci::client::MockCiClient;
use crate::test_utils::{ManualClock, workflow_run};
use mockall::Sequence;
use rstest::{fixture, rstest};

const DASHBOARD: &str = "https://github.com/o/r/actions/workflows/ci.yml";

#[fixture]
fn settings() -> GateSettings {
    GateSettings {
        workflow: "ci.yml".to_owned(),
        branch: "main".to_owned(),
        budget: Duration::from_secs(60),
        interval: Duration::from_secs(10),
    }
}

fn scripted(responses: Vec<Result<Option<WorkflowRun>, HttpError>>) -> MockCiClient {
    let mut client = MockCiClient::new();
    client
        .expect_dashboard_url()
        .returning(|_| DASHBOARD.to_owned());
    let mut seq = Sequence::new();
    for response in responses {
        client
            .expect_latest_run()
            .withf(|workflow, branch| workflow == "ci.yml" && branch == "main")
            .times(1)
            .in_sequence(&mut seq)
            .return_once(move |_, _| response);
    }
    client
}

#[rstest]
fn in_progress_then_success_logs_three_transitions(settings: GateSettings) {
    let in_progress = || Ok(Some(workflow_run("in_progress", None)));
    let client = scripted(vec![
        in_progress(),
        in_progress(),
        in_progress(),
        Ok(Some(workflow_run("completed", Some("success")))),
    ]);
    let clock = ManualClock::new();

    let report = await_gate(&client, &clock, &settings).expect("gate completes");

    assert_eq!(report.state, GateState::Success);
    assert_eq!(report.polls, 4);
    assert_eq!(report.transitions.len(), 3, "{:#?}", report.transitions);
    assert!(report.transitions[0].starts_with("gate PENDING: awaiting"));
    assert!(report.transitions[2].starts_with("gate SUCCESS"));
    assert_eq!(clock.elapsed(), Duration::from_secs(30));
}

#[rstest]
#[case::failure("failure")]
#[case::cancelled("cancelled")]
#[case::timed_out("timed_out")]
fn failing_conclusions_are_terminal(settings: GateSettings, #[case] conclusion: &str) {
    let client = scripted(vec![Ok(Some(workflow_run("completed", Some(conclusion))))]);

    let report = await_gate(&client, &ManualClock::new(), &settings).expect("gate completes");

    assert_eq!(report.state, GateState::Failure);
    assert!(!report.passed());
    assert!(report.transitions.last().is_some_and(|l| l.contains(conclusion)));
}

#[rstest]
#[case::neutral("neutral")]
#[case::skipped("skipped")]
#[case::action_required("action_required")]
fn other_conclusions_keep_waiting(settings: GateSettings, #[case] conclusion: &str) {
    let client = scripted(vec![
        Ok(Some(workflow_run("completed", Some(conclusion)))),
        Ok(Some(workflow_run("completed", Some("success")))),
    ]);

    let report = await_gate(&client, &ManualClock::new(), &settings).expect("gate completes");

    assert_eq!(report.state, GateState::Success);
    assert_eq!(report.polls, 2);
}

#[rstest]
fn budget_exhaustion_times_out_with_dashboard(settings: GateSettings) {
    let mut client = MockCiClient::new();
    client
        .expect_dashboard_url()
        .returning(|_| DASHBOARD.to_owned());
    client.expect_latest_run().times(6).returning(|_, _| Ok(None));
    let clock = ManualClock::new();

    let report = await_gate(&client, &clock, &settings).expect("gate completes");

    assert_eq!(report.state, GateState::Timeout);
    assert_eq!(report.dashboard_url, DASHBOARD);
    assert!(report.transitions.last().is_some_and(|l| l.contains(DASHBOARD)));
    // awaiting, "no run yet" once, timeout
    assert_eq!(report.transitions.len(), 3);
}

#[rstest]
fn zero_budget_times_out_without_polling(mut settings: GateSettings) {
    settings.budget = Duration::ZERO;
    let mut client = MockCiClient::new();
    client
        .expect_dashboard_url()
        .returning(|_| DASHBOARD.to_owned());
    client.expect_latest_run().never();

    let report = await_gate(&client, &ManualClock::new(), &settings).expect("gate completes");

    assert_eq!(report.state, GateState::Timeout);
    assert_eq!(report.polls, 0);
}

#[rstest]
fn transport_failure_is_not_retried(settings: GateSettings) {
    let client = scripted(vec![Err(HttpError::Unauthorized {
        url: "https://api.github.com/x".to_owned(),
        status: 401,
    })]);

    let result = await_gate(&client, &ManualClock::new(), &settings);

    assert!(matches!(result, Err(HttpError::Unauthorized { status: 401, .. })));
}

#[rstest]
fn run_url_is_kept_for_the_report(settings: GateSettings) {
    let client = scripted(vec![Ok(Some(workflow_run("completed", Some("success"))))]);
    let report = await_gate(&client, &ManualClock::new(), &settings).expect("gate completes");
    assert!(report.run_url.is_some_and(|url| url.contains("/actions/runs/")));
}

#[test]
fn only_pending_is_non_terminal() {
    assert!(!GateState::Pending.is_terminal());
    assert!(GateState::Timeout.is_terminal());
    assert_eq!(
        serde_json::to_string(&GateState::Timeout).expect("serialise"),
        "\"TIMEOUT\""
    );
}

#[rstest]
fn budget_counts_from_the_start_of_the_wait(settings: GateSettings) {
    let client = scripted(vec![Ok(Some(workflow_run("completed", Some("success"))))]);
    let clock = ManualClock::new();
    clock.sleep(Duration::from_secs(60));

    let report = await_gate(&client, &clock, &settings).expect("gate completes");

    assert_eq!(report.state, GateState::Success);
    assert_eq!(report.polls, 1);
}
