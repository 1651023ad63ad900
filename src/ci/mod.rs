//! CI gate: clock abstraction, workflow-run client, and the poller.

pub mod client;
pub mod clock;
pub mod poller;

pub use client::{CiClient, GithubActionsClient, WorkflowRun};
pub use clock::{Clock, SystemClock};
pub use poller::{GateReport, GateSettings, GateState, await_gate};
