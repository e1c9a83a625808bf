mod run;
mod status;

pub use run::{RunKind, RunSummary, WorkflowRun};
pub use status::{ApplicationStatus, InvalidTransition};
