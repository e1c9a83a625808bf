//! Workflow core: the apply cycle, bulk deployment, command dispatch and the
//! session state they share.

mod bulk;
mod command;
mod engine;
mod risk;
mod session;
mod simulation;
mod telemetry;

pub use bulk::{BulkOutcome, BulkReport};
pub use command::DispatchOutcome;
pub use engine::{EngineConfig, WorkflowEngine};
pub use risk::RiskState;
pub use session::{BulkProgress, WorkflowSession};
pub use telemetry::{TelemetryEntry, TelemetryLevel};

#[cfg(test)]
pub use simulation::DelayRange;
