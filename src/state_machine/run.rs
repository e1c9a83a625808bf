use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{ApplicationStatus, InvalidTransition, Transition};

/// What started a run. Used for telemetry and run summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// One job through the apply cycle.
    Apply,
    /// One entry of a bulk deployment queue.
    BulkEntry,
    /// Command interpretation and dispatch.
    Command,
    /// Strategy planning.
    Strategy,
    /// Profile augmentation outside the apply cycle.
    Augment,
}

/// Tracks the status of a single workflow run.
///
/// A run starts at `Pending` and moves forward through the transition table.
/// Once it reaches a terminal status every further transition is rejected;
/// callers start a new run instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: String,
    pub kind: RunKind,
    pub status: ApplicationStatus,
    pub history: Vec<ApplicationStatus>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub fn new(kind: RunKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            status: ApplicationStatus::Pending,
            history: Vec::new(),
            started_at: now,
            updated_at: now,
        }
    }

    /// Move the run to `next`, recording the previous status in the history.
    pub fn advance(&mut self, next: ApplicationStatus) -> Result<Transition, InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.history.push(self.status);
        self.status = next;
        self.updated_at = Utc::now();

        if next.is_terminal() {
            Ok(Transition::Finished(next))
        } else {
            Ok(Transition::Next(next))
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Compact record of a finished (or abandoned) run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub kind: RunKind,
    pub final_status: ApplicationStatus,
    pub transitions: Vec<ApplicationStatus>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl RunSummary {
    pub fn from_run(run: &WorkflowRun) -> Self {
        let now = Utc::now();
        let mut transitions = run.history.clone();
        transitions.push(run.status);

        Self {
            run_id: run.id.clone(),
            kind: run.kind,
            final_status: run.status,
            transitions,
            started_at: run.started_at,
            finished_at: now,
            duration_ms: (now - run.started_at).num_milliseconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn new_run_starts_pending() {
        let run = WorkflowRun::new(RunKind::Apply);
        assert_eq!(run.status, Pending);
        assert!(run.history.is_empty());
        assert!(!run.is_finished());
    }

    #[test]
    fn walks_apply_cycle() {
        let mut run = WorkflowRun::new(RunKind::Apply);
        for next in [GeneratingCl, MutatingResume, Applying, Verifying] {
            assert_eq!(run.advance(next).unwrap(), Transition::Next(next));
        }
        assert_eq!(run.advance(Completed).unwrap(), Transition::Finished(Completed));
        assert!(run.is_finished());
        assert_eq!(
            run.history,
            vec![Pending, GeneratingCl, MutatingResume, Applying, Verifying]
        );
    }

    #[test]
    fn terminal_run_rejects_further_transitions() {
        let mut run = WorkflowRun::new(RunKind::Apply);
        run.advance(GeneratingCl).unwrap();
        run.advance(Failed).unwrap();

        let err = run.advance(MutatingResume).unwrap_err();
        assert_eq!(err.from, Failed);
        assert_eq!(err.to, MutatingResume);
        assert_eq!(run.status, Failed);
    }

    #[test]
    fn illegal_jump_is_rejected_without_mutation() {
        let mut run = WorkflowRun::new(RunKind::Apply);
        assert!(run.advance(Verifying).is_err());
        assert_eq!(run.status, Pending);
        assert!(run.history.is_empty());
    }

    #[test]
    fn summary_includes_final_status() {
        let mut run = WorkflowRun::new(RunKind::Command);
        run.advance(Interpreting).unwrap();
        run.advance(Pending).unwrap();

        let summary = RunSummary::from_run(&run);
        assert_eq!(summary.kind, RunKind::Command);
        assert_eq!(summary.final_status, Pending);
        assert_eq!(summary.transitions, vec![Pending, Interpreting, Pending]);
        assert!(summary.duration_ms >= 0);
    }
}
