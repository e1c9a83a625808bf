use std::fmt;

use serde::{Deserialize, Serialize};

/// The workflow states of an apply run.
///
/// Single-job happy path:
/// PENDING → EXTRACTING → MATCHING → GENERATING_CL → MUTATING_RESUME → APPLYING → VERIFYING → COMPLETED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Extracting,
    Matching,
    GeneratingCl,
    MutatingResume,
    Applying,
    Verifying,
    Completed,
    Failed,
    RiskHalt,
    Interpreting,
    Strategizing,
    Augmenting,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Extracting => "EXTRACTING",
            ApplicationStatus::Matching => "MATCHING",
            ApplicationStatus::GeneratingCl => "GENERATING_CL",
            ApplicationStatus::MutatingResume => "MUTATING_RESUME",
            ApplicationStatus::Applying => "APPLYING",
            ApplicationStatus::Verifying => "VERIFYING",
            ApplicationStatus::Completed => "COMPLETED",
            ApplicationStatus::Failed => "FAILED",
            ApplicationStatus::RiskHalt => "RISK_HALT",
            ApplicationStatus::Interpreting => "INTERPRETING",
            ApplicationStatus::Strategizing => "STRATEGIZING",
            ApplicationStatus::Augmenting => "AUGMENTING",
        };
        f.write_str(label)
    }
}

impl ApplicationStatus {
    /// Terminal states end a run; a new run starts over at `Pending`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Completed | ApplicationStatus::Failed | ApplicationStatus::RiskHalt
        )
    }

    /// Rough completion percentage for progress rendering.
    pub fn progress_percent(self) -> u8 {
        match self {
            ApplicationStatus::Pending => 0,
            ApplicationStatus::Extracting => 10,
            ApplicationStatus::Matching => 25,
            ApplicationStatus::GeneratingCl => 40,
            ApplicationStatus::MutatingResume => 55,
            ApplicationStatus::Applying => 70,
            ApplicationStatus::Verifying => 85,
            ApplicationStatus::Completed => 100,
            ApplicationStatus::Failed | ApplicationStatus::RiskHalt => 100,
            ApplicationStatus::Interpreting
            | ApplicationStatus::Strategizing
            | ApplicationStatus::Augmenting => 50,
        }
    }

    /// The legal transition table.
    ///
    /// `Failed` is reachable from every non-terminal state. `RiskHalt` is only
    /// reachable from `Pending`, since the gate is consulted before any step.
    /// The command-driven states resolve back to `Pending`.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Extracting)
                | (Pending, GeneratingCl)
                | (Pending, Interpreting)
                | (Pending, Strategizing)
                | (Pending, Augmenting)
                | (Pending, RiskHalt)
                | (Extracting, Matching)
                | (Matching, GeneratingCl)
                | (GeneratingCl, MutatingResume)
                | (MutatingResume, Applying)
                | (Applying, Verifying)
                | (Verifying, Completed)
                | (Interpreting, Pending)
                | (Interpreting, Strategizing)
                | (Strategizing, Pending)
                | (Augmenting, Pending)
        )
    }
}

/// The result of asking the tracker to move to a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Advanced to a non-terminal status.
    Next(ApplicationStatus),
    /// Reached a terminal status; the run is over.
    Finished(ApplicationStatus),
}

/// Rejected transition. Carries both ends so callers can log it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal status transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn happy_path_is_legal() {
        let path = [
            Pending,
            Extracting,
            Matching,
            GeneratingCl,
            MutatingResume,
            Applying,
            Verifying,
            Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn terminal_states_are_final() {
        for terminal in [Completed, Failed, RiskHalt] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(Pending));
            assert!(!terminal.can_transition_to(Failed));
        }
    }

    #[test]
    fn failed_reachable_from_in_progress() {
        for state in [Extracting, Matching, GeneratingCl, MutatingResume, Applying, Verifying] {
            assert!(state.can_transition_to(Failed));
        }
    }

    #[test]
    fn risk_halt_only_from_pending() {
        assert!(Pending.can_transition_to(RiskHalt));
        assert!(!GeneratingCl.can_transition_to(RiskHalt));
        assert!(!Applying.can_transition_to(RiskHalt));
    }

    #[test]
    fn command_states_resolve_to_pending() {
        assert!(Interpreting.can_transition_to(Pending));
        assert!(Strategizing.can_transition_to(Pending));
        assert!(Augmenting.can_transition_to(Pending));
    }

    #[test]
    fn steps_cannot_be_skipped() {
        assert!(!GeneratingCl.can_transition_to(Applying));
        assert!(!Applying.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn status_display() {
        assert_eq!(GeneratingCl.to_string(), "GENERATING_CL");
        assert_eq!(RiskHalt.to_string(), "RISK_HALT");
        assert_eq!(MutatingResume.to_string(), "MUTATING_RESUME");
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&MutatingResume).unwrap();
        assert_eq!(json, r#""MUTATING_RESUME""#);
        let parsed: ApplicationStatus = serde_json::from_str(r#""RISK_HALT""#).unwrap();
        assert_eq!(parsed, RiskHalt);
    }
}
