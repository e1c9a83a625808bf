use thiserror::Error;

use crate::anthropic::AnthropicError;
use crate::state_machine::{ApplicationStatus, InvalidTransition};

/// Input problems caught before any collaborator is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("profile has no resume track to tailor")]
    NoResumeTrack,

    #[error("job input is empty")]
    EmptyJobInput,

    #[error("deployment queue is empty")]
    EmptyQueue,

    #[error("match threshold {0} is outside 0..=100")]
    InvalidThreshold(u8),

    #[error("no discovered jobs to apply to; run a search first")]
    NothingDiscovered,
}

/// An external call failed or returned something unusable.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("LLM call failed: {0}")]
    Api(#[from] AnthropicError),

    #[error("collaborator rejected the request: {0}")]
    Rejected(String),

    #[error("malformed collaborator response: {0}")]
    Malformed(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },
}

impl CollaboratorError {
    pub fn is_malformed(&self) -> bool {
        matches!(self, CollaboratorError::Malformed(_))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Why a workflow run did not produce its result.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("{step} failed: {source}")]
    Collaborator {
        step: ApplicationStatus,
        #[source]
        source: CollaboratorError,
    },

    #[error("workflow locked by risk gate: {reason}")]
    Locked { reason: String },

    #[error("another workflow run is already active")]
    Busy,

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl WorkflowError {
    /// The status a run ends in because of this error, if it ended one.
    pub fn terminal_status(&self) -> Option<ApplicationStatus> {
        match self {
            WorkflowError::Collaborator { .. } | WorkflowError::InvalidTransition(_) => {
                Some(ApplicationStatus::Failed)
            }
            WorkflowError::Locked { .. } => Some(ApplicationStatus::RiskHalt),
            WorkflowError::Precondition(_) | WorkflowError::Busy => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_error_display_names_step() {
        let err = WorkflowError::Collaborator {
            step: ApplicationStatus::MutatingResume,
            source: CollaboratorError::Rejected("quota exceeded".into()),
        };
        assert_eq!(
            err.to_string(),
            "MUTATING_RESUME failed: collaborator rejected the request: quota exceeded"
        );
    }

    #[test]
    fn terminal_status_classification() {
        let locked = WorkflowError::Locked {
            reason: "paused".into(),
        };
        assert_eq!(locked.terminal_status(), Some(ApplicationStatus::RiskHalt));

        let failed = WorkflowError::Collaborator {
            step: ApplicationStatus::GeneratingCl,
            source: CollaboratorError::Timeout {
                operation: "generate_cover_letter",
                secs: 90,
            },
        };
        assert_eq!(failed.terminal_status(), Some(ApplicationStatus::Failed));

        let pre = WorkflowError::from(PreconditionError::NoResumeTrack);
        assert_eq!(pre.terminal_status(), None);
        assert_eq!(WorkflowError::Busy.terminal_status(), None);
    }

    #[test]
    fn malformed_detection() {
        assert!(CollaboratorError::Malformed("eof".into()).is_malformed());
        assert!(!CollaboratorError::Rejected("no".into()).is_malformed());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WorkflowError>();
    }
}
