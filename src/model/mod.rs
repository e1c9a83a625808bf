mod application;
mod command;
mod job;
mod profile;

pub use application::{
    ApplicationLog, CoverLetterStyle, CycleArtifacts, DispatchTiming, MatchResult,
    MirroredPhrase, MutationReport, MutationTiming, ResumeMutation, VerificationProof,
};
pub use command::{CommandAction, CommandResult, StrategyPlan};
pub use job::{DiscoveredJob, Job};
pub use profile::{ResumeJson, ResumeTrack, SearchPreferences, UserProfile};

// Nested types that only fixtures build by name.
#[cfg(test)]
pub use application::FALLBACK_ATS_SCORE;
#[cfg(test)]
pub use command::{SearchFilters, StrategyStep};
#[cfg(test)]
pub use profile::Experience;
