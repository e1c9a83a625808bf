//! Collaborator contracts consumed by the workflow engine.
//!
//! Every call is an async request/response that may fail. The engine never
//! looks inside an implementation; [`LlmCareerAgent`] is the production one.

mod llm;
mod prompts;

pub use llm::LlmCareerAgent;

use crate::error::CollaboratorError;
use crate::model::{
    CommandResult, CoverLetterStyle, DiscoveredJob, Job, MatchResult, ResumeMutation,
    SearchPreferences, StrategyPlan, UserProfile,
};

#[allow(async_fn_in_trait)]
pub trait CareerAgent {
    /// Turns free-form posting text into a [`Job`]. Fails on unparseable input.
    async fn extract_job(&self, source_text: &str) -> Result<Job, CollaboratorError>;

    async fn score_match(
        &self,
        job: &Job,
        profile: &UserProfile,
    ) -> Result<MatchResult, CollaboratorError>;

    async fn generate_cover_letter(
        &self,
        job: &Job,
        profile: &UserProfile,
        style: CoverLetterStyle,
    ) -> Result<String, CollaboratorError>;

    /// Unreadable model output must come back as [`CollaboratorError::Malformed`]
    /// so the engine can fall back to the first track.
    async fn mutate_resume(
        &self,
        job: &Job,
        profile: &UserProfile,
    ) -> Result<ResumeMutation, CollaboratorError>;

    async fn search_jobs(
        &self,
        preferences: &SearchPreferences,
    ) -> Result<Vec<DiscoveredJob>, CollaboratorError>;

    async fn interpret_command(&self, text: &str) -> Result<CommandResult, CollaboratorError>;

    async fn create_strategy_plan(
        &self,
        goal: &str,
        profile: &UserProfile,
    ) -> Result<StrategyPlan, CollaboratorError>;

    /// Returns a new profile with the material merged in.
    async fn augment_profile(
        &self,
        profile: &UserProfile,
        source_text: &str,
    ) -> Result<UserProfile, CollaboratorError>;
}
