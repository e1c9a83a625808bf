//! Fixtures and scripted collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::agent::CareerAgent;
use crate::error::{CollaboratorError, StoreError};
use crate::model::{
    ApplicationLog, CommandResult, CoverLetterStyle, DiscoveredJob, DispatchTiming, Experience,
    Job, MatchResult, MutationReport, MutationTiming, ResumeJson, ResumeMutation, ResumeTrack,
    SearchPreferences, StrategyPlan, StrategyStep, UserProfile, VerificationProof,
};
use crate::store::ApplicationStore;
use crate::workflow::{DelayRange, EngineConfig, RiskState, WorkflowEngine, WorkflowSession};

pub fn sample_profile() -> UserProfile {
    UserProfile {
        full_name: "Jane Doe".into(),
        email: "jane@example.com".into(),
        phone: None,
        location: Some("Remote".into()),
        links: vec!["https://github.com/janedoe".into()],
        resume_tracks: vec![ResumeTrack {
            id: "backend".into(),
            name: "Backend".into(),
            content: ResumeJson {
                summary: "Backend engineer".into(),
                skills: vec!["Rust".into(), "Postgres".into(), "Kubernetes".into()],
                experience: vec![Experience {
                    company: "Initech".into(),
                    role: "Senior Engineer".into(),
                    duration: "2021-2025".into(),
                    achievements: vec!["Cut p99 latency by 40%".into()],
                }],
                projects: Vec::new(),
            },
        }],
        preferences: SearchPreferences {
            target_roles: vec!["Staff Engineer".into()],
            remote_only: true,
            match_threshold: Some(70),
            ..Default::default()
        },
    }
}

pub fn sample_job() -> Job {
    Job {
        id: "job-acme-42".into(),
        title: "Staff Engineer".into(),
        company: "Acme".into(),
        location: "Remote".into(),
        skills: vec!["Rust".into(), "Distributed systems".into()],
        description: "Own the ingestion platform.".into(),
        apply_url: "https://jobs.acme.example/postings/42".into(),
        platform: "greenhouse".into(),
        scraped_at: Utc::now(),
    }
}

pub fn sample_proof() -> VerificationProof {
    VerificationProof {
        dispatch_hash: format!("0x{}", "ab".repeat(32)),
        network_log: vec!["[sim] HTTP 201 from jobs.acme.example".into()],
        server_status: 201,
        timing: DispatchTiming {
            dispatch_ms: 1500,
            verify_ms: 120,
        },
        receipt_svg: None,
        simulated: true,
    }
}

pub fn discovered(title: &str, company: &str) -> DiscoveredJob {
    let slug = title.to_lowercase().replace(' ', "-");
    DiscoveredJob {
        id: format!("d-{}-{slug}", company.to_lowercase()),
        title: title.into(),
        company: company.into(),
        location: "Remote".into(),
        url: format!("https://jobs.{}.example/{slug}", company.to_lowercase()),
        platform: "greenhouse".into(),
        snippet: format!("{company} is hiring a {title}."),
        salary: None,
    }
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        default_threshold: 70,
        dispatch_delay: DelayRange { min_ms: 0, max_ms: 0 },
        collaborator_timeout: Duration::from_secs(5),
        default_style: CoverLetterStyle::Professional,
    }
}

pub fn test_engine(agent: ScriptedAgent) -> WorkflowEngine<ScriptedAgent, MemoryStore> {
    WorkflowEngine::new(
        agent,
        MemoryStore::default(),
        WorkflowSession::default(),
        fast_config(),
    )
}

/// In-memory store. `failing()` refuses every write.
#[derive(Default)]
pub struct MemoryStore {
    applications: Mutex<Vec<ApplicationLog>>,
    profile: Mutex<Option<UserProfile>>,
    risk: Mutex<Option<RiskState>>,
    failing: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn applications(&self) -> Vec<ApplicationLog> {
        self.applications.lock().unwrap().clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.lock().unwrap().clone()
    }

    pub fn risk(&self) -> Option<RiskState> {
        self.risk.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }
}

impl ApplicationStore for MemoryStore {
    async fn persist_application_log(&self, log: &ApplicationLog) -> Result<(), StoreError> {
        self.check()?;
        self.applications.lock().unwrap().push(log.clone());
        Ok(())
    }

    async fn load_applications(&self) -> Result<Vec<ApplicationLog>, StoreError> {
        Ok(self.applications())
    }

    async fn persist_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.check()?;
        *self.profile.lock().unwrap() = Some(profile.clone());
        Ok(())
    }

    async fn load_profile(&self) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.profile())
    }

    async fn persist_risk(&self, risk: &RiskState) -> Result<(), StoreError> {
        self.check()?;
        *self.risk.lock().unwrap() = Some(risk.clone());
        Ok(())
    }

    async fn load_risk(&self) -> Result<Option<RiskState>, StoreError> {
        Ok(self.risk())
    }
}

/// How the scripted agent answers `mutate_resume`.
#[derive(Debug, Clone, Copy, Default)]
pub enum MutationScript {
    #[default]
    Ok,
    Malformed,
    Reject,
}

/// Deterministic [`CareerAgent`] that records every call it receives.
#[derive(Default)]
pub struct ScriptedAgent {
    scores: HashMap<String, u8>,
    mutation: MutationScript,
    fail_cover_letter: bool,
    fail_extract: Option<String>,
    letter_delay: Option<Duration>,
    cancel_after: Option<(usize, CancellationToken)>,
    search_results: Vec<DiscoveredJob>,
    command: Option<CommandResult>,
    calls: Mutex<Vec<&'static str>>,
    last_search: Mutex<Option<SearchPreferences>>,
}

impl ScriptedAgent {
    pub const DEFAULT_SCORE: u8 = 85;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(mut self, title: &str, score: u8) -> Self {
        self.scores.insert(title.to_string(), score);
        self
    }

    pub fn with_mutation(mut self, script: MutationScript) -> Self {
        self.mutation = script;
        self
    }

    pub fn failing_cover_letter(mut self) -> Self {
        self.fail_cover_letter = true;
        self
    }

    pub fn failing_extract(mut self, title: &str) -> Self {
        self.fail_extract = Some(title.to_string());
        self
    }

    pub fn with_letter_delay(mut self, delay: Duration) -> Self {
        self.letter_delay = Some(delay);
        self
    }

    /// Cancels `token` once `n` cover letters have been written.
    pub fn cancel_after_letters(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    pub fn with_search(mut self, jobs: Vec<DiscoveredJob>) -> Self {
        self.search_results = jobs;
        self
    }

    pub fn with_command(mut self, command: CommandResult) -> Self {
        self.command = Some(command);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == name)
            .count()
    }

    pub fn last_search(&self) -> Option<SearchPreferences> {
        self.last_search.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(name);
        calls.iter().filter(|c| **c == name).count()
    }
}

fn field<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines()
        .find_map(|line| line.strip_prefix(key))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl CareerAgent for ScriptedAgent {
    async fn extract_job(&self, source_text: &str) -> Result<Job, CollaboratorError> {
        self.record("extract_job");
        let title = field(source_text, "Title:")
            .ok_or_else(|| CollaboratorError::Malformed("no title in posting".into()))?;
        if self.fail_extract.as_deref() == Some(title) {
            return Err(CollaboratorError::Rejected(format!("cannot read {title}")));
        }
        let company = field(source_text, "Company:").unwrap_or("Unknown");
        Ok(Job {
            id: format!("job-{}", title.to_lowercase().replace(' ', "-")),
            title: title.to_string(),
            company: company.to_string(),
            location: field(source_text, "Location:").unwrap_or("Remote").to_string(),
            skills: vec!["Rust".into()],
            description: source_text.to_string(),
            apply_url: field(source_text, "Apply URL:").unwrap_or_default().to_string(),
            platform: field(source_text, "Platform:").unwrap_or_default().to_string(),
            scraped_at: Utc::now(),
        })
    }

    async fn score_match(
        &self,
        job: &Job,
        _profile: &UserProfile,
    ) -> Result<MatchResult, CollaboratorError> {
        self.record("score_match");
        let score = self
            .scores
            .get(&job.title)
            .copied()
            .unwrap_or(Self::DEFAULT_SCORE);
        Ok(MatchResult {
            score,
            reasoning: format!("scripted score for {}", job.title),
            missing_skills: Vec::new(),
        })
    }

    async fn generate_cover_letter(
        &self,
        job: &Job,
        profile: &UserProfile,
        style: CoverLetterStyle,
    ) -> Result<String, CollaboratorError> {
        let written = self.record("generate_cover_letter");
        if let Some(delay) = self.letter_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_cover_letter {
            return Err(CollaboratorError::Rejected("content policy".into()));
        }
        if let Some((n, token)) = &self.cancel_after {
            if written >= *n {
                token.cancel();
            }
        }
        Ok(format!(
            "Dear {} team, {} would like to join as {} ({style}).",
            job.company, profile.full_name, job.title
        ))
    }

    async fn mutate_resume(
        &self,
        job: &Job,
        profile: &UserProfile,
    ) -> Result<ResumeMutation, CollaboratorError> {
        self.record("mutate_resume");
        match self.mutation {
            MutationScript::Malformed => {
                Err(CollaboratorError::Malformed("expected value at line 1".into()))
            }
            MutationScript::Reject => Err(CollaboratorError::Rejected("quota exceeded".into())),
            MutationScript::Ok => {
                let track = profile
                    .primary_track()
                    .ok_or_else(|| CollaboratorError::Rejected("no track".into()))?;
                let mut resume = track.content.clone();
                resume.skills.extend(job.skills.iter().cloned());
                Ok(ResumeMutation {
                    resume,
                    report: MutationReport {
                        selected_track_id: track.id.clone(),
                        selected_track_name: track.name.clone(),
                        injected_keywords: job.skills.clone(),
                        mirrored_phrases: Vec::new(),
                        reordering_justification: "skills first".into(),
                        ats_score_estimate: 88,
                        iterations: 1,
                        timing: MutationTiming::default(),
                    },
                })
            }
        }
    }

    async fn search_jobs(
        &self,
        preferences: &SearchPreferences,
    ) -> Result<Vec<DiscoveredJob>, CollaboratorError> {
        self.record("search_jobs");
        *self.last_search.lock().unwrap() = Some(preferences.clone());
        Ok(self.search_results.clone())
    }

    async fn interpret_command(&self, _text: &str) -> Result<CommandResult, CollaboratorError> {
        self.record("interpret_command");
        self.command
            .clone()
            .ok_or_else(|| CollaboratorError::Rejected("no command scripted".into()))
    }

    async fn create_strategy_plan(
        &self,
        goal: &str,
        profile: &UserProfile,
    ) -> Result<StrategyPlan, CollaboratorError> {
        self.record("create_strategy_plan");
        Ok(StrategyPlan {
            goal: goal.to_string(),
            summary: format!("Plan for {}", profile.full_name),
            steps: vec![StrategyStep {
                action: "Apply to five roles a week".into(),
                rationale: "steady pipeline".into(),
            }],
            target_roles: profile.preferences.target_roles.clone(),
            weekly_application_target: 5,
        })
    }

    async fn augment_profile(
        &self,
        profile: &UserProfile,
        _source_text: &str,
    ) -> Result<UserProfile, CollaboratorError> {
        self.record("augment_profile");
        let mut updated = profile.clone();
        if let Some(track) = updated.resume_tracks.first_mut() {
            track.content.skills.push("Kafka".into());
        }
        Ok(updated)
    }
}
