use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::session::WorkflowSession;
use super::simulation::{self, DelayRange};
use crate::agent::CareerAgent;
use crate::config::AutohuntConfig;
use crate::error::{CollaboratorError, PreconditionError, StoreError, WorkflowError};
use crate::model::{
    ApplicationLog, CoverLetterStyle, CycleArtifacts, Job, MatchResult, ResumeMutation,
    UserProfile,
};
use crate::state_machine::{ApplicationStatus, RunKind, RunSummary, WorkflowRun};
use crate::store::ApplicationStore;

/// Tunables of the workflow core.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bulk threshold used when neither the caller nor the profile sets one.
    pub default_threshold: u8,
    pub dispatch_delay: DelayRange,
    /// Upper bound on any single collaborator call.
    pub collaborator_timeout: Duration,
    pub default_style: CoverLetterStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_threshold: 70,
            dispatch_delay: DelayRange {
                min_ms: 1500,
                max_ms: 4000,
            },
            collaborator_timeout: Duration::from_secs(90),
            default_style: CoverLetterStyle::Professional,
        }
    }
}

impl From<&AutohuntConfig> for EngineConfig {
    fn from(config: &AutohuntConfig) -> Self {
        Self {
            default_threshold: config.match_threshold,
            dispatch_delay: DelayRange {
                min_ms: config.dispatch_delay_min_ms,
                max_ms: config.dispatch_delay_max_ms,
            },
            collaborator_timeout: Duration::from_secs(config.collaborator_timeout_secs),
            default_style: config.default_style,
        }
    }
}

/// Drives apply runs through the state machine against the collaborators.
///
/// All status writes go through the session; every public entry point first
/// claims the session's single-writer slot.
pub struct WorkflowEngine<A, S> {
    pub(crate) agent: A,
    pub(crate) store: S,
    pub(crate) session: WorkflowSession,
    pub(crate) config: EngineConfig,
}

impl<A: CareerAgent, S: ApplicationStore> WorkflowEngine<A, S> {
    pub fn new(agent: A, store: S, session: WorkflowSession, config: EngineConfig) -> Self {
        Self {
            agent,
            store,
            session,
            config,
        }
    }

    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one job through cover letter, resume mutation, simulated dispatch
    /// and verification. Returns the completed log or the reason it failed;
    /// a failed run never produces a partial log.
    pub async fn run_single_apply_cycle(
        &self,
        job: &Job,
        profile: &UserProfile,
        style: CoverLetterStyle,
    ) -> Result<ApplicationLog, WorkflowError> {
        let _guard = self.session.begin_run()?;
        let mut run = self.start_run(RunKind::Apply);

        self.check_gate(&mut run)?;
        if job.title.trim().is_empty() || job.company.trim().is_empty() {
            return Err(self.reject(&run, PreconditionError::EmptyJobInput));
        }
        if profile.resume_tracks.is_empty() {
            return Err(self.reject(&run, PreconditionError::NoResumeTrack));
        }

        let result = self.apply_cycle(&mut run, job, profile, style, None, None).await;
        self.session.record_run(RunSummary::from_run(&run));
        result
    }

    /// Extracts a job from raw posting text, scores it and then runs the
    /// apply cycle. The match result is embedded in the log.
    pub async fn run_from_posting(
        &self,
        source_text: &str,
        profile: &UserProfile,
        style: CoverLetterStyle,
    ) -> Result<ApplicationLog, WorkflowError> {
        let _guard = self.session.begin_run()?;
        let mut run = self.start_run(RunKind::Apply);

        self.check_gate(&mut run)?;
        if source_text.trim().is_empty() {
            return Err(self.reject(&run, PreconditionError::EmptyJobInput));
        }
        if profile.resume_tracks.is_empty() {
            return Err(self.reject(&run, PreconditionError::NoResumeTrack));
        }

        let result: Result<ApplicationLog, WorkflowError> = async {
            self.advance(&mut run, ApplicationStatus::Extracting)?;
            let job = match self
                .call("extract_job", self.agent.extract_job(source_text))
                .await
            {
                Ok(job) => job,
                Err(e) => return Err(self.fail(&mut run, e)),
            };
            self.session
                .info(format!("Extracted \"{}\" at {}", job.title, job.company));

            self.advance(&mut run, ApplicationStatus::Matching)?;
            let matched = match self
                .call("score_match", self.agent.score_match(&job, profile))
                .await
            {
                Ok(m) => m,
                Err(e) => return Err(self.fail(&mut run, e)),
            };
            self.session
                .info(format!("Match score {} for {}", matched.score, job.company));

            self.apply_cycle(&mut run, &job, profile, style, Some(matched), None)
                .await
        }
        .await;

        self.session.record_run(RunSummary::from_run(&run));
        result
    }

    /// Merges new material into the session profile (`AUGMENTING`) and saves it.
    /// A store failure is reported as a warning; the augmented profile is kept.
    pub async fn augment_profile(&self, source_text: &str) -> Result<UserProfile, WorkflowError> {
        let _guard = self.session.begin_run()?;
        let mut run = self.start_run(RunKind::Augment);

        if source_text.trim().is_empty() {
            return Err(self.reject(&run, PreconditionError::EmptyJobInput));
        }

        self.advance(&mut run, ApplicationStatus::Augmenting)?;
        let current = self.session.profile();
        let updated = match self
            .call(
                "augment_profile",
                self.agent.augment_profile(&current, source_text),
            )
            .await
        {
            Ok(p) => p,
            Err(e) => {
                let err = self.fail(&mut run, e);
                self.session.record_run(RunSummary::from_run(&run));
                return Err(err);
            }
        };
        self.advance(&mut run, ApplicationStatus::Pending)?;
        self.session.record_run(RunSummary::from_run(&run));

        if let Err(e) = self.save_profile(updated.clone()).await {
            self.session
                .warn(format!("Augmented profile not persisted: {e}"));
        }
        self.session.info("Profile augmented");
        Ok(updated)
    }

    /// Replaces the session profile and persists it.
    /// The in-memory profile is replaced even if the store write fails.
    pub async fn save_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        self.session.replace_profile(profile.clone());
        self.store.persist_profile(&profile).await
    }

    pub(crate) fn start_run(&self, kind: RunKind) -> WorkflowRun {
        let run = WorkflowRun::new(kind);
        tracing::debug!(run_id = %run.id, ?kind, "workflow run started");
        self.session.publish_status(run.status);
        run
    }

    /// Applies a transition and publishes it.
    pub(crate) fn advance(
        &self,
        run: &mut WorkflowRun,
        next: ApplicationStatus,
    ) -> Result<(), WorkflowError> {
        run.advance(next)?;
        tracing::info!(run_id = %run.id, status = %next, "status changed");
        self.session.publish_status(next);
        Ok(())
    }

    /// Halts the run with `RISK_HALT` if the gate is locked.
    pub(crate) fn check_gate(&self, run: &mut WorkflowRun) -> Result<(), WorkflowError> {
        if let Err(reason) = self.session.risk().check() {
            self.advance(run, ApplicationStatus::RiskHalt)?;
            self.session.warn(format!("Blocked by risk gate: {reason}"));
            self.session.record_run(RunSummary::from_run(run));
            return Err(WorkflowError::Locked { reason });
        }
        Ok(())
    }

    pub(crate) fn reject(&self, run: &WorkflowRun, err: PreconditionError) -> WorkflowError {
        self.session.error(format!("Rejected before start: {err}"));
        self.session.record_run(RunSummary::from_run(run));
        WorkflowError::Precondition(err)
    }

    /// Moves the run to `FAILED` and logs the collaborator error.
    pub(crate) fn fail(&self, run: &mut WorkflowRun, source: CollaboratorError) -> WorkflowError {
        let step = run.status;
        if !run.is_finished()
            && let Err(e) = self.advance(run, ApplicationStatus::Failed)
        {
            tracing::error!(error = %e, "could not mark run as failed");
        }
        self.session.error(format!("{step} failed: {source}"));
        WorkflowError::Collaborator { step, source }
    }

    /// Runs a collaborator call under the configured timeout.
    pub(crate) async fn call<T, F>(
        &self,
        operation: &'static str,
        fut: F,
    ) -> Result<T, CollaboratorError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        let limit = self.config.collaborator_timeout;
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout {
                operation,
                secs: limit.as_secs(),
            }),
        }
    }

    /// The apply cycle proper. Assumes the caller holds the run guard and has
    /// already checked the gate and preconditions.
    pub(crate) async fn apply_cycle(
        &self,
        run: &mut WorkflowRun,
        job: &Job,
        profile: &UserProfile,
        style: CoverLetterStyle,
        match_result: Option<MatchResult>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ApplicationLog, WorkflowError> {
        self.advance(run, ApplicationStatus::GeneratingCl)?;
        let cover_letter = match self
            .call(
                "generate_cover_letter",
                self.agent.generate_cover_letter(job, profile, style),
            )
            .await
        {
            Ok(letter) => letter,
            Err(e) => return Err(self.fail(run, e)),
        };
        self.session
            .info(format!("Cover letter ready for {} ({style})", job.company));

        self.advance(run, ApplicationStatus::MutatingResume)?;
        let mutation = match self
            .call("mutate_resume", self.agent.mutate_resume(job, profile))
            .await
        {
            Ok(m) => m,
            Err(e) if e.is_malformed() => {
                self.session.warn(format!(
                    "Resume mutation unreadable ({e}); using first resume track"
                ));
                ResumeMutation::fallback(profile)?
            }
            Err(e) => return Err(self.fail(run, e)),
        };
        self.session.info(format!(
            "Resume tailored from track \"{}\" (ATS estimate {})",
            mutation.report.selected_track_name, mutation.report.ats_score_estimate
        ));

        self.advance(run, ApplicationStatus::Applying)?;
        let dispatch_ms = simulation::simulate_dispatch(self.config.dispatch_delay, cancel).await;
        self.session.info(format!(
            "[simulated] Dispatched application to {} after {dispatch_ms}ms",
            job.company
        ));

        self.advance(run, ApplicationStatus::Verifying)?;
        let verification =
            simulation::synthesize_proof(job, dispatch_ms, &mut rand::thread_rng());
        self.session.info(format!(
            "[simulated] Verification receipt {} (HTTP {})",
            &verification.dispatch_hash[..18],
            verification.server_status
        ));

        let log = ApplicationLog::completed(
            job,
            CycleArtifacts {
                cover_letter,
                style,
                mutation,
                verification,
                match_result,
            },
        );
        self.advance(run, ApplicationStatus::Completed)?;
        self.session.push_application(log.clone());
        self.session
            .info(format!("Application to {} completed", job.company));

        if let Err(e) = self.store.persist_application_log(&log).await {
            self.session
                .warn(format!("Application log {} not persisted: {e}", log.id));
        }
        Ok(log)
    }
}
