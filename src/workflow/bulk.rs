use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::engine::WorkflowEngine;
use super::session::BulkProgress;
use crate::agent::CareerAgent;
use crate::error::{PreconditionError, WorkflowError};
use crate::model::{ApplicationLog, CoverLetterStyle, DiscoveredJob, UserProfile};
use crate::state_machine::{ApplicationStatus, RunKind, RunSummary, WorkflowRun};
use crate::store::ApplicationStore;

/// What happened to one queue entry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BulkOutcome {
    Applied(Box<ApplicationLog>),
    Skipped {
        discovered_id: String,
        title: String,
        company: String,
        score: u8,
        threshold: u8,
    },
    Failed {
        discovered_id: String,
        title: String,
        company: String,
        status: Option<ApplicationStatus>,
        reason: String,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkReport {
    pub total: usize,
    pub processed: usize,
    pub threshold: u8,
    pub cancelled: bool,
    pub outcomes: Vec<BulkOutcome>,
}

impl BulkReport {
    pub fn applied(&self) -> impl Iterator<Item = &ApplicationLog> {
        self.outcomes.iter().filter_map(|o| match o {
            BulkOutcome::Applied(log) => Some(log.as_ref()),
            _ => None,
        })
    }

    pub fn progress(&self) -> BulkProgress {
        let mut progress = BulkProgress {
            processed: self.processed,
            total: self.total,
            ..Default::default()
        };
        for outcome in &self.outcomes {
            match outcome {
                BulkOutcome::Applied(_) => progress.applied += 1,
                BulkOutcome::Skipped { .. } => progress.skipped += 1,
                BulkOutcome::Failed { .. } => progress.failed += 1,
            }
        }
        progress
    }
}

impl<A: CareerAgent, S: ApplicationStore> WorkflowEngine<A, S> {
    /// Applies to every queued job whose match score reaches the threshold,
    /// strictly one at a time.
    ///
    /// Per-job failures are logged and the batch moves on. `cancel` is checked
    /// before each entry; an entry already in flight is finished and keeps its
    /// log.
    pub async fn run_bulk_deployment(
        &self,
        queue: &[DiscoveredJob],
        profile: &UserProfile,
        threshold: Option<u8>,
        style: CoverLetterStyle,
        cancel: &CancellationToken,
    ) -> Result<BulkReport, WorkflowError> {
        let _guard = self.session.begin_run()?;
        self.bulk_deployment(queue, profile, threshold, style, cancel)
            .await
    }

    /// Bulk body; the caller holds the run guard.
    pub(crate) async fn bulk_deployment(
        &self,
        queue: &[DiscoveredJob],
        profile: &UserProfile,
        threshold: Option<u8>,
        style: CoverLetterStyle,
        cancel: &CancellationToken,
    ) -> Result<BulkReport, WorkflowError> {
        let mut entry_run = self.start_run(RunKind::BulkEntry);
        self.check_gate(&mut entry_run)?;

        if queue.is_empty() {
            return Err(self.reject(&entry_run, PreconditionError::EmptyQueue));
        }
        if profile.resume_tracks.is_empty() {
            return Err(self.reject(&entry_run, PreconditionError::NoResumeTrack));
        }
        let threshold = threshold
            .or(profile.preferences.match_threshold)
            .unwrap_or(self.config.default_threshold);
        if threshold > 100 {
            return Err(self.reject(&entry_run, PreconditionError::InvalidThreshold(threshold)));
        }

        let mut report = BulkReport {
            total: queue.len(),
            threshold,
            ..Default::default()
        };
        self.session.publish_progress(report.progress());
        self.session.info(format!(
            "Bulk deployment started: {} jobs, threshold {threshold}",
            queue.len()
        ));

        for entry in queue {
            if cancel.is_cancelled() {
                report.cancelled = true;
                self.session.warn(format!(
                    "Bulk deployment cancelled after {} of {}",
                    report.processed, report.total
                ));
                break;
            }

            let outcome = self
                .bulk_entry(entry, profile, threshold, style, cancel)
                .await;
            report.outcomes.push(outcome);
            report.processed += 1;

            let progress = report.progress();
            self.session.publish_progress(progress);
            self.session.info(format!(
                "Processed {} of {}",
                progress.processed, progress.total
            ));
        }

        let progress = report.progress();
        self.session.info(format!(
            "Bulk deployment finished: {} applied, {} skipped, {} failed",
            progress.applied, progress.skipped, progress.failed
        ));
        Ok(report)
    }

    /// Extract, score and (above threshold) apply for one entry. Never errors:
    /// failures become [`BulkOutcome::Failed`].
    async fn bulk_entry(
        &self,
        entry: &DiscoveredJob,
        profile: &UserProfile,
        threshold: u8,
        style: CoverLetterStyle,
        cancel: &CancellationToken,
    ) -> BulkOutcome {
        let mut run = self.start_run(RunKind::BulkEntry);
        let failed = |run: &WorkflowRun, err: WorkflowError| BulkOutcome::Failed {
            discovered_id: entry.id.clone(),
            title: entry.title.clone(),
            company: entry.company.clone(),
            status: Some(run.status),
            reason: err.to_string(),
        };

        let outcome: Result<BulkOutcome, WorkflowError> = async {
            self.advance(&mut run, ApplicationStatus::Extracting)?;
            let mut job = match self
                .call("extract_job", self.agent.extract_job(&entry.source_text()))
                .await
            {
                Ok(job) => job,
                Err(e) => return Err(self.fail(&mut run, e)),
            };
            if job.apply_url.trim().is_empty() {
                job.apply_url = entry.url.clone();
            }
            if job.platform.trim().is_empty() {
                job.platform = entry.platform.clone();
            }

            self.advance(&mut run, ApplicationStatus::Matching)?;
            let matched = match self
                .call("score_match", self.agent.score_match(&job, profile))
                .await
            {
                Ok(m) => m,
                Err(e) => return Err(self.fail(&mut run, e)),
            };

            if matched.score < threshold {
                self.session.info(format!(
                    "Skipped {} at {}: below threshold ({} < {threshold})",
                    job.title, job.company, matched.score
                ));
                return Ok(BulkOutcome::Skipped {
                    discovered_id: entry.id.clone(),
                    title: job.title,
                    company: job.company,
                    score: matched.score,
                    threshold,
                });
            }

            let log = self
                .apply_cycle(&mut run, &job, profile, style, Some(matched), Some(cancel))
                .await?;
            Ok(BulkOutcome::Applied(Box::new(log)))
        }
        .await;

        self.session.record_run(RunSummary::from_run(&run));
        match outcome {
            Ok(outcome) => outcome,
            Err(err) => failed(&run, err),
        }
    }
}
