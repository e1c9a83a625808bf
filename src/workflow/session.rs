//! Explicit session state shared by every workflow operation.
//!
//! The session replaces ambient UI state: current status, telemetry lines,
//! the application log, discovered jobs and the risk gate. Only the holder of
//! a [`RunGuard`] writes status; a second concurrent run is refused.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;

use super::risk::{RiskGate, RiskState};
use super::telemetry::{TelemetryEntry, TelemetryLevel};
use crate::error::WorkflowError;
use crate::model::{ApplicationLog, DiscoveredJob, UserProfile};
use crate::state_machine::{ApplicationStatus, RunSummary};

/// "N of M processed" for a bulk deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkProgress {
    pub processed: usize,
    pub total: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct WorkflowSession {
    status: watch::Sender<ApplicationStatus>,
    progress: watch::Sender<BulkProgress>,
    telemetry: Mutex<Vec<TelemetryEntry>>,
    applications: Mutex<Vec<ApplicationLog>>,
    discovered: Mutex<Vec<DiscoveredJob>>,
    profile: Mutex<UserProfile>,
    last_run: Mutex<Option<RunSummary>>,
    risk: RiskGate,
    active: AtomicBool,
}

/// Proof that the holder is the only active run. Releases on drop.
pub struct RunGuard<'a> {
    active: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

impl WorkflowSession {
    pub fn new(profile: UserProfile, risk: RiskState) -> Self {
        let (status, _) = watch::channel(ApplicationStatus::Pending);
        let (progress, _) = watch::channel(BulkProgress::default());
        Self {
            status,
            progress,
            telemetry: Mutex::new(Vec::new()),
            applications: Mutex::new(Vec::new()),
            discovered: Mutex::new(Vec::new()),
            profile: Mutex::new(profile),
            last_run: Mutex::new(None),
            risk: RiskGate::new(risk),
            active: AtomicBool::new(false),
        }
    }

    /// Claim the single-writer slot, or `Busy` if a run is already active.
    pub fn begin_run(&self) -> Result<RunGuard<'_>, WorkflowError> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WorkflowError::Busy)?;
        Ok(RunGuard {
            active: &self.active,
        })
    }

    pub fn status(&self) -> ApplicationStatus {
        *self.status.borrow()
    }

    /// Receives every status change, for progress rendering.
    pub fn subscribe(&self) -> watch::Receiver<ApplicationStatus> {
        self.status.subscribe()
    }

    pub(crate) fn publish_status(&self, status: ApplicationStatus) {
        self.status.send_replace(status);
    }

    pub fn progress(&self) -> BulkProgress {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<BulkProgress> {
        self.progress.subscribe()
    }

    pub(crate) fn publish_progress(&self, progress: BulkProgress) {
        self.progress.send_replace(progress);
    }

    pub fn log(&self, level: TelemetryLevel, message: impl Into<String>) {
        let entry = TelemetryEntry::new(level, message);
        entry.trace();
        lock(&self.telemetry).push(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(TelemetryLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(TelemetryLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(TelemetryLevel::Error, message);
    }

    pub fn telemetry(&self) -> Vec<TelemetryEntry> {
        lock(&self.telemetry).clone()
    }

    pub(crate) fn push_application(&self, log: ApplicationLog) {
        lock(&self.applications).push(log);
    }

    pub fn applications(&self) -> Vec<ApplicationLog> {
        lock(&self.applications).clone()
    }

    pub(crate) fn set_discovered(&self, jobs: Vec<DiscoveredJob>) {
        *lock(&self.discovered) = jobs;
    }

    pub fn discovered(&self) -> Vec<DiscoveredJob> {
        lock(&self.discovered).clone()
    }

    pub fn profile(&self) -> UserProfile {
        lock(&self.profile).clone()
    }

    pub(crate) fn replace_profile(&self, profile: UserProfile) {
        *lock(&self.profile) = profile;
    }

    pub(crate) fn record_run(&self, summary: RunSummary) {
        *lock(&self.last_run) = Some(summary);
    }

    pub fn last_run(&self) -> Option<RunSummary> {
        lock(&self.last_run).clone()
    }

    pub fn risk(&self) -> &RiskGate {
        &self.risk
    }
}

impl Default for WorkflowSession {
    fn default() -> Self {
        Self::new(UserProfile::default(), RiskState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_run_is_refused_until_guard_drops() {
        let session = WorkflowSession::default();
        let guard = session.begin_run().unwrap();
        assert!(matches!(session.begin_run(), Err(WorkflowError::Busy)));

        drop(guard);
        assert!(session.begin_run().is_ok());
    }

    #[test]
    fn status_changes_are_observable() {
        let session = WorkflowSession::default();
        let mut rx = session.subscribe();
        assert_eq!(session.status(), ApplicationStatus::Pending);

        session.publish_status(ApplicationStatus::Applying);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ApplicationStatus::Applying);
        assert_eq!(session.status(), ApplicationStatus::Applying);
    }

    #[test]
    fn telemetry_keeps_order_and_level() {
        let session = WorkflowSession::default();
        session.info("started");
        session.warn("store offline");
        session.error("cover letter failed");

        let lines = session.telemetry();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].level, TelemetryLevel::Warning);
        assert_eq!(lines[2].message, "cover letter failed");
    }

    #[test]
    fn progress_is_published() {
        let session = WorkflowSession::default();
        session.publish_progress(BulkProgress {
            processed: 2,
            total: 5,
            ..Default::default()
        });
        assert_eq!(session.progress().processed, 2);
        assert_eq!(session.progress().total, 5);
    }
}
