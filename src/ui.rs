//! Terminal output: a spinner that follows the session's status channel and
//! colored summaries of finished runs.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::WorkflowError;
use crate::model::ApplicationLog;
use crate::state_machine::ApplicationStatus;
use crate::workflow::{
    BulkOutcome, BulkProgress, BulkReport, DispatchOutcome, RiskState, TelemetryEntry,
    TelemetryLevel,
};

/// Spinner that re-renders on every status or bulk progress change.
pub struct RunProgress {
    pb: ProgressBar,
    watcher: JoinHandle<()>,
    green: Style,
    red: Style,
    yellow: Style,
}

fn spinner_message(status: ApplicationStatus, progress: BulkProgress) -> String {
    let mut msg = format!("{status} ({}%)", status.progress_percent());
    if progress.total > 0 {
        msg.push_str(&format!(
            "  [{}/{} processed, {} applied]",
            progress.processed, progress.total, progress.applied
        ));
    }
    msg
}

impl RunProgress {
    pub fn start(
        label: &str,
        mut status: watch::Receiver<ApplicationStatus>,
        mut progress: watch::Receiver<BulkProgress>,
    ) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {prefix:.bold} {msg}")
                .expect("invalid template"),
        );
        pb.set_prefix(label.to_string());
        pb.set_message(spinner_message(*status.borrow(), *progress.borrow()));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        let handle = pb.clone();
        let watcher = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = status.changed() => if changed.is_err() { break },
                    changed = progress.changed() => if changed.is_err() { break },
                }
                let msg = spinner_message(*status.borrow_and_update(), *progress.borrow_and_update());
                handle.set_message(msg);
            }
        });

        Self {
            pb,
            watcher,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    fn stop(&self) {
        self.watcher.abort();
        self.pb.finish_and_clear();
    }

    pub fn stop_with(&self, message: &str) {
        self.stop();
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    pub fn interrupted(&self) {
        self.stop();
        println!("  {} Interrupted", self.yellow.apply_to("■"));
    }

    pub fn complete(&self, log: &ApplicationLog) {
        self.stop();
        println!(
            "  {} Applied to {} at {}",
            self.green.apply_to("✓"),
            log.job_title,
            log.company
        );
        print_application(log);
    }

    pub fn fail(&self, err: &WorkflowError) {
        self.stop();
        match err.terminal_status() {
            Some(ApplicationStatus::RiskHalt) => {
                println!("  {} Halted: {err}", self.yellow.apply_to("■"));
            }
            _ => println!("  {} {err}", self.red.apply_to("✗")),
        }
    }

    pub fn report(&self, report: &BulkReport) {
        self.stop();
        print_report(report);
    }

    pub fn dispatched(&self, outcome: &DispatchOutcome) {
        self.stop();
        match outcome {
            DispatchOutcome::Discovered { jobs } => {
                println!("  {} Discovered {} jobs", self.green.apply_to("✓"), jobs.len());
                for job in jobs {
                    println!("    {} @ {} ({})", job.title, job.company, job.url);
                }
            }
            DispatchOutcome::Paused { risk } => {
                println!("  {} Paused: {}", self.yellow.apply_to("■"), risk_line(risk));
            }
            DispatchOutcome::Resumed { .. } => {
                println!("  {} Resumed", self.green.apply_to("▶"));
            }
            DispatchOutcome::Strategy { plan } => {
                println!("  {} Strategy: {}", self.green.apply_to("✓"), plan.goal);
                if !plan.summary.is_empty() {
                    println!("    {}", plan.summary);
                }
                for (i, step) in plan.steps.iter().enumerate() {
                    println!("    {}. {} ({})", i + 1, step.action, step.rationale);
                }
            }
            DispatchOutcome::Deployed { report } => print_report(report),
            DispatchOutcome::Rejected { reason } => {
                println!("  {} Command rejected: {reason}", self.yellow.apply_to("!"));
            }
            DispatchOutcome::Failed { action, reason } => {
                println!("  {} {action:?} failed: {reason}", self.red.apply_to("✗"));
            }
        }
    }
}

pub fn print_report(report: &BulkReport) {
    let green = Style::new().green();
    let yellow = Style::new().yellow();
    let red = Style::new().red();

    let progress = report.progress();
    println!(
        "  Bulk deployment: {}/{} processed, {} applied, threshold {}{}",
        progress.processed,
        progress.total,
        report.applied().count(),
        report.threshold,
        if report.cancelled { ", cancelled" } else { "" }
    );
    for outcome in &report.outcomes {
        match outcome {
            BulkOutcome::Applied(log) => println!(
                "    {} {} @ {} (score {})",
                green.apply_to("applied"),
                log.job_title,
                log.company,
                log.match_result.as_ref().map_or(0, |m| m.score)
            ),
            BulkOutcome::Skipped {
                title,
                company,
                score,
                threshold,
                ..
            } => println!(
                "    {} {title} @ {company} ({score} < {threshold})",
                yellow.apply_to("skipped")
            ),
            BulkOutcome::Failed {
                title,
                company,
                reason,
                ..
            } => println!("    {} {title} @ {company}: {reason}", red.apply_to("failed")),
        }
    }
    println!(
        "  {} applied, {} skipped, {} failed",
        progress.applied, progress.skipped, progress.failed
    );
}

pub fn print_application(log: &ApplicationLog) {
    let dim = Style::new().dim();
    println!(
        "    {} {} {} @ {} ({})",
        dim.apply_to(log.timestamp.format("%Y-%m-%d %H:%M")),
        log.status,
        log.job_title,
        log.company,
        log.apply_url
    );
    if log.status == ApplicationStatus::Completed && !log.has_required_artifacts() {
        println!(
            "      {} record is missing artifacts",
            Style::new().yellow().apply_to("!")
        );
    }
    if let Some(report) = &log.mutation_report {
        println!(
            "      resume track \"{}\", ATS estimate {}",
            report.selected_track_name, report.ats_score_estimate
        );
    }
    if let Some(proof) = &log.verification {
        println!(
            "      {} receipt {} HTTP {}",
            dim.apply_to("[simulated]"),
            proof.dispatch_hash.get(..18).unwrap_or(&proof.dispatch_hash),
            proof.server_status
        );
    }
}

pub fn print_telemetry(entries: &[TelemetryEntry]) {
    for entry in entries {
        let style = match entry.level {
            TelemetryLevel::Info => Style::new().dim(),
            TelemetryLevel::Warning => Style::new().yellow(),
            TelemetryLevel::Error => Style::new().red(),
        };
        println!("{}", style.apply_to(entry));
    }
}

fn risk_line(risk: &RiskState) -> String {
    match risk.block_reason() {
        Some(reason) => format!("locked ({reason})"),
        None => format!("open, level {:?}, reputation {}", risk.level, risk.reputation),
    }
}

pub fn print_status(risk: &RiskState, applications: &[ApplicationLog]) {
    let style = if risk.locked {
        Style::new().yellow().bold()
    } else {
        Style::new().green().bold()
    };
    println!("  Risk gate: {}", style.apply_to(risk_line(risk)));
    println!("  Applications: {}", applications.len());
    if let Some(last) = applications.last() {
        println!("  Last:");
        print_application(last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_message_includes_bulk_counts() {
        let progress = BulkProgress {
            processed: 2,
            total: 5,
            applied: 1,
            ..Default::default()
        };
        let msg = spinner_message(ApplicationStatus::Matching, progress);
        assert!(msg.starts_with("MATCHING"));
        assert!(msg.contains("[2/5 processed, 1 applied]"));

        let single = spinner_message(ApplicationStatus::Applying, BulkProgress::default());
        assert!(!single.contains("processed"));
    }

    #[test]
    fn risk_line_reports_lock_reason() {
        let mut risk = RiskState::default();
        assert!(risk_line(&risk).starts_with("open"));
        risk.lock("operator pause");
        assert_eq!(risk_line(&risk), "locked (operator pause)");
    }
}
