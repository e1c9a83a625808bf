use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::bulk::BulkReport;
use super::engine::WorkflowEngine;
use super::risk::RiskState;
use crate::agent::CareerAgent;
use crate::error::{PreconditionError, WorkflowError};
use crate::model::{CommandAction, CommandResult, DiscoveredJob, StrategyPlan};
use crate::state_machine::{ApplicationStatus, RunKind, RunSummary};
use crate::store::ApplicationStore;

/// Result of routing one command. Collaborator failures inside a branch are
/// reported as [`DispatchOutcome::Failed`]; nothing is retried.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Discovered { jobs: Vec<DiscoveredJob> },
    Paused { risk: RiskState },
    Resumed { risk: RiskState },
    Strategy { plan: StrategyPlan },
    Deployed { report: BulkReport },
    Rejected { reason: String },
    Failed { action: CommandAction, reason: String },
}

const DEFAULT_PAUSE_REASON: &str = "paused by operator";

impl<A: CareerAgent, S: ApplicationStore> WorkflowEngine<A, S> {
    /// Interprets free text (`INTERPRETING`) and dispatches the resulting command.
    ///
    /// `threshold` overrides the match threshold if the command turns out to
    /// be an Apply; it resolves the same way as for [`Self::run_bulk_deployment`].
    pub async fn execute_command_text(
        &self,
        text: &str,
        threshold: Option<u8>,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, WorkflowError> {
        let _guard = self.session.begin_run()?;
        let mut run = self.start_run(RunKind::Command);

        if text.trim().is_empty() {
            return Err(self.reject(&run, PreconditionError::EmptyJobInput));
        }

        self.advance(&mut run, ApplicationStatus::Interpreting)?;
        let command = match self
            .call("interpret_command", self.agent.interpret_command(text))
            .await
        {
            Ok(command) => command,
            Err(e) => {
                let err = self.fail(&mut run, e);
                self.session.record_run(RunSummary::from_run(&run));
                return Err(err);
            }
        };
        self.advance(&mut run, ApplicationStatus::Pending)?;
        self.session.record_run(RunSummary::from_run(&run));
        self.session
            .info(format!("Interpreted command: {:?}", command.action));

        Ok(self.dispatch(command, threshold, cancel).await)
    }

    /// Routes an already structured command.
    pub async fn dispatch_command(
        &self,
        command: CommandResult,
        threshold: Option<u8>,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome, WorkflowError> {
        let _guard = self.session.begin_run()?;
        Ok(self.dispatch(command, threshold, cancel).await)
    }

    async fn dispatch(
        &self,
        command: CommandResult,
        threshold: Option<u8>,
        cancel: &CancellationToken,
    ) -> DispatchOutcome {
        match command.action {
            CommandAction::Search => {
                let preferences = match &command.filters {
                    Some(filters) => self.session.profile().preferences.with_filters(filters),
                    None => self.session.profile().preferences,
                };
                match self
                    .call("search_jobs", self.agent.search_jobs(&preferences))
                    .await
                {
                    Ok(jobs) => {
                        self.session
                            .info(format!("Discovered {} jobs", jobs.len()));
                        self.session.set_discovered(jobs.clone());
                        DispatchOutcome::Discovered { jobs }
                    }
                    Err(e) => self.dispatch_failed(CommandAction::Search, e.to_string()),
                }
            }
            CommandAction::Pause => {
                let reason = command
                    .reason
                    .or(command.goal)
                    .unwrap_or_else(|| DEFAULT_PAUSE_REASON.to_string());
                let risk = self.session.risk().lock(&reason);
                self.session.warn(format!("Workflow paused: {reason}"));
                self.persist_risk(&risk).await;
                DispatchOutcome::Paused { risk }
            }
            CommandAction::Resume => {
                let risk = self.session.risk().unlock();
                self.session.info("Workflow resumed");
                self.persist_risk(&risk).await;
                DispatchOutcome::Resumed { risk }
            }
            CommandAction::Strategy => {
                let Some(goal) = command.goal.filter(|g| !g.trim().is_empty()) else {
                    return self.dispatch_failed(
                        CommandAction::Strategy,
                        "strategy command carries no goal".to_string(),
                    );
                };
                self.plan_strategy(&goal).await
            }
            CommandAction::Apply => {
                let queue = self.session.discovered();
                if queue.is_empty() {
                    return self.dispatch_failed(
                        CommandAction::Apply,
                        PreconditionError::NothingDiscovered.to_string(),
                    );
                }
                let profile = self.session.profile();
                match self
                    .bulk_deployment(&queue, &profile, threshold, self.config.default_style, cancel)
                    .await
                {
                    Ok(report) => DispatchOutcome::Deployed { report },
                    Err(e) => self.dispatch_failed(CommandAction::Apply, e.to_string()),
                }
            }
            CommandAction::Blocked => {
                let reason = command
                    .reason
                    .unwrap_or_else(|| "no reason given".to_string());
                self.session.warn(format!("Command blocked: {reason}"));
                DispatchOutcome::Rejected { reason }
            }
        }
    }

    async fn plan_strategy(&self, goal: &str) -> DispatchOutcome {
        let mut run = self.start_run(RunKind::Strategy);
        let outcome = async {
            self.advance(&mut run, ApplicationStatus::Strategizing)?;
            let profile = self.session.profile();
            let plan = match self
                .call(
                    "create_strategy_plan",
                    self.agent.create_strategy_plan(goal, &profile),
                )
                .await
            {
                Ok(plan) => plan,
                Err(e) => return Err(self.fail(&mut run, e)),
            };
            self.advance(&mut run, ApplicationStatus::Pending)?;
            Ok::<_, WorkflowError>(plan)
        }
        .await;
        self.session.record_run(RunSummary::from_run(&run));

        match outcome {
            Ok(plan) => {
                self.session.info(format!(
                    "Strategy ready: {} steps toward \"{}\"",
                    plan.steps.len(),
                    plan.goal
                ));
                DispatchOutcome::Strategy { plan }
            }
            // `fail` already logged the collaborator error.
            Err(e) => DispatchOutcome::Failed {
                action: CommandAction::Strategy,
                reason: e.to_string(),
            },
        }
    }

    fn dispatch_failed(&self, action: CommandAction, reason: String) -> DispatchOutcome {
        self.session
            .error(format!("{action:?} command failed: {reason}"));
        DispatchOutcome::Failed { action, reason }
    }

    async fn persist_risk(&self, risk: &RiskState) {
        if let Err(e) = self.store.persist_risk(risk).await {
            self.session.warn(format!("Risk state not persisted: {e}"));
        }
    }
}
