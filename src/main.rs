mod agent;
mod anthropic;
mod cli;
mod config;
mod error;
mod model;
mod state_machine;
mod store;
mod ui;
mod workflow;

#[cfg(test)]
mod test_support;

use std::future::Future;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use agent::LlmCareerAgent;
use anthropic::AnthropicClient;
use cli::{Cli, Command, ProfileAction};
use config::AutohuntConfig;
use model::{CommandAction, CommandResult, DiscoveredJob, Job, UserProfile};
use store::{ApplicationStore, JsonFileStore};
use ui::RunProgress;
use workflow::{DispatchOutcome, EngineConfig, WorkflowEngine, WorkflowSession};

const DISCOVERED_FILE: &str = "discovered.json";

/// Exit status after Ctrl-C, as a shell reports death by SIGINT.
const INTERRUPTED: u8 = 130;

type Engine = WorkflowEngine<LlmCareerAgent<AnthropicClient>, JsonFileStore>;

fn init_tracing(verbose: bool) {
    let default = if verbose { "autohunt=debug" } else { "autohunt=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AutohuntConfig::load()?;
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(style) = cli.style {
        config.default_style = style.into();
    }
    let store = JsonFileStore::new(&config.data_dir);

    match &cli.command {
        Command::Profile { action } => return profile_command(&store, action).await,
        Command::Log => {
            let logs = store.load_applications().await?;
            if logs.is_empty() {
                println!("  No applications yet.");
            }
            logs.iter().for_each(ui::print_application);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Status => {
            let risk = store.load_risk().await?.unwrap_or_default();
            let logs = store.load_applications().await?;
            ui::print_status(&risk, &logs);
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let needs_model = !matches!(cli.command, Command::Pause { .. } | Command::Resume);
    if needs_model && config.api_key.is_empty() {
        bail!("no API key: set ANTHROPIC_API_KEY or api_key in {}", config::CONFIG_FILE);
    }
    let client = AnthropicClient::new(config.api_key.clone())?;
    let agent = LlmCareerAgent::new(client, config.model.clone(), config.max_tokens);

    let profile = store.load_profile().await?.unwrap_or_default();
    let risk = store.load_risk().await?.unwrap_or_default();
    let session = WorkflowSession::new(profile, risk);
    let data_dir = config.data_dir.clone();
    let engine: Engine = WorkflowEngine::new(agent, store, session, EngineConfig::from(&config));

    let ok = match cli.command {
        Command::Apply { posting, job } => {
            let job = match &job {
                Some(path) => Some(read_job(path).await?),
                None => None,
            };
            let text = match &posting {
                Some(path) => tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading posting {}", path.display()))?,
                None => String::new(),
            };
            let progress = start_progress(&engine, "apply");
            let profile = engine.session().profile();
            let style = engine.config().default_style;
            let run = async {
                match &job {
                    Some(job) => engine.run_single_apply_cycle(job, &profile, style).await,
                    None => engine.run_from_posting(&text, &profile, style).await,
                }
            };
            match interruptible(run).await {
                Some(Ok(log)) => {
                    progress.complete(&log);
                    true
                }
                Some(Err(e)) => {
                    progress.fail(&e);
                    false
                }
                None => {
                    progress.interrupted();
                    return Ok(ExitCode::from(INTERRUPTED));
                }
            }
        }
        Command::Bulk { queue, threshold } => {
            let queue = match queue {
                Some(path) => read_queue(&path).await?,
                None => load_discovered(&data_dir).await?,
            };
            let cancel = CancellationToken::new();
            cancel_on_interrupt(cancel.clone());
            let progress = start_progress(&engine, "bulk");
            let profile = engine.session().profile();
            match engine
                .run_bulk_deployment(
                    &queue,
                    &profile,
                    threshold,
                    engine.config().default_style,
                    &cancel,
                )
                .await
            {
                Ok(report) => {
                    progress.report(&report);
                    true
                }
                Err(e) => {
                    progress.fail(&e);
                    false
                }
            }
        }
        Command::Command { text, threshold } => {
            engine
                .session()
                .set_discovered(load_discovered(&data_dir).await?);
            // The interpreted action may be Apply, which stops between jobs on cancel.
            let cancel = CancellationToken::new();
            cancel_on_interrupt(cancel.clone());
            let progress = start_progress(&engine, "command");
            match engine.execute_command_text(&text, threshold, &cancel).await {
                Ok(outcome) => {
                    progress.dispatched(&outcome);
                    if let DispatchOutcome::Discovered { jobs } = &outcome {
                        save_discovered(&data_dir, jobs).await?;
                    }
                    !matches!(outcome, DispatchOutcome::Failed { .. })
                }
                Err(e) => {
                    progress.fail(&e);
                    false
                }
            }
        }
        Command::Augment { source } => {
            let text = tokio::fs::read_to_string(&source)
                .await
                .with_context(|| format!("reading {}", source.display()))?;
            let progress = start_progress(&engine, "augment");
            match interruptible(engine.augment_profile(&text)).await {
                Some(Ok(profile)) => {
                    progress.stop_with(&format!(
                        "Profile updated: {} resume tracks",
                        profile.resume_tracks.len()
                    ));
                    true
                }
                Some(Err(e)) => {
                    progress.fail(&e);
                    false
                }
                None => {
                    progress.interrupted();
                    return Ok(ExitCode::from(INTERRUPTED));
                }
            }
        }
        Command::Pause { reason } => {
            dispatch_structured(&engine, CommandAction::Pause, reason).await
        }
        Command::Resume => dispatch_structured(&engine, CommandAction::Resume, None).await,
        Command::Profile { .. } | Command::Log | Command::Status => true,
    };

    if cli.verbose {
        let session = engine.session();
        ui::print_telemetry(&session.telemetry());
        let progress = session.progress();
        tracing::debug!(
            status = %session.status(),
            processed = progress.processed,
            total = progress.total,
            applications = session.applications().len(),
            "session state at exit"
        );
        if let Some(run) = session.last_run() {
            tracing::debug!(
                run_id = %run.run_id,
                final_status = %run.final_status,
                duration_ms = run.duration_ms,
                "last workflow run"
            );
        }
        if !ok && let Some(prompt) = engine.agent.last_prompt() {
            tracing::debug!(%prompt, "last prompt sent to the model");
        }
    }
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn start_progress(engine: &Engine, label: &str) -> RunProgress {
    RunProgress::start(
        label,
        engine.session().subscribe(),
        engine.session().subscribe_progress(),
    )
}

/// Pause and resume only flip the risk gate, so they run without an interrupt
/// handler and Ctrl-C keeps its default behavior.
async fn dispatch_structured(engine: &Engine, action: CommandAction, reason: Option<String>) -> bool {
    let command = CommandResult {
        action,
        goal: None,
        filters: None,
        reason,
    };
    let progress = start_progress(engine, "command");
    match engine
        .dispatch_command(command, None, &CancellationToken::new())
        .await
    {
        Ok(outcome) => {
            progress.dispatched(&outcome);
            !matches!(outcome, DispatchOutcome::Failed { .. })
        }
        Err(e) => {
            progress.fail(&e);
            false
        }
    }
}

/// First Ctrl-C asks the running deployment to stop after the current job;
/// a second one exits at once.
fn cancel_on_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if escalate_interrupts(tokio::signal::ctrl_c, cancel).await {
            std::process::exit(INTERRUPTED.into());
        }
    });
}

/// Cancels on the first signal. Returns true once a second signal arrives.
async fn escalate_interrupts<F, Fut>(mut signal: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if signal().await.is_err() {
        return false;
    }
    tracing::warn!("interrupt received, finishing the current job; press Ctrl-C again to abort");
    cancel.cancel();
    signal().await.is_ok()
}

/// Runs `fut` to completion unless Ctrl-C arrives first.
async fn interruptible<T>(fut: impl Future<Output = T>) -> Option<T> {
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No handler could be installed; never report an interrupt.
            std::future::pending::<()>().await;
        }
    };
    race_interrupt(fut, interrupt).await
}

async fn race_interrupt<T>(fut: impl Future<Output = T>, interrupt: impl Future) -> Option<T> {
    tokio::select! {
        out = fut => Some(out),
        _ = interrupt => None,
    }
}

async fn profile_command(store: &JsonFileStore, action: &ProfileAction) -> Result<ExitCode> {
    match action {
        ProfileAction::Show => match store.load_profile().await? {
            Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            None => println!("  No profile stored in {}.", store.root().display()),
        },
        ProfileAction::Import { file } => {
            let body = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("reading profile {}", file.display()))?;
            let profile: UserProfile =
                serde_json::from_str(&body).context("profile is not valid JSON")?;
            if profile.resume_tracks.is_empty() {
                tracing::warn!("imported profile has no resume track; apply runs will be rejected");
            }
            store.persist_profile(&profile).await?;
            println!(
                "  Imported profile for {} ({} resume tracks)",
                profile.full_name,
                profile.resume_tracks.len()
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn read_job(path: &Path) -> Result<Job> {
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading job {}", path.display()))?;
    serde_json::from_str(&body).context("job file is not a valid job record")
}

async fn read_queue(path: &Path) -> Result<Vec<DiscoveredJob>> {
    let body = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading queue {}", path.display()))?;
    serde_json::from_str(&body).context("queue must be a JSON array of discovered jobs")
}

async fn load_discovered(data_dir: &Path) -> Result<Vec<DiscoveredJob>> {
    let path = data_dir.join(DISCOVERED_FILE);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(Vec::new());
    }
    read_queue(&path).await
}

async fn save_discovered(data_dir: &Path, jobs: &[DiscoveredJob]) -> Result<()> {
    tokio::fs::create_dir_all(data_dir).await?;
    let body = serde_json::to_vec_pretty(jobs)?;
    tokio::fs::write(data_dir.join(DISCOVERED_FILE), body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CoverLetterStyle;
    use crate::test_support::{ScriptedAgent, discovered, sample_job, sample_profile, test_engine};

    #[tokio::test]
    async fn discovered_jobs_survive_between_invocations() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_discovered(dir.path()).await.unwrap().is_empty());

        let jobs = vec![discovered("SRE", "Globex"), discovered("Staff Engineer", "Acme")];
        save_discovered(dir.path(), &jobs).await.unwrap();
        assert_eq!(load_discovered(dir.path()).await.unwrap(), jobs);
    }

    #[tokio::test]
    async fn structured_job_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        let job = sample_job();
        std::fs::write(&path, serde_json::to_vec(&job).unwrap()).unwrap();
        assert_eq!(read_job(&path).await.unwrap(), job);

        std::fs::write(&path, "[]").unwrap();
        assert!(read_job(&path).await.is_err());
    }

    #[tokio::test]
    async fn first_interrupt_cancels_second_escalates() {
        let cancel = CancellationToken::new();
        let mut signals = 0;
        let escalated = escalate_interrupts(
            || {
                signals += 1;
                async { Ok(()) }
            },
            cancel.clone(),
        )
        .await;
        assert!(escalated);
        assert!(cancel.is_cancelled());
        assert_eq!(signals, 2);
    }

    #[tokio::test]
    async fn missing_signal_handler_never_cancels() {
        let cancel = CancellationToken::new();
        let escalated = escalate_interrupts(
            || async { Err(std::io::Error::other("no signal handler")) },
            cancel.clone(),
        )
        .await;
        assert!(!escalated);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn interrupted_run_releases_the_session() {
        let engine = test_engine(
            ScriptedAgent::new().with_letter_delay(std::time::Duration::from_secs(5)),
        );
        let job = sample_job();
        let profile = sample_profile();
        let run = engine.run_single_apply_cycle(
            &job,
            &profile,
            CoverLetterStyle::Professional,
        );
        let interrupt = tokio::time::sleep(std::time::Duration::from_millis(20));
        assert!(race_interrupt(run, interrupt).await.is_none());

        // The abandoned run dropped its guard, so the next command can start.
        engine.save_profile(sample_profile()).await.unwrap();
        assert!(engine.augment_profile("Kafka").await.is_ok());
    }

    #[tokio::test]
    async fn finished_work_beats_a_pending_interrupt() {
        let done = race_interrupt(async { 7 }, std::future::pending::<()>()).await;
        assert_eq!(done, Some(7));
    }

    #[tokio::test]
    async fn malformed_queue_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.json");
        std::fs::write(&path, "{\"not\": \"a list\"}").unwrap();
        assert!(read_queue(&path).await.is_err());
    }
}
