//! mailcron: external cron trigger for the newsletter sending scheduler.
//!
//! Each invocation locks and loads the state file, runs one scheduler pass and
//! one WooCommerce sync pass, then writes the state back. Overlapping
//! invocations on the same state file fail fast instead of doubling work.

mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mailcron_core::impls::{CronSchedule, InMemoryDirectory, InMemoryTaskStore, WooCommerceInactive};
use mailcron_core::ports::{Clock, Ports, SystemClock};
use mailcron_core::{
    Scheduler, SchedulerConfig, SchedulerError, SimpleWorker, WooCommerceSync, WorkerConfig,
    WorkerRunner,
};

use crate::state::{StateFile, StateLock};

// ── CLI ─────────────────────────────────────────────────────────────

/// Cron-driven newsletter sending scheduler.
#[derive(Parser, Debug)]
#[command(name = "mailcron", version, about)]
struct Cli {
    /// Path to mailcron.toml config file.
    #[arg(long, env = "MAILCRON_CONFIG", default_value = "mailcron.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one pass over the state file.
    Run {
        /// Path to the JSON state file.
        #[arg(long, env = "MAILCRON_STATE", default_value = "mailcron-state.json")]
        state: PathBuf,

        /// Process without writing the state back.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the effective configuration.
    Config,
}

// ── Config ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct CronConfig {
    #[serde(default)]
    scheduler: SchedulerConfig,
    #[serde(default)]
    worker: WorkerConfig,
}

impl CronConfig {
    fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.scheduler.validate().context("invalid [scheduler] config")?;
        config.worker.validate().context("invalid [worker] config")?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = CronConfig::load(&cli.config)?;

    match cli.command {
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config).context("failed to encode config")?);
            Ok(())
        }
        Command::Run { state, dry_run } => run(&config, &state, dry_run).await,
    }
}

async fn run(config: &CronConfig, state_path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let lock = StateLock::acquire(state_path)?;
    let state = lock.load()?;
    let tasks = InMemoryTaskStore::from_snapshot(state.tasks);
    let directory = InMemoryDirectory::from_snapshot(state.directory);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let ports = Ports {
        clock: clock.clone(),
        cron: Arc::new(CronSchedule::new()),
        tasks: Arc::new(tasks.clone()),
        newsletters: Arc::new(directory.clone()),
        subscribers: Arc::new(directory.clone()),
        finder: Arc::new(directory.clone()),
        wp_users: Arc::new(directory.clone()),
    };

    let scheduler = Scheduler::new(ports.clone(), config.scheduler.clone());
    let outcome = scheduler.process().await;
    match &outcome {
        Ok(true) => info!("due sending queues processed"),
        Ok(false) => info!("no sending queues were due"),
        Err(SchedulerError::ExecutionLimitReached) => {
            warn!("execution limit reached, remaining queues wait for the next run")
        }
        Err(e) => warn!(error = %e, "scheduler pass failed"),
    }

    let woocommerce = Arc::new(WooCommerceInactive);
    let sync = WooCommerceSync::new(
        woocommerce.clone(),
        woocommerce,
        ports.tasks.clone(),
        clock.clone(),
        &config.worker,
    );
    let runner = WorkerRunner::new(sync, ports.tasks.clone(), clock, &config.worker);
    let synced = if outcome.is_ok() {
        run_worker(&runner).await
    } else {
        Ok(false)
    };

    // Mutations made before a failed pass are persisted too.
    if dry_run {
        info!("dry run, state not written");
    } else {
        lock.save(&StateFile::capture(&tasks, &directory).await)?;
    }

    outcome.context("scheduler pass failed")?;
    if synced.context("woocommerce sync failed")? {
        info!("woocommerce sync pass finished");
    }
    Ok(())
}

/// Make sure the worker has a task, then process what is due.
async fn run_worker<W: SimpleWorker>(runner: &WorkerRunner<W>) -> Result<bool, SchedulerError> {
    if runner.worker().check_processing_requirements() {
        runner.schedule().await?;
    }
    runner.process().await
}
