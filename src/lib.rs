pub mod a11y;
pub mod bridge;
pub mod db;
pub mod detection;
pub mod driver;
pub mod enforcement;
pub mod settings;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use tokio::io::BufReader;
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use bridge::{
    read_host_messages, CommandWriter, LatestSnapshot, SnapshotSink, StdioBackAction,
    StdioNotifier,
};
use db::Database;
use detection::Classifier;
use driver::DriverHandle;
use enforcement::{EnforcementController, Enforcer};
use settings::{DriverMode, SettingsStore};

const DATA_DIR_ENV: &str = "SHORTSGUARD_DATA_DIR";
const EVENT_QUEUE_DEPTH: usize = 64;
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("shortsguard"))
        .ok_or_else(|| anyhow!("could not determine a data directory, set {DATA_DIR_ENV}"))
}

pub fn run() {
    // stderr only: stdout carries host commands.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("shortsguard starting up...");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(start());
    shutdown_runtime(runtime);

    if let Err(err) = result {
        error!("shortsguard stopped: {err:#}");
        std::process::exit(1);
    }

    info!("shortsguard shut down cleanly");
}

/// Stdin reads run on a blocking thread that can't be cancelled, so a plain
/// drop would wait for the host's next line.
fn shutdown_runtime(runtime: tokio::runtime::Runtime) {
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
}

async fn start() -> Result<()> {
    let data_dir = data_dir()?;
    info!("Using data directory {}", data_dir.display());

    let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;
    let settings = settings_store.settings().clone();
    info!(
        "Loaded settings from {} (budget {}ms, cooldown {}ms, {:?} driver)",
        settings_store.path().display(),
        settings.allowed_budget_ms,
        settings.cooldown_duration_ms,
        settings.driver
    );

    let database = Database::new(data_dir.join("shortsguard.sqlite3"))
        .context("failed to open database")?;
    match database.recent_blocks(1).await {
        Ok(blocks) => {
            if let Some(last) = blocks.first() {
                info!(
                    "Last block started {} after {}ms watched, ran until {}",
                    last.started_at.to_rfc3339(),
                    last.watched_ms,
                    last.blocked_until.to_rfc3339()
                );
            }
        }
        Err(err) => warn!("Failed to read block history: {err:#}"),
    }

    let writer = Arc::new(CommandWriter::stdout());
    let mut controller = EnforcementController::new(
        Classifier::new(settings.target_app_id.clone(), &settings.classifier),
        Enforcer::new(settings.policy()),
        database,
        Arc::new(StdioBackAction::new(writer.clone())),
        Arc::new(StdioNotifier::new(writer)),
    );
    if let Err(err) = controller.announce_carried_cooldown(Utc::now()).await {
        // The first tick reads the deadline again.
        warn!("Could not check for a carried-over cooldown: {err:#}");
    }

    let shutdown = CancellationToken::new();
    let stdin = BufReader::new(tokio::io::stdin());
    let mut driver = DriverHandle::new();

    let reader = match settings.driver {
        DriverMode::Timer => {
            let (tx, rx) = watch::channel(None);
            driver.start_timer(
                controller,
                LatestSnapshot::new(rx),
                Duration::from_millis(settings.tick_period_ms),
            )?;
            tokio::spawn(read_host_messages(
                stdin,
                SnapshotSink::Latest(tx),
                shutdown.clone(),
            ))
        }
        DriverMode::Event => {
            let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
            driver.start_event(controller, rx)?;
            tokio::spawn(read_host_messages(
                stdin,
                SnapshotSink::Events(tx),
                shutdown.clone(),
            ))
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("Interrupted, shutting down"),
            Err(err) => {
                warn!("Failed to listen for Ctrl-C: {err}");
                shutdown.cancelled().await;
                info!("Host bridge closed, shutting down");
            }
        },
        _ = shutdown.cancelled() => info!("Host bridge closed, shutting down"),
    }

    shutdown.cancel();
    reader.abort();
    driver.stop().await
}
