//! rules-worker: runs the threat-detection pipeline.
//!
//! Subcommands:
//! - `run`: consume tracking events from SQS until Ctrl-C
//! - `replay <FILE>`: push newline-delimited JSON events through the pipeline
//! - `simulate`: send one manual-trigger alert through the configured channel

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use watchpost_core::config::{load_dotenv, Config};
use watchpost_notify::{AlertPublisher, BufferedSink, Dispatcher, LogPublisher, SinkStats};
use watchpost_queue::{SqsAlertPublisher, SqsConsumer};
use watchpost_rules::{
    check_queue_health, replay_ndjson, run_consumer, spawn_idle_sweeper, IngestionCoordinator,
    WorkerConfig,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Threat-detection rules worker.
#[derive(Parser, Debug)]
#[command(name = "rules-worker", version, about)]
struct Cli {
    /// Seconds to wait for buffered alerts to flush on exit.
    #[arg(long, env = "RULES_SHUTDOWN_TIMEOUT", default_value_t = 10)]
    shutdown_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Consume the tracking queue until Ctrl-C.
    Run,
    /// Feed newline-delimited JSON tracking events from a file.
    Replay {
        /// Path to the NDJSON file.
        file: PathBuf,
    },
    /// Publish one MANUAL_TRIGGER alert through the configured channel.
    Simulate,
}

// ── wiring ──────────────────────────────────────────────────────────

fn build_publisher(config: &Config) -> anyhow::Result<Box<dyn AlertPublisher>> {
    let publisher: Box<dyn AlertPublisher> = match config.sink.kind.as_str() {
        "log" => Box::new(LogPublisher::new()),
        "sqs" => Box::new(SqsAlertPublisher::new(&config.aws, &config.queue)?),
        other => bail!("unknown ALERT_SINK '{other}' (expected sqs or log)"),
    };
    info!(channel = publisher.channel_name(), "Alert channel configured");
    Ok(publisher)
}

fn build_pipeline(
    config: &Config,
) -> anyhow::Result<(Arc<IngestionCoordinator>, JoinHandle<SinkStats>)> {
    let dispatcher = Dispatcher::new(vec![build_publisher(config)?]);
    let (sink, dispatch_handle) = BufferedSink::spawn(dispatcher, config.sink.buffer_size);
    let coordinator = Arc::new(IngestionCoordinator::new(&config.engine, Arc::new(sink)));
    Ok((coordinator, dispatch_handle))
}

/// Drop the last pipeline handle and wait for buffered alerts to go out.
async fn drain(
    coordinator: Arc<IngestionCoordinator>,
    dispatch_handle: JoinHandle<SinkStats>,
    timeout: Duration,
) {
    drop(coordinator);
    match tokio::time::timeout(timeout, dispatch_handle).await {
        Ok(Ok(stats)) => info!(
            dispatched = stats.dispatched,
            failed_deliveries = stats.failed_deliveries,
            "Alert sink drained"
        ),
        Ok(Err(e)) => error!(error = %e, "Alert dispatch task failed"),
        Err(_) => warn!(timeout_secs = timeout.as_secs(), "Timed out flushing alert buffer"),
    }
}

// ── subcommands ─────────────────────────────────────────────────────

async fn run(config: Config, shutdown_timeout: Duration) -> anyhow::Result<()> {
    let consumer = SqsConsumer::new(&config.aws, &config.queue).await?;
    check_queue_health(&consumer).await;
    let (coordinator, dispatch_handle) = build_pipeline(&config)?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let sweeper = if config.engine.idle_ttl_secs > 0 {
        Some(spawn_idle_sweeper(
            coordinator.clone(),
            Duration::from_secs(config.engine.idle_ttl_secs),
            Duration::from_secs(config.engine.sweep_interval_secs.max(1)),
            shutdown_tx.subscribe(),
        ))
    } else {
        info!("Idle state eviction disabled");
        None
    };

    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            info!("Ctrl-C received, shutting down");
            let _ = shutdown_tx.send(());
        });
    }

    let stats = run_consumer(
        &consumer,
        &coordinator,
        WorkerConfig::from(&config.queue),
        shutdown_tx.subscribe(),
    )
    .await;
    info!(processed = stats.processed, alerts = stats.alerts, "Consumer loop finished");

    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            warn!(error = %e, "Idle sweeper ended abnormally");
        }
    }

    drain(coordinator, dispatch_handle, shutdown_timeout).await;
    Ok(())
}

async fn replay(config: Config, file: PathBuf, shutdown_timeout: Duration) -> anyhow::Result<()> {
    let handle = tokio::fs::File::open(&file)
        .await
        .with_context(|| format!("failed to open {}", file.display()))?;
    let (coordinator, dispatch_handle) = build_pipeline(&config)?;

    let stats = replay_ndjson(BufReader::new(handle), &coordinator).await;
    info!(
        file = %file.display(),
        events = stats.events,
        skipped = stats.skipped,
        alerts = stats.alerts,
        "Replay complete"
    );
    drain(coordinator, dispatch_handle, shutdown_timeout).await;
    Ok(())
}

async fn simulate(config: Config) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::new(vec![build_publisher(&config)?]);
    match dispatcher.test_channel(0).await {
        Ok(()) => {
            info!("Manual trigger alert delivered");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Manual trigger alert failed");
            Err(e.into())
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let shutdown_timeout = Duration::from_secs(cli.shutdown_timeout);

    match cli.command {
        Command::Run => run(config, shutdown_timeout).await?,
        Command::Replay { file } => replay(config, file, shutdown_timeout).await?,
        Command::Simulate => simulate(config).await?,
    }

    info!("rules-worker exited cleanly");
    Ok(())
}
