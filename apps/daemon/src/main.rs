//! FindMy Bridge daemon.
//!
//! Watches the encrypted record store written by the system's tracking
//! daemon, maintains the in-memory device registry, and forwards device
//! changes to Home Assistant over the HTTP webhook and MQTT sinks.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use findmy_core::{DeviceRegistry, EventBus};
use findmy_sinks::NotificationDispatcher;
use findmy_store::{KeychainKeyProvider, RecordIngestor, StoreLayout, StoreWatcher};

use config::BridgeConfig;

/// App data directory, used for log files.
fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("findmy-bridge")
}

/// Initialize tracing with console and daily-rotated file logging.
///
/// Console: colored, compact. File: plain, more detail, under
/// `<data_dir>/findmy-bridge/logs/`. Falls back to console-only when the
/// logs directory cannot be created. The returned guard must stay alive for
/// the process lifetime.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info")
            .add_directive("findmy_core=debug".parse().expect("valid directive"))
            .add_directive("findmy_store=debug".parse().expect("valid directive"))
            .add_directive("findmy_sinks=debug".parse().expect("valid directive"))
            .add_directive("findmy_bridge=debug".parse().expect("valid directive"))
    });

    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_file(false)
        .with_line_number(false)
        .with_target(true);

    let logs_dir = app_data_dir().join("logs");
    let file_appender = std::fs::create_dir_all(&logs_dir)
        .ok()
        .and_then(|_| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("findmy-bridge")
                .filename_suffix("log")
                .build(&logs_dir)
                .ok()
        });

    match file_appender {
        Some(appender) => {
            let (non_blocking_file, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_target(true);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            eprintln!("Warning: file logging disabled, could not create {}", logs_dir.display());
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load a developer .env before anything reads the environment
    dotenvy::dotenv().ok();
    let _guard = init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "findmy-bridge starting");

    let config_path = BridgeConfig::resolve_path(std::env::args_os().nth(1).map(PathBuf::from));
    let config = match &config_path {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };

    let layout = match &config.record_store {
        Some(root) => StoreLayout::new(root.clone()),
        None => StoreLayout::default_root()
            .context("could not determine the home directory for the record store")?,
    };

    // Registry events flow through the bus into the dispatcher task, so
    // sink I/O never blocks ingestion.
    let bus = EventBus::new();
    let registry = Arc::new(DeviceRegistry::new(bus.sender()));
    let dispatcher =
        NotificationDispatcher::new(config.homeassistant.clone(), config.mqtt.clone());
    let dispatcher_task = dispatcher.start(bus.subscribe());

    let keys = Arc::new(KeychainKeyProvider::new()?);
    let ingestor = Arc::new(RecordIngestor::new(layout.clone(), keys, registry.clone()));

    // Bootstrap scan before the live stream, on a blocking worker. A missing
    // key disables ingestion but keeps the process (and sinks) up.
    let bootstrap = {
        let ingestor = ingestor.clone();
        tokio::task::spawn_blocking(move || ingestor.bootstrap())
            .await
            .context("bootstrap scan panicked")?
    };
    let ingestion_enabled = match bootstrap {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "ingestion disabled until the record key is provisioned");
            false
        }
    };

    // One watcher stream, one ingest worker: the registry sees a single
    // writer, and bootstrap completed before the first live event.
    let mut watcher = StoreWatcher::new(layout.root());
    let ingest_task = if ingestion_enabled {
        let (tx, mut rx) = mpsc::channel::<PathBuf>(100);
        watcher.start(tx)?;
        let ingestor = ingestor.clone();
        Some(tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                let ingestor = ingestor.clone();
                let ingested =
                    tokio::task::spawn_blocking(move || ingestor.ingest_path(&path)).await;
                if ingested.is_err() {
                    warn!("ingest worker panicked on a change event");
                }
            }
        }))
    } else {
        None
    };

    info!(
        root = %layout.root().display(),
        devices = registry.len(),
        "findmy-bridge running"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    // Stop the watcher before dropping it, then close the event bus so the
    // dispatcher drains and disconnects its sinks.
    watcher.stop();
    if let Some(task) = ingest_task {
        task.abort();
    }
    drop(ingestor);
    drop(registry);
    drop(bus);
    let _ = dispatcher_task.await;

    info!("findmy-bridge stopped");
    Ok(())
}
