//! linewatch - Main Entry Point
//!
//! Runs the acquisition loop unattended until interrupted.

use anyhow::Context;
use linewatch::{
    client::EndpointConnector,
    config::AppConfig,
    ingest::{ConnectionManager, PollLoop, Shutdown},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let (config, config_path) = AppConfig::discover().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&config)?;

    match &config_path {
        Some(path) => tracing::info!("Loaded configuration from {:?}", path),
        None => tracing::info!("No configuration file found, using defaults"),
    }
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        "Starting linewatch for {} (endpoint {})",
        config.browse_path().join("/"),
        config.server.endpoint
    );

    let shutdown = Shutdown::new();
    shutdown
        .install_interrupt_handler()
        .context("Failed to install interrupt handler")?;

    let connector = EndpointConnector::from_config(&config);
    let connections =
        ConnectionManager::open(&config, &connector).context("Failed to open connections")?;

    let summary = PollLoop::new(config, connections, shutdown)
        .run()
        .context("Acquisition stopped")?;

    tracing::info!(
        "Shut down after {:.1}s{}: {}",
        summary.elapsed.as_secs_f64(),
        if summary.cancelled { " (interrupted)" } else { "" },
        summary.stats
    );
    Ok(())
}

/// Console logging, plus a daily rolling file when a log directory is set
fn init_logging(config: &AppConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.default_filter))
        .context("Invalid log filter")?;

    let (file_layer, guard) = match &config.logging.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {:?}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, &config.logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
