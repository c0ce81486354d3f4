//! Pulse Agent - telemetry collection and threshold alerting
//!
//! Collects host metrics on a fixed interval, optionally forecasts them,
//! evaluates alert thresholds and reports results to the console, the
//! structured log and the Prometheus endpoint.

use anyhow::{Context, Result};
use clap::Parser;
use pulse_lib::{
    api::{self, AppState},
    collector::{create_source, ProcfsProvider},
    forecaster::create_forecaster,
    health::{components, HealthRegistry, HealthReporter},
    observability::{AgentMetrics, MetricsReporter, StructuredLogger},
    reporter::{ConsoleReporter, FanoutReporter},
    scheduler::watch,
    AgentConfig, AgentSettings, CollectionMode, SchedulerBuilder,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Telemetry collection and threshold alerting agent
#[derive(Parser, Debug)]
#[command(name = "pulse-agent", version, about)]
struct Args {
    /// Path to a TOML, YAML or JSON config file
    #[arg(short, long, env = "PULSE_CONFIG")]
    config: Option<PathBuf>,

    /// Do not print events to stdout
    #[arg(long)]
    no_console: bool,

    /// Colorize console output
    #[arg(long)]
    color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // JSON logs go to stderr, stdout belongs to the console reporter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let settings =
        AgentSettings::load(args.config.as_deref()).context("Failed to load configuration")?;
    let config = AgentConfig::from_settings(&settings).context("Invalid configuration")?;
    let mode = config.mode().mode();

    let logger = StructuredLogger::new(&settings.node_name);
    logger.log_startup(AGENT_VERSION, mode.as_str(), config.interval().as_millis());

    let health_registry = HealthRegistry::new();
    health_registry.register(components::COLLECTOR).await;
    health_registry.register(components::SCHEDULER).await;
    if let CollectionMode::Predictive(_) = config.mode() {
        health_registry.register(components::FORECASTER).await;
    }

    let metrics = AgentMetrics::new();
    metrics.set_mode(mode.as_str());

    let provider = Arc::new(ProcfsProvider::with_root(&settings.procfs_root));
    let forecaster = config
        .forecast()
        .map(create_forecaster)
        .transpose()
        .context("Failed to create forecaster")?;
    let source = create_source(&config, provider, forecaster)?;

    let mut reporter = FanoutReporter::new()
        .with(Arc::new(logger.clone()))
        .with(Arc::new(MetricsReporter::new(metrics.clone())))
        .with(Arc::new(HealthReporter::new(health_registry.clone())));
    if !args.no_console {
        let console =
            ConsoleReporter::stdout(args.color).with_thresholds(config.thresholds().to_vec());
        reporter = reporter.with(Arc::new(console));
    }

    let scheduler = Arc::new(
        SchedulerBuilder::from_config(&config)
            .source(source)
            .reporter(Arc::new(reporter))
            .build()?,
    );
    let scheduler_handle = scheduler.start()?;
    let watcher = tokio::spawn(watch(
        scheduler.clone(),
        scheduler_handle,
        health_registry.clone(),
    ));

    let app_state = Arc::new(AppState::new(health_registry.clone(), metrics));
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(settings.api_port, app_state));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    health_registry.set_ready(false).await;
    health_registry
        .set_unhealthy(components::SCHEDULER, "shutting down")
        .await;
    scheduler.stop();
    if let Err(e) = watcher.await {
        warn!(error = %e, "Scheduler watcher ended abnormally");
    }
    api_handle.abort();

    info!("Shutdown complete");
    Ok(())
}
