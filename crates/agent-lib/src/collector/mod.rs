//! Metric sources
//!
//! A `MetricSource` yields one snapshot per scheduler cycle. The stable
//! strategy reads a real-metric provider directly; the predictive strategy
//! feeds the provider's readings through a forecaster.

mod predictive;
mod procfs;
mod static_source;


pub use predictive::PredictiveSource;
pub use procfs::{parse_meminfo, parse_net_dev, parse_proc_stat, CpuTimes, ProcfsProvider};
pub use static_source::StaticSource;

use crate::config::{AgentConfig, CollectionMode};
use crate::error::{CollectionError, ConfigError};
use crate::forecaster::Forecaster;
use crate::models::{DiagnosticError, MetricSnapshot};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Real-metric provider injected into the sources
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Read the current metric values
    async fn collect(&self) -> Result<MetricSnapshot>;
}

/// Trait for snapshot-producing collection strategies
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Collect the snapshot for this cycle
    async fn collect(&self) -> std::result::Result<MetricSnapshot, CollectionError>;

    /// Take the diagnostics recorded by recovered failures since the last call
    fn drain_diagnostics(&self) -> Vec<DiagnosticError> {
        Vec::new()
    }

    /// Short strategy name for logs
    fn name(&self) -> &'static str;
}

/// Create the metric source selected by the configured mode
///
/// Predictive mode requires a forecaster; stable mode never uses one.
pub fn create_source(
    config: &AgentConfig,
    provider: Arc<dyn MetricsProvider>,
    forecaster: Option<Arc<dyn Forecaster>>,
) -> std::result::Result<Arc<dyn MetricSource>, ConfigError> {
    match config.mode() {
        CollectionMode::Stable => {
            tracing::info!("Stable mode, reading metrics directly from provider");
            Ok(Arc::new(StaticSource::new(provider)))
        }
        CollectionMode::Predictive(settings) => {
            let forecaster = forecaster.ok_or(ConfigError::MissingForecaster)?;
            tracing::info!(
                horizon_secs = settings.horizon.as_secs(),
                lookback = settings.lookback,
                forecast_timeout_ms = settings.timeout.as_millis() as u64,
                "Predictive mode, forecasting metrics from provider history"
            );
            let source =
                PredictiveSource::new(provider, forecaster, settings.horizon, settings.lookback)
                    .with_forecast_timeout(settings.timeout);
            Ok(Arc::new(source))
        }
    }
}
