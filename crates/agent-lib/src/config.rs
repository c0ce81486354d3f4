//! Agent configuration
//!
//! `AgentSettings` is the raw, deserializable form read from a config file
//! and `PULSE_*` environment variables. `AgentConfig` is the validated,
//! immutable view the rest of the agent is wired from.

use crate::error::ConfigError;
use crate::models::{AlertThreshold, Comparison, Severity};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "PULSE";

/// Longest accepted forecast horizon (30 days)
pub const MAX_FORECAST_HORIZON_SECS: u64 = 30 * 24 * 60 * 60;

/// Collection strategy requested by the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Stable,
    Predictive,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Stable => "stable",
            Mode::Predictive => "predictive",
        }
    }
}

/// Raw agent settings
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    #[serde(default)]
    pub mode: Mode,

    /// Collection interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Upper bound for one collection in milliseconds
    #[serde(default = "default_collection_timeout_ms")]
    pub collection_timeout_ms: u64,

    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<AlertThreshold>,

    /// How far ahead the forecaster predicts (predictive mode only)
    #[serde(default)]
    pub forecast_horizon_secs: Option<u64>,

    /// Upper bound for one forecaster call in milliseconds
    #[serde(default = "default_forecast_timeout_ms")]
    pub forecast_timeout_ms: u64,

    /// Remote forecaster URL; the local trend forecaster is used when unset
    #[serde(default)]
    pub forecaster_endpoint: Option<String>,

    /// Number of real snapshots handed to the forecaster
    #[serde(default = "default_lookback")]
    pub lookback: usize,

    /// Node name used in structured logs
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Root of the proc filesystem read by the system provider
    #[serde(default = "default_procfs_root")]
    pub procfs_root: String,
}

fn default_interval_ms() -> u64 {
    60_000
}

fn default_collection_timeout_ms() -> u64 {
    5_000
}

fn default_forecast_timeout_ms() -> u64 {
    3_000
}

fn default_thresholds() -> Vec<AlertThreshold> {
    vec![AlertThreshold::new(
        "cpu",
        Comparison::GreaterThan,
        80.0,
        Severity::Warning,
    )]
}

fn default_lookback() -> usize {
    10
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_procfs_root() -> String {
    "/proc".to_string()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            interval_ms: default_interval_ms(),
            collection_timeout_ms: default_collection_timeout_ms(),
            thresholds: default_thresholds(),
            forecast_horizon_secs: None,
            forecast_timeout_ms: default_forecast_timeout_ms(),
            forecaster_endpoint: None,
            lookback: default_lookback(),
            node_name: default_node_name(),
            api_port: default_api_port(),
            procfs_root: default_procfs_root(),
        }
    }
}

impl AgentSettings {
    /// Load settings from an optional config file overlaid with `PULSE_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Forecaster options, present only in predictive mode
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSettings {
    pub horizon: Duration,
    pub lookback: usize,
    pub timeout: Duration,
    pub endpoint: Option<Url>,
}

/// Validated collection mode
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionMode {
    Stable,
    Predictive(ForecastSettings),
}

impl CollectionMode {
    pub fn mode(&self) -> Mode {
        match self {
            CollectionMode::Stable => Mode::Stable,
            CollectionMode::Predictive(_) => Mode::Predictive,
        }
    }
}

/// Immutable, validated agent configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    mode: CollectionMode,
    interval: Duration,
    collection_timeout: Duration,
    thresholds: Vec<AlertThreshold>,
}

impl AgentConfig {
    /// Validate raw settings
    pub fn from_settings(settings: &AgentSettings) -> Result<Self, ConfigError> {
        if settings.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if settings.collection_timeout_ms == 0 {
            return Err(ConfigError::InvalidCollectionTimeout);
        }
        validate_thresholds(&settings.thresholds)?;

        let mode = match settings.mode {
            Mode::Stable => {
                if settings.forecast_horizon_secs.is_some()
                    || settings.forecaster_endpoint.is_some()
                {
                    warn!("Forecaster settings are ignored in stable mode");
                }
                CollectionMode::Stable
            }
            Mode::Predictive => CollectionMode::Predictive(forecast_settings(settings)?),
        };

        Ok(Self {
            mode,
            interval: Duration::from_millis(settings.interval_ms),
            collection_timeout: Duration::from_millis(settings.collection_timeout_ms),
            thresholds: settings.thresholds.clone(),
        })
    }

    pub fn mode(&self) -> &CollectionMode {
        &self.mode
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn collection_timeout(&self) -> Duration {
        self.collection_timeout
    }

    pub fn thresholds(&self) -> &[AlertThreshold] {
        &self.thresholds
    }

    pub fn forecast(&self) -> Option<&ForecastSettings> {
        match &self.mode {
            CollectionMode::Stable => None,
            CollectionMode::Predictive(forecast) => Some(forecast),
        }
    }
}

fn validate_thresholds(thresholds: &[AlertThreshold]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for threshold in thresholds {
        if threshold.metric.trim().is_empty() {
            return Err(ConfigError::InvalidThreshold {
                metric: threshold.metric.clone(),
                reason: "metric name must not be empty".to_string(),
            });
        }
        if !threshold.limit.is_finite() {
            return Err(ConfigError::InvalidThreshold {
                metric: threshold.metric.clone(),
                reason: "limit must be a finite number".to_string(),
            });
        }
        if !seen.insert(threshold.metric.as_str()) {
            return Err(ConfigError::DuplicateThreshold(threshold.metric.clone()));
        }
    }
    Ok(())
}

fn forecast_settings(settings: &AgentSettings) -> Result<ForecastSettings, ConfigError> {
    let horizon_secs = settings
        .forecast_horizon_secs
        .ok_or(ConfigError::MissingForecastHorizon)?;
    if horizon_secs == 0 || horizon_secs > MAX_FORECAST_HORIZON_SECS {
        return Err(ConfigError::InvalidForecastHorizon {
            max: MAX_FORECAST_HORIZON_SECS,
        });
    }
    // The forecast shares the collection budget with the provider call
    if settings.forecast_timeout_ms == 0
        || settings.forecast_timeout_ms >= settings.collection_timeout_ms
    {
        return Err(ConfigError::InvalidForecastTimeout);
    }
    if settings.lookback == 0 {
        return Err(ConfigError::InvalidLookback);
    }

    let endpoint = settings
        .forecaster_endpoint
        .as_deref()
        .map(parse_endpoint)
        .transpose()?;

    Ok(ForecastSettings {
        horizon: Duration::from_secs(horizon_secs),
        lookback: settings.lookback,
        timeout: Duration::from_millis(settings.forecast_timeout_ms),
        endpoint,
    })
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: format!("unsupported scheme {}", other),
        }),
    }
}
