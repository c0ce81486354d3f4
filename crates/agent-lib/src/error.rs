//! Error taxonomy for the agent core

use crate::models::{DiagnosticError, DiagnosticKind};
use std::time::Duration;
use thiserror::Error;

/// Fatal configuration errors raised while building an `AgentConfig`
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("interval must be greater than 0")]
    InvalidInterval,
    #[error("collection_timeout must be greater than 0")]
    InvalidCollectionTimeout,
    #[error("predictive mode requires forecast_horizon_secs")]
    MissingForecastHorizon,
    #[error("forecast_horizon_secs must be between 1 and {max}")]
    InvalidForecastHorizon { max: u64 },
    #[error("forecast_timeout_ms must be greater than 0 and below collection_timeout_ms")]
    InvalidForecastTimeout,
    #[error("lookback must be at least 1")]
    InvalidLookback,
    #[error("invalid forecaster_endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("duplicate threshold for metric {0}")]
    DuplicateThreshold(String),
    #[error("invalid threshold for metric {metric:?}: {reason}")]
    InvalidThreshold { metric: String, reason: String },
    #[error("predictive mode requires a forecaster")]
    MissingForecaster,
}

/// Per-cycle collection failures; the cycle is skipped and reported
#[derive(Debug, Clone, Error)]
pub enum CollectionError {
    #[error("collection exceeded timeout of {0:?}")]
    Timeout(Duration),
    #[error("metric source unavailable: {0}")]
    SourceUnavailable(String),
}

impl CollectionError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            CollectionError::Timeout(_) => DiagnosticKind::CollectionTimeout,
            CollectionError::SourceUnavailable(_) => DiagnosticKind::SourceUnavailable,
        }
    }

    pub fn to_diagnostic(&self) -> DiagnosticError {
        DiagnosticError::new(self.kind(), self.to_string())
    }
}

/// Forecaster failures; recovered by degrading to the latest real snapshot
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("insufficient history: {have} samples, need {need}")]
    InsufficientHistory { have: usize, need: usize },
    #[error("forecaster request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("forecaster returned status {0}")]
    Status(u16),
    #[error("forecast horizon {0:?} is out of range")]
    HorizonOutOfRange(Duration),
    #[error("forecaster did not answer within {0:?}")]
    Timeout(Duration),
    #[error("forecaster returned confidence {0} outside [0, 1]")]
    InvalidConfidence(f64),
    #[error("forecaster failed: {0}")]
    Other(String),
}

/// Scheduler lifecycle misuse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,
    #[error("scheduler has been stopped")]
    Stopped,
}
