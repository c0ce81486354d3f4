//! Forecasting collaborators
//!
//! A forecaster turns a window of observed snapshots into a predicted
//! snapshot some horizon ahead, along with a confidence score. The agent
//! ships a local least-squares trend forecaster and an HTTP client for a
//! remote forecasting service.

mod http;
mod trend;

pub use http::HttpForecaster;
pub use trend::{fit_line, LineFit, TrendForecaster, MIN_HISTORY};

use crate::config::ForecastSettings;
use crate::error::ForecastError;
use crate::models::MetricSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound for a single forecaster call
pub const DEFAULT_FORECAST_TIMEOUT: Duration = Duration::from_secs(3);

/// Predicted snapshot and the forecaster's confidence in it
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub snapshot: MetricSnapshot,
    pub confidence: f64,
}

/// Trait for forecasting implementations
#[async_trait]
pub trait Forecaster: Send + Sync {
    /// Predict the snapshot `horizon` past the newest entry of `history` (oldest first)
    async fn predict(
        &self,
        history: &[MetricSnapshot],
        horizon: Duration,
    ) -> Result<Forecast, ForecastError>;
}

/// Create the forecaster selected by the forecast settings
pub fn create_forecaster(
    settings: &ForecastSettings,
) -> Result<Arc<dyn Forecaster>, ForecastError> {
    match &settings.endpoint {
        Some(endpoint) => {
            tracing::info!(endpoint = %endpoint, "Using remote forecaster");
            Ok(Arc::new(HttpForecaster::with_timeout(
                endpoint.clone(),
                settings.timeout,
            )?))
        }
        None => {
            tracing::info!(lookback = settings.lookback, "Using local trend forecaster");
            Ok(Arc::new(TrendForecaster::new(settings.lookback)))
        }
    }
}

/// `base` shifted by `horizon`, or an error when the result is not a representable timestamp
pub(crate) fn forecast_timestamp(
    base: DateTime<Utc>,
    horizon: Duration,
) -> Result<DateTime<Utc>, ForecastError> {
    chrono::Duration::from_std(horizon)
        .ok()
        .and_then(|offset| base.checked_add_signed(offset))
        .ok_or(ForecastError::HorizonOutOfRange(horizon))
}
