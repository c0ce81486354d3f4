//! Forecast-backed metric source
//!
//! Keeps a bounded window of real snapshots and asks the forecaster for the
//! snapshot `horizon` ahead. When the forecaster fails the latest real
//! snapshot is returned with confidence 0 and a diagnostic is recorded.

use super::{MetricSource, MetricsProvider};
use crate::error::{CollectionError, ForecastError};
use crate::forecaster::{Forecaster, DEFAULT_FORECAST_TIMEOUT};
use crate::models::{DiagnosticError, DiagnosticKind, MetricSnapshot};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Source producing forecasts from the provider's recent readings
pub struct PredictiveSource {
    provider: Arc<dyn MetricsProvider>,
    forecaster: Arc<dyn Forecaster>,
    horizon: Duration,
    lookback: usize,
    forecast_timeout: Duration,
    history: Mutex<VecDeque<MetricSnapshot>>,
    diagnostics: Mutex<Vec<DiagnosticError>>,
}

impl PredictiveSource {
    pub fn new(
        provider: Arc<dyn MetricsProvider>,
        forecaster: Arc<dyn Forecaster>,
        horizon: Duration,
        lookback: usize,
    ) -> Self {
        let lookback = lookback.max(1);
        Self {
            provider,
            forecaster,
            horizon,
            lookback,
            forecast_timeout: DEFAULT_FORECAST_TIMEOUT,
            history: Mutex::new(VecDeque::with_capacity(lookback)),
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    /// Bound each forecaster call; an elapsed call degrades like a failed one
    pub fn with_forecast_timeout(mut self, timeout: Duration) -> Self {
        self.forecast_timeout = timeout;
        self
    }

    /// Number of real snapshots currently in the lookback window
    pub fn history_len(&self) -> usize {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Append a real snapshot and return the window, oldest first
    fn record(&self, snapshot: MetricSnapshot) -> Vec<MetricSnapshot> {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push_back(snapshot);
        while history.len() > self.lookback {
            history.pop_front();
        }
        history.iter().cloned().collect()
    }

    fn degrade(&self, latest: &MetricSnapshot, error: ForecastError) -> MetricSnapshot {
        warn!(error = %error, "Forecast failed, falling back to latest observed snapshot");
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DiagnosticError::new(
                DiagnosticKind::ForecastDegraded,
                error.to_string(),
            ));
        latest.clone().with_confidence(0.0)
    }
}

#[async_trait]
impl MetricSource for PredictiveSource {
    async fn collect(&self) -> Result<MetricSnapshot, CollectionError> {
        let observed = self
            .provider
            .collect()
            .await
            .map_err(|e| CollectionError::SourceUnavailable(format!("{:#}", e)))?;

        let window = self.record(observed.clone());

        let prediction = self.forecaster.predict(&window, self.horizon);
        let forecast = match tokio::time::timeout(self.forecast_timeout, prediction).await {
            Ok(Ok(forecast)) => forecast,
            Ok(Err(e)) => return Ok(self.degrade(&observed, e)),
            Err(_) => {
                let error = ForecastError::Timeout(self.forecast_timeout);
                return Ok(self.degrade(&observed, error));
            }
        };

        if !(0.0..=1.0).contains(&forecast.confidence) {
            return Ok(self.degrade(
                &observed,
                ForecastError::InvalidConfidence(forecast.confidence),
            ));
        }

        debug!(
            samples = window.len(),
            confidence = forecast.confidence,
            "Forecast produced"
        );
        Ok(forecast.snapshot.with_confidence(forecast.confidence))
    }

    fn drain_diagnostics(&self) -> Vec<DiagnosticError> {
        std::mem::take(&mut *self.diagnostics.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn name(&self) -> &'static str {
        "predictive"
    }
}
