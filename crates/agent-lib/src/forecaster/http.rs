//! Remote forecaster client
//!
//! Posts the lookback window to a forecasting service as JSON and reads back
//! the predicted metrics with a confidence score.

use super::{forecast_timestamp, Forecast, Forecaster, DEFAULT_FORECAST_TIMEOUT};
use crate::error::ForecastError;
use crate::models::MetricSnapshot;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Serialize)]
struct ForecastRequest<'a> {
    horizon_secs: u64,
    history: &'a [MetricSnapshot],
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    metrics: BTreeMap<String, f64>,
    confidence: f64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Forecaster backed by an HTTP forecasting service
pub struct HttpForecaster {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpForecaster {
    pub fn new(endpoint: Url) -> Result<Self, ForecastError> {
        Self::with_timeout(endpoint, DEFAULT_FORECAST_TIMEOUT)
    }

    pub fn with_timeout(endpoint: Url, timeout: Duration) -> Result<Self, ForecastError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Forecaster for HttpForecaster {
    async fn predict(
        &self,
        history: &[MetricSnapshot],
        horizon: Duration,
    ) -> Result<Forecast, ForecastError> {
        let request = ForecastRequest {
            horizon_secs: horizon.as_secs(),
            history,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ForecastError::Status(status.as_u16()));
        }

        let body: ForecastResponse = response.json().await?;
        if !(0.0..=1.0).contains(&body.confidence) {
            return Err(ForecastError::InvalidConfidence(body.confidence));
        }

        let timestamp = match body.timestamp {
            Some(ts) => ts,
            None => {
                let base = history.last().map(|s| s.timestamp()).unwrap_or_else(Utc::now);
                forecast_timestamp(base, horizon)?
            }
        };

        debug!(
            endpoint = %self.endpoint,
            metrics = body.metrics.len(),
            confidence = body.confidence,
            "Received forecast"
        );

        Ok(Forecast {
            snapshot: MetricSnapshot::new(timestamp, body.metrics).with_confidence(body.confidence),
            confidence: body.confidence,
        })
    }
}
