//! Local trend forecaster
//!
//! Fits a least-squares line per metric over the lookback window and
//! extrapolates it to the requested horizon.

use super::{forecast_timestamp, Forecast, Forecaster};
use crate::error::ForecastError;
use crate::models::MetricSnapshot;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Minimum number of snapshots needed to fit a trend
pub const MIN_HISTORY: usize = 2;

/// Result of a simple linear regression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination in `[0, 1]`
    pub r_squared: f64,
}

impl LineFit {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Least-squares fit over `(x, y)` points
///
/// A flat series fits perfectly. Points sharing a single x value carry no
/// trend and fit with zero confidence.
pub fn fit_line(points: &[(f64, f64)]) -> Option<LineFit> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if sxx.abs() < f64::EPSILON {
        return Some(LineFit {
            slope: 0.0,
            intercept: mean_y,
            r_squared: 0.0,
        });
    }

    let slope = sxy / sxx;
    let r_squared = if syy.abs() < f64::EPSILON {
        1.0
    } else {
        ((sxy * sxy) / (sxx * syy)).clamp(0.0, 1.0)
    };

    Some(LineFit {
        slope,
        intercept: mean_y - slope * mean_x,
        r_squared,
    })
}

/// Forecaster extrapolating per-metric linear trends
pub struct TrendForecaster {
    lookback: usize,
}

impl TrendForecaster {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
        }
    }

    fn window_fill(&self, samples: usize) -> f64 {
        (samples as f64 / self.lookback as f64).min(1.0)
    }
}

#[async_trait]
impl Forecaster for TrendForecaster {
    async fn predict(
        &self,
        history: &[MetricSnapshot],
        horizon: Duration,
    ) -> Result<Forecast, ForecastError> {
        let latest = match history.last() {
            Some(latest) if history.len() >= MIN_HISTORY => latest,
            _ => {
                return Err(ForecastError::InsufficientHistory {
                    have: history.len(),
                    need: MIN_HISTORY,
                })
            }
        };

        let origin = history[0].timestamp();
        let seconds_since_origin =
            |s: &MetricSnapshot| (s.timestamp() - origin).num_milliseconds() as f64 / 1000.0;
        let target_x = seconds_since_origin(latest) + horizon.as_secs_f64();

        let mut predicted = BTreeMap::new();
        let mut fit_total = 0.0;
        for (name, &latest_value) in latest.metrics() {
            let points: Vec<(f64, f64)> = history
                .iter()
                .filter_map(|s| s.get(name).map(|v| (seconds_since_origin(s), v)))
                .collect();

            let (value, r_squared) = match fit_line(&points) {
                Some(fit) if points.len() >= MIN_HISTORY => (fit.at(target_x), fit.r_squared),
                _ => (latest_value, 0.0),
            };
            predicted.insert(name.clone(), value);
            fit_total += r_squared;
        }

        let mean_fit = if predicted.is_empty() {
            0.0
        } else {
            fit_total / predicted.len() as f64
        };
        let confidence = (mean_fit * self.window_fill(history.len())).clamp(0.0, 1.0);

        let timestamp = forecast_timestamp(latest.timestamp(), horizon)?;

        Ok(Forecast {
            snapshot: MetricSnapshot::new(timestamp, predicted).with_confidence(confidence),
            confidence,
        })
    }
}
