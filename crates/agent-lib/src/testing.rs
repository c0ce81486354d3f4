//! Test doubles shared by the unit tests

use crate::collector::MetricsProvider;
use crate::error::ForecastError;
use crate::forecaster::{Forecast, Forecaster};
use crate::models::{Alert, DiagnosticError, MetricSnapshot, ReportEvent};
use crate::reporter::Reporter;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Provider returning the same values on every call, optionally after a delay
pub(crate) struct ConstantProvider {
    values: Vec<(&'static str, f64)>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ConstantProvider {
    pub(crate) fn new(values: &[(&'static str, f64)]) -> Self {
        Self {
            values: values.to_vec(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsProvider for ConstantProvider {
    async fn collect(&self) -> anyhow::Result<MetricSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(MetricSnapshot::now(self.values.iter().copied()))
    }
}

/// Provider replaying a fixed script of readings, failing once exhausted
pub(crate) struct ScriptedProvider {
    script: Mutex<VecDeque<Result<MetricSnapshot, String>>>,
}

impl ScriptedProvider {
    pub(crate) fn new(script: Vec<Result<MetricSnapshot, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl MetricsProvider for ScriptedProvider {
    async fn collect(&self) -> anyhow::Result<MetricSnapshot> {
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(snapshot)) => Ok(snapshot),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("script exhausted")),
        }
    }
}

/// Provider that panics on its first call and reads normally afterwards
#[derive(Default)]
pub(crate) struct PanicOnceProvider {
    calls: AtomicUsize,
}

impl PanicOnceProvider {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsProvider for PanicOnceProvider {
    async fn collect(&self) -> anyhow::Result<MetricSnapshot> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("provider blew up");
        }
        Ok(MetricSnapshot::now([("cpu", 10.0)]))
    }
}

/// Forecaster that always fails
pub(crate) struct FailingForecaster;

#[async_trait]
impl Forecaster for FailingForecaster {
    async fn predict(
        &self,
        _history: &[MetricSnapshot],
        _horizon: Duration,
    ) -> Result<Forecast, ForecastError> {
        Err(ForecastError::Other("model offline".to_string()))
    }
}

/// Forecaster returning fixed values and recording the window sizes it saw
pub(crate) struct FixedForecaster {
    values: Vec<(&'static str, f64)>,
    confidence: f64,
    delay: Duration,
    windows: Mutex<Vec<usize>>,
}

impl FixedForecaster {
    pub(crate) fn new(values: &[(&'static str, f64)], confidence: f64) -> Self {
        Self {
            values: values.to_vec(),
            confidence,
            delay: Duration::ZERO,
            windows: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn windows(&self) -> Vec<usize> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forecaster for FixedForecaster {
    async fn predict(
        &self,
        history: &[MetricSnapshot],
        _horizon: Duration,
    ) -> Result<Forecast, ForecastError> {
        self.windows.lock().unwrap().push(history.len());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Forecast {
            snapshot: MetricSnapshot::now(self.values.iter().copied()),
            confidence: self.confidence,
        })
    }
}

/// Reporter keeping every event it receives
#[derive(Default)]
pub(crate) struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub(crate) fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub(crate) fn snapshots(&self) -> Vec<MetricSnapshot> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Snapshot(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn alerts(&self) -> Vec<Alert> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Alert(a) => Some(a),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn diagnostics(&self) -> Vec<DiagnosticError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Diagnostic(d) => Some(d),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn report(&self, event: &ReportEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Reporter that always fails
pub(crate) struct FailingReporter;

#[async_trait]
impl Reporter for FailingReporter {
    async fn report(&self, _event: &ReportEvent) -> anyhow::Result<()> {
        anyhow::bail!("sink closed")
    }
}
