//! Observability infrastructure for the pulse agent
//!
//! Provides:
//! - Prometheus metrics (cycle latency, alert and diagnostic counts, latest metric values)
//! - Structured JSON logging with tracing
//! - Reporter adapters feeding both from scheduler events

use crate::models::{Alert, DiagnosticError, MetricSnapshot, ReportEvent, Severity};
use crate::reporter::Reporter;
use async_trait::async_trait;
use prometheus::{
    register_gauge, register_gauge_vec, register_histogram, register_int_counter,
    register_int_counter_vec, Gauge, GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for cycle duration (in seconds)
const CYCLE_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct AgentMetricsInner {
    cycle_duration_seconds: Histogram,
    cycles_total: IntCounter,
    alerts_total: IntCounterVec,
    diagnostics_total: IntCounterVec,
    metric_value: GaugeVec,
    forecast_confidence: Gauge,
    mode_info: GaugeVec,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            cycle_duration_seconds: register_histogram!(
                "pulse_agent_cycle_duration_seconds",
                "Time spent in one collect, evaluate and report cycle",
                CYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_duration_seconds"),

            cycles_total: register_int_counter!(
                "pulse_agent_cycles_total",
                "Total number of scheduler cycles run"
            )
            .expect("Failed to register cycles_total"),

            alerts_total: register_int_counter_vec!(
                "pulse_agent_alerts_total",
                "Total number of threshold alerts raised",
                &["severity"]
            )
            .expect("Failed to register alerts_total"),

            diagnostics_total: register_int_counter_vec!(
                "pulse_agent_diagnostics_total",
                "Total number of recovered per-cycle failures",
                &["kind"]
            )
            .expect("Failed to register diagnostics_total"),

            metric_value: register_gauge_vec!(
                "pulse_agent_metric_value",
                "Latest value of each collected metric",
                &["metric", "source"]
            )
            .expect("Failed to register metric_value"),

            forecast_confidence: register_gauge!(
                "pulse_agent_forecast_confidence",
                "Confidence of the latest forecast snapshot"
            )
            .expect("Failed to register forecast_confidence"),

            mode_info: register_gauge_vec!(
                "pulse_agent_mode_info",
                "Collection mode the agent is running in",
                &["mode"]
            )
            .expect("Failed to register mode_info"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new)
    }

    /// Record one completed cycle and its duration
    pub fn observe_cycle(&self, duration_secs: f64) {
        self.inner().cycle_duration_seconds.observe(duration_secs);
        self.inner().cycles_total.inc();
    }

    pub fn inc_alerts(&self, severity: Severity) {
        self.inner()
            .alerts_total
            .with_label_values(&[severity.as_str()])
            .inc();
    }

    pub fn inc_diagnostics(&self, kind: &str) {
        self.inner().diagnostics_total.with_label_values(&[kind]).inc();
    }

    /// Publish the values of a snapshot, labelled as observed or forecast
    pub fn set_snapshot(&self, snapshot: &MetricSnapshot) {
        let source = if snapshot.is_forecast() {
            "forecast"
        } else {
            "observed"
        };
        for (name, value) in snapshot.metrics() {
            self.inner()
                .metric_value
                .with_label_values(&[name, source])
                .set(*value);
        }
        if let Some(confidence) = snapshot.confidence() {
            self.inner().forecast_confidence.set(confidence);
        }
    }

    /// Update collection mode info
    pub fn set_mode(&self, mode: &str) {
        self.inner().mode_info.reset();
        self.inner().mode_info.with_label_values(&[mode]).set(1.0);
    }
}

/// Reporter publishing events as Prometheus metrics
#[derive(Clone, Default)]
pub struct MetricsReporter {
    metrics: AgentMetrics,
}

impl MetricsReporter {
    pub fn new(metrics: AgentMetrics) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Reporter for MetricsReporter {
    async fn report(&self, event: &ReportEvent) -> anyhow::Result<()> {
        match event {
            ReportEvent::Snapshot(snapshot) => self.metrics.set_snapshot(snapshot),
            ReportEvent::Alert(alert) => self.metrics.inc_alerts(alert.severity),
            ReportEvent::Diagnostic(diagnostic) => {
                self.metrics.inc_diagnostics(diagnostic.kind.as_str())
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}

/// Structured logger for agent events
///
/// Provides consistent JSON-formatted logging for snapshots, alerts,
/// diagnostics and lifecycle events. Doubles as the log sink reporter.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    /// Log agent startup
    pub fn log_startup(&self, version: &str, mode: &str, interval_ms: u128) {
        info!(
            event = "agent_started",
            node = %self.node_name,
            agent_version = %version,
            mode = %mode,
            predictive = mode == "predictive",
            interval_ms = interval_ms as u64,
            "Pulse agent started"
        );
    }

    /// Log agent shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Pulse agent shutting down"
        );
    }

    pub fn log_snapshot(&self, snapshot: &MetricSnapshot) {
        info!(
            event = "snapshot_collected",
            node = %self.node_name,
            timestamp = %snapshot.timestamp(),
            metrics = ?snapshot.metrics(),
            confidence = ?snapshot.confidence(),
            "Snapshot collected"
        );
    }

    pub fn log_alert(&self, alert: &Alert) {
        match alert.severity {
            Severity::Critical => {
                warn!(
                    event = "alert_raised",
                    node = %self.node_name,
                    metric = %alert.metric,
                    observed = alert.observed,
                    op = %alert.op,
                    limit = alert.limit,
                    severity = %alert.severity,
                    predictive = alert.is_predictive(),
                    "Critical threshold alert"
                );
            }
            _ => {
                info!(
                    event = "alert_raised",
                    node = %self.node_name,
                    metric = %alert.metric,
                    observed = alert.observed,
                    op = %alert.op,
                    limit = alert.limit,
                    severity = %alert.severity,
                    predictive = alert.is_predictive(),
                    "Threshold alert"
                );
            }
        }
    }

    pub fn log_diagnostic(&self, diagnostic: &DiagnosticError) {
        warn!(
            event = "diagnostic",
            node = %self.node_name,
            kind = %diagnostic.kind,
            details = %diagnostic.message,
            "Cycle recovered from failure"
        );
    }
}

#[async_trait]
impl Reporter for StructuredLogger {
    async fn report(&self, event: &ReportEvent) -> anyhow::Result<()> {
        match event {
            ReportEvent::Snapshot(snapshot) => self.log_snapshot(snapshot),
            ReportEvent::Alert(alert) => self.log_alert(alert),
            ReportEvent::Diagnostic(diagnostic) => self.log_diagnostic(diagnostic),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comparison, DiagnosticKind};
    use prometheus::{Encoder, TextEncoder};

    fn gathered() -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_agent_metrics_creation() {
        let metrics = AgentMetrics::new();

        metrics.observe_cycle(0.002);
        metrics.inc_alerts(Severity::Warning);
        metrics.inc_diagnostics("collection_timeout");
        metrics.set_mode("stable");

        let text = gathered();
        assert!(text.contains("pulse_agent_cycles_total"));
        assert!(text.contains("pulse_agent_mode_info{mode=\"stable\"} 1"));
    }

    #[tokio::test]
    async fn test_metrics_reporter_publishes_snapshot_values() {
        let reporter = MetricsReporter::new(AgentMetrics::new());

        let forecast = MetricSnapshot::now([("reporter_test_metric", 42.5)]).with_confidence(0.75);
        reporter.report(&ReportEvent::Snapshot(forecast)).await.unwrap();
        reporter
            .report(&ReportEvent::Alert(Alert {
                metric: "reporter_test_metric".to_string(),
                observed: 42.5,
                limit: 40.0,
                op: Comparison::GreaterThan,
                severity: Severity::Critical,
                timestamp: chrono::Utc::now(),
                confidence: Some(0.75),
            }))
            .await
            .unwrap();
        reporter
            .report(&ReportEvent::Diagnostic(DiagnosticError::new(
                DiagnosticKind::ForecastDegraded,
                "offline",
            )))
            .await
            .unwrap();

        let text = gathered();
        assert!(text.contains(
            "pulse_agent_metric_value{metric=\"reporter_test_metric\",source=\"forecast\"} 42.5"
        ));
        assert!(text.contains("pulse_agent_alerts_total{severity=\"critical\"}"));
        assert!(text.contains("pulse_agent_diagnostics_total{kind=\"forecast_degraded\"}"));
    }

    #[tokio::test]
    async fn test_structured_logger_reports_every_event() {
        let logger = StructuredLogger::new("test-node");
        assert_eq!(logger.node_name, "test-node");

        let snapshot = MetricSnapshot::now([("cpu", 1.0)]);
        assert!(logger.report(&ReportEvent::Snapshot(snapshot)).await.is_ok());
        assert!(logger
            .report(&ReportEvent::Diagnostic(DiagnosticError::new(
                DiagnosticKind::SourceUnavailable,
                "gone"
            )))
            .await
            .is_ok());
    }
}
