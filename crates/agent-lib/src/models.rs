//! Core data models for the pulse agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Conventional metric names produced by the bundled providers
pub mod metric_names {
    pub const CPU: &str = "cpu";
    pub const MEMORY: &str = "memory";
    pub const TRAFFIC: &str = "traffic";
}

/// A single point-in-time set of named metric values
///
/// Snapshots are immutable once built. Forecasted snapshots carry a
/// confidence in `[0, 1]`; observed ones carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    timestamp: DateTime<Utc>,
    metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
}

impl MetricSnapshot {
    pub fn new(timestamp: DateTime<Utc>, metrics: BTreeMap<String, f64>) -> Self {
        Self {
            timestamp,
            metrics,
            confidence: None,
        }
    }

    /// Build an observed snapshot from `(name, value)` pairs stamped with the current time
    pub fn now<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self::new(
            Utc::now(),
            values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )
    }

    /// Return a copy of this snapshot marked with a forecast confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// True for snapshots produced by a forecaster (including degraded ones)
    pub fn is_forecast(&self) -> bool {
        self.confidence.is_some()
    }
}

/// Comparison operator of a threshold; the alert fires when
/// `observed <op> limit` holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">", alias = "gt")]
    GreaterThan,
    #[serde(rename = "<", alias = "lt")]
    LessThan,
    #[serde(rename = ">=", alias = "gte")]
    GreaterOrEqual,
    #[serde(rename = "<=", alias = "lte")]
    LessOrEqual,
}

impl Comparison {
    /// NaN never violates
    pub fn is_violated(&self, observed: f64, limit: f64) -> bool {
        match self {
            Comparison::GreaterThan => observed > limit,
            Comparison::LessThan => observed < limit,
            Comparison::GreaterOrEqual => observed >= limit,
            Comparison::LessOrEqual => observed <= limit,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::LessThan => "<",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule comparing one metric to a limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThreshold {
    pub metric: String,
    pub op: Comparison,
    pub limit: f64,
    #[serde(default = "default_severity")]
    pub severity: Severity,
}

fn default_severity() -> Severity {
    Severity::Warning
}

impl AlertThreshold {
    pub fn new(metric: impl Into<String>, op: Comparison, limit: f64, severity: Severity) -> Self {
        Self {
            metric: metric.into(),
            op,
            limit,
            severity,
        }
    }
}

/// A threshold violation observed on one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub metric: String,
    pub observed: f64,
    pub limit: f64,
    pub op: Comparison,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    /// Confidence of the snapshot the alert was raised on; set for predictive alerts
    pub confidence: Option<f64>,
}

impl Alert {
    pub fn is_predictive(&self) -> bool {
        self.confidence.is_some()
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.2} {} {:.2}",
            self.metric, self.observed, self.op, self.limit
        )
    }
}

/// Classification of a recovered per-cycle failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    CollectionTimeout,
    SourceUnavailable,
    ForecastDegraded,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::CollectionTimeout => "collection_timeout",
            DiagnosticKind::SourceUnavailable => "source_unavailable",
            DiagnosticKind::ForecastDegraded => "forecast_degraded",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recovered error surfaced through the reporter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticError {
    pub kind: DiagnosticKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticError {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Everything a reporter can be asked to render
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    Snapshot(MetricSnapshot),
    Alert(Alert),
    Diagnostic(DiagnosticError),
}
