//! Human-readable console output

use super::Reporter;
use crate::models::{Alert, AlertThreshold, DiagnosticError, MetricSnapshot, ReportEvent, Severity};
use crate::policy::ThresholdPolicy;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use colored::{Color, Colorize};
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Writes one line per event to a terminal or any other writer
pub struct ConsoleReporter {
    out: Mutex<Box<dyn Write + Send>>,
    color: bool,
    policy: Option<ThresholdPolicy>,
}

impl ConsoleReporter {
    pub fn new(out: Box<dyn Write + Send>, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            color,
            policy: None,
        }
    }

    /// Append an overall status to each snapshot line, `WARNING` when any
    /// of `thresholds` is violated and `OPTIMAL` otherwise
    pub fn with_thresholds(mut self, thresholds: Vec<AlertThreshold>) -> Self {
        self.policy = Some(ThresholdPolicy::new(thresholds));
        self
    }

    pub fn stdout(color: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), color)
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn format_snapshot(&self, snapshot: &MetricSnapshot) -> String {
        let values = snapshot
            .metrics()
            .iter()
            .map(|(name, value)| format!("{}={:.2}", name, value))
            .collect::<Vec<_>>()
            .join(" ");

        let label = match snapshot.confidence() {
            None => self.paint("HEALTH CHECK", Color::Green),
            Some(c) if c > 0.0 => format!(
                "{} (confidence {:.0}%)",
                self.paint("FORECAST", Color::Cyan),
                c * 100.0
            ),
            Some(_) => format!(
                "{} (forecast unavailable, observed values)",
                self.paint("FORECAST", Color::Yellow)
            ),
        };

        let mut line = format!("[{}] {} {}", stamp(snapshot.timestamp()), label, values);
        if let Some(policy) = &self.policy {
            let status = if policy.evaluate(snapshot).is_empty() {
                self.paint("OPTIMAL", Color::Green)
            } else {
                self.paint("WARNING", Color::Red)
            };
            line.push_str(&format!(" status={}", status));
        }
        line
    }

    fn format_alert(&self, alert: &Alert) -> String {
        let color = match alert.severity {
            Severity::Critical => Color::Red,
            Severity::Warning => Color::Yellow,
            Severity::Info => Color::Blue,
        };
        let label = if alert.is_predictive() {
            "PREDICTIVE ALERT"
        } else {
            "ALERT"
        };

        let mut line = format!(
            "[{}] {} [{}] {}",
            stamp(alert.timestamp),
            self.paint(label, color),
            alert.severity,
            alert
        );
        if let Some(c) = alert.confidence {
            line.push_str(&format!(" (confidence {:.0}%)", c * 100.0));
        }
        line
    }

    fn format_diagnostic(&self, diagnostic: &DiagnosticError) -> String {
        format!(
            "[{}] {} {}",
            stamp(diagnostic.timestamp),
            self.paint("DIAGNOSTIC", Color::Magenta),
            diagnostic
        )
    }
}

fn stamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl Reporter for ConsoleReporter {
    async fn report(&self, event: &ReportEvent) -> anyhow::Result<()> {
        let line = match event {
            ReportEvent::Snapshot(snapshot) => self.format_snapshot(snapshot),
            ReportEvent::Alert(alert) => self.format_alert(alert),
            ReportEvent::Diagnostic(diagnostic) => self.format_diagnostic(diagnostic),
        };

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
