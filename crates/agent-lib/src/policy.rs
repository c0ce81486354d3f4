//! Threshold evaluation
//!
//! Compares a snapshot against the configured thresholds and produces the
//! resulting alerts in threshold declaration order.

use crate::models::{Alert, AlertThreshold, MetricSnapshot};

/// Evaluate a snapshot against thresholds
///
/// Thresholds whose metric is absent from the snapshot are skipped.
/// Deterministic and side-effect free.
pub fn evaluate(snapshot: &MetricSnapshot, thresholds: &[AlertThreshold]) -> Vec<Alert> {
    thresholds
        .iter()
        .filter_map(|threshold| {
            let observed = snapshot.get(&threshold.metric)?;
            if !threshold.op.is_violated(observed, threshold.limit) {
                return None;
            }
            Some(Alert {
                metric: threshold.metric.clone(),
                observed,
                limit: threshold.limit,
                op: threshold.op,
                severity: threshold.severity,
                timestamp: snapshot.timestamp(),
                confidence: snapshot.confidence(),
            })
        })
        .collect()
}

/// Owns the configured thresholds for the scheduler
#[derive(Debug, Clone, Default)]
pub struct ThresholdPolicy {
    thresholds: Vec<AlertThreshold>,
}

impl ThresholdPolicy {
    pub fn new(thresholds: Vec<AlertThreshold>) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &[AlertThreshold] {
        &self.thresholds
    }

    pub fn evaluate(&self, snapshot: &MetricSnapshot) -> Vec<Alert> {
        evaluate(snapshot, &self.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comparison, Severity};

    fn cpu_over_80() -> AlertThreshold {
        AlertThreshold::new("cpu", Comparison::GreaterThan, 80.0, Severity::Warning)
    }

    #[test]
    fn test_strictly_greater_boundary() {
        let thresholds = vec![cpu_over_80()];

        let alerts = evaluate(&MetricSnapshot::now([("cpu", 81.0)]), &thresholds);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, "cpu");
        assert_eq!(alerts[0].observed, 81.0);
        assert_eq!(alerts[0].limit, 80.0);
        assert_eq!(alerts[0].severity, Severity::Warning);

        let alerts = evaluate(&MetricSnapshot::now([("cpu", 80.0)]), &thresholds);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_missing_metric_is_skipped() {
        let thresholds = vec![
            AlertThreshold::new("disk", Comparison::GreaterThan, 0.0, Severity::Critical),
            cpu_over_80(),
        ];

        let alerts = evaluate(&MetricSnapshot::now([("cpu", 99.0)]), &thresholds);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric, "cpu");

        let alerts = evaluate(&MetricSnapshot::now([("memory", 99.0)]), &thresholds);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_alerts_follow_declaration_order() {
        let thresholds = vec![
            AlertThreshold::new("traffic", Comparison::GreaterOrEqual, 500.0, Severity::Info),
            AlertThreshold::new("memory", Comparison::LessThan, 10.0, Severity::Critical),
            cpu_over_80(),
        ];
        let snapshot = MetricSnapshot::now([("cpu", 95.0), ("memory", 5.0), ("traffic", 500.0)]);

        let alerts = evaluate(&snapshot, &thresholds);
        let metrics: Vec<_> = alerts.iter().map(|a| a.metric.as_str()).collect();
        assert_eq!(metrics, vec!["traffic", "memory", "cpu"]);
        assert_eq!(alerts[1].severity, Severity::Critical);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let policy = ThresholdPolicy::new(vec![
            cpu_over_80(),
            AlertThreshold::new("memory", Comparison::LessOrEqual, 50.0, Severity::Info),
        ]);
        let snapshot = MetricSnapshot::now([("cpu", 90.0), ("memory", 50.0)]);

        let first = policy.evaluate(&snapshot);
        let second = policy.evaluate(&snapshot);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|a| a.timestamp == snapshot.timestamp()));
    }

    #[test]
    fn test_alert_carries_forecast_confidence() {
        let snapshot = MetricSnapshot::now([("cpu", 90.0)]).with_confidence(0.7);

        let alerts = evaluate(&snapshot, &[cpu_over_80()]);
        assert_eq!(alerts[0].confidence, Some(0.7));
        assert!(alerts[0].is_predictive());
    }

    #[test]
    fn test_nan_observation_never_alerts() {
        let snapshot = MetricSnapshot::now([("cpu", f64::NAN)]);
        assert!(evaluate(&snapshot, &[cpu_over_80()]).is_empty());
    }
}
