//! Component health for the pulse agent
//!
//! Tracks collector, forecaster and scheduler state for the liveness and
//! readiness endpoints. The registry is fed from report events, so health
//! follows what the scheduler actually observed.

use crate::models::{DiagnosticKind, ReportEvent};
use crate::reporter::Reporter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still producing output, but through a fallback path
    Degraded,
    Unhealthy,
}

/// Latest known state of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            updated_at: Utc::now(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of the liveness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across all components; empty means healthy
    pub fn overall(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .fold(ComponentStatus::Healthy, |worst, status| match (worst, status) {
                (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                    ComponentStatus::Unhealthy
                }
                (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                    ComponentStatus::Degraded
                }
                _ => ComponentStatus::Healthy,
            })
    }
}

/// Body of the readiness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const COLLECTOR: &str = "collector";
    pub const FORECASTER: &str = "forecaster";
    pub const SCHEDULER: &str = "scheduler";
}

/// Shared health state, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::overall(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let status = self.health().await.status;

        let reason = if !ready {
            Some("Agent not yet initialized")
        } else if status == ComponentStatus::Unhealthy {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

/// Reporter that folds scheduler events into component health
#[derive(Debug, Clone)]
pub struct HealthReporter {
    registry: HealthRegistry,
}

impl HealthReporter {
    pub fn new(registry: HealthRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Reporter for HealthReporter {
    async fn report(&self, event: &ReportEvent) -> anyhow::Result<()> {
        match event {
            ReportEvent::Snapshot(snapshot) => {
                self.registry.set_healthy(components::COLLECTOR).await;
                if snapshot.confidence().is_some_and(|c| c > 0.0) {
                    self.registry.set_healthy(components::FORECASTER).await;
                }
            }
            ReportEvent::Diagnostic(diagnostic) => {
                let component = match diagnostic.kind {
                    DiagnosticKind::ForecastDegraded => components::FORECASTER,
                    DiagnosticKind::CollectionTimeout | DiagnosticKind::SourceUnavailable => {
                        components::COLLECTOR
                    }
                };
                self.registry
                    .set_degraded(component, diagnostic.to_string())
                    .await;
            }
            ReportEvent::Alert(_) => {}
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "health"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiagnosticError, MetricSnapshot};

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_overall_status_is_worst_component() {
        let registry = HealthRegistry::new();
        registry.register(components::COLLECTOR).await;
        registry.register(components::FORECASTER).await;

        registry.set_degraded(components::FORECASTER, "fallback").await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry.set_unhealthy(components::COLLECTOR, "stopped").await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_readiness_transitions() {
        let registry = HealthRegistry::new();
        registry.register(components::SCHEDULER).await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);

        registry.set_unhealthy(components::SCHEDULER, "stopped").await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Critical component unhealthy"));
    }

    #[tokio::test]
    async fn test_health_reporter_tracks_collector_and_forecaster() {
        let registry = HealthRegistry::new();
        let reporter = HealthReporter::new(registry.clone());

        reporter
            .report(&ReportEvent::Diagnostic(DiagnosticError::new(
                DiagnosticKind::CollectionTimeout,
                "collection timed out",
            )))
            .await
            .unwrap();
        let health = registry.health().await;
        assert_eq!(
            health.components[components::COLLECTOR].status,
            ComponentStatus::Degraded
        );

        reporter
            .report(&ReportEvent::Diagnostic(DiagnosticError::new(
                DiagnosticKind::ForecastDegraded,
                "model offline",
            )))
            .await
            .unwrap();
        let degraded = MetricSnapshot::now([("cpu", 10.0)]).with_confidence(0.0);
        reporter.report(&ReportEvent::Snapshot(degraded)).await.unwrap();

        let health = registry.health().await;
        assert_eq!(
            health.components[components::COLLECTOR].status,
            ComponentStatus::Healthy
        );
        assert_eq!(
            health.components[components::FORECASTER].status,
            ComponentStatus::Degraded
        );

        let forecast = MetricSnapshot::now([("cpu", 10.0)]).with_confidence(0.8);
        reporter.report(&ReportEvent::Snapshot(forecast)).await.unwrap();
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }
}
