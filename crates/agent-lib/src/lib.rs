//! Agent library for periodic telemetry collection and threshold alerting
//!
//! This crate provides the core functionality for:
//! - Metric collection, directly from procfs or through a forecaster
//! - Threshold evaluation into alerts
//! - The scheduling loop driving collect, evaluate and report cycles
//! - Reporters, health checks and observability

pub mod api;
pub mod collector;
pub mod config;
pub mod error;
pub mod forecaster;
pub mod health;
pub mod models;
pub mod observability;
pub mod policy;
pub mod reporter;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use config::{AgentConfig, AgentSettings, CollectionMode, Mode};
pub use error::{CollectionError, ConfigError, ForecastError, SchedulerError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthReporter, HealthResponse,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{AgentMetrics, MetricsReporter, StructuredLogger};
pub use policy::ThresholdPolicy;
pub use scheduler::{Scheduler, SchedulerBuilder, SchedulerState};
