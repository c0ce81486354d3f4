//! Result reporting
//!
//! Reporters render snapshots, alerts and diagnostics. Failures stay at the
//! reporter boundary: callers log them and carry on.

mod console;

pub use console::ConsoleReporter;

use crate::models::ReportEvent;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Trait for event sinks
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, event: &ReportEvent) -> anyhow::Result<()>;

    /// Short sink name for logs
    fn name(&self) -> &'static str {
        "reporter"
    }
}

/// Broadcasts every event to several reporters
///
/// A failing reporter is logged and skipped; the remaining reporters still
/// receive the event.
#[derive(Default, Clone)]
pub struct FanoutReporter {
    reporters: Vec<Arc<dyn Reporter>>,
}

impl FanoutReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

#[async_trait]
impl Reporter for FanoutReporter {
    async fn report(&self, event: &ReportEvent) -> anyhow::Result<()> {
        for reporter in &self.reporters {
            if let Err(e) = reporter.report(event).await {
                warn!(reporter = reporter.name(), error = %e, "Reporter failed");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fanout"
    }
}
