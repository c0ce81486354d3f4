//! Collection scheduler
//!
//! Drives the collect, evaluate and report cycle on a fixed interval. Cycles
//! run strictly one after another; a slow cycle defers the next tick instead
//! of overlapping with it. Each cycle runs on its own task so a panic inside
//! a collaborator costs one cycle, not the loop.

use crate::collector::MetricSource;
use crate::config::AgentConfig;
use crate::error::{CollectionError, SchedulerError};
use crate::health::{components, HealthRegistry};
use crate::models::{AlertThreshold, ReportEvent};
use crate::observability::AgentMetrics;
use crate::policy::ThresholdPolicy;
use crate::reporter::Reporter;
use anyhow::{bail, Result};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle of a scheduler; `Stopped` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Periodic collect, evaluate and report loop
pub struct Scheduler {
    source: Arc<dyn MetricSource>,
    policy: ThresholdPolicy,
    reporter: Arc<dyn Reporter>,
    interval: Duration,
    collection_timeout: Duration,
    state: AtomicU8,
    shutdown: Notify,
    metrics: AgentMetrics,
}

impl Scheduler {
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    pub fn state(&self) -> SchedulerState {
        match self.state.load(Ordering::SeqCst) {
            IDLE => SchedulerState::Idle,
            RUNNING => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RUNNING
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the loop on a new task
    ///
    /// The first cycle runs immediately, then one per interval until
    /// [`Scheduler::stop`] is called. A scheduler can be started only once.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>, SchedulerError> {
        self.state
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|current| match current {
                RUNNING => SchedulerError::AlreadyRunning,
                _ => SchedulerError::Stopped,
            })?;

        info!(
            source = self.source.name(),
            interval_ms = self.interval.as_millis() as u64,
            thresholds = self.policy.thresholds().len(),
            "Starting scheduler"
        );

        Ok(tokio::spawn(Arc::clone(self).run()))
    }

    /// Stop the loop
    ///
    /// No new cycle starts once this returns; a cycle already in flight may
    /// finish. Safe to call repeatedly, from any thread, and before `start`.
    pub fn stop(&self) {
        let previous = self.state.swap(STOPPED, Ordering::SeqCst);
        if previous == RUNNING {
            info!("Stopping scheduler");
        }
        self.shutdown.notify_waiters();
    }

    async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            if !self.is_running() {
                break;
            }
            let scheduler = Arc::clone(&self);
            if let Err(e) = tokio::spawn(async move { scheduler.run_cycle().await }).await {
                error!(error = %e, "Cycle aborted, continuing with the next one");
            }

            let notified = self.shutdown.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_running() {
                break;
            }

            tokio::select! {
                biased;
                _ = &mut notified => break,
                _ = ticker.tick() => {}
            }
        }

        info!("Scheduler stopped");
    }

    /// Run a single cycle
    ///
    /// Collection failures are reported as diagnostics; nothing here stops
    /// the loop.
    pub async fn run_cycle(&self) {
        let started = Instant::now();

        let collected = match tokio::time::timeout(self.collection_timeout, self.source.collect())
            .await
        {
            Ok(result) => result,
            Err(_) => Err(CollectionError::Timeout(self.collection_timeout)),
        };

        for diagnostic in self.source.drain_diagnostics() {
            self.report(ReportEvent::Diagnostic(diagnostic)).await;
        }

        match collected {
            Ok(snapshot) => {
                let alerts = self.policy.evaluate(&snapshot);
                self.report(ReportEvent::Snapshot(snapshot)).await;
                for alert in alerts {
                    self.report(ReportEvent::Alert(alert)).await;
                }
            }
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "Collection failed, skipping cycle");
                self.report(ReportEvent::Diagnostic(e.to_diagnostic())).await;
            }
        }

        let elapsed = started.elapsed();
        self.metrics.observe_cycle(elapsed.as_secs_f64());
        debug!(elapsed_ms = elapsed.as_millis() as u64, "Cycle complete");
    }

    async fn report(&self, event: ReportEvent) {
        if let Err(e) = self.reporter.report(&event).await {
            warn!(reporter = self.reporter.name(), error = %e, "Failed to report event");
        }
    }
}

/// Supervise the loop task returned by [`Scheduler::start`]
///
/// A loop that ends while the scheduler was not stopped, or whose task
/// failed, marks the scheduler component unhealthy and stops the scheduler.
pub async fn watch(scheduler: Arc<Scheduler>, handle: JoinHandle<()>, health: HealthRegistry) {
    let outcome = handle.await;
    let reason = match outcome {
        Ok(()) if scheduler.state() == SchedulerState::Stopped => return,
        Ok(()) => "scheduler loop exited unexpectedly".to_string(),
        Err(e) if e.is_panic() => "scheduler task panicked".to_string(),
        Err(e) => format!("scheduler task failed: {}", e),
    };

    error!(reason = %reason, "Scheduler is no longer running");
    scheduler.stop();
    health.set_unhealthy(components::SCHEDULER, reason).await;
}

/// Builder for creating a scheduler
pub struct SchedulerBuilder {
    source: Option<Arc<dyn MetricSource>>,
    reporter: Option<Arc<dyn Reporter>>,
    thresholds: Vec<AlertThreshold>,
    interval: Duration,
    collection_timeout: Duration,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            reporter: None,
            thresholds: Vec::new(),
            interval: Duration::from_secs(60),
            collection_timeout: Duration::from_secs(5),
        }
    }

    /// Take interval, collection timeout and thresholds from a validated config
    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new()
            .interval(config.interval())
            .collection_timeout(config.collection_timeout())
            .thresholds(config.thresholds().to_vec())
    }

    pub fn source(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn thresholds(mut self, thresholds: Vec<AlertThreshold>) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn collection_timeout(mut self, timeout: Duration) -> Self {
        self.collection_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Scheduler> {
        let source = self
            .source
            .ok_or_else(|| anyhow::anyhow!("Metric source is required"))?;
        let reporter = self
            .reporter
            .ok_or_else(|| anyhow::anyhow!("Reporter is required"))?;
        if self.interval.is_zero() {
            bail!("Interval must be greater than 0");
        }
        if self.collection_timeout.is_zero() {
            bail!("Collection timeout must be greater than 0");
        }

        Ok(Scheduler {
            source,
            policy: ThresholdPolicy::new(self.thresholds),
            reporter,
            interval: self.interval,
            collection_timeout: self.collection_timeout,
            state: AtomicU8::new(IDLE),
            shutdown: Notify::new(),
            metrics: AgentMetrics::new(),
        })
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
