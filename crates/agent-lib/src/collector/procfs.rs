//! Host metrics from the proc filesystem
//!
//! Reads:
//! - stat for aggregate CPU busy percentage
//! - meminfo for memory used percentage
//! - net/dev for network throughput in bytes per second

use super::MetricsProvider;
use crate::models::{metric_names, MetricSnapshot};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tokio::fs;

/// Aggregate CPU jiffies from the first line of stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub idle: u64,
    pub total: u64,
}

impl CpuTimes {
    /// Busy percentage between two readings, or since boot without a previous one
    pub fn busy_percent_since(&self, previous: Option<&CpuTimes>) -> f64 {
        let (idle, total) = match previous {
            Some(prev) => (
                self.idle.saturating_sub(prev.idle),
                self.total.saturating_sub(prev.total),
            ),
            None => (self.idle, self.total),
        };

        if total == 0 {
            return 0.0;
        }
        (total.saturating_sub(idle) as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
    }
}

/// Parse the aggregate `cpu` line of stat
pub fn parse_proc_stat(content: &str) -> Result<CpuTimes> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .context("No aggregate cpu line")?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .context("Malformed cpu line")?;

    if fields.len() < 4 {
        anyhow::bail!("cpu line has {} fields, expected at least 4", fields.len());
    }

    // user nice system idle iowait irq softirq steal; guest time is already in user
    let total: u64 = fields.iter().take(8).sum();
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);

    Ok(CpuTimes { idle, total })
}

/// Parse meminfo and return the used memory percentage
pub fn parse_meminfo(content: &str) -> Result<f64> {
    let mut values: HashMap<&str, u64> = HashMap::new();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if let (Some(key), Some(value)) = (parts.next(), parts.next()) {
            if let Ok(value) = value.parse::<u64>() {
                values.insert(key.trim_end_matches(':'), value);
            }
        }
    }

    let total = *values.get("MemTotal").context("MemTotal missing")?;
    if total == 0 {
        anyhow::bail!("MemTotal is zero");
    }

    let available = match values.get("MemAvailable") {
        Some(available) => *available,
        None => ["MemFree", "Buffers", "Cached"]
            .iter()
            .filter_map(|k| values.get(k))
            .sum::<u64>(),
    };

    Ok((total.saturating_sub(available) as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
}

/// Parse net/dev and return total received plus transmitted bytes across non-loopback interfaces
pub fn parse_net_dev(content: &str) -> Result<u64> {
    let mut total = 0u64;
    for line in content.lines().skip(2) {
        let Some((iface, counters)) = line.split_once(':') else {
            continue;
        };
        if iface.trim() == "lo" {
            continue;
        }

        let fields: Vec<&str> = counters.split_whitespace().collect();
        if fields.len() < 9 {
            anyhow::bail!("Malformed net/dev line for {}", iface.trim());
        }
        let rx: u64 = fields[0].parse().context("Malformed rx bytes")?;
        let tx: u64 = fields[8].parse().context("Malformed tx bytes")?;
        total = total.saturating_add(rx).saturating_add(tx);
    }
    Ok(total)
}

#[derive(Debug, Default)]
struct PreviousReading {
    cpu: Option<CpuTimes>,
    network: Option<(Instant, u64)>,
}

/// Provider reading host metrics from procfs
pub struct ProcfsProvider {
    root: PathBuf,
    previous: Mutex<PreviousReading>,
}

impl ProcfsProvider {
    /// Create a provider for the host's `/proc`
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Create a provider with a custom proc root (for testing)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            previous: Mutex::new(PreviousReading::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read(&self, relative: &str) -> Result<String> {
        let path = self.root.join(relative);
        fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

impl Default for ProcfsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsProvider for ProcfsProvider {
    async fn collect(&self) -> Result<MetricSnapshot> {
        let cpu_times = parse_proc_stat(&self.read("stat").await?)?;
        let memory = parse_meminfo(&self.read("meminfo").await?)?;
        let network_bytes = parse_net_dev(&self.read("net/dev").await?)?;
        let now = Instant::now();

        let mut metrics = BTreeMap::new();
        metrics.insert(metric_names::MEMORY.to_string(), memory);

        let mut previous = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        metrics.insert(
            metric_names::CPU.to_string(),
            cpu_times.busy_percent_since(previous.cpu.as_ref()),
        );

        if let Some((at, bytes)) = previous.network {
            let elapsed = now.duration_since(at).as_secs_f64();
            if elapsed > 0.0 {
                let rate = network_bytes.saturating_sub(bytes) as f64 / elapsed;
                metrics.insert(metric_names::TRAFFIC.to_string(), rate);
            }
        }

        previous.cpu = Some(cpu_times);
        previous.network = Some((now, network_bytes));

        Ok(MetricSnapshot::new(Utc::now(), metrics))
    }
}
