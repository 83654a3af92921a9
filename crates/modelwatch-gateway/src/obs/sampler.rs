//! Host resource sampler.
//!
//! Reads CPU utilization, used host memory, and this process's memory and
//! start time through a `HostSource`, then writes the gauges. A failed read
//! leaves the gauges at their previous values; sampling never fails a scrape.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use sysinfo::{Pid, System};
use tokio::task::JoinHandle;

use modelwatch_core::error::{ModelWatchError, Result};

use super::metrics::{Gauge, ProxyMetrics};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq)]
pub struct HostReading {
    pub cpu_percent: f64,
    pub memory_used_mb: f64,
    /// `None` when the process entry could not be read.
    pub process: Option<ProcessReading>,
}

/// Figures for the proxy's own process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReading {
    pub resident_bytes: f64,
    pub virtual_bytes: f64,
    /// Seconds since the Unix epoch.
    pub start_time_seconds: f64,
}

/// Source of host statistics.
pub trait HostSource: Send {
    fn read(&mut self) -> Result<HostReading>;
}

/// `sysinfo`-backed host source.
///
/// CPU usage is computed from the delta between two refreshes, so the first
/// reading after startup may be 0.
pub struct SysinfoHost {
    system: System,
    pid: Option<Pid>,
}

impl SysinfoHost {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!(error = %e, "current pid unavailable, process gauges disabled");
                None
            }
        };
        Self { system, pid }
    }
}

impl Default for SysinfoHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSource for SysinfoHost {
    fn read(&mut self) -> Result<HostReading> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ModelWatchError::SamplerRead("platform not supported by sysinfo".into()));
        }

        self.system.refresh_cpu();
        self.system.refresh_memory();

        if self.system.cpus().is_empty() {
            return Err(ModelWatchError::SamplerRead("no cpu information".into()));
        }
        if self.system.total_memory() == 0 {
            return Err(ModelWatchError::SamplerRead("no memory information".into()));
        }

        let process = self.pid.and_then(|pid| {
            if !self.system.refresh_process(pid) {
                return None;
            }
            self.system.process(pid).map(|p| ProcessReading {
                resident_bytes: p.memory() as f64,
                virtual_bytes: p.virtual_memory() as f64,
                start_time_seconds: p.start_time() as f64,
            })
        });

        Ok(HostReading {
            cpu_percent: f64::from(self.system.global_cpu_info().cpu_usage()),
            memory_used_mb: self.system.used_memory() as f64 / BYTES_PER_MB,
            process,
        })
    }
}

pub struct SystemSampler {
    host: Mutex<Box<dyn HostSource>>,
    cpu_percent: Gauge,
    memory_used_mb: Gauge,
    process_resident_bytes: Gauge,
    process_virtual_bytes: Gauge,
    process_start_time: Gauge,
}

impl SystemSampler {
    pub fn new(host: Box<dyn HostSource>, metrics: &ProxyMetrics) -> Self {
        Self {
            host: Mutex::new(host),
            cpu_percent: metrics.cpu_percent.clone(),
            memory_used_mb: metrics.memory_used_mb.clone(),
            process_resident_bytes: metrics.process_resident_bytes.clone(),
            process_virtual_bytes: metrics.process_virtual_bytes.clone(),
            process_start_time: metrics.process_start_time.clone(),
        }
    }

    /// Read the host source and update gauges. Returns whether the read succeeded.
    ///
    /// Blocking; call from `spawn_blocking` on async paths.
    pub fn refresh(&self) -> bool {
        let reading = {
            let mut host = self.host.lock().unwrap_or_else(PoisonError::into_inner);
            host.read()
        };

        match reading {
            Ok(r) => {
                self.cpu_percent.set(r.cpu_percent);
                self.memory_used_mb.set(r.memory_used_mb);
                if let Some(p) = r.process {
                    self.process_resident_bytes.set(p.resident_bytes);
                    self.process_virtual_bytes.set(p.virtual_bytes);
                    self.process_start_time.set(p.start_time_seconds);
                }
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "host sample failed, keeping previous gauge values");
                false
            }
        }
    }

    /// Refresh on the blocking pool. A panicking source is logged, not propagated.
    pub async fn refresh_async(self: &Arc<Self>) -> bool {
        let sampler = Arc::clone(self);
        match tokio::task::spawn_blocking(move || sampler.refresh()).await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::error!(error = %e, "host sample task failed");
                false
            }
        }
    }

    /// Refresh on a fixed interval in the background.
    pub fn spawn_interval(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.refresh_async().await;
            }
        })
    }
}
