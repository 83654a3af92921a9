//! Named metrics registry for the proxy.
//!
//! Series are registered once at startup and never removed. Counters and
//! gauges are lock-free `f64` atomics; histograms and summaries keep their
//! count, sum, and buckets behind a per-series mutex so an observation is
//! applied as one unit. There is no registry-wide lock on the mutation path:
//! name lookups go through a sharded `DashMap`, and the registration-order
//! list is only read by `snapshot()`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use modelwatch_core::error::{ModelWatchError, Result};

/// Default latency buckets in seconds (the conventional Prometheus set).
pub const DEFAULT_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl MetricKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
            MetricKind::Summary => "summary",
        }
    }
}

/// `f64` stored as raw bits.
#[derive(Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Release);
    }

    fn add(&self, delta: f64) {
        // fetch_update retries on contention, so no increment is lost.
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            });
    }
}

struct DistState {
    count: u64,
    sum: f64,
    /// Non-cumulative per-bucket counts; empty for summaries.
    buckets: Vec<u64>,
}

enum SeriesValue {
    Scalar(AtomicF64),
    Dist {
        bounds: Vec<f64>,
        state: Mutex<DistState>,
    },
}

/// One registered series.
pub struct MetricSeries {
    name: String,
    kind: MetricKind,
    help: String,
    value: SeriesValue,
}

impl MetricSeries {
    fn new(name: &str, kind: MetricKind, help: &str, bounds: &[f64]) -> Self {
        let value = match kind {
            MetricKind::Counter | MetricKind::Gauge => SeriesValue::Scalar(AtomicF64::default()),
            MetricKind::Histogram | MetricKind::Summary => {
                let bounds = if kind == MetricKind::Histogram { bounds.to_vec() } else { Vec::new() };
                SeriesValue::Dist {
                    state: Mutex::new(DistState {
                        count: 0,
                        sum: 0.0,
                        buckets: vec![0; bounds.len()],
                    }),
                    bounds,
                }
            }
        };
        Self {
            name: name.to_string(),
            kind,
            help: help.to_string(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    fn kind_err(&self, msg: &str) -> ModelWatchError {
        ModelWatchError::MetricKind {
            name: self.name.clone(),
            msg: msg.to_string(),
        }
    }

    fn increment(&self, delta: f64) -> Result<()> {
        if self.kind != MetricKind::Counter {
            return Err(self.kind_err("increment requires a counter"));
        }
        if !delta.is_finite() || delta < 0.0 {
            return Err(self.kind_err("counter delta must be finite and >= 0"));
        }
        if let SeriesValue::Scalar(v) = &self.value {
            v.add(delta);
        }
        Ok(())
    }

    fn set(&self, value: f64) -> Result<()> {
        if self.kind != MetricKind::Gauge {
            return Err(self.kind_err("set requires a gauge"));
        }
        if let SeriesValue::Scalar(v) = &self.value {
            v.store(value);
        }
        Ok(())
    }

    fn observe(&self, value: f64) -> Result<()> {
        let SeriesValue::Dist { bounds, state } = &self.value else {
            return Err(self.kind_err("observe requires a histogram or summary"));
        };
        if value.is_nan() {
            return Err(self.kind_err("observation must not be NaN"));
        }
        let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
        st.count += 1;
        st.sum += value;
        if let Some(i) = bounds.iter().position(|&b| value <= b) {
            st.buckets[i] += 1;
        }
        Ok(())
    }

    fn snapshot(&self) -> SeriesSnapshot {
        let value = match &self.value {
            SeriesValue::Scalar(v) => SnapshotValue::Scalar(v.load()),
            SeriesValue::Dist { bounds, state } => {
                let st = state.lock().unwrap_or_else(PoisonError::into_inner);
                if self.kind == MetricKind::Histogram {
                    let mut acc = 0;
                    let buckets = bounds
                        .iter()
                        .zip(st.buckets.iter())
                        .map(|(&le, &n)| {
                            acc += n;
                            (le, acc)
                        })
                        .collect();
                    SnapshotValue::Histogram {
                        buckets,
                        sum: st.sum,
                        count: st.count,
                    }
                } else {
                    SnapshotValue::Summary {
                        sum: st.sum,
                        count: st.count,
                    }
                }
            }
        };
        SeriesSnapshot {
            name: self.name.clone(),
            kind: self.kind,
            help: self.help.clone(),
            value,
        }
    }
}

/// Counter handle.
#[derive(Clone)]
pub struct Counter(Arc<MetricSeries>);

impl Counter {
    /// Increment by 1.
    pub fn inc(&self) {
        let _ = self.0.increment(1.0);
    }

    /// Increment by an arbitrary non-negative value.
    pub fn inc_by(&self, delta: f64) -> Result<()> {
        self.0.increment(delta)
    }

    pub fn get(&self) -> f64 {
        match &self.0.value {
            SeriesValue::Scalar(v) => v.load(),
            SeriesValue::Dist { .. } => 0.0,
        }
    }
}

/// Gauge handle.
#[derive(Clone)]
pub struct Gauge(Arc<MetricSeries>);

impl Gauge {
    pub fn set(&self, value: f64) {
        let _ = self.0.set(value);
    }

    pub fn get(&self) -> f64 {
        match &self.0.value {
            SeriesValue::Scalar(v) => v.load(),
            SeriesValue::Dist { .. } => 0.0,
        }
    }
}

/// Histogram or summary handle.
#[derive(Clone)]
pub struct Distribution(Arc<MetricSeries>);

impl Distribution {
    pub fn observe(&self, value: f64) {
        let _ = self.0.observe(value);
    }

    /// Observe a duration in seconds.
    pub fn observe_duration(&self, d: Duration) {
        self.observe(d.as_secs_f64());
    }

    /// (count, sum)
    pub fn totals(&self) -> (u64, f64) {
        match self.0.snapshot().value {
            SnapshotValue::Histogram { count, sum, .. } | SnapshotValue::Summary { count, sum } => {
                (count, sum)
            }
            SnapshotValue::Scalar(_) => (0, 0.0),
        }
    }
}

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

#[derive(Default)]
pub struct Registry {
    by_name: DashMap<String, Arc<MetricSeries>>,
    order: RwLock<Vec<Arc<MetricSeries>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, series: MetricSeries) -> Result<Arc<MetricSeries>> {
        if !valid_name(&series.name) {
            return Err(ModelWatchError::MetricKind {
                name: series.name,
                msg: "invalid metric name".into(),
            });
        }
        match self.by_name.entry(series.name.clone()) {
            Entry::Occupied(e) => Err(ModelWatchError::DuplicateMetric(e.key().clone())),
            Entry::Vacant(slot) => {
                let series = Arc::new(series);
                slot.insert(Arc::clone(&series));
                self.order
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(Arc::clone(&series));
                Ok(series)
            }
        }
    }

    /// Register a series. Histograms get `DEFAULT_BUCKETS`.
    pub fn register(&self, name: &str, kind: MetricKind, help: &str) -> Result<()> {
        self.insert(MetricSeries::new(name, kind, help, &DEFAULT_BUCKETS))
            .map(|_| ())
    }

    pub fn counter(&self, name: &str, help: &str) -> Result<Counter> {
        self.insert(MetricSeries::new(name, MetricKind::Counter, help, &[]))
            .map(Counter)
    }

    pub fn gauge(&self, name: &str, help: &str) -> Result<Gauge> {
        self.insert(MetricSeries::new(name, MetricKind::Gauge, help, &[]))
            .map(Gauge)
    }

    /// Register a histogram with explicit upper bounds (must be increasing).
    pub fn histogram(&self, name: &str, help: &str, bounds: &[f64]) -> Result<Distribution> {
        if bounds.windows(2).any(|w| w[0] >= w[1]) || bounds.iter().any(|b| !b.is_finite()) {
            return Err(ModelWatchError::MetricKind {
                name: name.to_string(),
                msg: "histogram bounds must be finite and strictly increasing".into(),
            });
        }
        self.insert(MetricSeries::new(name, MetricKind::Histogram, help, bounds))
            .map(Distribution)
    }

    pub fn summary(&self, name: &str, help: &str) -> Result<Distribution> {
        self.insert(MetricSeries::new(name, MetricKind::Summary, help, &[]))
            .map(Distribution)
    }

    fn lookup(&self, name: &str) -> Result<Arc<MetricSeries>> {
        self.by_name
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| ModelWatchError::UnknownMetric(name.to_string()))
    }

    pub fn increment(&self, name: &str, delta: f64) -> Result<()> {
        self.lookup(name)?.increment(delta)
    }

    pub fn set(&self, name: &str, value: f64) -> Result<()> {
        self.lookup(name)?.set(value)
    }

    pub fn observe(&self, name: &str, value: f64) -> Result<()> {
        self.lookup(name)?.observe(value)
    }

    /// Registration-ordered copy of every series.
    pub fn snapshot(&self) -> Snapshot {
        let order = self.order.read().unwrap_or_else(PoisonError::into_inner);
        Snapshot {
            series: order.iter().map(|s| s.snapshot()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotValue {
    Scalar(f64),
    /// `buckets` holds cumulative `(upper_bound, count)` pairs, `+Inf` excluded.
    Histogram {
        buckets: Vec<(f64, u64)>,
        sum: f64,
        count: u64,
    },
    Summary {
        sum: f64,
        count: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSnapshot {
    pub name: String,
    pub kind: MetricKind,
    pub help: String,
    pub value: SnapshotValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub series: Vec<SeriesSnapshot>,
}

/// Helper to escape help text.
fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Prometheus float spelling.
fn fmt_f64(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v == f64::INFINITY {
        "+Inf".into()
    } else if v == f64::NEG_INFINITY {
        "-Inf".into()
    } else {
        format!("{v}")
    }
}

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<&SeriesSnapshot> {
        self.series.iter().find(|s| s.name == name)
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for s in &self.series {
            let name = &s.name;
            let _ = writeln!(out, "# HELP {} {}", name, escape_help(&s.help));
            let _ = writeln!(out, "# TYPE {} {}", name, s.kind.as_str());
            match &s.value {
                SnapshotValue::Scalar(v) => {
                    let _ = writeln!(out, "{} {}", name, fmt_f64(*v));
                }
                SnapshotValue::Histogram { buckets, sum, count } => {
                    for (le, n) in buckets {
                        let _ = writeln!(out, "{}_bucket{{le=\"{}\"}} {}", name, fmt_f64(*le), n);
                    }
                    let _ = writeln!(out, "{}_bucket{{le=\"+Inf\"}} {}", name, count);
                    let _ = writeln!(out, "{}_sum {}", name, fmt_f64(*sum));
                    let _ = writeln!(out, "{}_count {}", name, count);
                }
                SnapshotValue::Summary { sum, count } => {
                    let _ = writeln!(out, "{}_sum {}", name, fmt_f64(*sum));
                    let _ = writeln!(out, "{}_count {}", name, count);
                }
            }
        }
        out
    }
}

/// Handles the proxy touches on every request or scrape.
#[derive(Clone)]
pub struct ProxyMetrics {
    pub requests: Counter,
    pub failures: Counter,
    pub inference_duration: Distribution,
    pub request_latency: Distribution,
    pub cpu_percent: Gauge,
    pub memory_used_mb: Gauge,
    pub process_resident_bytes: Gauge,
    pub process_virtual_bytes: Gauge,
    pub process_start_time: Gauge,
    pub score: Option<Gauge>,
}

impl ProxyMetrics {
    /// Register the proxy's series on `registry`. Fails on any name clash.
    pub fn register(registry: &Registry, with_score: bool) -> Result<Self> {
        let requests = registry.counter(
            "model_request_total",
            "Total number of model prediction requests",
        )?;
        let failures = registry.counter(
            "model_request_failures_total",
            "Total number of prediction requests the backend failed to serve",
        )?;
        let inference_duration = registry.summary(
            "model_inference_duration_seconds",
            "Duration of model inference",
        )?;
        let request_latency = registry.histogram(
            "model_request_latency_seconds",
            "Latency of model requests",
            &DEFAULT_BUCKETS,
        )?;
        let cpu_percent = registry.gauge("system_cpu_percent", "CPU usage percentage")?;
        let memory_used_mb = registry.gauge("system_memory_usage_mb", "Memory usage in megabytes")?;
        let process_resident_bytes = registry.gauge(
            "process_resident_memory_bytes",
            "Resident memory size of the proxy process in bytes",
        )?;
        let process_virtual_bytes = registry.gauge(
            "process_virtual_memory_bytes",
            "Virtual memory size of the proxy process in bytes",
        )?;
        let process_start_time = registry.gauge(
            "process_start_time_seconds",
            "Start time of the proxy process since unix epoch in seconds",
        )?;
        let score = if with_score {
            Some(registry.gauge("model_f1_score", "Current F1 Score of the ML model")?)
        } else {
            None
        };

        Ok(Self {
            requests,
            failures,
            inference_duration,
            request_latency,
            cpu_percent,
            memory_used_mb,
            process_resident_bytes,
            process_virtual_bytes,
            process_start_time,
            score,
        })
    }
}
