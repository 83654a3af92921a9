//! In-process observability.
//!
//! - `metrics`: named registry, typed handles, Prometheus text rendering
//! - `sampler`: host CPU/memory gauges
//! - `score`: externally supplied model score gauge

pub mod metrics;
pub mod sampler;
pub mod score;

pub use metrics::{MetricKind, ProxyMetrics, Registry, Snapshot};
pub use sampler::{HostSource, HostReading, ProcessReading, SysinfoHost, SystemSampler};
pub use score::{FileScoreSource, ScoreGauge, ScoreSource};
