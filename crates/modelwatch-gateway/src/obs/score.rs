//! Model score gauge fed by an external source.
//!
//! The proxy never computes a score itself. Whoever evaluates the served
//! model supplies a `ScoreSource`; without one the gauge is not registered.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use modelwatch_core::error::{ModelWatchError, Result};

use super::metrics::Gauge;

pub trait ScoreSource: Send + Sync {
    fn current_score(&self) -> Result<f64>;
}

/// Reads a single float from a text file on every call.
pub struct FileScoreSource {
    path: PathBuf,
}

impl FileScoreSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScoreSource for FileScoreSource {
    fn current_score(&self) -> Result<f64> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            ModelWatchError::SamplerRead(format!("read score {}: {e}", self.path.display()))
        })?;
        let v: f64 = raw.trim().parse().map_err(|e| {
            ModelWatchError::SamplerRead(format!("parse score {}: {e}", self.path.display()))
        })?;
        if !v.is_finite() {
            return Err(ModelWatchError::SamplerRead("score is not finite".into()));
        }
        Ok(v)
    }
}

pub struct ScoreGauge {
    source: Arc<dyn ScoreSource>,
    gauge: Gauge,
}

impl ScoreGauge {
    pub fn new(source: Arc<dyn ScoreSource>, gauge: Gauge) -> Self {
        Self { source, gauge }
    }

    /// Same contract as the host sampler: stale value on failure.
    pub fn refresh(&self) -> bool {
        match self.source.current_score() {
            Ok(v) => {
                self.gauge.set(v);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "score read failed, keeping previous value");
                false
            }
        }
    }
}
