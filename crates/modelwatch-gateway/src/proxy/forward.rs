//! Per-request forwarding state machine.
//!
//! RECEIVED -> VALIDATING -> FORWARDING -> COMPLETED | FAILED
//!
//! - A body that does not parse fails before any metric is touched.
//! - A parsed body bumps the request counter exactly once, then one
//!   outbound call is made under `timeout`.
//! - Only completed calls are folded into the duration distributions; failed
//!   and timed-out calls bump the failure counter instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::Instrument;

use modelwatch_core::error::{ModelWatchError, Result};
use modelwatch_core::protocol::parse_predict_request;

use crate::backend::{BackendError, InferenceBackend};
use crate::obs::ProxyMetrics;

/// Result of one forwarded request, folded into the registry right away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestOutcome {
    pub success: bool,
    pub duration: Duration,
}

impl RequestOutcome {
    fn record(&self, metrics: &ProxyMetrics) {
        if self.success {
            metrics.inference_duration.observe_duration(self.duration);
            metrics.request_latency.observe_duration(self.duration);
        } else {
            metrics.failures.inc();
        }
    }
}

pub struct Proxy {
    backend: Arc<dyn InferenceBackend>,
    metrics: ProxyMetrics,
    timeout: Duration,
    seq: AtomicU64,
}

impl Proxy {
    pub fn new(backend: Arc<dyn InferenceBackend>, metrics: ProxyMetrics, timeout: Duration) -> Self {
        Self {
            backend,
            metrics,
            timeout,
            seq: AtomicU64::new(1),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate `body`, forward it unchanged, and return the backend's body.
    pub async fn handle(&self, body: Bytes) -> Result<Bytes> {
        let req = match parse_predict_request(&body) {
            Ok(req) => req,
            Err(e) => {
                tracing::debug!(error = %e, len = body.len(), "rejected predict body");
                return Err(e);
            }
        };

        let request_id = self.seq.fetch_add(1, Ordering::Relaxed);
        let span = tracing::info_span!(
            "predict",
            request_id,
            shape = req.shape(),
            rows = req.rows()
        );

        self.metrics.requests.inc();
        self.forward(body).instrument(span).await
    }

    async fn forward(&self, body: Bytes) -> Result<Bytes> {
        let started = Instant::now();
        let res = tokio::time::timeout(self.timeout, self.backend.invoke(body)).await;
        let duration = started.elapsed();

        let res = match res {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(BackendError::Timeout)) | Err(_) => Err(ModelWatchError::BackendTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
            Ok(Err(e)) => Err(ModelWatchError::BackendUnavailable(e.to_string())),
        };

        let outcome = RequestOutcome {
            success: res.is_ok(),
            duration,
        };
        outcome.record(&self.metrics);

        match &res {
            Ok(bytes) => {
                tracing::debug!(elapsed_ms = duration.as_millis() as u64, len = bytes.len(), "prediction served");
            }
            Err(e) => {
                tracing::error!(error = %e, elapsed_ms = duration.as_millis() as u64, "prediction failed");
            }
        }
        res
    }
}
