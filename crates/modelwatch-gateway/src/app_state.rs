//! Shared application state for the modelwatch proxy.
//!
//! Built once at startup and cloned into every handler. Construction fails
//! (instead of panicking) on metric name clashes or a bad backend client, so
//! `main` can refuse to serve.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use modelwatch_core::error::Result;

use crate::backend::{HttpBackend, InferenceBackend};
use crate::config::ProxyConfig;
use crate::obs::{
    FileScoreSource, HostSource, ProxyMetrics, Registry, ScoreGauge, ScoreSource, SysinfoHost,
    SystemSampler,
};
use crate::proxy::Proxy;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ProxyConfig,
    registry: Arc<Registry>,
    metrics: ProxyMetrics,
    proxy: Proxy,
    sampler: Arc<SystemSampler>,
    score: Option<Arc<ScoreGauge>>,
    draining: AtomicBool,
}

impl AppState {
    /// Production wiring: HTTP backend, sysinfo host source, file score source.
    pub fn new(cfg: ProxyConfig) -> Result<Self> {
        let backend = HttpBackend::new(cfg.backend.invocations_url(), cfg.backend.timeout())?;
        let score: Option<Arc<dyn ScoreSource>> = cfg
            .score
            .path
            .as_ref()
            .map(|p| Arc::new(FileScoreSource::new(p)) as Arc<dyn ScoreSource>);

        tracing::info!(backend = %backend.url(), timeout_ms = cfg.backend.timeout_ms, "backend configured");
        Self::with_parts(cfg, Arc::new(backend), Box::new(SysinfoHost::new()), score)
    }

    /// Wire state from explicit collaborators.
    pub fn with_parts(
        cfg: ProxyConfig,
        backend: Arc<dyn InferenceBackend>,
        host: Box<dyn HostSource>,
        score_source: Option<Arc<dyn ScoreSource>>,
    ) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let metrics = ProxyMetrics::register(&registry, score_source.is_some())?;

        let proxy = Proxy::new(backend, metrics.clone(), cfg.backend.timeout());
        let sampler = Arc::new(SystemSampler::new(host, &metrics));
        let score = match (score_source, metrics.score.clone()) {
            (Some(src), Some(gauge)) => Some(Arc::new(ScoreGauge::new(src, gauge))),
            _ => None,
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                metrics,
                proxy,
                sampler,
                score,
                draining: AtomicBool::new(false),
            }),
        })
    }

    pub fn cfg(&self) -> &ProxyConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn metrics(&self) -> &ProxyMetrics {
        &self.inner.metrics
    }

    pub fn proxy(&self) -> &Proxy {
        &self.inner.proxy
    }

    /// Refresh host and score gauges off the async workers.
    pub async fn refresh_sampled(&self) {
        self.inner.sampler.refresh_async().await;

        if let Some(score) = &self.inner.score {
            let score = Arc::clone(score);
            if let Err(e) = tokio::task::spawn_blocking(move || score.refresh()).await {
                tracing::error!(error = %e, "score refresh task failed");
            }
        }
    }

    /// Start the background sampler when `sampler.interval_ms` is non-zero.
    pub fn spawn_sampler(&self) -> Option<JoinHandle<()>> {
        let ms = self.inner.cfg.sampler.interval_ms;
        if ms == 0 {
            return None;
        }
        Some(Arc::clone(&self.inner.sampler).spawn_interval(Duration::from_millis(ms)))
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.inner.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Relaxed)
    }
}
