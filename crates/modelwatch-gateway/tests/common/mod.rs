//! Shared fixtures: stub backends, scripted host sources, proxy bootstrap.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::post, Router};
use bytes::Bytes;
use tokio::net::TcpListener;

use modelwatch_core::error::{ModelWatchError, Result};
use modelwatch_gateway::app_state::AppState;
use modelwatch_gateway::backend::HttpBackend;
use modelwatch_gateway::config::ProxyConfig;
use modelwatch_gateway::obs::{HostSource, HostReading, ProcessReading, ScoreSource};
use modelwatch_gateway::router::build_router;

pub const SCENARIO_BODY: &str = r#"{"dataframe_split":{"columns":["age"],"data":[[30]]}}"#;

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Backend answering every call with `status` + `body` after `delay`.
pub async fn spawn_backend(delay: Duration, status: StatusCode, body: &'static str) -> SocketAddr {
    let router = Router::new().route(
        "/invocations",
        post(move |_body: Bytes| async move {
            tokio::time::sleep(delay).await;
            (status, [(axum::http::header::CONTENT_TYPE, "application/json")], body)
        }),
    );
    serve(router).await
}

/// Backend echoing the request body back.
pub async fn spawn_echo_backend() -> SocketAddr {
    let router = Router::new().route("/invocations", post(|body: Bytes| async move { body }));
    serve(router).await
}

/// Backend that fails every second call with 500. Returns the hit counter too.
pub async fn spawn_alternating_backend() -> (SocketAddr, Arc<AtomicU64>) {
    let hits = Arc::new(AtomicU64::new(0));
    let h = Arc::clone(&hits);
    let router = Router::new().route(
        "/invocations",
        post(move |_body: Bytes| {
            let h = Arc::clone(&h);
            async move {
                let n = h.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                if n % 2 == 0 {
                    (StatusCode::OK, r#"{"predictions":[0]}"#)
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":"boom"}"#)
                }
            }
        }),
    );
    (serve(router).await, hits)
}

/// Backend that sleeps when the body mentions "slow".
pub async fn spawn_selective_backend(slow: Duration) -> SocketAddr {
    let router = Router::new().route(
        "/invocations",
        post(move |body: Bytes| async move {
            if String::from_utf8_lossy(&body).contains("slow") {
                tokio::time::sleep(slow).await;
            }
            r#"{"predictions":[1]}"#
        }),
    );
    serve(router).await
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Host source returning `cpu = 10 * call` until `fail_from`, then failing.
pub struct ScriptedHost {
    calls: u32,
    fail_from: u32,
}

impl ScriptedHost {
    pub fn healthy() -> Self {
        Self { calls: 0, fail_from: u32::MAX }
    }

    pub fn failing_after(ok_reads: u32) -> Self {
        Self { calls: 0, fail_from: ok_reads }
    }
}

impl HostSource for ScriptedHost {
    fn read(&mut self) -> Result<HostReading> {
        let n = self.calls;
        self.calls += 1;
        if n >= self.fail_from {
            return Err(ModelWatchError::SamplerRead("scripted failure".into()));
        }
        Ok(HostReading {
            cpu_percent: 10.0 * f64::from(n + 1),
            memory_used_mb: 512.0 + f64::from(n),
            process: Some(ProcessReading {
                resident_bytes: 4096.0,
                virtual_bytes: 65536.0,
                start_time_seconds: 1_700_000_000.0,
            }),
        })
    }
}

pub fn config_for(backend: SocketAddr, timeout_ms: u64) -> ProxyConfig {
    let mut cfg = ProxyConfig::default();
    cfg.backend.base_url = format!("http://{backend}");
    cfg.backend.timeout_ms = timeout_ms;
    cfg
}

pub struct TestProxy {
    pub addr: SocketAddr,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn predict(&self, body: &str) -> reqwest::Response {
        self.client
            .post(self.url("/predict"))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap()
    }

    pub async fn scrape(&self) -> String {
        let resp = self.client.get(self.url("/metrics")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        resp.text().await.unwrap()
    }
}

pub async fn spawn_proxy_with(
    cfg: ProxyConfig,
    host: Box<dyn HostSource>,
    score: Option<Arc<dyn ScoreSource>>,
) -> TestProxy {
    let backend = HttpBackend::new(cfg.backend.invocations_url(), cfg.backend.timeout()).unwrap();
    let state = AppState::with_parts(cfg, Arc::new(backend), host, score).unwrap();
    let addr = serve(build_router(state.clone())).await;
    TestProxy {
        addr,
        state,
        client: reqwest::Client::new(),
    }
}

pub async fn spawn_proxy(backend: SocketAddr, timeout_ms: u64) -> TestProxy {
    spawn_proxy_with(
        config_for(backend, timeout_ms),
        Box::new(ScriptedHost::healthy()),
        None,
    )
    .await
}

/// Value of an unlabelled sample line (`name value`) in exposition text.
pub fn sample(text: &str, name: &str) -> Option<f64> {
    text.lines()
        .filter(|l| !l.starts_with('#'))
        .find_map(|l| {
            let (n, v) = l.split_once(' ')?;
            (n == name).then(|| v.parse().ok()).flatten()
        })
}

/// Lines that must not change without traffic (gauges excluded).
pub fn stable_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| !l.starts_with('#'))
        .filter(|l| !l.starts_with("system_") && !l.starts_with("process_") && !l.starts_with("model_f1_score"))
        .map(str::to_string)
        .collect()
}
