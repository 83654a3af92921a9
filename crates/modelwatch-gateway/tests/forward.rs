//! Proxy state machine against in-process backends (no HTTP).

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use modelwatch_core::error::{ClientCode, ModelWatchError};
use modelwatch_gateway::backend::{BackendError, InferenceBackend};
use modelwatch_gateway::obs::{ProxyMetrics, Registry};
use modelwatch_gateway::proxy::Proxy;

const BODY: &str = r#"{"dataframe_split":{"columns":["age"],"data":[[30]]}}"#;

enum Mode {
    Ok(&'static str),
    Fail(BackendError),
    Hang,
}

struct FakeBackend {
    mode: Mode,
    calls: AtomicU64,
}

impl FakeBackend {
    fn new(mode: Mode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicU64::new(0),
        })
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for FakeBackend {
    async fn invoke(&self, _body: Bytes) -> Result<Bytes, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            Mode::Ok(b) => Ok(Bytes::from_static((*b).as_bytes())),
            Mode::Fail(BackendError::Status { status, body }) => Err(BackendError::Status {
                status: *status,
                body: body.clone(),
            }),
            Mode::Fail(BackendError::Transport(m)) => Err(BackendError::Transport(m.clone())),
            Mode::Fail(BackendError::Timeout) => Err(BackendError::Timeout),
            Mode::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

fn proxy_with(backend: Arc<FakeBackend>, timeout: Duration) -> (Proxy, ProxyMetrics) {
    let reg = Registry::new();
    let metrics = ProxyMetrics::register(&reg, false).unwrap();
    (Proxy::new(backend, metrics.clone(), timeout), metrics)
}

#[tokio::test]
async fn bad_input_never_reaches_the_backend() {
    let backend = FakeBackend::new(Mode::Ok("{}"));
    let (proxy, metrics) = proxy_with(Arc::clone(&backend), Duration::from_secs(1));

    let err = proxy.handle(Bytes::from_static(b"[]")).await.unwrap_err();
    assert_eq!(err.client_code(), ClientCode::BadInput);
    assert_eq!(backend.calls(), 0);
    assert_eq!(metrics.requests.get(), 0.0);
    assert_eq!(metrics.failures.get(), 0.0);
}

#[tokio::test]
async fn success_returns_backend_body() {
    let backend = FakeBackend::new(Mode::Ok(r#"{"predictions":["Extrovert"]}"#));
    let (proxy, metrics) = proxy_with(Arc::clone(&backend), Duration::from_secs(1));

    let out = proxy.handle(Bytes::from_static(BODY.as_bytes())).await.unwrap();
    assert_eq!(&out[..], br#"{"predictions":["Extrovert"]}"#);
    assert_eq!(metrics.requests.get(), 1.0);
    assert_eq!(metrics.inference_duration.totals().0, 1);
    assert_eq!(metrics.request_latency.totals().0, 1);
}

#[tokio::test]
async fn each_failure_kind_is_attempted_once() {
    let cases = [
        (
            BackendError::Status { status: 503, body: "down".into() },
            ClientCode::BackendUnavailable,
        ),
        (BackendError::Transport("refused".into()), ClientCode::BackendUnavailable),
        (BackendError::Timeout, ClientCode::BackendTimeout),
    ];

    for (failure, code) in cases {
        let backend = FakeBackend::new(Mode::Fail(failure));
        let (proxy, metrics) = proxy_with(Arc::clone(&backend), Duration::from_secs(1));

        let err = proxy.handle(Bytes::from_static(BODY.as_bytes())).await.unwrap_err();
        assert_eq!(err.client_code(), code);
        assert_eq!(backend.calls(), 1);
        assert_eq!(metrics.requests.get(), 1.0);
        assert_eq!(metrics.failures.get(), 1.0);
        assert_eq!(metrics.request_latency.totals().0, 0);
    }
}

#[tokio::test]
async fn hang_is_cut_off_by_the_timeout() {
    let backend = FakeBackend::new(Mode::Hang);
    let (proxy, metrics) = proxy_with(Arc::clone(&backend), Duration::from_millis(250));

    let err = proxy.handle(Bytes::from_static(BODY.as_bytes())).await.unwrap_err();
    assert!(matches!(err, ModelWatchError::BackendTimeout { timeout_ms: 250 }));
    assert_eq!(metrics.failures.get(), 1.0);
}

#[tokio::test]
async fn dropped_request_counts_once() {
    let backend = FakeBackend::new(Mode::Hang);
    let (proxy, metrics) = proxy_with(Arc::clone(&backend), Duration::from_secs(30));

    // Simulates a client disconnect: the handler future is dropped mid-flight.
    let res = tokio::time::timeout(
        Duration::from_millis(50),
        proxy.handle(Bytes::from_static(BODY.as_bytes())),
    )
    .await;
    assert!(res.is_err());

    assert_eq!(metrics.requests.get(), 1.0);
    assert_eq!(metrics.failures.get(), 0.0);
    assert_eq!(metrics.request_latency.totals().0, 0);
}
