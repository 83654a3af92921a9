//! Outbound client for the model-serving backend.
//!
//! The proxy talks to the backend through `InferenceBackend` so the HTTP
//! client can be swapped in tests. `HttpBackend` issues exactly one POST per
//! call; there are no retries at this layer or above it.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use modelwatch_core::error::{ModelWatchError, Result};

/// Max bytes of a failing backend body kept for logs.
const ERROR_BODY_PREVIEW: usize = 256;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("backend timed out")]
    Timeout,
}

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Send `body` to the inference endpoint and return the success body.
    async fn invoke(&self, body: Bytes) -> std::result::Result<Bytes, BackendError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpBackend {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| ModelWatchError::Config(format!("backend client build failed: {e}")))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn transport_err(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport(e.to_string())
    }
}

fn preview(body: &[u8]) -> String {
    let cut = body.len().min(ERROR_BODY_PREVIEW);
    String::from_utf8_lossy(&body[..cut]).into_owned()
}

#[async_trait]
impl InferenceBackend for HttpBackend {
    async fn invoke(&self, body: Bytes) -> std::result::Result<Bytes, BackendError> {
        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport_err)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(transport_err)?;

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: preview(&bytes),
            });
        }
        Ok(bytes)
    }
}
