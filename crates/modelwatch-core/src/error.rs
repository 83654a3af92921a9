//! Shared error type across modelwatch crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Malformed or unrecognized prediction payload.
    BadInput,
    /// Backend answered with an error or could not be reached.
    BackendUnavailable,
    /// Backend did not answer within the configured timeout.
    BackendTimeout,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and tests.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadInput => "BAD_INPUT",
            ClientCode::BackendUnavailable => "BACKEND_UNAVAILABLE",
            ClientCode::BackendTimeout => "BACKEND_TIMEOUT",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// HTTP status the code maps to at the handler boundary.
    pub fn http_status(self) -> u16 {
        match self {
            ClientCode::BadInput => 400,
            ClientCode::BackendUnavailable => 502,
            ClientCode::BackendTimeout => 504,
            ClientCode::Internal => 500,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ModelWatchError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum ModelWatchError {
    #[error("bad input: {0}")]
    BadInput(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("backend timed out after {timeout_ms}ms")]
    BackendTimeout { timeout_ms: u64 },
    #[error("sampler read failed: {0}")]
    SamplerRead(String),
    #[error("duplicate metric: {0}")]
    DuplicateMetric(String),
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("metric {name}: {msg}")]
    MetricKind { name: String, msg: String },
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ModelWatchError {
    /// Map internal error to a stable client-facing code.
    ///
    /// Only `BadInput` and the backend variants can reach a client during
    /// normal operation; everything else surfaces as `Internal`.
    pub fn client_code(&self) -> ClientCode {
        match self {
            ModelWatchError::BadInput(_) => ClientCode::BadInput,
            ModelWatchError::BackendUnavailable(_) => ClientCode::BackendUnavailable,
            ModelWatchError::BackendTimeout { .. } => ClientCode::BackendTimeout,
            ModelWatchError::SamplerRead(_)
            | ModelWatchError::DuplicateMetric(_)
            | ModelWatchError::UnknownMetric(_)
            | ModelWatchError::MetricKind { .. }
            | ModelWatchError::Config(_)
            | ModelWatchError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Message safe to return to a caller.
    ///
    /// Backend status lines, response bodies and addresses stay in the logs;
    /// callers only see which class of failure occurred.
    pub fn client_message(&self) -> String {
        match self.client_code() {
            ClientCode::BadInput | ClientCode::BackendTimeout => self.to_string(),
            ClientCode::BackendUnavailable => "inference failed or backend unreachable".to_string(),
            ClientCode::Internal => "internal error".to_string(),
        }
    }
}
