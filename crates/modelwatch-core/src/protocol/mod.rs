//! Wire contracts accepted by the proxy.
//!
//! Only the inbound `/predict` body is modelled here; the backend response is
//! opaque and forwarded verbatim. Parsers are panic-free: malformed input is
//! reported as `ModelWatchError::BadInput`.

pub mod payload;

pub use payload::{parse_predict_request, DataframeSplit, PredictRequest, Tabular};
