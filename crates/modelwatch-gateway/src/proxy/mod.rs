//! Prediction proxy: `/predict` handler and the forwarding logic behind it.

pub mod forward;
pub mod handler;

pub use forward::{Proxy, RequestOutcome};
pub use handler::{error_response, predict};
