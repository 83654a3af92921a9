//! modelwatch gateway library entry.
//!
//! This crate wires the prediction proxy, the metrics registry, and the
//! host sampler into an axum service. It is consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod backend;
pub mod config;
pub mod logging;
pub mod obs;
pub mod ops;
pub mod proxy;
pub mod router;
