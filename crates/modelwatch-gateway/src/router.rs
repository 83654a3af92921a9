//! Axum router wiring.
//!
//! `/predict` goes to the proxy handler, `/metrics` to the scrape handler.
//! Each request runs in its own task, so a slow backend call only holds up
//! the request that made it.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ops, proxy};

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.cfg().proxy.max_body_bytes;

    Router::new()
        .route("/predict", post(proxy::predict))
        .route("/metrics", get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
