//! modelwatch gateway
//!
//! - `POST /predict` forwarded to the model-serving backend, with metrics
//! - `GET /metrics` Prometheus scrape endpoint
//! - Graceful shutdown: readiness flips to draining, in-flight requests finish

use modelwatch_core::error::{ModelWatchError, Result};
use modelwatch_gateway::config::{self, ProxyConfig};
use modelwatch_gateway::{app_state::AppState, logging, router};

#[tokio::main]
async fn main() {
    // The log sink is configurable, so config loads before the subscriber.
    let cfg = match config::load_from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            let _ = logging::init(None);
            tracing::error!(error = %e, "config load failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(cfg.log.file.as_deref()) {
        let _ = logging::init(None);
        tracing::error!(error = %e, "log setup failed");
        std::process::exit(1);
    }

    if let Err(e) = run(cfg).await {
        tracing::error!(error = %e, "modelwatch-gateway stopped");
        std::process::exit(1);
    }
}

async fn run(cfg: ProxyConfig) -> Result<()> {
    let listen = cfg.proxy.listen_addr()?;

    // Duplicate metric names fail here, before the socket is bound.
    let state = AppState::new(cfg)?;
    let _sampler = state.spawn_sampler();
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| ModelWatchError::Config(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, "modelwatch-gateway starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| ModelWatchError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.set_draining();
    tracing::info!("shutdown signal received, draining");
}
