//! Proxy config loader (strict parsing, env overrides).
//!
//! Order: defaults, optional YAML file, environment, then `validate()`.

pub mod schema;

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use modelwatch_core::error::{ModelWatchError, Result};

pub use schema::{BackendSection, LogSection, ProxyConfig, ProxySection, SamplerSection, ScoreSection};

/// Config file looked up in the working directory when `MODELWATCH_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "modelwatch.yaml";

pub fn load_from_file(path: &str) -> Result<ProxyConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ModelWatchError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ProxyConfig> {
    let cfg: ProxyConfig = serde_yaml::from_str(s)
        .map_err(|e| ModelWatchError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load using the process environment.
pub fn load_from_env() -> Result<ProxyConfig> {
    load_with(|key| std::env::var(key).ok())
}

/// Load with an injectable environment lookup.
pub fn load_with<F>(env: F) -> Result<ProxyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match env("MODELWATCH_CONFIG") {
        Some(path) => load_from_file(&path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => load_from_file(DEFAULT_CONFIG_FILE)?,
        None => ProxyConfig::default(),
    };
    apply_env(&mut cfg, env)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Apply `MODELWATCH_*` overrides on top of `cfg`.
pub fn apply_env<F>(cfg: &mut ProxyConfig, env: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(listen) = env("MODELWATCH_LISTEN") {
        cfg.proxy.listen = listen;
    }
    if let Some(port) = env("MODELWATCH_LISTEN_PORT") {
        let port: u16 = port
            .parse()
            .map_err(|e| ModelWatchError::Config(format!("MODELWATCH_LISTEN_PORT: {e}")))?;
        let mut addr: SocketAddr = cfg.proxy.listen_addr()?;
        addr.set_port(port);
        cfg.proxy.listen = addr.to_string();
    }
    if let Some(url) = env("MODELWATCH_BACKEND_URL") {
        cfg.backend.base_url = url;
    }
    if let Some(ms) = env("MODELWATCH_TIMEOUT_MS") {
        cfg.backend.timeout_ms = ms
            .parse()
            .map_err(|e| ModelWatchError::Config(format!("MODELWATCH_TIMEOUT_MS: {e}")))?;
    }
    if let Some(path) = env("MODELWATCH_SCORE_PATH") {
        cfg.score.path = Some(path);
    }
    if let Some(path) = env("MODELWATCH_LOG_FILE") {
        cfg.log.file = Some(path);
    }
    Ok(())
}
