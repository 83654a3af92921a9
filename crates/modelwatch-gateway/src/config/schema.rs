use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use modelwatch_core::error::{ModelWatchError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    pub version: u32,

    #[serde(default)]
    pub proxy: ProxySection,

    #[serde(default)]
    pub backend: BackendSection,

    #[serde(default)]
    pub sampler: SamplerSection,

    #[serde(default)]
    pub score: ScoreSection,

    #[serde(default)]
    pub log: LogSection,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            version: 1,
            proxy: ProxySection::default(),
            backend: BackendSection::default(),
            sampler: SamplerSection::default(),
            score: ScoreSection::default(),
            log: LogSection::default(),
        }
    }
}

impl ProxyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ModelWatchError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.proxy.validate()?;
        self.backend.validate()?;
        self.sampler.validate()?;
        self.log.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ProxySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ProxySection {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            ModelWatchError::Config(format!("proxy.listen must be a valid SocketAddr: {e}"))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if self.max_body_bytes < 1024 {
            return Err(ModelWatchError::Config(
                "proxy.max_body_bytes must be at least 1024".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_invocations_path")]
    pub invocations_path: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            invocations_path: default_invocations_path(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl BackendSection {
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ModelWatchError::Config(
                "backend.base_url must start with http:// or https://".into(),
            ));
        }
        if !self.invocations_path.starts_with('/') {
            return Err(ModelWatchError::Config(
                "backend.invocations_path must start with '/'".into(),
            ));
        }
        if !(1..=600_000).contains(&self.timeout_ms) {
            return Err(ModelWatchError::Config(
                "backend.timeout_ms must be between 1 and 600000".into(),
            ));
        }
        Ok(())
    }

    /// Full invocation URL (base without trailing slash + path).
    pub fn invocations_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.invocations_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerSection {
    /// 0 = refresh on scrape only.
    #[serde(default)]
    pub interval_ms: u64,
}

impl SamplerSection {
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms != 0 && self.interval_ms < 100 {
            return Err(ModelWatchError::Config(
                "sampler.interval_ms must be 0 or at least 100".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreSection {
    /// File holding the current model score, written by the evaluation job.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    /// Append logs here instead of stdout.
    #[serde(default)]
    pub file: Option<String>,
}

impl LogSection {
    pub fn validate(&self) -> Result<()> {
        if matches!(self.file.as_deref(), Some(f) if f.trim().is_empty()) {
            return Err(ModelWatchError::Config("log.file must not be empty".into()));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "127.0.0.1:8001".into()
}
fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}
fn default_base_url() -> String {
    "http://127.0.0.1:5005".into()
}
fn default_invocations_path() -> String {
    "/invocations".into()
}
fn default_timeout_ms() -> u64 {
    5000
}
