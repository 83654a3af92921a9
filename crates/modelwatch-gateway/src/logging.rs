//! Tracing subscriber setup.
//!
//! Events go to stdout unless `log.file` names a file, in which case they are
//! appended there without ANSI colors. `RUST_LOG` filters either sink and
//! defaults to `info`.

use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use modelwatch_core::error::{ModelWatchError, Result};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Open `path` for appending, creating it when missing. The parent
/// directory must already exist.
pub fn open_log_file(path: &str) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ModelWatchError::Config(format!("open log file {path} failed: {e}")))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(file: Option<&str>) -> Result<()> {
    let builder = fmt().with_env_filter(env_filter());
    let installed = match file {
        Some(path) => {
            let file = open_log_file(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.try_init(),
    };
    installed.map_err(|e| ModelWatchError::Internal(format!("install log subscriber failed: {e}")))
}
