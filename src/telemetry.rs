//! Logging setup for the `caboose` binary.
//!
//! Two stages: a console-only subscriber while the environment is being
//! resolved, then a global subscriber writing to the console and to
//! `<log_dir>/caboose.log`. `RUST_LOG` overrides the run-mode default filter.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::env::{Environment, RunMode};

/// Name of the log file inside the log directory.
pub const LOG_FILE: &str = "caboose.log";

/// Errors encountered while configuring logging.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The log file could not be opened for appending.
    #[error("cannot open log file {path:?}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A global subscriber was already installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(String),
}

/// Console subscriber used before the environment is known.
pub fn console() -> impl Subscriber + Send + Sync {
    fmt::Subscriber::builder()
        .with_env_filter(filter("info"))
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(true)
        .finish()
}

/// Installs the global console + file subscriber.
pub fn init(env: &Environment) -> Result<(), TelemetryError> {
    let path = env.log_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| TelemetryError::LogFile {
            path: path.clone(),
            source,
        })?;

    let default = match env.run_mode {
        RunMode::Development => "caboose=debug,info",
        RunMode::Production => "info",
    };
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(true);
    let file = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter(default))
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    tracing::info!(path = %path.display(), mode = %env.run_mode, "file logging enabled");
    Ok(())
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
