//! Logging initialization.
//!
//! Supports three formats:
//! - `pretty`: human-readable text
//! - `component`: compact `target message {fields}` lines; use the
//!   [`log_component!`](crate::log_component) macro to add a `component` field
//! - `json`: structured JSON lines for log aggregators

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{KernelError, Result};

/// Install the global tracing subscriber.
///
/// Falls back to `RUST_LOG`; if unset, uses `cfg.level`. Call once at
/// startup; a second call returns an error instead of panicking.
///
/// # Errors
/// Returns [`KernelError::Config`] if the log file cannot be opened or a
/// subscriber is already installed.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let already_set = |e: Box<dyn std::error::Error + Send + Sync>| {
        KernelError::Config(format!("logging already initialized: {}", e))
    };

    let file = match &cfg.file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| KernelError::Config(format!("cannot open log file {}: {}", path, e)))?,
        ),
        None => None,
    };

    match (cfg.format, file) {
        (LogFormat::Json, Some(file)) => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(already_set),
        (LogFormat::Json, None) => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .map_err(already_set),
        (LogFormat::Pretty, Some(file)) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(already_set),
        (LogFormat::Pretty, None) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(already_set),
        (LogFormat::Component, Some(file)) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .compact()
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(already_set),
        (LogFormat::Component, None) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .compact()
            .try_init()
            .map_err(already_set),
    }
}

/// Emit a component-tagged tracing event.
///
/// ```
/// # use agentkernel::log_component;
/// log_component!(info, "hooks", "module mounted");
/// log_component!(warn, "provider", "capacity low", remaining = 0.02f64);
/// ```
#[macro_export]
macro_rules! log_component {
    ($level:ident, $component:expr, $msg:expr) => {
        tracing::$level!(component = $component, $msg)
    };
    ($level:ident, $component:expr, $msg:expr, $($key:ident = $val:expr),+ $(,)?) => {
        tracing::$level!(component = $component, $($key = $val,)+ $msg)
    };
}
