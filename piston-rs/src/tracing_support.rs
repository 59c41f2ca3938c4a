//! Tracing and logging support.
//!
//! The engine always emits `tracing` events: a `parse` span per parse with
//! token, flag and sub-command events inside it, registration at `info`, and
//! action failures at `warn`. This module only installs a subscriber for hosts
//! that do not bring their own.

pub use tracing::{self, debug, error, info, instrument, trace, warn};

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "tracing")]
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer, Registry,
};

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracingFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,

    /// Single-line output.
    Compact,

    /// One JSON object per event.
    Json,
}

impl FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(TracingFormat::Pretty),
            "compact" => Ok(TracingFormat::Compact),
            "json" => Ok(TracingFormat::Json),
            other => Err(format!(
                "unknown log format '{}', expected pretty, compact or json",
                other
            )),
        }
    }
}

impl fmt::Display for TracingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TracingFormat::Pretty => "pretty",
            TracingFormat::Compact => "compact",
            TracingFormat::Json => "json",
        })
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter.
    ///
    /// If None, uses RUST_LOG environment variable or defaults to "info".
    pub level: Option<tracing::Level>,

    pub format: TracingFormat,

    pub timestamps: bool,

    /// Include target module names in output.
    pub target: bool,

    pub thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: None,
            format: TracingFormat::Pretty,
            timestamps: true,
            target: true,
            thread_ids: false,
        }
    }
}

/// Install a stderr subscriber filtered by `RUST_LOG` (default `info`).
///
/// Fails if a global subscriber is already set.
#[cfg(feature = "tracing")]
pub fn init_subscriber() -> Result<(), TryInitError> {
    init_subscriber_with_config(TracingConfig::default())
}

/// Install a stderr subscriber built from `config`.
///
/// # Example
///
/// ```no_run
/// use piston::tracing_support::{init_subscriber_with_config, TracingConfig, TracingFormat};
///
/// init_subscriber_with_config(TracingConfig {
///     format: TracingFormat::Json,
///     ..Default::default()
/// })
/// .ok();
/// ```
#[cfg(feature = "tracing")]
pub fn init_subscriber_with_config(config: TracingConfig) -> Result<(), TryInitError> {
    let filter = match config.level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(fmt_layer(&config))
        .with(filter)
        .try_init()
}

#[cfg(feature = "tracing")]
fn fmt_layer(config: &TracingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.target)
        .with_thread_ids(config.thread_ids);

    match (config.format, config.timestamps) {
        (TracingFormat::Pretty, true) => layer.pretty().boxed(),
        (TracingFormat::Pretty, false) => layer.pretty().without_time().boxed(),
        (TracingFormat::Compact, true) => layer.compact().boxed(),
        (TracingFormat::Compact, false) => layer.compact().without_time().boxed(),
        (TracingFormat::Json, true) => layer.json().boxed(),
        (TracingFormat::Json, false) => layer.json().without_time().boxed(),
    }
}

// Fallback when tracing feature is disabled
#[cfg(not(feature = "tracing"))]
pub fn init_subscriber() -> Result<(), std::convert::Infallible> {
    Ok(())
}
