//! Logging setup for converter front ends
//!
//! The library itself only emits `tracing` events. Binaries pick one of the
//! modes below once at startup.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// How much the converter reports, and where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber installed
    Silent,
    /// Compact stderr output, `info` and above
    Development,
    /// Pretty output with thread ids and source locations, `debug` and above
    Debug,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid log mode: {0}")]
    InvalidMode(String),
}

impl std::str::FromStr for LoggingMode {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "silent" => Ok(LoggingMode::Silent),
            "development" | "dev" => Ok(LoggingMode::Development),
            "debug" => Ok(LoggingMode::Debug),
            other => Err(LoggingError::InvalidMode(other.to_string())),
        }
    }
}

/// Install a global subscriber for `mode`
///
/// # Environment Variables
///
/// - `PLEXCONNECT_LOG_LEVEL`: filter directive, e.g. `xml_converter=debug`
/// - `RUST_LOG`: used when `PLEXCONNECT_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => Registry::default()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .with(env_filter("info"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
        LoggingMode::Debug => Registry::default()
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(env_filter("debug"))
            .try_init()
            .map_err(|e| LoggingError::TracingInit(e.to_string())),
    }
}

/// Install a subscriber chosen by `PLEXCONNECT_LOG_MODE`
///
/// Unset or unrecognized values fall back to [`LoggingMode::Silent`].
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = std::env::var("PLEXCONNECT_LOG_MODE")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LoggingMode::Silent);
    init_logging(mode)
}

fn env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var("PLEXCONNECT_LOG_LEVEL") {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}

/// Whether a global subscriber is already installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}
