//! Logging and tracing initialization.
//!
//! Structured logging via the `tracing` ecosystem, with pretty console
//! output by default and JSON output for machine parsing.

use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Configuration for the logging system.
#[derive(Default)]
pub struct LogConfig {
    /// Output logs as JSON (for machine parsing)
    pub json: bool,
    /// Enable verbose logging (sets default level to DEBUG)
    pub verbose: bool,
}

/// Initialize the tracing subscriber with the given configuration.
///
/// This should be called early in main(), after config is loaded.
/// The log level can be overridden at runtime via the `RUST_LOG`
/// environment variable.
pub fn init(config: LogConfig) {
    let default_level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "vmrestored={}",
            default_level.as_str().to_lowercase()
        ))
    });

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init();
    }
}
