//!
//! src/logging.rs  Oct 18th, 2026
//!
//! Initializes logger so every fetch, status check and notification
//! leaves a structured line with its identifier attached
//!
//!

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use tracing_error::ErrorLayer;
use tracing_appender::non_blocking;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::ScoutError;

/// Must be held until exit or buffered lines are lost
pub struct LoggingGuard(#[allow(dead_code)] tracing_appender::non_blocking::WorkerGuard);

fn build_filter(cfg: &LoggingConfig) -> EnvFilter {
    std::env::var("RUST_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(cfg.filter_directives.clone()))
}

pub fn init_logging(cfg: &LoggingConfig) -> Result<LoggingGuard, ScoutError> {
    let (writer, guard) = non_blocking(std::io::stdout());
    let filter = build_filter(cfg);
    let time = fmt::time::UtcTime::rfc_3339();

    let base = fmt::layer()
        .with_writer(writer)
        .with_timer(time)
        .with_target(cfg.include_target)
        .with_file(cfg.include_file_line)
        .with_line_number(cfg.include_file_line);

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let result = match cfg.format {
        LogFormat::Json => registry
            .with(base
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false))
            .try_init(),
        LogFormat::Pretty => registry
            .with(base.with_ansi(cfg.with_ansi).compact())
            .try_init(),
    };

    result.map_err(|e| ScoutError::Config(format!("logger init: {e}")))?;
    Ok( LoggingGuard(guard) )
}
