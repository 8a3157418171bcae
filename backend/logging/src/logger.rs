//! Structured Logger
//!
//! Wraps `tracing` to provide console output, an optional rolling NDJSON file,
//! and environment-based level control (`RUST_LOG` wins over the configured level).

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global logger for interactive use.
///
/// Console output goes to stdout. When `log_dir` is set a daily rolling file
/// `plugsmith.log.YYYY-MM-DD` receives the same events as JSON lines.
pub fn init_logger(log_dir: Option<&Path>, level: &str) {
    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_ansi(true);

    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, "plugsmith.log");
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

/// Initialize a stderr-only logger, for modes where stdout carries protocol data.
pub fn init_stderr_logger(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(false),
        )
        .try_init();
}
