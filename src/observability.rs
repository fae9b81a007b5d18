//! Logging and observability helpers.

pub mod sensitive;

pub use sensitive::Sensitive;

use std::fs;

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "sqlaudit.log";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. Returns `false`
/// when a subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::CLOSE);

    let installed = match (&config.directory, config.json) {
        (Some(dir), json) => {
            if let Err(e) = fs::create_dir_all(dir) {
                eprintln!("Failed to create log directory {}: {}", dir.display(), e);
            }
            let file_appender: RollingFileAppender =
                tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let builder = builder.with_writer(file_appender).with_ansi(false);
            if json {
                builder
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .try_init()
                    .is_ok()
            } else {
                builder.try_init().is_ok()
            }
        }
        (None, true) => builder
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .try_init()
            .is_ok(),
        (None, false) => builder.with_writer(std::io::stderr).try_init().is_ok(),
    };

    if installed {
        tracing::info!(
            json = config.json,
            directory = ?config.directory,
            "Tracing initialized"
        );
    }
    installed
}
