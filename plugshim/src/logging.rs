//! Logging setup for the plugshim binary.
//!
//! Library crates only emit `tracing` events; this module installs the subscriber.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable overriding the log filter
pub const LOG_LEVEL_ENV: &str = "PLUGSHIM_LOG_LEVEL";

/// Logging mode for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No output
    Silent,
    /// Compact stderr output, `info` by default
    Development,
    /// Verbose output with source locations, `debug` by default
    Debug,
}

impl LoggingMode {
    /// `-v` selects [`LoggingMode::Debug`].
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            LoggingMode::Debug
        } else {
            LoggingMode::Development
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Initialize logging with the specified mode
///
/// # Environment Variables
///
/// - `PLUGSHIM_LOG_LEVEL`: filter directive, e.g. `debug` or `plugshim_server=trace`
/// - `RUST_LOG`: used when `PLUGSHIM_LOG_LEVEL` is unset
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let subscriber = Registry::default()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .compact(),
                )
                .with(create_env_filter("info"));

            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let subscriber = Registry::default()
                .with(
                    fmt::layer()
                        .pretty()
                        .with_thread_ids(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(create_env_filter("debug"));

            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

fn create_env_filter(default_level: &str) -> EnvFilter {
    filter_directive(
        std::env::var(LOG_LEVEL_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
        default_level,
    )
    .parse()
    .unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// First non-empty of the plugshim override, `RUST_LOG`, then the mode default.
fn filter_directive(override_level: Option<String>, rust_log: Option<String>, default_level: &str) -> String {
    override_level
        .filter(|level| !level.trim().is_empty())
        .or_else(|| rust_log.filter(|level| !level.trim().is_empty()))
        .unwrap_or_else(|| default_level.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_mode() {
        assert!(init_logging(LoggingMode::Silent).is_ok());
    }

    #[test]
    fn test_from_verbose() {
        assert_eq!(LoggingMode::from_verbose(true), LoggingMode::Debug);
        assert_eq!(LoggingMode::from_verbose(false), LoggingMode::Development);
    }

    #[test]
    fn test_filter_precedence() {
        assert_eq!(
            filter_directive(Some("trace".into()), Some("warn".into()), "info"),
            "trace"
        );
        assert_eq!(filter_directive(None, Some("warn".into()), "info"), "warn");
        assert_eq!(filter_directive(Some(" ".into()), None, "debug"), "debug");
    }
}
