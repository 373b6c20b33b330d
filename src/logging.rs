//! Logging configuration for sql-runner.
//!
//! Logs always go to stderr so that stdout carries nothing but query results.

use tracing_subscriber::EnvFilter;

/// Default filter when neither `--log-level` nor `RUST_LOG` is set.
const DEFAULT_FILTER: &str = "info";

/// Initializes stderr logging.
///
/// An explicit `directive` (from `--log-level`) wins over `RUST_LOG`.
pub fn init_stderr_logging(directive: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(directive))
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the filter from an explicit directive, `RUST_LOG`, or the default.
///
/// An unparsable directive falls back to the default rather than failing
/// startup before errors can even be reported.
pub fn build_filter(directive: Option<&str>) -> EnvFilter {
    match directive {
        Some(d) => EnvFilter::try_new(d).unwrap_or_else(|e| {
            eprintln!("Warning: Invalid log filter '{d}': {e}");
            EnvFilter::new(DEFAULT_FILTER)
        }),
        None => {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
        }
    }
}
