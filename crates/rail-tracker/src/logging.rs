//! Logging setup for the tracker binary
//!
//! Logs go to stderr so stdout carries nothing but GeoJSON. `RUST_LOG`
//! takes precedence; without it debug builds log at `debug` and release
//! builds at `info`.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter used when `RUST_LOG` is unset or invalid
pub fn default_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter()));
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_filter(filter);

    if tracing_subscriber::registry().with(fmt_layer).try_init().is_err() {
        return;
    }

    #[cfg(feature = "profiling")]
    tracing::info!("Logging initialized (profiling spans enabled)");

    tracing::info!("rail-tracker {}", env!("CARGO_PKG_VERSION"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_twice() {
        setup_logging();
        setup_logging();
        tracing::debug!("still logging");
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(default_filter()).is_ok());
    }
}
