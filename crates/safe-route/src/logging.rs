//! Logging and profiling setup
//!
//! Logs go to stderr so stdout carries nothing but the JSON result. `RUST_LOG` always wins;
//! otherwise the level defaults to `info` (or `debug` with `--verbose`).

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

fn default_directives(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Install the global tracing subscriber
pub fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter);
    let registry = tracing_subscriber::registry().with(fmt_layer);
    registry.init();

    #[cfg(feature = "profiling")]
    tracing::info!("Logging initialized (profiling scopes emitted as tracing spans)");
    #[cfg(not(feature = "profiling"))]
    tracing::debug!("Logging initialized (profiling disabled in this build)");
}
