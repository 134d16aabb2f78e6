//! Logging init for the command-line tool.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,fetchgate=info";

/// Install a stderr `tracing` subscriber.
///
/// `RUST_LOG` overrides the default filter; `verbose` raises this crate to
/// `debug`. Safe to call more than once: later calls are ignored.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("warn,fetchgate=debug")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
