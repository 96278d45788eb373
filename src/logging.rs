//! Tracing subscriber setup for the binary.
//!
//! The library only emits `tracing` events; installing a subscriber is
//! left to whoever owns the process.

use tracing_subscriber::EnvFilter;

/// Environment variable with a full `EnvFilter` directive.
pub const LOG_ENV: &str = "CREDVAULT_LOG";

/// Install a stderr `fmt` subscriber.
///
/// `CREDVAULT_LOG` takes precedence; otherwise `credvault=<level>` with
/// everything else at `warn`.  Safe to call more than once.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("credvault={level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
