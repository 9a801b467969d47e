//! Logging setup for binaries and examples embedding the client
//!
//! The library itself only emits `tracing` events.

use crate::ClientConfig;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a global subscriber
///
/// `RUST_LOG` overrides `level`. JSON output for production, pretty
/// console output for development. Returns an error if a subscriber is
/// already installed.
pub fn init_logger(level: &str, json_format: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(env_filter);

    if json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_thread_ids(true),
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init()?;
    }

    Ok(())
}

/// Initialize for the configured environment: JSON outside development
pub fn init_logger_from_config(config: &ClientConfig, level: &str) -> anyhow::Result<()> {
    init_logger(level, !config.is_development())
}
