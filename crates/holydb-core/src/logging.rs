//! Tracing subscriber setup.
//!
//! HolyDB libraries only emit `tracing` events; installing a subscriber is the
//! job of whatever binary embeds them. [`init_tracing`] is the helper such a
//! binary calls once at startup.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to `log_level`. Fails if the
/// filter does not parse or a global subscriber is already installed.
///
/// # Examples
///
/// ```no_run
/// holydb_core::logging::init_tracing("info").expect("tracing init");
/// ```
pub fn init_tracing(log_level: &str) -> Result<()> {
    let filter = build_filter(log_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(log_level, "tracing initialised");
    Ok(())
}

/// Build the env filter, preferring `RUST_LOG` over the configured level.
fn build_filter(log_level: &str) -> Result<EnvFilter> {
    if std::env::var("RUST_LOG").is_ok() {
        return Ok(EnvFilter::from_default_env());
    }
    EnvFilter::try_new(log_level).with_context(|| format!("invalid log level filter: {log_level}"))
}
