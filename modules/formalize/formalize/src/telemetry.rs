//! Logging setup for binaries and tests embedding the module.

use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber. `RUST_LOG` wins over `default_filter`.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is already set.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
