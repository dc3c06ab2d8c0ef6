//! Tracing subscriber setup for the CLI.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber filtered by `RUST_LOG`, or `default_filter`
/// when the variable is unset or invalid.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    Ok(())
}
