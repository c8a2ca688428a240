//! Tracing subscriber bootstrap

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `filter`.
///
/// A subscriber that is already installed is left in place.
pub fn init_logging(filter: &str) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::try_new(filter)
            .with_context(|| format!("Invalid log filter '{filter}'"))?,
    };

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

/// Filter directive for a `-v`/`-q` count on top of the configured one
pub fn filter_for_verbosity(base: &str, verbose: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => base.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}
