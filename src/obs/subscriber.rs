// crates.io
use tracing_subscriber::EnvFilter;
// self
use crate::{_prelude::*, error::ConfigError};

/// Installs the global `fmt` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when it is set and parses.
pub fn init_subscriber(default_filter: &str) -> Result<()> {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.try_init()
		.map_err(|source| ConfigError::Subscriber { source })?;

	Ok(())
}
