//! Settings loading

use crate::{ConfigError, Settings};
use config::{Config, Environment, File};
use tracing::debug;

/// Loads settings from an optional file path with `FUNDROUTER_*` environment
/// overrides layered on top (e.g. `FUNDROUTER_TIMEOUTS__REQUEST_MS=10000`).
pub fn load_settings(path: Option<&str>) -> Result<Settings, ConfigError> {
	let mut builder = Config::builder();

	if let Some(path) = path {
		debug!(path, "loading configuration file");
		builder = builder.add_source(File::with_name(path).required(true));
	} else {
		builder = builder.add_source(File::with_name("config/default").required(false));
	}

	let settings = builder
		.add_source(Environment::with_prefix("FUNDROUTER").separator("__"))
		.build()?
		.try_deserialize()?;

	Ok(settings)
}
