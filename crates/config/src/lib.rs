//! fundrouter configuration
//!
//! Settings are loaded from an optional config file layered under
//! `FUNDROUTER_*` environment overrides. Secrets may be given inline or as
//! environment variable references resolved at use time.

pub mod loader;
pub mod secret;
pub mod settings;

pub use loader::load_settings;
pub use secret::SecretValue;
pub use settings::{ChainSettings, LoggingSettings, Settings, TimeoutSettings, VenueSettings};

use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("failed to load configuration: {0}")]
	Load(#[from] config::ConfigError),

	#[error("environment variable {var} is not set")]
	MissingEnv { var: String },

	#[error("invalid configuration: {reason}")]
	Invalid { reason: String },
}
