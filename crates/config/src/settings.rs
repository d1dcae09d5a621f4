//! Configuration settings structures

use crate::secret::SecretValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Source chains, keyed by RPC registry key ("avalanche", "base").
	pub chains: HashMap<String, ChainSettings>,
	pub venues: VenueSettings,
	pub timeouts: TimeoutSettings,
	pub logging: LoggingSettings,
}

/// Per-chain connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
	pub rpc_url: String,
}

/// Venue credentials. Venues whose credentials resolve to nothing are left
/// out of the provider registry at assembly time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueSettings {
	pub coingecko_api_key: SecretValue,
	pub simpleswap_api_key: SecretValue,
	pub nearintents_api_key: SecretValue,
	pub houdini_api_key: SecretValue,
	pub houdini_api_secret: SecretValue,
}

/// Timeout knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
	/// Per-request HTTP timeout for venue and catalog clients.
	pub request_ms: u64,
	/// Global ceiling on the whole best-quote fan-out.
	pub quote_global_ms: u64,
}

impl Default for TimeoutSettings {
	fn default() -> Self {
		Self {
			request_ms: 30_000,
			quote_global_ms: 45_000,
		}
	}
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
	pub level: String,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self { level: "info".to_string() }
	}
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			chains: HashMap::new(),
			venues: VenueSettings::default(),
			timeouts: TimeoutSettings::default(),
			logging: LoggingSettings::default(),
		}
	}
}

impl Settings {
	/// RPC endpoints keyed by chain registry key.
	pub fn rpc_endpoints(&self) -> HashMap<String, String> {
		self.chains
			.iter()
			.map(|(key, chain)| (key.clone(), chain.rpc_url.clone()))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_sane() {
		let settings = Settings::default();
		assert!(settings.chains.is_empty());
		assert_eq!(settings.timeouts.request_ms, 30_000);
		assert_eq!(settings.logging.level, "info");
	}

	#[test]
	fn deserializes_partial_config() {
		let settings: Settings = serde_json::from_str(
			r#"{
				"chains": {"base": {"rpc_url": "https://mainnet.base.org"}},
				"venues": {"simpleswap_api_key": {"type": "plain", "value": "k"}}
			}"#,
		)
		.unwrap();
		assert_eq!(
			settings.rpc_endpoints().get("base").unwrap(),
			"https://mainnet.base.org"
		);
		assert_eq!(settings.timeouts.quote_global_ms, 45_000);
	}
}
