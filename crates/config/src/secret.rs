//! Environment-resolvable secret values

use crate::ConfigError;
use serde::{Deserialize, Serialize};

/// A configuration value that is either given inline or resolved from an
/// environment variable when first used.
///
/// ```toml
/// [venues]
/// simpleswap_api_key = { type = "env", value = "SIMPLESWAP_API_KEY" }
/// coingecko_api_key = { type = "plain", value = "CG-..." }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SecretValue {
	/// Inline plain value.
	Plain(String),
	/// Name of an environment variable holding the value.
	Env(String),
}

impl SecretValue {
	pub fn plain(value: impl Into<String>) -> Self {
		Self::Plain(value.into())
	}

	pub fn from_env(var: impl Into<String>) -> Self {
		Self::Env(var.into())
	}

	/// Resolves the value, reading the environment when necessary.
	pub fn resolve(&self) -> Result<String, ConfigError> {
		match self {
			SecretValue::Plain(value) => Ok(value.clone()),
			SecretValue::Env(var) => {
				std::env::var(var).map_err(|_| ConfigError::MissingEnv { var: var.clone() })
			},
		}
	}

	/// Resolves the value, returning `None` when an environment reference is
	/// unset. Used for optional venue credentials.
	pub fn resolve_optional(&self) -> Option<String> {
		match self {
			SecretValue::Plain(value) if value.is_empty() => None,
			SecretValue::Plain(value) => Some(value.clone()),
			SecretValue::Env(var) => std::env::var(var).ok().filter(|v| !v.is_empty()),
		}
	}
}

impl Default for SecretValue {
	fn default() -> Self {
		Self::Plain(String::new())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn plain_values_resolve_directly() {
		let value = SecretValue::plain("key-123");
		assert_eq!(value.resolve().unwrap(), "key-123");
		assert_eq!(value.resolve_optional(), Some("key-123".to_string()));
	}

	#[test]
	fn empty_plain_value_is_absent() {
		assert_eq!(SecretValue::default().resolve_optional(), None);
	}

	#[test]
	fn missing_env_var_errors_on_required_resolve() {
		let value = SecretValue::from_env("FUNDROUTER_TEST_UNSET_VAR");
		assert!(matches!(value.resolve(), Err(ConfigError::MissingEnv { .. })));
		assert_eq!(value.resolve_optional(), None);
	}

	#[test]
	fn deserializes_tagged_form() {
		let value: SecretValue =
			serde_json::from_str(r#"{"type":"env","value":"MY_KEY"}"#).unwrap();
		assert_eq!(value, SecretValue::from_env("MY_KEY"));
	}
}
