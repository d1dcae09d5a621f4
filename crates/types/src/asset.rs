//! Blockchain asset notation
//!
//! Assets are written as `CHAIN.SYMBOL` or `CHAIN.SYMBOL-0xContract`, the
//! notation used by cross-chain liquidity pools. Parsing is case-insensitive;
//! rendering always produces uppercase chain/symbol and a lowercase contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Per-provider identifiers attached to an asset by the resolver.
///
/// A caller that pre-resolved an asset passes these along so providers can
/// skip their own static-mapping lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHints {
	/// Router-pool asset notation (e.g. `BASE.LINK-0x...`).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub router_asset: Option<String>,
	/// Custodial-exchange currency symbol.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exchange_symbol: Option<String>,
	/// Intent-network token identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub intent_token_id: Option<String>,
	/// Privacy-exchange currency identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub private_symbol: Option<String>,
}

impl ResolvedHints {
	pub fn is_empty(&self) -> bool {
		self.router_asset.is_none()
			&& self.exchange_symbol.is_none()
			&& self.intent_token_id.is_none()
			&& self.private_symbol.is_none()
	}
}

/// A blockchain asset. An empty contract address means the chain-native asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
	pub chain: String,
	pub symbol: String,
	#[serde(default)]
	pub contract_address: String,
	/// Resolver-provided provider identifiers, if the caller pre-resolved.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hints: Option<ResolvedHints>,
}

/// Error parsing asset notation.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid asset notation {input:?}: expected CHAIN.SYMBOL")]
pub struct AssetParseError {
	pub input: String,
}

impl Asset {
	pub fn new(chain: impl Into<String>, symbol: impl Into<String>) -> Self {
		Self {
			chain: chain.into().to_uppercase(),
			symbol: symbol.into().to_uppercase(),
			contract_address: String::new(),
			hints: None,
		}
	}

	pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
		self.contract_address = contract.into().to_lowercase();
		self
	}

	pub fn with_hints(mut self, hints: ResolvedHints) -> Self {
		self.hints = Some(hints);
		self
	}

	/// True if the asset is the chain's native asset (no contract address).
	pub fn is_native(&self) -> bool {
		self.contract_address.is_empty()
	}

	/// The `CHAIN.SYMBOL` part without any contract suffix.
	pub fn short_notation(&self) -> String {
		format!("{}.{}", self.chain, self.symbol)
	}
}

impl FromStr for Asset {
	type Err = AssetParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let err = || AssetParseError { input: s.to_string() };

		let (chain, rest) = s.split_once('.').ok_or_else(err)?;
		if chain.is_empty() || rest.is_empty() {
			return Err(err());
		}

		let (symbol, contract) = match rest.split_once('-') {
			Some((sym, contract)) => (sym, contract),
			None => (rest, ""),
		};
		if symbol.is_empty() {
			return Err(err());
		}

		Ok(Asset {
			chain: chain.to_uppercase(),
			symbol: symbol.to_uppercase(),
			contract_address: contract.to_lowercase(),
			hints: None,
		})
	}
}

impl fmt::Display for Asset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.contract_address.is_empty() {
			write!(f, "{}.{}", self.chain, self.symbol)
		} else {
			write!(f, "{}.{}-{}", self.chain, self.symbol, self.contract_address)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_native_asset() {
		let asset: Asset = "BTC.BTC".parse().unwrap();
		assert_eq!(asset.chain, "BTC");
		assert_eq!(asset.symbol, "BTC");
		assert!(asset.is_native());
	}

	#[test]
	fn parses_contract_asset_case_insensitively() {
		let asset: Asset = "eth.usdc-0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"
			.parse()
			.unwrap();
		assert_eq!(asset.chain, "ETH");
		assert_eq!(asset.symbol, "USDC");
		assert_eq!(
			asset.contract_address,
			"0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
		);
	}

	#[test]
	fn rejects_malformed_notation() {
		assert!("BTC".parse::<Asset>().is_err());
		assert!(".BTC".parse::<Asset>().is_err());
		assert!("BTC.".parse::<Asset>().is_err());
	}

	#[test]
	fn notation_round_trips() {
		for input in [
			"BTC.BTC",
			"BASE.LINK-0x88fb150bdc53a65fe94dea0c9ba0a6daf8c6e196",
			"avax.usdc-0XB97EF9EF8734C71904D8002F8B6BC66DD9C48A6E",
		] {
			let asset: Asset = input.parse().unwrap();
			let rendered = asset.to_string();
			let reparsed: Asset = rendered.parse().unwrap();
			assert_eq!(reparsed.to_string(), rendered);
		}
	}
}
