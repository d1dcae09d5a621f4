//! Swap quotes and execution results

use crate::asset::Asset;
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A swap quote produced by a provider.
///
/// Quotes are value objects: created by a provider's quote call, compared by
/// the manager, optionally persisted by an external collaborator, and passed
/// back unchanged to execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
	/// Name of the provider that produced this quote.
	pub provider: String,
	pub from_asset: Asset,
	pub to_asset: Asset,
	/// RPC registry key of the funding chain ("avalanche", "base").
	pub from_chain: String,
	pub input_amount_usd: f64,
	/// Input amount in the source token's smallest unit.
	pub input_amount: U256,
	/// Human-readable expected output amount.
	pub expected_output: String,
	/// Expected output normalized to the common 8-decimal comparison scale.
	pub expected_output_raw: U256,
	#[serde(default)]
	pub memo: String,
	/// Router contract address, for router-deposit flows.
	#[serde(default)]
	pub router: String,
	/// Inbound vault or deposit address.
	#[serde(default)]
	pub vault_address: String,
	/// Unix expiry timestamp, zero when the venue does not set one.
	#[serde(default)]
	pub expiry: i64,
	/// Opaque per-provider data carried from quote to execute.
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub extra: HashMap<String, serde_json::Value>,
}

impl Quote {
	/// Reads a string value from the per-provider extra data.
	pub fn extra_str(&self, key: &str) -> Option<&str> {
		self.extra.get(key).and_then(|v| v.as_str())
	}
}

/// Result of submitting a swap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResult {
	/// Source-chain transaction hash, empty for purely off-chain submissions.
	pub tx_hash: String,
	/// Venue-specific tracking handle, empty for venues tracked by hash only.
	#[serde(default)]
	pub external_id: String,
}

/// Terminal-state swap status. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
	Pending,
	Completed,
	Failed,
}

impl SwapStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			SwapStatus::Pending => "pending",
			SwapStatus::Completed => "completed",
			SwapStatus::Failed => "failed",
		}
	}

	pub fn is_terminal(&self) -> bool {
		!matches!(self, SwapStatus::Pending)
	}
}

impl fmt::Display for SwapStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What a routing hint selects on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HintKind {
	#[default]
	None,
	Provider,
	Category,
}

/// Optional caller-supplied filter narrowing provider selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingHint {
	#[serde(default)]
	pub kind: HintKind,
	#[serde(default)]
	pub value: String,
}

impl RoutingHint {
	pub fn none() -> Self {
		Self::default()
	}

	pub fn provider(name: impl Into<String>) -> Self {
		Self { kind: HintKind::Provider, value: name.into() }
	}

	pub fn category(name: impl Into<String>) -> Self {
		Self { kind: HintKind::Category, value: name.into() }
	}

	pub fn is_none(&self) -> bool {
		self.kind == HintKind::None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_round_trips_through_serde() {
		for status in [SwapStatus::Pending, SwapStatus::Completed, SwapStatus::Failed] {
			let json = serde_json::to_string(&status).unwrap();
			assert_eq!(json, format!("\"{}\"", status.as_str()));
			let back: SwapStatus = serde_json::from_str(&json).unwrap();
			assert_eq!(back, status);
		}
	}

	#[test]
	fn quote_survives_persistence_round_trip() {
		let mut extra = HashMap::new();
		extra.insert("deposit_address".to_string(), serde_json::json!("0xdead"));
		let quote = Quote {
			provider: "thorchain".to_string(),
			from_asset: "BASE.USDC-0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"
				.parse()
				.unwrap(),
			to_asset: "BTC.BTC".parse().unwrap(),
			from_chain: "base".to_string(),
			input_amount_usd: 25.0,
			input_amount: U256::from(25_000_000u64),
			expected_output: "0.00021".to_string(),
			expected_output_raw: U256::from(21_000u64),
			memo: "=:BTC.BTC:bc1q...".to_string(),
			router: String::new(),
			vault_address: "0xvault".to_string(),
			expiry: 1_700_000_000,
			extra,
		};

		let json = serde_json::to_string(&quote).unwrap();
		let back: Quote = serde_json::from_str(&json).unwrap();
		assert_eq!(back.provider, quote.provider);
		assert_eq!(back.expected_output_raw, quote.expected_output_raw);
		assert_eq!(back.extra_str("deposit_address"), Some("0xdead"));
	}
}
