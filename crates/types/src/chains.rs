//! Source-chain registry
//!
//! Immutable per-chain constants for the EVM chains swaps can be funded from.
//! Data is looked up through functions rather than exposed as mutable globals
//! so tests can reason about a fixed universe.

use crate::asset::Asset;
use alloy::primitives::{address, Address};

/// Static description of a supported source chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainInfo {
	/// RPC registry key ("avalanche", "base").
	pub key: &'static str,
	/// Uppercase chain code used in asset notation ("AVAX", "BASE").
	pub code: &'static str,
	pub chain_id: u64,
	/// USDC contract on this chain.
	pub usdc: Address,
	/// Router-pool notation for this chain's USDC.
	pub usdc_pool_asset: &'static str,
	/// Symbol of the chain's native gas asset.
	pub native_symbol: &'static str,
}

/// Chains the core can fund swaps from.
pub const SOURCE_CHAINS: &[ChainInfo] = &[
	ChainInfo {
		key: "avalanche",
		code: "AVAX",
		chain_id: 43114,
		usdc: address!("0xB97EF9Ef8734C71904D8002F8B6BC66Dd9c48a6E"),
		usdc_pool_asset: "AVAX.USDC-0XB97EF9EF8734C71904D8002F8B6BC66DD9C48A6E",
		native_symbol: "AVAX",
	},
	ChainInfo {
		key: "base",
		code: "BASE",
		chain_id: 8453,
		usdc: address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
		usdc_pool_asset: "BASE.USDC-0X833589FCD6EDB6E08F4C7C32D4F71B54BDA02913",
		native_symbol: "ETH",
	},
];

/// Looks up a chain by its RPC registry key.
pub fn chain_info(key: &str) -> Option<&'static ChainInfo> {
	SOURCE_CHAINS.iter().find(|c| c.key == key)
}

/// Looks up a chain by its uppercase notation code.
pub fn chain_by_code(code: &str) -> Option<&'static ChainInfo> {
	SOURCE_CHAINS.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

/// The USDC asset for a source chain, in canonical notation.
pub fn usdc_asset(key: &str) -> Asset {
	match chain_info(key) {
		Some(info) => info
			.usdc_pool_asset
			.parse()
			.expect("source chain constants hold valid notation"),
		None => Asset::new(key, "USDC"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registry_lookups() {
		assert_eq!(chain_info("base").unwrap().chain_id, 8453);
		assert_eq!(chain_by_code("avax").unwrap().key, "avalanche");
		assert!(chain_info("solana").is_none());
	}

	#[test]
	fn usdc_asset_notation_is_canonical() {
		let asset = usdc_asset("base");
		assert_eq!(asset.chain, "BASE");
		assert_eq!(asset.symbol, "USDC");
		assert_eq!(
			asset.contract_address,
			"0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"
		);
	}
}
