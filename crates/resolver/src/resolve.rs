//! Asset resolution pipeline

use crate::coingecko::CoinGeckoClient;
use crate::exchange_index::ExchangeLookup;
use crate::intents::TokenMatcher;
use crate::pools::PoolMatcher;
use crate::{ResolverError, ResolverResult};
use fundrouter_types::{Asset, ResolvedHints};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// A successful match of the asset on one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMatch {
	pub provider: String,
	/// Provider-specific identifier for the asset.
	pub asset_id: String,
}

/// The result of resolving an unknown asset. A resolution always carries at
/// least one provider match; zero matches is a resolution failure, never a
/// partial success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
	/// Identifier of the symbol-search catalog entry.
	pub catalog_id: String,
	pub name: String,
	pub symbol: String,
	/// Best-effort contract address for display.
	pub contract_address: String,
	pub providers: Vec<ProviderMatch>,
}

impl Resolution {
	/// Bundles the per-provider identifiers so a caller can pre-resolve once
	/// and let providers skip their own static-mapping lookups.
	pub fn to_hints(&self) -> ResolvedHints {
		let mut hints = ResolvedHints::default();
		for pm in &self.providers {
			match pm.provider.as_str() {
				"thorchain" => hints.router_asset = Some(pm.asset_id.clone()),
				"simpleswap" => hints.exchange_symbol = Some(pm.asset_id.clone()),
				"nearintents" => hints.intent_token_id = Some(pm.asset_id.clone()),
				"houdini" => hints.private_symbol = Some(pm.asset_id.clone()),
				_ => {},
			}
		}
		hints
	}
}

/// Resolves chain/symbol/contract triples against the external catalogs.
pub struct Resolver {
	catalog: CoinGeckoClient,
	pools: PoolMatcher,
	intents: TokenMatcher,
	exchanges: Vec<Arc<dyn ExchangeLookup>>,
}

impl Resolver {
	pub fn new(
		catalog: CoinGeckoClient,
		pools: PoolMatcher,
		intents: TokenMatcher,
		exchanges: Vec<Arc<dyn ExchangeLookup>>,
	) -> Self {
		Self { catalog, pools, intents, exchanges }
	}

	/// Convenience form of [`Resolver::resolve`] for callers holding the
	/// raw chain/symbol/contract triple.
	pub async fn resolve_parts(
		&self,
		chain: &str,
		symbol: &str,
		contract: &str,
	) -> ResolverResult<Resolution> {
		let mut asset = Asset::new(chain, symbol);
		if !contract.is_empty() {
			asset = asset.with_contract(contract);
		}
		self.resolve(&asset).await
	}

	/// Attempts to identify the asset and match it across providers.
	pub async fn resolve(&self, asset: &Asset) -> ResolverResult<Resolution> {
		let coins = self.catalog.search(&asset.symbol).await?;
		let best = CoinGeckoClient::best_match(&coins, &asset.symbol).ok_or_else(|| {
			ResolverError::SymbolNotFound { symbol: asset.symbol.clone() }
		})?;

		let platforms = self.catalog.platforms(&best.id).await?;

		let mut resolution = Resolution {
			catalog_id: best.id.clone(),
			name: best.name.clone(),
			symbol: best.symbol.to_uppercase(),
			contract_address: platforms
				.get(&asset.chain)
				.cloned()
				.unwrap_or_default(),
			providers: Vec::new(),
		};

		self.match_router_pools(asset, &platforms, &mut resolution).await;
		self.match_intent_tokens(asset, &mut resolution).await;
		self.match_exchanges(asset, &mut resolution);

		if resolution.providers.is_empty() {
			return Err(ResolverError::Unsupported {
				name: resolution.name,
				symbol: resolution.symbol,
			});
		}

		Ok(resolution)
	}

	/// Router pool matching: the caller's own contract first, then every
	/// catalog (chain, contract) pair, finally a native chain.symbol match.
	/// The first hit wins and short-circuits the remaining attempts.
	async fn match_router_pools(
		&self,
		asset: &Asset,
		platforms: &std::collections::HashMap<String, String>,
		resolution: &mut Resolution,
	) {
		if !asset.contract_address.is_empty() {
			match self
				.pools
				.match_pool(&asset.chain, &asset.symbol, &asset.contract_address)
				.await
			{
				Ok(Some(pool_asset)) => {
					resolution.providers.push(ProviderMatch {
						provider: "thorchain".to_string(),
						asset_id: pool_asset,
					});
					return;
				},
				Ok(None) => {},
				Err(e) => warn!(error = %e, "router pool match failed"),
			}
		}

		for (chain, contract) in platforms {
			match self.pools.match_pool(chain, &asset.symbol, contract).await {
				Ok(Some(pool_asset)) => {
					resolution.providers.push(ProviderMatch {
						provider: "thorchain".to_string(),
						asset_id: pool_asset,
					});
					if resolution.contract_address.is_empty() {
						resolution.contract_address = contract.clone();
					}
					return;
				},
				Ok(None) => {},
				Err(e) => {
					warn!(chain, error = %e, "router pool match failed");
					continue;
				},
			}
		}

		// Chain-native assets have no contract anywhere; match pools that
		// are themselves contract-less.
		if platforms.is_empty() || asset.contract_address.is_empty() {
			match self.pools.match_pool(&asset.chain, &asset.symbol, "").await {
				Ok(Some(pool_asset)) => {
					resolution.providers.push(ProviderMatch {
						provider: "thorchain".to_string(),
						asset_id: pool_asset,
					});
				},
				Ok(None) => {},
				Err(e) => warn!(error = %e, "router native match failed"),
			}
		}
	}

	async fn match_intent_tokens(&self, asset: &Asset, resolution: &mut Resolution) {
		match self.intents.match_token(&asset.chain, &asset.symbol).await {
			Ok(Some(token_id)) => {
				resolution.providers.push(ProviderMatch {
					provider: "nearintents".to_string(),
					asset_id: token_id,
				});
			},
			Ok(None) => debug!(symbol = asset.symbol, "no intent token match"),
			Err(e) => warn!(error = %e, "intent token match failed"),
		}
	}

	/// Exchange catalog matching. The router pool notation, when one
	/// matched, re-derives canonical chain/symbol naming; the caller's raw
	/// input is the fallback for assets absent from the pool catalog.
	fn match_exchanges(&self, asset: &Asset, resolution: &mut Resolution) {
		let pool_key = resolution
			.providers
			.iter()
			.find(|pm| pm.provider == "thorchain")
			.and_then(|pm| {
				let (chain, rest) = pm.asset_id.split_once('.')?;
				let symbol = rest.split('-').next()?;
				Some((chain.to_string(), symbol.to_string()))
			});

		for catalog in &self.exchanges {
			// several catalogs may serve one venue (static table + live
			// index); the first match per provider wins
			if resolution
				.providers
				.iter()
				.any(|pm| pm.provider == catalog.provider_name())
			{
				continue;
			}
			let matched = pool_key
				.as_ref()
				.and_then(|(chain, symbol)| catalog.lookup(chain, symbol, ""))
				.or_else(|| {
					catalog.lookup(&asset.chain, &asset.symbol, &asset.contract_address)
				});

			if let Some(asset_id) = matched {
				resolution.providers.push(ProviderMatch {
					provider: catalog.provider_name().to_string(),
					asset_id,
				});
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hints_map_provider_names() {
		let resolution = Resolution {
			catalog_id: "chainlink".to_string(),
			name: "Chainlink".to_string(),
			symbol: "LINK".to_string(),
			contract_address: "0xabc".to_string(),
			providers: vec![
				ProviderMatch {
					provider: "thorchain".to_string(),
					asset_id: "BASE.LINK-0XABC".to_string(),
				},
				ProviderMatch {
					provider: "nearintents".to_string(),
					asset_id: "nep141:link.omft.near".to_string(),
				},
			],
		};

		let hints = resolution.to_hints();
		assert_eq!(hints.router_asset.as_deref(), Some("BASE.LINK-0XABC"));
		assert_eq!(
			hints.intent_token_id.as_deref(),
			Some("nep141:link.omft.near")
		);
		assert!(hints.exchange_symbol.is_none());
		assert!(hints.private_symbol.is_none());
	}
}
