//! Exchange currency catalogs
//!
//! Custodial venues identify currencies with their own symbol/id vocabulary.
//! Two catalog flavors answer the resolver's lookups: a curated static table
//! shipped with each venue integration, and a dynamic index rebuilt from the
//! venue's live currency list. Dynamic indexes are rebuilt wholesale and
//! swapped under a write lock, so concurrent readers never observe a partial
//! rebuild.

use crate::ResolverResult;
use fundrouter_types::{CatalogCurrency, CurrencyFeed};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// A venue currency catalog the resolver can query.
pub trait ExchangeLookup: Send + Sync {
	/// Provider name recorded in resolutions.
	fn provider_name(&self) -> &'static str;

	/// Finds the venue currency id for a chain/symbol/contract triple.
	fn lookup(&self, chain: &str, symbol: &str, contract: &str) -> Option<String>;
}

/// Venue network aliases for a chain code. Venues disagree on network naming
/// (one lists Avalanche C-chain as "avaxc", another as "avalanche"), so every
/// plausible alias is tried in order until one hits.
pub fn network_aliases(chain: &str) -> Vec<String> {
	let chain = chain.to_lowercase();
	let aliases: &[&str] = match chain.as_str() {
		"eth" | "ethereum" => &["eth", "erc20", "ethereum"],
		"avax" | "avalanche" => &["avaxc", "avalanche", "avax"],
		"base" => &["base"],
		"bsc" | "binance" => &["bsc", "bep20", "bnb"],
		"arb" | "arbitrum" => &["arb", "arbitrum"],
		"polygon" | "matic" => &["polygon", "matic", "pol"],
		"sol" | "solana" => &["sol", "solana"],
		"btc" | "bitcoin" => &["btc", "bitcoin"],
		_ => return vec![chain],
	};
	aliases.iter().map(|a| a.to_string()).collect()
}

/// Catalog backed by a curated compile-time table keyed by `CHAIN.SYMBOL`.
pub struct StaticCatalog {
	provider: &'static str,
	lookup_fn: fn(&str) -> Option<&'static str>,
}

impl StaticCatalog {
	pub fn new(provider: &'static str, lookup_fn: fn(&str) -> Option<&'static str>) -> Self {
		Self { provider, lookup_fn }
	}
}

impl ExchangeLookup for StaticCatalog {
	fn provider_name(&self) -> &'static str {
		self.provider
	}

	fn lookup(&self, chain: &str, symbol: &str, _contract: &str) -> Option<String> {
		let key = format!("{}.{}", chain, symbol).to_uppercase();
		(self.lookup_fn)(&key).map(str::to_string)
	}
}

#[derive(Default)]
struct CurrencyIndex {
	/// lowercase "network:contract" to currency id
	by_contract: HashMap<String, String>,
	/// lowercase "network:symbol" to currency id
	by_symbol: HashMap<String, String>,
}

impl CurrencyIndex {
	fn build(currencies: &[CatalogCurrency]) -> Self {
		let mut by_contract = HashMap::new();
		let mut by_symbol = HashMap::new();
		for currency in currencies {
			let network = currency.network.to_lowercase();
			if !currency.contract_address.is_empty() {
				let key = format!("{network}:{}", currency.contract_address.to_lowercase());
				by_contract.insert(key, currency.id.clone());
			}
			let key = format!("{network}:{}", currency.symbol.to_lowercase());
			by_symbol.insert(key, currency.id.clone());
		}
		Self { by_contract, by_symbol }
	}
}

/// Catalog backed by a venue's live currency list. Starts empty; `refresh`
/// is driven by the external scheduler collaborator.
pub struct DynamicCatalog {
	provider: &'static str,
	feed: Arc<dyn CurrencyFeed>,
	index: RwLock<CurrencyIndex>,
}

impl DynamicCatalog {
	pub fn new(provider: &'static str, feed: Arc<dyn CurrencyFeed>) -> Self {
		Self {
			provider,
			feed,
			index: RwLock::new(CurrencyIndex::default()),
		}
	}

	/// Fetches the currency list and swaps in a freshly built index.
	pub async fn refresh(&self) -> ResolverResult<()> {
		let currencies = self
			.feed
			.catalog_currencies()
			.await
			.map_err(|e| crate::ResolverError::invalid_response(format!(
				"{} currency list: {e}",
				self.provider
			)))?;
		let rebuilt = CurrencyIndex::build(&currencies);

		let mut index = self.index.write().expect("index lock poisoned");
		*index = rebuilt;
		info!(
			provider = self.provider,
			currencies = currencies.len(),
			"exchange currency index refreshed"
		);
		Ok(())
	}
}

impl ExchangeLookup for DynamicCatalog {
	fn provider_name(&self) -> &'static str {
		self.provider
	}

	fn lookup(&self, chain: &str, symbol: &str, contract: &str) -> Option<String> {
		let index = self.index.read().expect("index lock poisoned");
		let symbol = symbol.to_lowercase();
		let contract = contract.to_lowercase();

		for network in network_aliases(chain) {
			if !contract.is_empty() {
				if let Some(id) = index.by_contract.get(&format!("{network}:{contract}")) {
					return Some(id.clone());
				}
			}
			if let Some(id) = index.by_symbol.get(&format!("{network}:{symbol}")) {
				return Some(id.clone());
			}
			debug!(
				provider = self.provider,
				network, symbol, "no exchange catalog entry"
			);
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use fundrouter_types::ProviderResult;

	struct FixedFeed(Vec<CatalogCurrency>);

	#[async_trait]
	impl CurrencyFeed for FixedFeed {
		async fn catalog_currencies(&self) -> ProviderResult<Vec<CatalogCurrency>> {
			Ok(self.0.clone())
		}
	}

	fn currency(id: &str, symbol: &str, network: &str, contract: &str) -> CatalogCurrency {
		CatalogCurrency {
			id: id.to_string(),
			symbol: symbol.to_string(),
			network: network.to_string(),
			contract_address: contract.to_string(),
		}
	}

	#[test]
	fn aliases_are_tried_in_order() {
		assert_eq!(network_aliases("AVAX"), vec!["avaxc", "avalanche", "avax"]);
		assert_eq!(network_aliases("dot"), vec!["dot"]);
	}

	#[test]
	fn static_catalog_builds_uppercase_key() {
		fn table(key: &str) -> Option<&'static str> {
			(key == "BTC.BTC").then_some("btc")
		}
		let catalog = StaticCatalog::new("simpleswap", table);
		assert_eq!(catalog.lookup("btc", "btc", ""), Some("btc".to_string()));
		assert_eq!(catalog.lookup("BTC", "WBTC", ""), None);
	}

	#[tokio::test]
	async fn dynamic_catalog_matches_contract_before_symbol() {
		let catalog = DynamicCatalog::new(
			"simpleswap",
			Arc::new(FixedFeed(vec![
				currency("usdc-real", "usdc", "avaxc", "0xb97ef9ef8734c71904d8002f8b6bc66dd9c48a6e"),
				currency("usdc-decoy", "usdc", "avaxc", ""),
			])),
		);
		assert_eq!(catalog.lookup("AVAX", "USDC", "0xdead"), None);

		catalog.refresh().await.unwrap();
		assert_eq!(
			catalog.lookup(
				"AVAX",
				"whatever",
				"0xB97EF9Ef8734C71904D8002F8B6BC66Dd9c48a6E"
			),
			Some("usdc-real".to_string())
		);
	}

	#[tokio::test]
	async fn dynamic_catalog_walks_network_aliases() {
		let catalog = DynamicCatalog::new(
			"houdini",
			Arc::new(FixedFeed(vec![currency("AVAXC", "avax", "avalanche", "")])),
		);
		catalog.refresh().await.unwrap();

		// "avaxc" misses, the "avalanche" alias hits
		assert_eq!(
			catalog.lookup("AVAX", "AVAX", ""),
			Some("AVAXC".to_string())
		);
	}

	#[tokio::test]
	async fn refresh_replaces_index_wholesale() {
		let feed = Arc::new(FixedFeed(vec![currency("new", "abc", "eth", "")]));
		let catalog = DynamicCatalog::new("simpleswap", feed);
		catalog.refresh().await.unwrap();
		assert_eq!(catalog.lookup("ETH", "ABC", ""), Some("new".to_string()));
	}
}
