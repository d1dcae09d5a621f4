//! Resolver pipeline against fixture catalogs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fundrouter::{Asset, DynamicCatalog, PoolMatcher, Resolver, ResolverError, StaticCatalog, TokenMatcher};
use fundrouter_resolver::coingecko::{CoinGeckoClient, SearchCoin};
use fundrouter_resolver::intents::IntentToken;
use fundrouter_resolver::pools::parse_pool_asset;
use fundrouter_resolver::ExchangeLookup;
use fundrouter_types::{CatalogCurrency, CurrencyFeed, ProviderResult};

fn coin(id: &str, name: &str, symbol: &str, rank: Option<u32>) -> SearchCoin {
	serde_json::from_value(serde_json::json!({
		"id": id,
		"name": name,
		"symbol": symbol,
		"market_cap_rank": rank,
	}))
	.unwrap()
}

fn catalog_client() -> CoinGeckoClient {
	CoinGeckoClient::with_base_url(None, "http://unreachable.invalid", Duration::from_secs(1))
}

fn empty_pools() -> PoolMatcher {
	PoolMatcher::with_pools(Vec::new())
}

fn empty_tokens() -> TokenMatcher {
	TokenMatcher::with_tokens(Vec::new())
}

struct StaticFeed(Vec<CatalogCurrency>);

#[async_trait]
impl CurrencyFeed for StaticFeed {
	async fn catalog_currencies(&self) -> ProviderResult<Vec<CatalogCurrency>> {
		Ok(self.0.clone())
	}
}

#[tokio::test]
async fn resolves_contract_asset_end_to_end() {
	let catalog = catalog_client();
	catalog.seed_search(
		"LINK",
		vec![coin("chainlink", "Chainlink", "LINK", Some(25))],
	);
	catalog.seed_platforms(
		"chainlink",
		HashMap::from([(
			"base".to_string(),
			"0x88Fb150BDc53A65fe94Dea0c9BA0a6dAf8C6e196".to_string(),
		)]),
	);

	let pools = PoolMatcher::with_pools(vec![parse_pool_asset(
		"BASE.LINK-0X88FB150BDC53A65FE94DEA0C9BA0A6DAF8C6E196",
	)
	.unwrap()]);

	let resolver = Resolver::new(catalog, pools, empty_tokens(), Vec::new());
	let resolution = resolver.resolve(&Asset::new("BASE", "LINK")).await.unwrap();

	assert_eq!(resolution.catalog_id, "chainlink");
	assert_eq!(resolution.name, "Chainlink");
	assert_eq!(resolution.symbol, "LINK");
	assert_eq!(resolution.providers.len(), 1);
	assert_eq!(resolution.providers[0].provider, "thorchain");
	assert_eq!(
		resolution.providers[0].asset_id,
		"BASE.LINK-0X88FB150BDC53A65FE94DEA0C9BA0A6DAF8C6E196"
	);
	// the platform contract fills the display address
	assert_eq!(
		resolution.contract_address,
		"0x88Fb150BDc53A65fe94Dea0c9BA0a6dAf8C6e196"
	);

	let hints = resolution.to_hints();
	assert_eq!(
		hints.router_asset.as_deref(),
		Some("BASE.LINK-0X88FB150BDC53A65FE94DEA0C9BA0A6DAF8C6E196")
	);
}

#[tokio::test]
async fn catalog_rank_tie_break_prefers_lowest() {
	let catalog = catalog_client();
	catalog.seed_search(
		"BTC",
		vec![
			coin("knockoff-btc", "Knockoff", "BTC", Some(50)),
			coin("bitcoin", "Bitcoin", "BTC", Some(5)),
		],
	);
	catalog.seed_platforms("bitcoin", HashMap::new());

	let pools = PoolMatcher::with_pools(vec![parse_pool_asset("BTC.BTC").unwrap()]);
	let resolver = Resolver::new(catalog, pools, empty_tokens(), Vec::new());

	let resolution = resolver.resolve(&Asset::new("BTC", "BTC")).await.unwrap();
	assert_eq!(resolution.catalog_id, "bitcoin");
	// native asset matched the contract-less pool
	assert_eq!(resolution.providers[0].asset_id, "BTC.BTC");
}

#[tokio::test]
async fn zero_provider_matches_is_an_error_not_empty_success() {
	let catalog = catalog_client();
	catalog.seed_search(
		"OBSCURE",
		vec![coin("obscure-coin", "Obscure", "OBSCURE", None)],
	);
	catalog.seed_platforms("obscure-coin", HashMap::new());

	let resolver = Resolver::new(catalog, empty_pools(), empty_tokens(), Vec::new());
	let err = resolver
		.resolve(&Asset::new("ETH", "OBSCURE"))
		.await
		.unwrap_err();
	assert!(matches!(err, ResolverError::Unsupported { .. }));
}

#[tokio::test]
async fn unknown_symbol_is_not_found() {
	let catalog = catalog_client();
	catalog.seed_search("NOPE", Vec::new());

	let resolver = Resolver::new(catalog, empty_pools(), empty_tokens(), Vec::new());
	let err = resolver.resolve(&Asset::new("ETH", "NOPE")).await.unwrap_err();
	assert!(matches!(err, ResolverError::SymbolNotFound { .. }));
}

#[tokio::test]
async fn intent_match_prefers_highest_price() {
	let catalog = catalog_client();
	catalog.seed_search("SOL", vec![coin("solana", "Solana", "SOL", Some(6))]);
	catalog.seed_platforms("solana", HashMap::new());

	let tokens = TokenMatcher::with_tokens(vec![
		serde_json::from_value(serde_json::json!({
			"assetId": "spoofed-sol",
			"symbol": "SOL",
			"blockchain": "sol",
			"price": 0.01,
		}))
		.unwrap(),
		serde_json::from_value::<IntentToken>(serde_json::json!({
			"assetId": "nep141:sol.omft.near",
			"symbol": "SOL",
			"blockchain": "sol",
			"price": 150.0,
		}))
		.unwrap(),
	]);

	let resolver = Resolver::new(catalog, empty_pools(), tokens, Vec::new());
	let resolution = resolver.resolve(&Asset::new("SOL", "SOL")).await.unwrap();

	assert_eq!(resolution.providers.len(), 1);
	assert_eq!(resolution.providers[0].provider, "nearintents");
	assert_eq!(resolution.providers[0].asset_id, "nep141:sol.omft.near");
}

#[tokio::test]
async fn exchange_key_derives_from_pool_notation_with_caller_fallback() {
	// pool notation names the chain AVAX even though the caller typed
	// "avalanche"; the static catalog key comes from the pool match
	let catalog = catalog_client();
	catalog.seed_search("AVAX", vec![coin("avalanche-2", "Avalanche", "AVAX", Some(12))]);
	catalog.seed_platforms("avalanche-2", HashMap::new());

	let pools = PoolMatcher::with_pools(vec![parse_pool_asset("AVAX.AVAX").unwrap()]);

	fn table(key: &str) -> Option<&'static str> {
		(key == "AVAX.AVAX").then_some("avaxc")
	}
	let exchanges: Vec<Arc<dyn ExchangeLookup>> =
		vec![Arc::new(StaticCatalog::new("simpleswap", table))];

	let resolver = Resolver::new(catalog, pools, empty_tokens(), exchanges);
	let resolution = resolver.resolve(&Asset::new("AVAX", "AVAX")).await.unwrap();

	let simpleswap = resolution
		.providers
		.iter()
		.find(|pm| pm.provider == "simpleswap")
		.unwrap();
	assert_eq!(simpleswap.asset_id, "avaxc");
}

#[tokio::test]
async fn dynamic_catalog_backfills_when_static_table_misses() {
	let catalog = catalog_client();
	catalog.seed_search("PEPE", vec![coin("pepe", "Pepe", "PEPE", Some(30))]);
	catalog.seed_platforms("pepe", HashMap::new());

	fn empty_table(_key: &str) -> Option<&'static str> {
		None
	}
	let dynamic = Arc::new(DynamicCatalog::new(
		"simpleswap",
		Arc::new(StaticFeed(vec![CatalogCurrency {
			id: "pepeeth".to_string(),
			symbol: "pepe".to_string(),
			network: "erc20".to_string(),
			contract_address: String::new(),
		}])),
	));
	dynamic.refresh().await.unwrap();

	let exchanges: Vec<Arc<dyn ExchangeLookup>> = vec![
		Arc::new(StaticCatalog::new("simpleswap", empty_table)),
		dynamic,
	];

	let resolver = Resolver::new(catalog, empty_pools(), empty_tokens(), exchanges);
	let resolution = resolver.resolve(&Asset::new("ETH", "PEPE")).await.unwrap();

	// the "erc20" network alias for ETH found the live-index entry
	assert_eq!(resolution.providers.len(), 1);
	assert_eq!(resolution.providers[0].provider, "simpleswap");
	assert_eq!(resolution.providers[0].asset_id, "pepeeth");
}
