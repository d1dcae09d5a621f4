//! CoinGecko symbol-search catalog client

use crate::cache::TtlCache;
use crate::{ResolverError, ResolverResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";

const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Catalog platform names translated into the chain-code vocabulary used in
/// asset notation. Platforms outside this table are dropped.
const PLATFORM_CHAINS: &[(&str, &str)] = &[
	("ethereum", "ETH"),
	("avalanche", "AVAX"),
	("base", "BASE"),
	("binance-smart-chain", "BSC"),
	("polygon-pos", "POLYGON"),
	("solana", "SOL"),
	("arbitrum-one", "ARB"),
	("tron", "TRON"),
	("bitcoin", "BTC"),
	("litecoin", "LTC"),
	("dogecoin", "DOGE"),
	("bitcoin-cash", "BCH"),
	("cosmos", "GAIA"),
	("thorchain", "THOR"),
	("sui", "SUI"),
	("the-open-network", "TON"),
	("xrp", "XRP"),
	("polkadot", "DOT"),
	("cardano", "ADA"),
];

fn platform_chain(platform: &str) -> Option<&'static str> {
	PLATFORM_CHAINS
		.iter()
		.find(|(p, _)| *p == platform)
		.map(|(_, chain)| *chain)
}

/// One catalog search result.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchCoin {
	pub id: String,
	pub name: String,
	pub symbol: String,
	#[serde(default)]
	pub market_cap_rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
	#[serde(default)]
	coins: Vec<SearchCoin>,
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
	#[serde(default)]
	platforms: HashMap<String, String>,
}

/// Symbol-search catalog client with per-symbol and per-coin caches.
pub struct CoinGeckoClient {
	api_key: Option<String>,
	base_url: String,
	http: reqwest::Client,
	search_cache: TtlCache<Vec<SearchCoin>>,
	coin_cache: TtlCache<HashMap<String, String>>,
}

impl CoinGeckoClient {
	pub fn new(api_key: Option<String>, request_timeout: Duration) -> Self {
		Self::with_base_url(api_key, BASE_URL, request_timeout)
	}

	pub fn with_base_url(
		api_key: Option<String>,
		base_url: impl Into<String>,
		request_timeout: Duration,
	) -> Self {
		Self {
			api_key,
			base_url: base_url.into(),
			http: reqwest::Client::builder()
				.timeout(request_timeout)
				.build()
				.expect("reqwest client"),
			search_cache: TtlCache::new(CACHE_TTL),
			coin_cache: TtlCache::new(CACHE_TTL),
		}
	}

	/// Pre-populates the search cache, for test fixtures.
	pub fn seed_search(&self, symbol: &str, coins: Vec<SearchCoin>) {
		self.search_cache.seed(symbol.to_lowercase(), coins);
	}

	/// Pre-populates the platform cache, for test fixtures. Keys are catalog
	/// platform names, values contract addresses.
	pub fn seed_platforms(&self, coin_id: &str, platforms: HashMap<String, String>) {
		self.coin_cache.seed(coin_id, translate_platforms(platforms));
	}

	fn key_param(&self) -> String {
		match &self.api_key {
			Some(key) => format!("&x_cg_demo_api_key={key}"),
			None => String::new(),
		}
	}

	async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> ResolverResult<T> {
		let response = self.http.get(url).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ResolverError::Status {
				endpoint: url.to_string(),
				status: status.as_u16(),
				body,
			});
		}
		serde_json::from_str(&body)
			.map_err(|e| ResolverError::invalid_response(format!("{url}: {e}")))
	}

	/// Searches the catalog for coins matching a symbol (cached).
	pub async fn search(&self, symbol: &str) -> ResolverResult<Vec<SearchCoin>> {
		let key = symbol.to_lowercase();
		self.search_cache
			.get_or_fetch(&key, || async {
				let url = format!(
					"{}/search?query={}{}",
					self.base_url,
					url::form_urlencoded::byte_serialize(symbol.as_bytes())
						.collect::<String>(),
					self.key_param(),
				);
				let response: SearchResponse = self.get_json(&url).await?;
				Ok(response.coins)
			})
			.await
	}

	/// Per-chain contract addresses for a catalog entry, translated into
	/// chain codes (cached per coin id).
	pub async fn platforms(&self, coin_id: &str) -> ResolverResult<HashMap<String, String>> {
		self.coin_cache
			.get_or_fetch(coin_id, || async {
				let url = format!(
					"{}/coins/{}?localization=false&tickers=false&market_data=false&community_data=false&developer_data=false{}",
					self.base_url,
					coin_id,
					self.key_param(),
				);
				let response: CoinResponse = self.get_json(&url).await?;
				Ok(translate_platforms(response.platforms))
			})
			.await
	}

	/// Picks the search result with the best (lowest) market-cap rank among
	/// entries matching the symbol. Unranked entries are only chosen when
	/// nothing ranked exists; catalog order breaks ties.
	pub fn best_match<'a>(coins: &'a [SearchCoin], symbol: &str) -> Option<&'a SearchCoin> {
		let mut best: Option<&SearchCoin> = None;
		for coin in coins {
			if !coin.symbol.eq_ignore_ascii_case(symbol) {
				continue;
			}
			let rank = coin.market_cap_rank.filter(|r| *r != 0);
			match (best.and_then(|b| b.market_cap_rank.filter(|r| *r != 0)), rank) {
				(_, None) => {
					if best.is_none() {
						best = Some(coin);
					}
				},
				(None, Some(_)) => best = Some(coin),
				(Some(best_rank), Some(rank)) => {
					if rank < best_rank {
						best = Some(coin);
					}
				},
			}
		}
		best
	}
}

fn translate_platforms(platforms: HashMap<String, String>) -> HashMap<String, String> {
	let mut out = HashMap::new();
	for (platform, contract) in platforms {
		if platform.is_empty() || contract.is_empty() {
			continue;
		}
		if let Some(chain) = platform_chain(&platform) {
			out.insert(chain.to_string(), contract);
		}
	}
	out
}
