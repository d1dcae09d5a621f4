//! Liquidity-pool catalog matcher
//!
//! The router network publishes its pools as `CHAIN.SYMBOL[-CONTRACT]`
//! notation strings. A pool match is the most structurally reliable
//! cross-chain identifier available, so the resolver also reuses it to
//! re-derive canonical chain/symbol naming for the exchange catalogs.

use crate::cache::TtlCache;
use crate::{ResolverError, ResolverResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const POOLS_URL: &str = "https://thornode.ninerealms.com/thorchain/pools";

const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Deserialize)]
struct WirePool {
	#[serde(default)]
	asset: String,
	#[serde(default)]
	status: String,
}

/// A pool asset broken into its notation components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPool {
	/// Original pool notation, handed back verbatim on a match.
	pub raw: String,
	pub chain: String,
	pub symbol: String,
	/// Lowercase contract, empty for native pools.
	pub contract: String,
}

/// Parses a pool's notation string; returns `None` for malformed entries.
pub fn parse_pool_asset(asset: &str) -> Option<ParsedPool> {
	let (chain, rest) = asset.split_once('.')?;
	if chain.is_empty() || rest.is_empty() {
		return None;
	}
	let (symbol, contract) = match rest.split_once('-') {
		Some((symbol, contract)) => (symbol, contract.to_lowercase()),
		None => (rest, String::new()),
	};
	Some(ParsedPool {
		raw: asset.to_string(),
		chain: chain.to_string(),
		symbol: symbol.to_string(),
		contract,
	})
}

/// Cached matcher over the pool catalog. Only `Available` pools are usable.
pub struct PoolMatcher {
	pools_url: String,
	http: reqwest::Client,
	cache: TtlCache<Vec<ParsedPool>>,
}

impl PoolMatcher {
	pub fn new(request_timeout: Duration) -> Self {
		Self::with_url(POOLS_URL, request_timeout)
	}

	pub fn with_url(pools_url: impl Into<String>, request_timeout: Duration) -> Self {
		Self {
			pools_url: pools_url.into(),
			http: reqwest::Client::builder()
				.timeout(request_timeout)
				.build()
				.expect("reqwest client"),
			cache: TtlCache::new(CACHE_TTL),
		}
	}

	/// Builds a matcher over a fixed pool list, for test fixtures.
	pub fn with_pools(pools: Vec<ParsedPool>) -> Self {
		let matcher = Self::new(Duration::from_secs(15));
		matcher.cache.seed("pools", pools);
		matcher
	}

	async fn fetch_pools(&self) -> ResolverResult<Vec<ParsedPool>> {
		self.cache
			.get_or_fetch("pools", || async {
				let response = self.http.get(&self.pools_url).send().await?;
				let status = response.status();
				let body = response.text().await?;
				if !status.is_success() {
					return Err(ResolverError::Status {
						endpoint: self.pools_url.clone(),
						status: status.as_u16(),
						body,
					});
				}
				let wire: Vec<WirePool> = serde_json::from_str(&body).map_err(|e| {
					ResolverError::invalid_response(format!("pool list: {e}"))
				})?;

				let parsed: Vec<ParsedPool> = wire
					.iter()
					.filter(|p| p.status == "Available")
					.filter_map(|p| parse_pool_asset(&p.asset))
					.collect();
				debug!(pools = parsed.len(), "loaded pool catalog");
				Ok(parsed)
			})
			.await
	}

	/// Finds a pool by chain and contract address; native assets (empty
	/// contract) match contract-less pools by symbol instead. Returns the
	/// pool's raw notation.
	pub async fn match_pool(
		&self,
		chain: &str,
		symbol: &str,
		contract: &str,
	) -> ResolverResult<Option<String>> {
		let pools = self.fetch_pools().await?;
		let contract = contract.to_lowercase();

		for pool in &pools {
			if !pool.chain.eq_ignore_ascii_case(chain) {
				continue;
			}
			if !contract.is_empty() && !pool.contract.is_empty() {
				if pool.contract == contract {
					return Ok(Some(pool.raw.clone()));
				}
			} else if contract.is_empty()
				&& pool.contract.is_empty()
				&& pool.symbol.eq_ignore_ascii_case(symbol)
			{
				return Ok(Some(pool.raw.clone()));
			}
		}
		Ok(None)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn fixture() -> PoolMatcher {
		PoolMatcher::with_pools(vec![
			parse_pool_asset("BTC.BTC").unwrap(),
			parse_pool_asset("BASE.LINK-0X88FB150BDC53A65FE94DEA0C9BA0A6DAF8C6E196").unwrap(),
			parse_pool_asset("AVAX.USDC-0XB97EF9EF8734C71904D8002F8B6BC66DD9C48A6E").unwrap(),
		])
	}

	#[test]
	fn parses_pool_notation() {
		let pool = parse_pool_asset("BASE.LINK-0XABC").unwrap();
		assert_eq!(pool.chain, "BASE");
		assert_eq!(pool.symbol, "LINK");
		assert_eq!(pool.contract, "0xabc");
		assert!(parse_pool_asset("garbage").is_none());
	}

	#[tokio::test]
	async fn matches_by_contract() {
		let matcher = fixture();
		let found = matcher
			.match_pool("base", "LINK", "0x88fb150bdc53a65fe94dea0c9ba0a6daf8c6e196")
			.await
			.unwrap();
		assert_eq!(
			found.as_deref(),
			Some("BASE.LINK-0X88FB150BDC53A65FE94DEA0C9BA0A6DAF8C6E196")
		);
	}

	#[tokio::test]
	async fn native_assets_match_by_symbol() {
		let matcher = fixture();
		let found = matcher.match_pool("btc", "btc", "").await.unwrap();
		assert_eq!(found.as_deref(), Some("BTC.BTC"));
	}

	#[tokio::test]
	async fn contract_mismatch_is_no_match() {
		let matcher = fixture();
		let found = matcher.match_pool("base", "LINK", "0xdead").await.unwrap();
		assert_eq!(found, None);

		// a contract-bearing query never matches a native pool
		let found = matcher.match_pool("btc", "BTC", "0xdead").await.unwrap();
		assert_eq!(found, None);
	}
}
