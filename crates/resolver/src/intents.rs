//! Intent-network token catalog matcher

use crate::cache::TtlCache;
use crate::{ResolverError, ResolverResult};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const TOKENS_URL: &str = "https://1click.chaindefuser.com/v0/tokens";

const CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Chain codes translated into the intent network's blockchain field values.
const CHAIN_BLOCKCHAINS: &[(&str, &str)] = &[
	("ETH", "eth"),
	("BASE", "base"),
	("AVAX", "avax"),
	("BSC", "bsc"),
	("POLYGON", "pol"),
	("ARB", "arb"),
	("SOL", "sol"),
	("BTC", "btc"),
	("LTC", "ltc"),
	("DOGE", "doge"),
	("BCH", "bch"),
	("TRON", "tron"),
	("TON", "ton"),
	("SUI", "sui"),
	("GAIA", "near"),
];

fn chain_blockchain(chain: &str) -> Option<&'static str> {
	CHAIN_BLOCKCHAINS
		.iter()
		.find(|(code, _)| code.eq_ignore_ascii_case(chain))
		.map(|(_, blockchain)| *blockchain)
}

/// One intent-network token.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentToken {
	pub asset_id: String,
	pub symbol: String,
	pub blockchain: String,
	#[serde(default)]
	pub contract_address: String,
	#[serde(default)]
	pub decimals: u32,
	#[serde(default)]
	pub price: f64,
}

/// Cached matcher over the intent network's token list.
pub struct TokenMatcher {
	tokens_url: String,
	http: reqwest::Client,
	cache: TtlCache<Vec<IntentToken>>,
}

impl TokenMatcher {
	pub fn new(request_timeout: Duration) -> Self {
		Self::with_url(TOKENS_URL, request_timeout)
	}

	pub fn with_url(tokens_url: impl Into<String>, request_timeout: Duration) -> Self {
		Self {
			tokens_url: tokens_url.into(),
			http: reqwest::Client::builder()
				.timeout(request_timeout)
				.build()
				.expect("reqwest client"),
			cache: TtlCache::new(CACHE_TTL),
		}
	}

	/// Builds a matcher over a fixed token list, for test fixtures.
	pub fn with_tokens(tokens: Vec<IntentToken>) -> Self {
		let matcher = Self::new(Duration::from_secs(15));
		matcher.cache.seed("tokens", tokens);
		matcher
	}

	async fn fetch_tokens(&self) -> ResolverResult<Vec<IntentToken>> {
		self.cache
			.get_or_fetch("tokens", || async {
				let response = self.http.get(&self.tokens_url).send().await?;
				let status = response.status();
				let body = response.text().await?;
				if !status.is_success() {
					return Err(ResolverError::Status {
						endpoint: self.tokens_url.clone(),
						status: status.as_u16(),
						body,
					});
				}
				let tokens: Vec<IntentToken> = serde_json::from_str(&body).map_err(|e| {
					ResolverError::invalid_response(format!("token list: {e}"))
				})?;
				debug!(tokens = tokens.len(), "loaded intent token catalog");
				Ok(tokens)
			})
			.await
	}

	/// Finds a token by symbol, optionally narrowed to the blockchain the
	/// chain code maps to. Among same-symbol candidates the highest quoted
	/// price wins; price is a liquidity and legitimacy proxy here, not a
	/// valuation.
	pub async fn match_token(
		&self,
		chain: &str,
		symbol: &str,
	) -> ResolverResult<Option<String>> {
		let tokens = self.fetch_tokens().await?;
		let want_blockchain = chain_blockchain(chain);

		let mut best: Option<&IntentToken> = None;
		for token in &tokens {
			if !token.symbol.eq_ignore_ascii_case(symbol) {
				continue;
			}
			if let Some(blockchain) = want_blockchain {
				if !token.blockchain.eq_ignore_ascii_case(blockchain) {
					continue;
				}
			}
			if best.map(|b| token.price > b.price).unwrap_or(true) {
				best = Some(token);
			}
		}

		Ok(best.map(|t| t.asset_id.clone()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn token(asset_id: &str, symbol: &str, blockchain: &str, price: f64) -> IntentToken {
		IntentToken {
			asset_id: asset_id.to_string(),
			symbol: symbol.to_string(),
			blockchain: blockchain.to_string(),
			contract_address: String::new(),
			decimals: 8,
			price,
		}
	}

	#[tokio::test]
	async fn highest_price_wins_among_same_symbol() {
		let matcher = TokenMatcher::with_tokens(vec![
			token("fake", "BTC", "btc", 0.02),
			token("real", "BTC", "btc", 64_000.0),
		]);
		let found = matcher.match_token("BTC", "btc").await.unwrap();
		assert_eq!(found.as_deref(), Some("real"));
	}

	#[tokio::test]
	async fn chain_filter_narrows_candidates() {
		let matcher = TokenMatcher::with_tokens(vec![
			token("on-eth", "USDT", "eth", 1.0),
			token("on-tron", "USDT", "tron", 1.0),
		]);
		let found = matcher.match_token("TRON", "usdt").await.unwrap();
		assert_eq!(found.as_deref(), Some("on-tron"));
	}

	#[tokio::test]
	async fn unmapped_chain_matches_across_blockchains() {
		let matcher = TokenMatcher::with_tokens(vec![token("anywhere", "RUNE", "near", 5.0)]);
		let found = matcher.match_token("THOR", "RUNE").await.unwrap();
		assert_eq!(found.as_deref(), Some("anywhere"));
	}

	#[tokio::test]
	async fn unknown_symbol_is_no_match() {
		let matcher = TokenMatcher::with_tokens(vec![token("a", "BTC", "btc", 1.0)]);
		assert_eq!(matcher.match_token("BTC", "NOPE").await.unwrap(), None);
	}
}
