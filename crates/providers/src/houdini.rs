//! Houdini privacy exchange integration
//!
//! Custodial exchange shape with a fixed $50 USD floor per swap. Quotes try
//! CEX-only routes first, falling back to all routes. Two providers share the
//! same venue client: the regular one and an XMR-routed variant that hops
//! through anonymous XMR and is only reachable through an explicit routing
//! hint.

use crate::evm::{gate_source_chains, EvmBridge};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use fundrouter_types::amount::{to_raw_scale, usd_to_usdc_units};
use fundrouter_types::chains::chain_info;
use fundrouter_types::{
	Asset, CatalogCurrency, CurrencyFeed, ExecuteResult, ProviderError, ProviderResult, Quote,
	SwapProvider, SwapStatus, CATEGORY_PRIVATE, CATEGORY_XMR_PRIVATE,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const NAME: &str = "houdini";
pub const XMR_NAME: &str = "houdini-xmr";

const BASE_URL: &str = "https://api-partner.houdiniswap.com";

/// Venue-imposed USD floor, checked before any network call.
const MIN_SWAP_USD: f64 = 50.0;

/// Curated notation-to-token mapping for assets Houdini lists.
const ASSET_SYMBOLS: &[(&str, &str)] = &[
	// Major L1s
	("BTC.BTC", "BTC"),
	("ETH.ETH", "ETH"),
	("SOL.SOL", "SOL"),
	("AVAX.AVAX", "AVAXC"), // C-chain
	("DOT.DOT", "DOT"),
	("ADA.ADA", "ADA"),
	("TON.TON", "TON"),
	("TRX.TRX", "TRX"),
	("SUI.SUI", "SUI"),
	// L2s / EVM sidechains
	("BASE.ETH", "ETHBASE"),
	("ARB.ETH", "ETHARB"),
	("BSC.BNB", "BNB"),
	// Cosmos ecosystem
	("GAIA.ATOM", "ATOM"),
	("THOR.RUNE", "RUNE"),
	("SEI.SEI", "SEI"),
	// UTXO chains
	("LTC.LTC", "LTC"),
	("BCH.BCH", "BCH"),
	("DOGE.DOGE", "DOGE"),
	("DASH.DASH", "DASH"),
	("ZEC.ZEC", "ZEC"),
];

/// Houdini token id for the USDC held on each source chain.
const SOURCE_SYMBOLS: &[(&str, &str)] = &[("avalanche", "USDCAVAXC"), ("base", "USDCBASE")];

/// Looks up the Houdini token id for an uppercase `CHAIN.SYMBOL` key.
pub fn lookup_symbol(key: &str) -> Option<&'static str> {
	ASSET_SYMBOLS
		.iter()
		.find(|(k, _)| *k == key)
		.map(|(_, sym)| *sym)
}

fn source_symbol(chain: &str) -> Option<&'static str> {
	SOURCE_SYMBOLS
		.iter()
		.find(|(k, _)| *k == chain)
		.map(|(_, sym)| *sym)
}

fn source_chains() -> Vec<String> {
	SOURCE_SYMBOLS.iter().map(|(k, _)| k.to_string()).collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
	#[serde(default)]
	pub amount_out: f64,
	#[serde(default)]
	pub amount_in: f64,
	#[serde(default)]
	pub quote_id: String,
	#[serde(default)]
	pub in_quote_id: String,
	#[serde(default)]
	pub out_quote_id: String,
	#[serde(default)]
	pub min: f64,
	#[serde(default)]
	pub max: f64,
	#[serde(default)]
	pub duration: i64,
	#[serde(default)]
	pub swap_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
	#[serde(default)]
	pub id: String,
	#[serde(default)]
	pub houdini_id: String,
	#[serde(default)]
	pub sender_address: String,
	#[serde(default)]
	pub receiver_address: String,
	#[serde(default)]
	pub status: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
	#[serde(default)]
	pub houdini_id: String,
	#[serde(default)]
	pub status: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireToken {
	#[serde(default)]
	id: String,
	#[serde(default)]
	symbol: String,
	#[serde(default)]
	network: String,
	#[serde(default)]
	contract_address: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateExchangeRequest<'a> {
	amount: f64,
	from: &'a str,
	to: &'a str,
	address_to: &'a str,
	anonymous: bool,
	#[serde(skip_serializing_if = "str::is_empty")]
	quote_id: &'a str,
	#[serde(skip_serializing_if = "str::is_empty")]
	in_quote_id: &'a str,
	#[serde(skip_serializing_if = "str::is_empty")]
	out_quote_id: &'a str,
}

/// Houdini partner-API client.
pub struct HoudiniClient {
	api_key: String,
	api_secret: String,
	base_url: String,
	http: reqwest::Client,
}

impl HoudiniClient {
	pub fn new(
		api_key: impl Into<String>,
		api_secret: impl Into<String>,
		request_timeout: Duration,
	) -> Self {
		Self::with_base_url(api_key, api_secret, BASE_URL, request_timeout)
	}

	pub fn with_base_url(
		api_key: impl Into<String>,
		api_secret: impl Into<String>,
		base_url: impl Into<String>,
		request_timeout: Duration,
	) -> Self {
		Self {
			api_key: api_key.into(),
			api_secret: api_secret.into(),
			base_url: base_url.into(),
			http: reqwest::Client::builder()
				.timeout(request_timeout)
				.build()
				.expect("reqwest client"),
		}
	}

	fn auth_header(&self) -> String {
		format!("{}:{}", self.api_key, self.api_secret)
	}

	async fn get<T: serde::de::DeserializeOwned>(&self, path_and_query: &str) -> ProviderResult<T> {
		let url = format!("{}{path_and_query}", self.base_url);
		let response = self
			.http
			.get(&url)
			.header("Authorization", self.auth_header())
			.send()
			.await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status(url, status.as_u16(), body));
		}
		serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("{path_and_query}: {e}")))
	}

	/// Pair bounds in source-token units.
	pub async fn get_min_max(
		&self,
		from: &str,
		to: &str,
		anonymous: bool,
	) -> ProviderResult<(f64, f64)> {
		let bounds: [f64; 2] = self
			.get(&format!(
				"/getMinMax?from={from}&to={to}&anonymous={anonymous}&cexOnly=true"
			))
			.await?;
		Ok((bounds[0], bounds[1]))
	}

	async fn quote_once(
		&self,
		from: &str,
		to: &str,
		amount: f64,
		anonymous: bool,
		cex_only: bool,
	) -> ProviderResult<QuoteResponse> {
		self.get(&format!(
			"/quote?amount={amount}&from={from}&to={to}&anonymous={anonymous}&cexOnly={cex_only}"
		))
		.await
	}

	/// Quote, trying CEX-only routes first and falling back to all routes.
	pub async fn get_quote(&self, from: &str, to: &str, amount: f64) -> ProviderResult<QuoteResponse> {
		match self.quote_once(from, to, amount, false, true).await {
			Ok(quote) => Ok(quote),
			Err(e) => {
				debug!(error = %e, "houdini cex-only quote unavailable, retrying all routes");
				self.quote_once(from, to, amount, false, false).await
			},
		}
	}

	/// Quote for the anonymous XMR-routed path.
	pub async fn get_quote_xmr(
		&self,
		from: &str,
		to: &str,
		amount: f64,
	) -> ProviderResult<QuoteResponse> {
		self.quote_once(from, to, amount, true, false).await
	}

	pub async fn create_exchange(
		&self,
		from: &str,
		to: &str,
		amount: f64,
		address_to: &str,
		quote_id: &str,
	) -> ProviderResult<ExchangeResponse> {
		self.post_exchange(CreateExchangeRequest {
			amount,
			from,
			to,
			address_to,
			anonymous: false,
			quote_id,
			in_quote_id: "",
			out_quote_id: "",
		})
		.await
	}

	pub async fn create_exchange_xmr(
		&self,
		from: &str,
		to: &str,
		amount: f64,
		address_to: &str,
		in_quote_id: &str,
		out_quote_id: &str,
	) -> ProviderResult<ExchangeResponse> {
		self.post_exchange(CreateExchangeRequest {
			amount,
			from,
			to,
			address_to,
			anonymous: true,
			quote_id: "",
			in_quote_id,
			out_quote_id,
		})
		.await
	}

	async fn post_exchange(
		&self,
		request: CreateExchangeRequest<'_>,
	) -> ProviderResult<ExchangeResponse> {
		let url = format!("{}/exchange", self.base_url);
		let response = self
			.http
			.post(&url)
			.header("Authorization", self.auth_header())
			.json(&request)
			.send()
			.await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status(url, status.as_u16(), body));
		}
		serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("exchange: {e}")))
	}

	pub async fn get_status(&self, houdini_id: &str) -> ProviderResult<StatusResponse> {
		self.get(&format!(
			"/status?id={}",
			url::form_urlencoded::byte_serialize(houdini_id.as_bytes()).collect::<String>()
		))
		.await
	}
}

#[async_trait]
impl CurrencyFeed for HoudiniClient {
	async fn catalog_currencies(&self) -> ProviderResult<Vec<CatalogCurrency>> {
		let tokens: Vec<WireToken> = self.get("/tokens").await?;
		Ok(tokens
			.into_iter()
			.map(|t| CatalogCurrency {
				id: t.id,
				symbol: t.symbol,
				network: t.network,
				contract_address: t.contract_address.unwrap_or_default(),
			})
			.collect())
	}
}

/// Houdini status codes: 0 waiting, 1 confirming, 2 exchanging, 3 sending,
/// 4 completed, 5+ failed or expired.
fn map_numeric_status(status: i64) -> SwapStatus {
	match status {
		4 => SwapStatus::Completed,
		s if s >= 5 => SwapStatus::Failed,
		_ => SwapStatus::Pending,
	}
}

fn target_symbol(to_asset: &Asset) -> Option<String> {
	if let Some(hints) = &to_asset.hints {
		if let Some(symbol) = &hints.private_symbol {
			return Some(symbol.clone());
		}
	}
	lookup_symbol(&to_asset.short_notation()).map(str::to_string)
}

/// Shared quote/execute/status machinery for both Houdini providers; the XMR
/// variant differs only in the quote endpoint and the quote-id bookkeeping.
struct HoudiniCore {
	client: Arc<HoudiniClient>,
	evm: Arc<dyn EvmBridge>,
}

impl HoudiniCore {
	async fn quote(
		&self,
		provider: &'static str,
		xmr_routed: bool,
		to_asset: &Asset,
		usd_amount: f64,
		destination: &str,
		sender: Address,
	) -> ProviderResult<Vec<Quote>> {
		if usd_amount < MIN_SWAP_USD {
			return Err(ProviderError::BelowMinimum {
				provider: provider.to_string(),
				minimum: MIN_SWAP_USD,
				requested: usd_amount,
			});
		}

		let to_symbol = target_symbol(to_asset).ok_or_else(|| ProviderError::UnsupportedAsset {
			provider: provider.to_string(),
			asset: to_asset.to_string(),
		})?;

		let required = usd_to_usdc_units(usd_amount);
		let chains =
			gate_source_chains(self.evm.as_ref(), provider, &source_chains(), sender, required)
				.await;

		let attempts = chains.iter().map(|chain| {
			let to_symbol = to_symbol.clone();
			async move {
				let from_symbol = source_symbol(chain)?;
				let result = if xmr_routed {
					self.client.get_quote_xmr(from_symbol, &to_symbol, usd_amount).await
				} else {
					self.client.get_quote(from_symbol, &to_symbol, usd_amount).await
				};
				let response = match result {
					Ok(response) => response,
					Err(e) => {
						warn!(provider, chain, error = %e, "houdini quote failed");
						return None;
					},
				};

				let output = format!("{}", response.amount_out);
				let Some(expected_raw) = to_raw_scale(&output) else {
					warn!(provider, chain, output, "houdini returned unparseable amount");
					return None;
				};

				let mut extra = HashMap::new();
				extra.insert("houdini_from".to_string(), from_symbol.into());
				extra.insert(
					"houdini_to".to_string(),
					serde_json::Value::String(to_symbol.clone()),
				);
				extra.insert(
					"houdini_destination".to_string(),
					serde_json::Value::String(destination.to_string()),
				);
				if xmr_routed {
					extra.insert(
						"houdini_in_quote_id".to_string(),
						serde_json::Value::String(response.in_quote_id.clone()),
					);
					extra.insert(
						"houdini_out_quote_id".to_string(),
						serde_json::Value::String(response.out_quote_id.clone()),
					);
				} else {
					extra.insert(
						"houdini_quote_id".to_string(),
						serde_json::Value::String(response.quote_id.clone()),
					);
				}

				Some(Quote {
					provider: provider.to_string(),
					from_asset: fundrouter_types::usdc_asset(chain),
					to_asset: to_asset.clone(),
					from_chain: chain.clone(),
					input_amount_usd: usd_amount,
					input_amount: usd_to_usdc_units(usd_amount),
					expected_output: output,
					expected_output_raw: expected_raw,
					memo: String::new(),
					router: String::new(),
					vault_address: String::new(),
					expiry: 0,
					extra,
				})
			}
		});

		let quotes: Vec<Quote> = join_all(attempts).await.into_iter().flatten().collect();
		if quotes.is_empty() {
			return Err(ProviderError::NoQuotes {
				provider: provider.to_string(),
				asset: to_asset.to_string(),
			});
		}
		Ok(quotes)
	}

	async fn execute(
		&self,
		provider: &'static str,
		xmr_routed: bool,
		quote: &Quote,
		signer: &PrivateKeySigner,
	) -> ProviderResult<ExecuteResult> {
		let missing = |field: &str| ProviderError::MissingQuoteData {
			provider: provider.to_string(),
			field: field.to_string(),
		};

		let from_symbol = quote.extra_str("houdini_from").ok_or_else(|| missing("houdini_from"))?;
		let to_symbol = quote.extra_str("houdini_to").ok_or_else(|| missing("houdini_to"))?;
		let destination = quote
			.extra_str("houdini_destination")
			.ok_or_else(|| missing("houdini_destination"))?;

		let info = chain_info(&quote.from_chain).ok_or_else(|| ProviderError::UnknownChain {
			chain: quote.from_chain.clone(),
		})?;

		let exchange = if xmr_routed {
			let in_quote_id = quote.extra_str("houdini_in_quote_id").unwrap_or_default();
			let out_quote_id = quote.extra_str("houdini_out_quote_id").unwrap_or_default();
			self.client
				.create_exchange_xmr(
					from_symbol,
					to_symbol,
					quote.input_amount_usd,
					destination,
					in_quote_id,
					out_quote_id,
				)
				.await?
		} else {
			let quote_id = quote.extra_str("houdini_quote_id").unwrap_or_default();
			self.client
				.create_exchange(
					from_symbol,
					to_symbol,
					quote.input_amount_usd,
					destination,
					quote_id,
				)
				.await?
		};
		info!(
			provider,
			houdini_id = exchange.houdini_id,
			deposit = exchange.sender_address,
			"houdini exchange created"
		);

		let deposit: Address = exchange.sender_address.parse().map_err(|_| {
			ProviderError::invalid_response(format!(
				"invalid deposit address {:?}",
				exchange.sender_address
			))
		})?;

		let tx_hash = self
			.evm
			.transfer(
				&quote.from_chain,
				signer,
				info.usdc,
				deposit,
				quote.input_amount,
				true,
			)
			.await?;

		Ok(ExecuteResult { tx_hash, external_id: exchange.houdini_id })
	}

	async fn check_status(&self, external_id: &str) -> ProviderResult<SwapStatus> {
		if external_id.is_empty() {
			return Ok(SwapStatus::Pending);
		}
		let status = self.client.get_status(external_id).await?;
		Ok(map_numeric_status(status.status))
	}
}

pub struct HoudiniProvider {
	core: HoudiniCore,
}

impl HoudiniProvider {
	pub fn new(
		api_key: impl Into<String>,
		api_secret: impl Into<String>,
		evm: Arc<dyn EvmBridge>,
		request_timeout: Duration,
	) -> Self {
		let client = Arc::new(HoudiniClient::new(api_key, api_secret, request_timeout));
		Self::with_client(evm, client)
	}

	pub fn with_client(evm: Arc<dyn EvmBridge>, client: Arc<HoudiniClient>) -> Self {
		Self { core: HoudiniCore { client, evm } }
	}
}

#[async_trait]
impl SwapProvider for HoudiniProvider {
	fn name(&self) -> &'static str {
		NAME
	}

	fn category(&self) -> &'static str {
		CATEGORY_PRIVATE
	}

	fn supports_asset(&self, asset: &Asset) -> bool {
		target_symbol(asset).is_some()
	}

	async fn quote(
		&self,
		to_asset: &Asset,
		usd_amount: f64,
		destination: &str,
		sender: Address,
	) -> ProviderResult<Vec<Quote>> {
		self.core
			.quote(NAME, false, to_asset, usd_amount, destination, sender)
			.await
	}

	async fn execute(
		&self,
		quote: &Quote,
		signer: &PrivateKeySigner,
	) -> ProviderResult<ExecuteResult> {
		self.core.execute(NAME, false, quote, signer).await
	}

	async fn check_status(&self, _tx_hash: &str, external_id: &str) -> ProviderResult<SwapStatus> {
		self.core.check_status(external_id).await
	}
}

/// XMR-routed Houdini variant. Only reachable through an explicit routing
/// hint; the manager never considers the `xmr-private` category otherwise.
pub struct HoudiniXmrProvider {
	core: HoudiniCore,
}

impl HoudiniXmrProvider {
	pub fn new(
		api_key: impl Into<String>,
		api_secret: impl Into<String>,
		evm: Arc<dyn EvmBridge>,
		request_timeout: Duration,
	) -> Self {
		let client = Arc::new(HoudiniClient::new(api_key, api_secret, request_timeout));
		Self::with_client(evm, client)
	}

	pub fn with_client(evm: Arc<dyn EvmBridge>, client: Arc<HoudiniClient>) -> Self {
		Self { core: HoudiniCore { client, evm } }
	}
}

#[async_trait]
impl SwapProvider for HoudiniXmrProvider {
	fn name(&self) -> &'static str {
		XMR_NAME
	}

	fn category(&self) -> &'static str {
		CATEGORY_XMR_PRIVATE
	}

	fn supports_asset(&self, asset: &Asset) -> bool {
		target_symbol(asset).is_some()
	}

	async fn quote(
		&self,
		to_asset: &Asset,
		usd_amount: f64,
		destination: &str,
		sender: Address,
	) -> ProviderResult<Vec<Quote>> {
		self.core
			.quote(XMR_NAME, true, to_asset, usd_amount, destination, sender)
			.await
	}

	async fn execute(
		&self,
		quote: &Quote,
		signer: &PrivateKeySigner,
	) -> ProviderResult<ExecuteResult> {
		self.core.execute(XMR_NAME, true, quote, signer).await
	}

	async fn check_status(&self, _tx_hash: &str, external_id: &str) -> ProviderResult<SwapStatus> {
		self.core.check_status(external_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn numeric_status_mapping() {
		for pending in [0, 1, 2, 3] {
			assert_eq!(map_numeric_status(pending), SwapStatus::Pending);
		}
		assert_eq!(map_numeric_status(4), SwapStatus::Completed);
		assert_eq!(map_numeric_status(5), SwapStatus::Failed);
		assert_eq!(map_numeric_status(7), SwapStatus::Failed);
	}

	#[test]
	fn static_mapping_lookup() {
		assert_eq!(lookup_symbol("BTC.BTC"), Some("BTC"));
		assert_eq!(lookup_symbol("AVAX.AVAX"), Some("AVAXC"));
		assert_eq!(lookup_symbol("POLYGON.POL"), None);
	}

	#[test]
	fn quote_response_parses_camel_case() {
		let body = r#"{
			"amountOut": 0.0021,
			"amountIn": 50,
			"quoteId": "q1",
			"inQuoteId": "in1",
			"outQuoteId": "out1",
			"min": 10,
			"max": 5000,
			"duration": 15,
			"swapName": "USDCBASE-BTC"
		}"#;
		let quote: QuoteResponse = serde_json::from_str(body).unwrap();
		assert_eq!(quote.quote_id, "q1");
		assert!((quote.amount_out - 0.0021).abs() < f64::EPSILON);
	}
}
