//! SimpleSwap custodial exchange integration
//!
//! Quote via the estimate endpoint, execute by creating an exchange record
//! (which returns a one-time deposit address) and transferring USDC to it,
//! then poll the exchange status.

use crate::evm::{gate_source_chains, EvmBridge};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use fundrouter_types::amount::{to_raw_scale, usd_to_usdc_units};
use fundrouter_types::chains::chain_info;
use fundrouter_types::{
	Asset, CatalogCurrency, CurrencyFeed, ExecuteResult, ProviderError, ProviderResult, Quote,
	SwapProvider, SwapStatus, CATEGORY_DEX,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const NAME: &str = "simpleswap";

const BASE_URL: &str = "https://api.simpleswap.io";

/// Curated notation-to-currency mapping for assets SimpleSwap lists.
/// Note: CRO here is the ERC-20 on Ethereum, not native Cronos.
const ASSET_SYMBOLS: &[(&str, &str)] = &[
	// Major L1s
	("BTC.BTC", "btc"),
	("ETH.ETH", "eth"),
	("SOL.SOL", "sol"),
	("AVAX.AVAX", "avaxc"), // C-chain, not X-chain
	("DOT.DOT", "dot"),
	("ADA.ADA", "ada"),
	("TON.TON", "ton"),
	("TRX.TRX", "trx"),
	("SUI.SUI", "sui"),
	// L2s / EVM sidechains
	("BASE.ETH", "ethbase"),
	("ARB.ETH", "etharb"),
	("BSC.BNB", "bnb-bsc"),
	("POLYGON.POL", "pol"),
	// Cosmos ecosystem
	("GAIA.ATOM", "atom"),
	("OSMO.OSMO", "osmo"),
	("DYDX.DYDX", "dydxmain"),
	("SEI.SEI", "sei"),
	("AKASH.AKT", "akt"),
	("NOBLE.USDC", "usdcnoble"),
	("LUNA.LUNA", "luna"),
	("LUNC.LUNC", "lunc"),
	("THOR.RUNE", "rune"),
	// UTXO chains
	("LTC.LTC", "ltc"),
	("BCH.BCH", "bch"),
	("DOGE.DOGE", "doge"),
	("DASH.DASH", "dash"),
	("ZEC.ZEC", "zec"),
	// Other
	("HYPE.HYPE", "hype"),
	("CRO.CRO", "cro"),
];

/// SimpleSwap currency for the USDC held on each source chain.
const SOURCE_SYMBOLS: &[(&str, &str)] = &[("avalanche", "usdcavaxc"), ("base", "usdcbase")];

/// Looks up the SimpleSwap currency for an uppercase `CHAIN.SYMBOL` key.
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

#[derive(Debug, Clone, Deserialize)]
pub struct Exchange {
	pub id: String,
	#[serde(default)]
	pub status: String,
	#[serde(default)]
	pub address_from: String,
	#[serde(default)]
	pub address_to: String,
	#[serde(default, rename = "expected_amount")]
	pub amount_from: String,
	#[serde(default)]
	pub amount_to: String,
}

#[derive(Debug, Clone, Deserialize)]
struct WireCurrency {
	#[serde(default)]
	symbol: String,
	#[serde(default)]
	network: String,
	#[serde(default)]
	contract_address: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateExchangeRequest<'a> {
	fixed: bool,
	currency_from: &'a str,
	currency_to: &'a str,
	amount: String,
	address_to: &'a str,
	extra_id_to: &'a str,
	user_refund_address: &'a str,
}

/// SimpleSwap REST client.
pub struct SimpleSwapClient {
	api_key: String,
	base_url: String,
	http: reqwest::Client,
}

impl SimpleSwapClient {
	pub fn new(api_key: impl Into<String>, request_timeout: Duration) -> Self {
		Self::with_base_url(api_key, BASE_URL, request_timeout)
	}

	pub fn with_base_url(
		api_key: impl Into<String>,
		base_url: impl Into<String>,
		request_timeout: Duration,
	) -> Self {
		Self {
			api_key: api_key.into(),
			base_url: base_url.into(),
			http: reqwest::Client::builder()
				.timeout(request_timeout)
				.build()
				.expect("reqwest client"),
		}
	}

	/// Estimated output amount for a swap, as the venue's decimal string.
	pub async fn get_estimated(&self, from: &str, to: &str, amount: f64) -> ProviderResult<String> {
		let url = format!(
			"{}/get_estimated?api_key={}&fixed=false&currency_from={from}&currency_to={to}&amount={amount}",
			self.base_url, self.api_key,
		);
		let response = self.http.get(&url).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status("get_estimated", status.as_u16(), body));
		}
		// The venue answers with a JSON-quoted decimal string.
		serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("get_estimated: {e}")))
	}

	/// Creates an exchange record; the response carries the deposit address.
	pub async fn create_exchange(
		&self,
		from: &str,
		to: &str,
		amount: f64,
		address_to: &str,
		refund_address: &str,
	) -> ProviderResult<Exchange> {
		let url = format!("{}/create_exchange?api_key={}", self.base_url, self.api_key);
		let request = CreateExchangeRequest {
			fixed: false,
			currency_from: from,
			currency_to: to,
			amount: amount.to_string(),
			address_to,
			extra_id_to: "",
			user_refund_address: refund_address,
		};
		let response = self.http.post(&url).json(&request).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status("create_exchange", status.as_u16(), body));
		}
		serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("create_exchange: {e}")))
	}

	pub async fn get_exchange(&self, id: &str) -> ProviderResult<Exchange> {
		let url = format!(
			"{}/get_exchange?api_key={}&id={}",
			self.base_url,
			self.api_key,
			url::form_urlencoded::byte_serialize(id.as_bytes()).collect::<String>(),
		);
		let response = self.http.get(&url).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status("get_exchange", status.as_u16(), body));
		}
		serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("get_exchange: {e}")))
	}
}

#[async_trait]
impl CurrencyFeed for SimpleSwapClient {
	async fn catalog_currencies(&self) -> ProviderResult<Vec<CatalogCurrency>> {
		let url = format!("{}/get_all_currencies?api_key={}", self.base_url, self.api_key);
		let response = self.http.get(&url).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status(
				"get_all_currencies",
				status.as_u16(),
				body,
			));
		}
		let currencies: Vec<WireCurrency> = serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("get_all_currencies: {e}")))?;

		Ok(currencies
			.into_iter()
			.map(|c| CatalogCurrency {
				id: c.symbol.clone(),
				symbol: c.symbol,
				network: c.network,
				contract_address: c.contract_address.unwrap_or_default(),
			})
			.collect())
	}
}

/// Maps the venue's exchange status strings to terminal swap states.
fn map_exchange_status(status: &str) -> SwapStatus {
	match status {
		"finished" => SwapStatus::Completed,
		"failed" | "refunded" | "expired" => SwapStatus::Failed,
		// waiting, confirming, exchanging, sending
		_ => SwapStatus::Pending,
	}
}

pub struct SimpleSwapProvider {
	client: Arc<SimpleSwapClient>,
	evm: Arc<dyn EvmBridge>,
}

impl SimpleSwapProvider {
	pub fn new(api_key: impl Into<String>, evm: Arc<dyn EvmBridge>, request_timeout: Duration) -> Self {
		Self {
			client: Arc::new(SimpleSwapClient::new(api_key, request_timeout)),
			evm,
		}
	}

	pub fn with_client(evm: Arc<dyn EvmBridge>, client: Arc<SimpleSwapClient>) -> Self {
		Self { client, evm }
	}

	fn target_symbol(to_asset: &Asset) -> Option<String> {
		if let Some(hints) = &to_asset.hints {
			if let Some(symbol) = &hints.exchange_symbol {
				return Some(symbol.clone());
			}
		}
		lookup_symbol(&to_asset.short_notation()).map(str::to_string)
	}
}

#[async_trait]
impl SwapProvider for SimpleSwapProvider {
	fn name(&self) -> &'static str {
		NAME
	}

	fn category(&self) -> &'static str {
		CATEGORY_DEX
	}

	fn supports_asset(&self, asset: &Asset) -> bool {
		Self::target_symbol(asset).is_some()
	}

	async fn quote(
		&self,
		to_asset: &Asset,
		usd_amount: f64,
		destination: &str,
		sender: Address,
	) -> ProviderResult<Vec<Quote>> {
		let to_symbol = Self::target_symbol(to_asset).ok_or_else(|| {
			ProviderError::UnsupportedAsset {
				provider: NAME.to_string(),
				asset: to_asset.to_string(),
			}
		})?;

		let required = usd_to_usdc_units(usd_amount);
		let chains =
			gate_source_chains(self.evm.as_ref(), NAME, &source_chains(), sender, required)
				.await;

		let attempts = chains.iter().map(|chain| {
			let to_symbol = to_symbol.clone();
			async move {
				let from_symbol = source_symbol(chain)?;
				match self
					.client
					.get_estimated(from_symbol, &to_symbol, usd_amount)
					.await
				{
					Ok(estimated) => {
						let Some(expected_raw) = to_raw_scale(&estimated) else {
							warn!(chain, estimated, "simpleswap returned unparseable estimate");
							return None;
						};

						let mut extra = std::collections::HashMap::new();
						extra.insert("simpleswap_from".to_string(), from_symbol.into());
						extra.insert(
							"simpleswap_to".to_string(),
							serde_json::Value::String(to_symbol.clone()),
						);
						extra.insert(
							"simpleswap_destination".to_string(),
							serde_json::Value::String(destination.to_string()),
						);

						Some(Quote {
							provider: NAME.to_string(),
							from_asset: fundrouter_types::usdc_asset(chain),
							to_asset: to_asset.clone(),
							from_chain: chain.clone(),
							input_amount_usd: usd_amount,
							input_amount: usd_to_usdc_units(usd_amount),
							expected_output: estimated,
							expected_output_raw: expected_raw,
							memo: String::new(),
							router: String::new(),
							vault_address: String::new(),
							expiry: 0,
							extra,
						})
					},
					Err(e) => {
						warn!(chain, error = %e, "simpleswap quote failed");
						None
					},
				}
			}
		});

		let quotes: Vec<Quote> = join_all(attempts).await.into_iter().flatten().collect();
		if quotes.is_empty() {
			return Err(ProviderError::NoQuotes {
				provider: NAME.to_string(),
				asset: to_asset.to_string(),
			});
		}
		Ok(quotes)
	}

	async fn execute(
		&self,
		quote: &Quote,
		signer: &PrivateKeySigner,
	) -> ProviderResult<ExecuteResult> {
		let from_symbol = quote.extra_str("simpleswap_from").ok_or_else(|| {
			ProviderError::MissingQuoteData {
				provider: NAME.to_string(),
				field: "simpleswap_from".to_string(),
			}
		})?;
		let to_symbol = quote.extra_str("simpleswap_to").ok_or_else(|| {
			ProviderError::MissingQuoteData {
				provider: NAME.to_string(),
				field: "simpleswap_to".to_string(),
			}
		})?;
		let destination = quote.extra_str("simpleswap_destination").ok_or_else(|| {
			ProviderError::MissingQuoteData {
				provider: NAME.to_string(),
				field: "simpleswap_destination".to_string(),
			}
		})?;

		let info = chain_info(&quote.from_chain).ok_or_else(|| ProviderError::UnknownChain {
			chain: quote.from_chain.clone(),
		})?;

		let refund_address = signer.address().to_string();
		let exchange = self
			.client
			.create_exchange(
				from_symbol,
				to_symbol,
				quote.input_amount_usd,
				destination,
				&refund_address,
			)
			.await?;
		info!(
			exchange_id = exchange.id,
			deposit = exchange.address_from,
			"simpleswap exchange created"
		);

		let deposit: Address = exchange.address_from.parse().map_err(|_| {
			ProviderError::invalid_response(format!(
				"invalid deposit address {:?}",
				exchange.address_from
			))
		})?;

		// The venue only starts once the deposit is confirmed, so wait for
		// the transfer to be mined before reporting the hash.
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

		Ok(ExecuteResult { tx_hash, external_id: exchange.id })
	}

	async fn check_status(&self, _tx_hash: &str, external_id: &str) -> ProviderResult<SwapStatus> {
		if external_id.is_empty() {
			return Ok(SwapStatus::Pending);
		}
		let exchange = self.client.get_exchange(external_id).await?;
		Ok(map_exchange_status(&exchange.status))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_mapping_covers_venue_states() {
		assert_eq!(map_exchange_status("finished"), SwapStatus::Completed);
		for failed in ["failed", "refunded", "expired"] {
			assert_eq!(map_exchange_status(failed), SwapStatus::Failed);
		}
		for open in ["waiting", "confirming", "exchanging", "sending", ""] {
			assert_eq!(map_exchange_status(open), SwapStatus::Pending);
		}
	}

	#[test]
	fn static_mapping_lookup() {
		assert_eq!(lookup_symbol("BTC.BTC"), Some("btc"));
		assert_eq!(lookup_symbol("AVAX.AVAX"), Some("avaxc"));
		assert_eq!(lookup_symbol("KUJI.KUJI"), None);
	}

	#[test]
	fn hint_overrides_static_mapping() {
		let mut asset = Asset::new("SOL", "BONK");
		assert_eq!(SimpleSwapProvider::target_symbol(&asset), None);

		asset.hints = Some(fundrouter_types::ResolvedHints {
			exchange_symbol: Some("bonk".to_string()),
			..Default::default()
		});
		assert_eq!(
			SimpleSwapProvider::target_symbol(&asset),
			Some("bonk".to_string())
		);
	}

	#[test]
	fn exchange_payload_parses() {
		let body = r#"{
			"id": "abc123",
			"status": "waiting",
			"address_from": "0x1111111111111111111111111111111111111111",
			"address_to": "bc1qxyz",
			"expected_amount": "25",
			"amount_to": "0.00021"
		}"#;
		let exchange: Exchange = serde_json::from_str(body).unwrap();
		assert_eq!(exchange.id, "abc123");
		assert_eq!(map_exchange_status(&exchange.status), SwapStatus::Pending);
	}
}
