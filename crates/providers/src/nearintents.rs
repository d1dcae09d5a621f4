//! NEAR Intents (1click) deposit-address integration
//!
//! Quote the intent network for a one-time deposit address, transfer USDC to
//! it without waiting for confirmation, notify the venue of the transaction
//! hash on a best-effort basis, and poll execution status by deposit address.

use crate::evm::{gate_source_chains, EvmBridge};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use fundrouter_types::amount::{to_raw_scale, usd_to_usdc_units};
use fundrouter_types::chains::chain_info;
use fundrouter_types::{
	Asset, ExecuteResult, ProviderError, ProviderResult, Quote, SwapProvider, SwapStatus,
	CATEGORY_DEX,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub const NAME: &str = "nearintents";

const BASE_URL: &str = "https://1click.chaindefuser.com";

/// Slippage tolerance in basis points (1%).
const SLIPPAGE_TOLERANCE_BPS: u32 = 100;

/// Quote deadline horizon.
const QUOTE_DEADLINE_MINUTES: i64 = 60;

/// Notation-to-token-id mapping for destination assets on the intent network.
const ASSET_TOKEN_IDS: &[(&str, &str)] = &[
	// Major L1s
	("BTC.BTC", "nep141:btc.omft.near"),
	("ETH.ETH", "nep141:eth.omft.near"),
	("SOL.SOL", "nep141:sol.omft.near"),
	("AVAX.AVAX", "nep245:v2_1.omni.hot.tg:43114_11111111111111111111"),
	("ADA.ADA", "nep141:cardano.omft.near"),
	("TON.TON", "nep245:v2_1.omni.hot.tg:1117_"),
	("TRX.TRX", "nep141:tron.omft.near"),
	("SUI.SUI", "nep141:sui.omft.near"),
	("XRP.XRP", "nep141:xrp.omft.near"),
	// L2s / EVM sidechains
	("BSC.BNB", "nep245:v2_1.omni.hot.tg:56_11111111111111111111"),
	("POLYGON.POL", "nep245:v2_1.omni.hot.tg:137_11111111111111111111"),
	// UTXO chains
	("LTC.LTC", "nep141:ltc.omft.near"),
	("BCH.BCH", "nep141:bch.omft.near"),
	("DOGE.DOGE", "nep141:doge.omft.near"),
];

/// Intent-network token id of the USDC held on each source chain.
const SOURCE_TOKEN_IDS: &[(&str, &str)] = &[
	(
		"avalanche",
		"nep245:v2_1.omni.hot.tg:43114_3atVJH3r5c4GqiSYmg9fECvjc47o",
	),
	(
		"base",
		"nep141:base-0x833589fcd6edb6e08f4c7c32d4f71b54bda02913.omft.near",
	),
];

/// Looks up the intent-network token id for an uppercase `CHAIN.SYMBOL` key.
pub fn lookup_token_id(key: &str) -> Option<&'static str> {
	ASSET_TOKEN_IDS
		.iter()
		.find(|(k, _)| *k == key)
		.map(|(_, id)| *id)
}

fn source_token_id(chain: &str) -> Option<&'static str> {
	SOURCE_TOKEN_IDS
		.iter()
		.find(|(k, _)| *k == chain)
		.map(|(_, id)| *id)
}

fn source_chains() -> Vec<String> {
	SOURCE_TOKEN_IDS.iter().map(|(k, _)| k.to_string()).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest<'a> {
	dry: bool,
	swap_type: &'a str,
	slippage_tolerance: u32,
	origin_asset: &'a str,
	deposit_type: &'a str,
	destination_asset: &'a str,
	amount: String,
	refund_to: String,
	refund_type: &'a str,
	recipient: &'a str,
	recipient_type: &'a str,
	deadline: String,
	deposit_mode: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDetails {
	#[serde(default)]
	pub deposit_address: String,
	#[serde(default)]
	pub amount_out: String,
	#[serde(default)]
	pub amount_out_formatted: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
	#[serde(default)]
	pub quote: QuoteDetails,
	#[serde(default)]
	pub correlation_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitDepositTxRequest<'a> {
	tx_hash: &'a str,
	deposit_address: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ExecutionStatusResponse {
	#[serde(default)]
	status: String,
}

/// 1click REST client (bearer-token auth).
pub struct OneClickClient {
	api_key: String,
	base_url: String,
	http: reqwest::Client,
}

impl OneClickClient {
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

	async fn get_quote(&self, request: &QuoteRequest<'_>) -> ProviderResult<QuoteResponse> {
		let url = format!("{}/v0/quote", self.base_url);
		let response = self
			.http
			.post(&url)
			.bearer_auth(&self.api_key)
			.json(request)
			.send()
			.await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status(url, status.as_u16(), body));
		}
		serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("quote: {e}")))
	}

	/// Notifies the venue of the deposit transaction to speed up processing.
	pub async fn submit_deposit_tx(
		&self,
		tx_hash: &str,
		deposit_address: &str,
	) -> ProviderResult<()> {
		let url = format!("{}/v0/deposit/submit", self.base_url);
		let response = self
			.http
			.post(&url)
			.bearer_auth(&self.api_key)
			.json(&SubmitDepositTxRequest { tx_hash, deposit_address })
			.send()
			.await?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(ProviderError::http_status(url, status.as_u16(), body));
		}
		Ok(())
	}

	/// Execution status keyed by the swap's one-time deposit address.
	pub async fn get_execution_status(&self, deposit_address: &str) -> ProviderResult<String> {
		let url = format!(
			"{}/v0/status?depositAddress={}",
			self.base_url,
			url::form_urlencoded::byte_serialize(deposit_address.as_bytes()).collect::<String>(),
		);
		let response = self.http.get(&url).bearer_auth(&self.api_key).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status(url, status.as_u16(), body));
		}
		let parsed: ExecutionStatusResponse = serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("status: {e}")))?;
		Ok(parsed.status)
	}
}

/// Venue execution states: SUCCESS completes; FAILED and REFUNDED fail;
/// everything else (PENDING_DEPOSIT, INCOMPLETE_DEPOSIT, PROCESSING,
/// KNOWN_DEPOSIT_TX) is still in flight.
fn map_execution_status(status: &str) -> SwapStatus {
	match status {
		"SUCCESS" => SwapStatus::Completed,
		"FAILED" | "REFUNDED" => SwapStatus::Failed,
		_ => SwapStatus::Pending,
	}
}

pub struct NearIntentsProvider {
	client: OneClickClient,
	evm: Arc<dyn EvmBridge>,
}

impl NearIntentsProvider {
	pub fn new(api_key: impl Into<String>, evm: Arc<dyn EvmBridge>, request_timeout: Duration) -> Self {
		Self {
			client: OneClickClient::new(api_key, request_timeout),
			evm,
		}
	}

	pub fn with_client(evm: Arc<dyn EvmBridge>, client: OneClickClient) -> Self {
		Self { client, evm }
	}

	fn target_token_id(to_asset: &Asset) -> Option<String> {
		if let Some(hints) = &to_asset.hints {
			if let Some(token_id) = &hints.intent_token_id {
				return Some(token_id.clone());
			}
		}
		lookup_token_id(&to_asset.short_notation()).map(str::to_string)
	}
}

#[async_trait]
impl SwapProvider for NearIntentsProvider {
	fn name(&self) -> &'static str {
		NAME
	}

	fn category(&self) -> &'static str {
		CATEGORY_DEX
	}

	fn supports_asset(&self, asset: &Asset) -> bool {
		Self::target_token_id(asset).is_some()
	}

	async fn quote(
		&self,
		to_asset: &Asset,
		usd_amount: f64,
		destination: &str,
		sender: Address,
	) -> ProviderResult<Vec<Quote>> {
		let dest_token_id =
			Self::target_token_id(to_asset).ok_or_else(|| ProviderError::UnsupportedAsset {
				provider: NAME.to_string(),
				asset: to_asset.to_string(),
			})?;

		let required = usd_to_usdc_units(usd_amount);
		let chains =
			gate_source_chains(self.evm.as_ref(), NAME, &source_chains(), sender, required)
				.await;

		let deadline = (Utc::now() + ChronoDuration::minutes(QUOTE_DEADLINE_MINUTES))
			.to_rfc3339_opts(SecondsFormat::Millis, true);

		let attempts = chains.iter().map(|chain| {
			let dest_token_id = dest_token_id.clone();
			let deadline = deadline.clone();
			async move {
				let origin_token_id = source_token_id(chain)?;
				let request = QuoteRequest {
					dry: false,
					swap_type: "EXACT_INPUT",
					slippage_tolerance: SLIPPAGE_TOLERANCE_BPS,
					origin_asset: origin_token_id,
					deposit_type: "ORIGIN_CHAIN",
					destination_asset: &dest_token_id,
					amount: required.to_string(),
					refund_to: sender.to_string(),
					refund_type: "ORIGIN_CHAIN",
					recipient: destination,
					recipient_type: "DESTINATION_CHAIN",
					deadline,
					deposit_mode: "SIMPLE",
				};

				let response = match self.client.get_quote(&request).await {
					Ok(response) => response,
					Err(e) => {
						warn!(chain, error = %e, "nearintents quote failed");
						return None;
					},
				};

				if response.quote.deposit_address.is_empty() {
					warn!(chain, "nearintents returned no deposit address");
					return None;
				}

				let Some(expected_raw) = to_raw_scale(&response.quote.amount_out_formatted)
				else {
					warn!(
						chain,
						amount = response.quote.amount_out_formatted,
						"nearintents returned unparseable amount"
					);
					return None;
				};

				let mut extra = HashMap::new();
				extra.insert(
					"nearintents_deposit_address".to_string(),
					serde_json::Value::String(response.quote.deposit_address.clone()),
				);
				extra.insert(
					"nearintents_correlation_id".to_string(),
					serde_json::Value::String(response.correlation_id.clone()),
				);
				extra.insert(
					"nearintents_destination".to_string(),
					serde_json::Value::String(destination.to_string()),
				);

				Some(Quote {
					provider: NAME.to_string(),
					from_asset: fundrouter_types::usdc_asset(chain),
					to_asset: to_asset.clone(),
					from_chain: chain.clone(),
					input_amount_usd: usd_amount,
					input_amount: required,
					expected_output: response.quote.amount_out_formatted,
					expected_output_raw: expected_raw,
					memo: String::new(),
					router: String::new(),
					vault_address: response.quote.deposit_address,
					expiry: 0,
					extra,
				})
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
		let deposit_address = quote.extra_str("nearintents_deposit_address").ok_or_else(|| {
			ProviderError::MissingQuoteData {
				provider: NAME.to_string(),
				field: "nearintents_deposit_address".to_string(),
			}
		})?;

		let info = chain_info(&quote.from_chain).ok_or_else(|| ProviderError::UnknownChain {
			chain: quote.from_chain.clone(),
		})?;

		let deposit: Address = deposit_address.parse().map_err(|_| {
			ProviderError::invalid_response(format!(
				"invalid deposit address {deposit_address:?}"
			))
		})?;

		// Completion is inherently asynchronous here; status polling picks up
		// confirmation, so the transfer is not awaited to mining.
		let tx_hash = self
			.evm
			.transfer(
				&quote.from_chain,
				signer,
				info.usdc,
				deposit,
				quote.input_amount,
				false,
			)
			.await?;

		// Best-effort speed-up: the venue discovers the deposit on its own if
		// this notification is lost.
		if let Err(e) = self.client.submit_deposit_tx(&tx_hash, deposit_address).await {
			warn!(error = %e, "nearintents deposit-tx notify failed (non-fatal)");
		}

		Ok(ExecuteResult {
			tx_hash,
			// Status is polled by deposit address.
			external_id: deposit_address.to_string(),
		})
	}

	async fn check_status(&self, _tx_hash: &str, external_id: &str) -> ProviderResult<SwapStatus> {
		if external_id.is_empty() {
			return Ok(SwapStatus::Pending);
		}
		let status = self.client.get_execution_status(external_id).await?;
		Ok(map_execution_status(&status))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::U256;

	#[test]
	fn execution_status_mapping() {
		assert_eq!(map_execution_status("SUCCESS"), SwapStatus::Completed);
		assert_eq!(map_execution_status("FAILED"), SwapStatus::Failed);
		assert_eq!(map_execution_status("REFUNDED"), SwapStatus::Failed);
		for open in [
			"PENDING_DEPOSIT",
			"INCOMPLETE_DEPOSIT",
			"PROCESSING",
			"KNOWN_DEPOSIT_TX",
			"",
		] {
			assert_eq!(map_execution_status(open), SwapStatus::Pending);
		}
	}

	#[test]
	fn token_id_lookup() {
		assert_eq!(lookup_token_id("BTC.BTC"), Some("nep141:btc.omft.near"));
		assert_eq!(lookup_token_id("ETH.USDC"), None);
	}

	#[test]
	fn quote_response_parses() {
		let body = r#"{
			"quote": {
				"depositAddress": "0x2222222222222222222222222222222222222222",
				"amountOut": "21000",
				"amountOutFormatted": "0.00021"
			},
			"correlationId": "corr-1"
		}"#;
		let response: QuoteResponse = serde_json::from_str(body).unwrap();
		assert_eq!(response.correlation_id, "corr-1");
		assert_eq!(
			to_raw_scale(&response.quote.amount_out_formatted).unwrap(),
			U256::from(21_000u64)
		);
	}
}
