//! THORChain router-deposit integration
//!
//! Quote via thornode's swap-quote endpoint, execute by approving the chain's
//! THORChain router for USDC and calling `depositWithExpiry` with the quoted
//! memo, then poll the transaction-status endpoint until the outbound leg is
//! signed (or, for RUNE-side destinations with no outbound leg, until the
//! swap is finalised).

use crate::evm::{gate_source_chains, EvmBridge};
use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use chrono::Utc;
use fundrouter_types::amount::{usd_to_router_units, usd_to_usdc_units};
use fundrouter_types::chains::chain_info;
use fundrouter_types::{
	Asset, ExecuteResult, ProviderError, ProviderResult, Quote, SwapProvider, SwapStatus,
	CATEGORY_DEX,
};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const NAME: &str = "thorchain";

const THORNODE_BASE_URL: &str = "https://thornode.ninerealms.com";

/// thornode allows roughly one request per second per client.
const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Gas limit for the router `depositWithExpiry` call.
const DEPOSIT_GAS_LIMIT: u64 = 200_000;

/// Chains THORChain is connected to; a cheap support pre-check before the
/// pool catalog is consulted.
const CONNECTED_CHAINS: &[&str] = &[
	"BTC", "ETH", "AVAX", "BSC", "BASE", "DOGE", "LTC", "BCH", "GAIA", "THOR", "XRP",
];

sol! {
	function depositWithExpiry(
		address vault,
		address asset,
		uint256 amount,
		string memo,
		uint256 expiry
	) external payable;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteFees {
	#[serde(default)]
	pub asset: String,
	#[serde(default)]
	pub affiliate: String,
	#[serde(default)]
	pub outbound: String,
	#[serde(default)]
	pub liquidity: String,
	#[serde(default)]
	pub total: String,
	#[serde(default)]
	pub slippage_bps: i64,
	#[serde(default)]
	pub total_bps: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteResponse {
	#[serde(default)]
	pub inbound_address: String,
	#[serde(default)]
	pub router: String,
	#[serde(default)]
	pub expiry: i64,
	#[serde(default)]
	pub memo: String,
	#[serde(default)]
	pub expected_amount_out: String,
	#[serde(default)]
	pub recommended_min_amount_in: String,
	#[serde(default)]
	pub recommended_gas_rate: String,
	#[serde(default)]
	pub fees: QuoteFees,
	#[serde(default)]
	pub outbound_delay_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundAddress {
	pub chain: String,
	pub address: String,
	#[serde(default)]
	pub router: String,
	#[serde(default)]
	pub halted: bool,
	#[serde(default)]
	pub gas_rate: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TxStage {
	#[serde(default)]
	pub completed: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxStages {
	#[serde(default)]
	pub inbound_observed: Option<TxStage>,
	#[serde(default)]
	pub inbound_finalised: Option<TxStage>,
	#[serde(default)]
	pub swap_finalised: Option<TxStage>,
	#[serde(default)]
	pub outbound_signed: Option<TxStage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxStatusResponse {
	#[serde(default)]
	pub stages: TxStages,
}

/// Minimal thornode REST client, rate limited to one request per second.
pub struct ThornodeClient {
	base_url: String,
	http: reqwest::Client,
	last_request: Mutex<Option<Instant>>,
}

impl ThornodeClient {
	pub fn new(request_timeout: Duration) -> Self {
		Self::with_base_url(THORNODE_BASE_URL, request_timeout)
	}

	pub fn with_base_url(base_url: impl Into<String>, request_timeout: Duration) -> Self {
		Self {
			base_url: base_url.into(),
			http: reqwest::Client::builder()
				.timeout(request_timeout)
				.build()
				.expect("reqwest client"),
			last_request: Mutex::new(None),
		}
	}

	async fn rate_limit(&self) {
		let mut last = self.last_request.lock().await;
		if let Some(previous) = *last {
			let since = previous.elapsed();
			if since < RATE_LIMIT_INTERVAL {
				tokio::time::sleep(RATE_LIMIT_INTERVAL - since).await;
			}
		}
		*last = Some(Instant::now());
	}

	async fn get_json<T: DeserializeOwned>(&self, url: String) -> ProviderResult<T> {
		self.rate_limit().await;
		let response = self.http.get(&url).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status(url, status.as_u16(), body));
		}
		serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("{url}: {e}")))
	}

	pub async fn get_quote(
		&self,
		from_asset: &str,
		to_asset: &str,
		destination: &str,
		amount: u64,
	) -> ProviderResult<QuoteResponse> {
		let url = format!(
			"{}/thorchain/quote/swap?from_asset={}&to_asset={}&amount={}&destination={}&streaming_interval=1&streaming_quantity=0",
			self.base_url,
			urlencode(from_asset),
			urlencode(to_asset),
			amount,
			urlencode(destination),
		);
		self.get_json(url).await
	}

	pub async fn get_inbound_addresses(&self) -> ProviderResult<Vec<InboundAddress>> {
		let url = format!("{}/thorchain/inbound_addresses", self.base_url);
		self.get_json(url).await
	}

	pub async fn get_tx_status(&self, tx_hash: &str) -> ProviderResult<TxStatusResponse> {
		let hash = tx_hash.trim_start_matches("0x");
		let url = format!("{}/thorchain/tx/status/{hash}", self.base_url);
		self.get_json(url).await
	}
}

fn urlencode(s: &str) -> String {
	url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Maps thornode's stage report onto the terminal swap states. Cross-chain
/// swaps complete when the outbound is signed; RUNE-side destinations have no
/// outbound stage and complete when the swap itself is finalised.
fn map_stage_status(stages: &TxStages) -> SwapStatus {
	if let Some(outbound) = stages.outbound_signed {
		if outbound.completed {
			return SwapStatus::Completed;
		}
	} else if stages.swap_finalised.map(|s| s.completed).unwrap_or(false) {
		return SwapStatus::Completed;
	}
	SwapStatus::Pending
}

pub struct ThorchainProvider {
	client: ThornodeClient,
	evm: Arc<dyn EvmBridge>,
}

impl ThorchainProvider {
	pub fn new(evm: Arc<dyn EvmBridge>, request_timeout: Duration) -> Self {
		Self {
			client: ThornodeClient::new(request_timeout),
			evm,
		}
	}

	pub fn with_client(evm: Arc<dyn EvmBridge>, client: ThornodeClient) -> Self {
		Self { client, evm }
	}

	fn target_notation(to_asset: &Asset) -> String {
		to_asset
			.hints
			.as_ref()
			.and_then(|h| h.router_asset.clone())
			.unwrap_or_else(|| to_asset.to_string())
	}

	async fn quote_for_chain(
		&self,
		chain: &str,
		to_asset: &Asset,
		to_notation: &str,
		usd_amount: f64,
		destination: &str,
	) -> ProviderResult<Quote> {
		let info = chain_info(chain).ok_or_else(|| ProviderError::UnknownChain {
			chain: chain.to_string(),
		})?;

		// USDC trades 1:1 with USD; thornode wants the amount in its own
		// 8-decimal representation.
		let router_amount = usd_to_router_units(usd_amount);
		let response = self
			.client
			.get_quote(info.usdc_pool_asset, to_notation, destination, router_amount)
			.await?;

		let expected_raw =
			U256::from_str_radix(&response.expected_amount_out, 10).map_err(|_| {
				ProviderError::invalid_response(format!(
					"unparseable expected_amount_out {:?}",
					response.expected_amount_out
				))
			})?;

		let mut extra = std::collections::HashMap::new();
		extra.insert("fees".to_string(), serde_json::to_value(&response.fees)?);
		extra.insert(
			"recommended_min".to_string(),
			serde_json::Value::String(response.recommended_min_amount_in.clone()),
		);
		extra.insert(
			"gas_rate".to_string(),
			serde_json::Value::String(response.recommended_gas_rate.clone()),
		);
		extra.insert(
			"outbound_delay_s".to_string(),
			serde_json::Value::from(response.outbound_delay_seconds),
		);

		Ok(Quote {
			provider: NAME.to_string(),
			from_asset: fundrouter_types::usdc_asset(chain),
			to_asset: to_asset.clone(),
			from_chain: chain.to_string(),
			input_amount_usd: usd_amount,
			input_amount: usd_to_usdc_units(usd_amount),
			expected_output: response.expected_amount_out,
			expected_output_raw: expected_raw,
			memo: response.memo,
			router: response.router,
			vault_address: response.inbound_address,
			expiry: response.expiry,
			extra,
		})
	}
}

#[async_trait]
impl SwapProvider for ThorchainProvider {
	fn name(&self) -> &'static str {
		NAME
	}

	fn category(&self) -> &'static str {
		CATEGORY_DEX
	}

	fn supports_asset(&self, asset: &Asset) -> bool {
		if let Some(hints) = &asset.hints {
			if hints.router_asset.is_some() {
				return true;
			}
		}
		CONNECTED_CHAINS.contains(&asset.chain.as_str())
	}

	async fn quote(
		&self,
		to_asset: &Asset,
		usd_amount: f64,
		destination: &str,
		sender: Address,
	) -> ProviderResult<Vec<Quote>> {
		let to_notation = Self::target_notation(to_asset);
		let required = usd_to_usdc_units(usd_amount);

		let candidates = self.evm.chain_keys();
		let chains = gate_source_chains(self.evm.as_ref(), NAME, &candidates, sender, required)
			.await;

		let attempts = chains.iter().map(|chain| {
			let to_notation = to_notation.clone();
			async move {
				match self
					.quote_for_chain(chain, to_asset, &to_notation, usd_amount, destination)
					.await
				{
					Ok(quote) => Some(quote),
					Err(e) => {
						warn!(chain, error = %e, "thorchain quote failed");
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
		let info = chain_info(&quote.from_chain).ok_or_else(|| ProviderError::UnknownChain {
			chain: quote.from_chain.clone(),
		})?;

		let router: Address = quote.router.parse().map_err(|_| {
			ProviderError::invalid_response(format!("invalid router address {:?}", quote.router))
		})?;
		let vault: Address = quote.vault_address.parse().map_err(|_| {
			ProviderError::invalid_response(format!(
				"invalid vault address {:?}",
				quote.vault_address
			))
		})?;

		// Router pulls the tokens via transferFrom, so the approval must be
		// mined before the deposit goes out.
		self.evm
			.approve(&quote.from_chain, signer, info.usdc, router, quote.input_amount)
			.await?;

		// Give the deposit at least an hour of validity even if the quote's
		// own expiry is nearly spent.
		let min_expiry = Utc::now().timestamp() + 3600;
		let expiry = quote.expiry.max(min_expiry);

		let data = depositWithExpiryCall {
			vault,
			asset: info.usdc,
			amount: quote.input_amount,
			memo: quote.memo.clone(),
			expiry: U256::from(expiry as u64),
		}
		.abi_encode();

		let tx_hash = self
			.evm
			.contract_call(&quote.from_chain, signer, router, data, DEPOSIT_GAS_LIMIT)
			.await?;

		debug!(tx_hash, memo = quote.memo, "thorchain deposit submitted");
		Ok(ExecuteResult { tx_hash, external_id: String::new() })
	}

	async fn check_status(&self, tx_hash: &str, _external_id: &str) -> ProviderResult<SwapStatus> {
		let status = self.client.get_tx_status(tx_hash).await?;
		Ok(map_stage_status(&status.stages))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn done() -> Option<TxStage> {
		Some(TxStage { completed: true })
	}

	fn open() -> Option<TxStage> {
		Some(TxStage { completed: false })
	}

	#[test]
	fn outbound_signed_completes() {
		let stages = TxStages {
			outbound_signed: done(),
			swap_finalised: done(),
			..Default::default()
		};
		assert_eq!(map_stage_status(&stages), SwapStatus::Completed);
	}

	#[test]
	fn pending_while_outbound_unsigned() {
		let stages = TxStages {
			outbound_signed: open(),
			swap_finalised: done(),
			..Default::default()
		};
		assert_eq!(map_stage_status(&stages), SwapStatus::Pending);
	}

	#[test]
	fn native_destination_completes_on_swap_finalised() {
		let stages = TxStages {
			outbound_signed: None,
			swap_finalised: done(),
			..Default::default()
		};
		assert_eq!(map_stage_status(&stages), SwapStatus::Completed);
	}

	#[test]
	fn fresh_swap_is_pending() {
		assert_eq!(map_stage_status(&TxStages::default()), SwapStatus::Pending);
	}

	#[test]
	fn quote_status_parses_thornode_shape() {
		let body = r#"{
			"stages": {
				"inbound_observed": {"completed": true},
				"swap_finalised": {"completed": true},
				"outbound_signed": {"completed": false}
			}
		}"#;
		let status: TxStatusResponse = serde_json::from_str(body).unwrap();
		assert_eq!(map_stage_status(&status.stages), SwapStatus::Pending);
	}
}
