//! CoW Protocol gasless solver integration
//!
//! Same-chain USDC swaps signed entirely off-chain. Approvals use EIP-2612
//! permit signatures embedded as pre-hooks in the order's application data,
//! so orders can be placed even with zero native token balance. Also hosts
//! the gas-refill routine the external top-up scheduler calls.

use crate::evm::EvmBridge;
use crate::signing::{
	build_permit_app_data, erc2612_domain, sign_typed_data, DEFAULT_APP_DATA,
	DEFAULT_APP_DATA_HASH,
};
use alloy::primitives::{address, Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use chrono::Utc;
use fundrouter_types::amount::{format_units, to_raw_scale, usd_to_usdc_units};
use fundrouter_types::chains::{chain_by_code, chain_info};
use fundrouter_types::{
	Asset, ExecuteResult, ProviderError, ProviderResult, Quote, SwapProvider, SwapStatus,
	CATEGORY_DEX,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

pub const NAME: &str = "cowswap";

/// GPv2Settlement address, identical on all supported chains.
const SETTLEMENT_CONTRACT: Address = address!("0x9008D19f58AAbD9eD0D60971565AA8510560ab41");

/// GPv2VaultRelayer address; sell tokens must be approved (or permitted) to it.
const VAULT_RELAYER: Address = address!("0xC92E8bdf79f0507f65a392b0ab4667716BFE0110");

/// Placeholder buy-token address for the chain's native gas token.
const NATIVE_TOKEN: Address = address!("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Permit deadline horizon in seconds.
const PERMIT_DEADLINE_SECS: i64 = 1800;

sol! {
	/// GPv2 order message signed under the "Gnosis Protocol" v2 domain.
	struct Order {
		address sellToken;
		address buyToken;
		address receiver;
		uint256 sellAmount;
		uint256 buyAmount;
		uint32 validTo;
		bytes32 appData;
		uint256 feeAmount;
		string kind;
		bool partiallyFillable;
		string sellTokenBalance;
		string buyTokenBalance;
	}
}

struct VenueChain {
	key: &'static str,
	api_base: &'static str,
}

const SUPPORTED: &[VenueChain] = &[
	VenueChain { key: "base", api_base: "https://api.cow.fi/base/api/v1" },
	VenueChain { key: "avalanche", api_base: "https://api.cow.fi/avalanche/api/v1" },
];

fn venue_chain(key: &str) -> Option<&'static VenueChain> {
	SUPPORTED.iter().find(|c| c.key == key)
}

/// An asset is reachable when its chain is a venue chain and it is either
/// the chain's native asset or carries a contract address.
fn supports(asset: &Asset) -> bool {
	let Some(info) = chain_by_code(&asset.chain) else {
		return false;
	};
	if venue_chain(info.key).is_none() {
		return false;
	}
	asset.symbol == info.native_symbol || !asset.contract_address.is_empty()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest<'a> {
	sell_token: String,
	buy_token: String,
	receiver: &'a str,
	sell_amount_before_fee: String,
	kind: &'a str,
	from: String,
	app_data: &'a str,
	app_data_hash: &'a str,
	signing_scheme: &'a str,
}

/// The venue's order payload, carried unchanged from quote to submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
	#[serde(default)]
	pub sell_token: String,
	#[serde(default)]
	pub buy_token: String,
	#[serde(default)]
	pub receiver: String,
	#[serde(default)]
	pub sell_amount: String,
	#[serde(default)]
	pub buy_amount: String,
	#[serde(default)]
	pub valid_to: u32,
	#[serde(default)]
	pub app_data: String,
	#[serde(default)]
	pub app_data_hash: String,
	#[serde(default)]
	pub fee_amount: String,
	#[serde(default)]
	pub kind: String,
	#[serde(default)]
	pub partially_fillable: bool,
	#[serde(default)]
	pub sell_token_balance: String,
	#[serde(default)]
	pub buy_token_balance: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
	#[serde(default)]
	pub quote: OrderPayload,
	#[serde(default)]
	pub id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrderSubmission<'a> {
	#[serde(flatten)]
	order: &'a OrderPayload,
	signing_scheme: &'a str,
	signature: String,
	from: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OrderStatusResponse {
	#[serde(default)]
	status: String,
}

/// Result of a gas refill attempt.
#[derive(Debug, Clone)]
pub struct GasRefillResult {
	pub chain: String,
	pub order_uid: String,
	pub status: SwapStatus,
}

/// CoW Protocol API client, one endpoint family per chain.
pub struct CowClient {
	http: reqwest::Client,
	api_bases: HashMap<String, String>,
}

impl CowClient {
	pub fn new(request_timeout: Duration) -> Self {
		let api_bases = SUPPORTED
			.iter()
			.map(|c| (c.key.to_string(), c.api_base.to_string()))
			.collect();
		Self {
			http: reqwest::Client::builder()
				.timeout(request_timeout)
				.build()
				.expect("reqwest client"),
			api_bases,
		}
	}

	/// Overrides a chain's API base, for tests.
	pub fn with_api_base(mut self, chain: &str, base: impl Into<String>) -> Self {
		self.api_bases.insert(chain.to_string(), base.into());
		self
	}

	fn api_base(&self, chain: &str) -> ProviderResult<&str> {
		self.api_bases
			.get(chain)
			.map(String::as_str)
			.ok_or_else(|| ProviderError::UnknownChain { chain: chain.to_string() })
	}

	async fn get_quote(
		&self,
		chain: &str,
		request: &QuoteRequest<'_>,
	) -> ProviderResult<QuoteResult> {
		let url = format!("{}/quote", self.api_base(chain)?);
		let response = self.http.post(&url).json(request).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status(url, status.as_u16(), body));
		}
		serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("quote: {e}")))
	}

	async fn submit_order(
		&self,
		chain: &str,
		submission: &OrderSubmission<'_>,
	) -> ProviderResult<String> {
		let url = format!("{}/orders", self.api_base(chain)?);
		let response = self.http.post(&url).json(submission).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status(url, status.as_u16(), body));
		}
		// The venue answers with the JSON-quoted order UID.
		serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("orders: {e}")))
	}

	pub async fn order_status(&self, chain: &str, order_uid: &str) -> ProviderResult<String> {
		let url = format!("{}/orders/{order_uid}", self.api_base(chain)?);
		let response = self.http.get(&url).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(ProviderError::http_status(url, status.as_u16(), body));
		}
		let parsed: OrderStatusResponse = serde_json::from_str(&body)
			.map_err(|e| ProviderError::invalid_response(format!("order status: {e}")))?;
		Ok(parsed.status)
	}
}

/// Order lifecycle: fulfilled completes; expired and cancelled fail; open and
/// presignaturePending stay pending while the order rests in the book.
fn map_order_status(status: &str) -> SwapStatus {
	match status {
		"fulfilled" => SwapStatus::Completed,
		"expired" | "cancelled" => SwapStatus::Failed,
		_ => SwapStatus::Pending,
	}
}

fn parse_u256_dec(value: &str, field: &str) -> ProviderResult<U256> {
	U256::from_str_radix(value, 10)
		.map_err(|_| ProviderError::invalid_response(format!("unparseable {field} {value:?}")))
}

fn parse_address(value: &str, field: &str) -> ProviderResult<Address> {
	value
		.parse()
		.map_err(|_| ProviderError::invalid_response(format!("invalid {field} {value:?}")))
}

/// Encodes the chain key into the tracking handle so status checks know
/// which endpoint family owns the order.
fn encode_external_id(chain: &str, order_uid: &str) -> String {
	format!("{chain}:{order_uid}")
}

fn decode_external_id(external_id: &str) -> ProviderResult<(&str, &str)> {
	external_id
		.split_once(':')
		.ok_or_else(|| ProviderError::invalid_response(format!(
			"malformed order tracking handle {external_id:?}"
		)))
}

pub struct CowSwapProvider {
	client: CowClient,
	evm: Arc<dyn EvmBridge>,
}

impl CowSwapProvider {
	pub fn new(evm: Arc<dyn EvmBridge>, request_timeout: Duration) -> Self {
		Self { client: CowClient::new(request_timeout), evm }
	}

	pub fn with_client(evm: Arc<dyn EvmBridge>, client: CowClient) -> Self {
		Self { client, evm }
	}

	/// True when the vault relayer's allowance does not cover the sale and a
	/// permit pre-hook will be needed at submission time.
	async fn needs_permit(
		&self,
		chain: &str,
		owner: Address,
		sell_amount: U256,
	) -> ProviderResult<bool> {
		let info = chain_info(chain).ok_or_else(|| ProviderError::UnknownChain {
			chain: chain.to_string(),
		})?;
		let allowance = self
			.evm
			.allowance(chain, info.usdc, owner, VAULT_RELAYER)
			.await?;
		Ok(allowance < sell_amount)
	}

	/// Builds the permit pre-hook application data for an order.
	async fn permit_app_data(
		&self,
		chain: &str,
		owner: Address,
		signer: &PrivateKeySigner,
	) -> ProviderResult<(String, String)> {
		let info = chain_info(chain).ok_or_else(|| ProviderError::UnknownChain {
			chain: chain.to_string(),
		})?;

		let nonce = self.evm.permit_nonce(chain, info.usdc, owner).await?;
		let deadline = U256::from((Utc::now().timestamp() + PERMIT_DEADLINE_SECS) as u64);
		let domain = erc2612_domain("USDC", "2", info.chain_id, info.usdc);

		// Permit the maximum so subsequent orders skip the hook entirely.
		let built = build_permit_app_data(
			signer,
			&domain,
			info.usdc,
			owner,
			VAULT_RELAYER,
			U256::MAX,
			nonce,
			deadline,
		);
		match built {
			Ok(pair) => {
				info!(chain, owner = %owner, nonce = %nonce, "built permit pre-hook");
				Ok(pair)
			},
			Err(e) => {
				// A bad permit surfaces venue-side as a misleading
				// "insufficient allowance" rejection, so the full domain
				// context has to be on record here.
				error!(
					chain,
					owner = %owner,
					token = %info.usdc,
					domain_name = "USDC",
					domain_version = "2",
					error = %e,
					"permit construction failed"
				);
				Err(e)
			},
		}
	}

	fn sign_order(
		&self,
		chain_id: u64,
		order: &OrderPayload,
		signer: &PrivateKeySigner,
	) -> ProviderResult<String> {
		let app_data: B256 = order.app_data_hash.parse().map_err(|_| {
			ProviderError::invalid_response(format!(
				"invalid appDataHash {:?}",
				order.app_data_hash
			))
		})?;

		let message = Order {
			sellToken: parse_address(&order.sell_token, "sellToken")?,
			buyToken: parse_address(&order.buy_token, "buyToken")?,
			receiver: parse_address(&order.receiver, "receiver")?,
			sellAmount: parse_u256_dec(&order.sell_amount, "sellAmount")?,
			buyAmount: parse_u256_dec(&order.buy_amount, "buyAmount")?,
			validTo: order.valid_to,
			appData: app_data,
			feeAmount: parse_u256_dec(&order.fee_amount, "feeAmount")?,
			kind: order.kind.clone(),
			partiallyFillable: order.partially_fillable,
			sellTokenBalance: order.sell_token_balance.clone(),
			buyTokenBalance: order.buy_token_balance.clone(),
		};

		let domain = alloy::sol_types::Eip712Domain::new(
			Some("Gnosis Protocol".into()),
			Some("v2".into()),
			Some(U256::from(chain_id)),
			Some(SETTLEMENT_CONTRACT),
			None,
		);

		Ok(sign_typed_data(signer, &domain, &message)?.to_hex())
	}

	/// Refills a chain's native gas balance by selling USDC when the balance
	/// is below `min_native_wei` and the USDC balance covers `refill_usdc`.
	/// Returns `None` when no refill is needed or possible.
	pub async fn refill_gas_if_needed(
		&self,
		chain: &str,
		owner: Address,
		signer: &PrivateKeySigner,
		native_balance: U256,
		usdc_balance: U256,
		min_native_wei: U256,
		refill_usdc: U256,
	) -> ProviderResult<Option<GasRefillResult>> {
		if venue_chain(chain).is_none() {
			return Ok(None);
		}
		if native_balance >= min_native_wei {
			return Ok(None);
		}
		if usdc_balance < refill_usdc {
			return Ok(None);
		}
		let info = chain_info(chain).ok_or_else(|| ProviderError::UnknownChain {
			chain: chain.to_string(),
		})?;

		info!(
			chain,
			owner = %owner,
			native = %native_balance,
			threshold = %min_native_wei,
			"gas refill needed"
		);

		let (app_data, app_data_hash) = if self.needs_permit(chain, owner, refill_usdc).await? {
			self.permit_app_data(chain, owner, signer).await?
		} else {
			(DEFAULT_APP_DATA.to_string(), DEFAULT_APP_DATA_HASH.to_string())
		};

		let receiver = owner.to_string();
		let request = QuoteRequest {
			sell_token: info.usdc.to_string(),
			buy_token: NATIVE_TOKEN.to_string(),
			receiver: &receiver,
			sell_amount_before_fee: refill_usdc.to_string(),
			kind: "sell",
			from: owner.to_string(),
			app_data: &app_data,
			app_data_hash: &app_data_hash,
			signing_scheme: "eip712",
		};
		let result = self.client.get_quote(chain, &request).await?;

		let signature = self.sign_order(info.chain_id, &result.quote, signer)?;
		let submission = OrderSubmission {
			order: &result.quote,
			signing_scheme: "eip712",
			signature,
			from: owner.to_string(),
		};
		let order_uid = self.client.submit_order(chain, &submission).await?;
		info!(chain, order_uid, "gas refill order submitted");

		Ok(Some(GasRefillResult {
			chain: chain.to_string(),
			order_uid,
			status: SwapStatus::Pending,
		}))
	}
}

#[async_trait]
impl SwapProvider for CowSwapProvider {
	fn name(&self) -> &'static str {
		NAME
	}

	fn category(&self) -> &'static str {
		CATEGORY_DEX
	}

	fn supports_asset(&self, asset: &Asset) -> bool {
		supports(asset)
	}

	async fn quote(
		&self,
		to_asset: &Asset,
		usd_amount: f64,
		destination: &str,
		sender: Address,
	) -> ProviderResult<Vec<Quote>> {
		// Orders settle on the target asset's own chain, so the only viable
		// source chain is that chain itself.
		let info = chain_by_code(&to_asset.chain).ok_or_else(|| {
			ProviderError::UnsupportedAsset {
				provider: NAME.to_string(),
				asset: to_asset.to_string(),
			}
		})?;
		if venue_chain(info.key).is_none() || !self.evm.has_chain(info.key) {
			return Err(ProviderError::UnsupportedAsset {
				provider: NAME.to_string(),
				asset: to_asset.to_string(),
			});
		}

		let required = usd_to_usdc_units(usd_amount);
		let balance = self.evm.usdc_balance(info.key, sender).await?;
		if balance < required {
			return Err(ProviderError::NoQuotes {
				provider: NAME.to_string(),
				asset: to_asset.to_string(),
			});
		}

		let (buy_token, buy_decimals) = if to_asset.symbol == info.native_symbol {
			(NATIVE_TOKEN, 18)
		} else {
			let token = parse_address(&to_asset.contract_address, "buy token")?;
			let decimals = self.evm.erc20_decimals(info.key, token).await?;
			(token, u32::from(decimals))
		};

		// The signing key is not available at quote time, so the permit hook
		// (which needs a signature) is deferred: quote against the hook-less
		// application data and record whether submission must rebuild the
		// order around a permit.
		let needs_permit = self.needs_permit(info.key, sender, required).await?;

		let request = QuoteRequest {
			sell_token: info.usdc.to_string(),
			buy_token: buy_token.to_string(),
			receiver: destination,
			sell_amount_before_fee: required.to_string(),
			kind: "sell",
			from: sender.to_string(),
			app_data: DEFAULT_APP_DATA,
			app_data_hash: DEFAULT_APP_DATA_HASH,
			signing_scheme: "eip712",
		};
		let result = self.client.get_quote(info.key, &request).await?;

		let buy_amount = parse_u256_dec(&result.quote.buy_amount, "buyAmount")?;
		let expected_output = format_units(buy_amount, buy_decimals);
		let expected_raw = to_raw_scale(&expected_output).ok_or_else(|| {
			ProviderError::invalid_response(format!(
				"unnormalizable buy amount {expected_output:?}"
			))
		})?;

		let mut extra = HashMap::new();
		extra.insert("cowswap_chain_key".to_string(), serde_json::Value::String(
			info.key.to_string(),
		));
		extra.insert("cowswap_order".to_string(), serde_json::to_value(&result.quote)?);
		extra.insert(
			"cowswap_needs_permit".to_string(),
			serde_json::Value::Bool(needs_permit),
		);
		extra.insert(
			"cowswap_destination".to_string(),
			serde_json::Value::String(destination.to_string()),
		);

		Ok(vec![Quote {
			provider: NAME.to_string(),
			from_asset: fundrouter_types::usdc_asset(info.key),
			to_asset: to_asset.clone(),
			from_chain: info.key.to_string(),
			input_amount_usd: usd_amount,
			input_amount: required,
			expected_output,
			expected_output_raw: expected_raw,
			memo: String::new(),
			router: String::new(),
			vault_address: String::new(),
			expiry: i64::from(result.quote.valid_to),
			extra,
		}])
	}

	async fn execute(
		&self,
		quote: &Quote,
		signer: &PrivateKeySigner,
	) -> ProviderResult<ExecuteResult> {
		let chain = quote.extra_str("cowswap_chain_key").ok_or_else(|| {
			ProviderError::MissingQuoteData {
				provider: NAME.to_string(),
				field: "cowswap_chain_key".to_string(),
			}
		})?;
		let order_value = quote.extra.get("cowswap_order").ok_or_else(|| {
			ProviderError::MissingQuoteData {
				provider: NAME.to_string(),
				field: "cowswap_order".to_string(),
			}
		})?;
		let mut order: OrderPayload = serde_json::from_value(order_value.clone())?;

		let info = chain_info(chain).ok_or_else(|| ProviderError::UnknownChain {
			chain: chain.to_string(),
		})?;

		// A permit hook changes the signed appData hash, so the order has to
		// be re-quoted around the hook before signing.
		let needs_permit = quote
			.extra
			.get("cowswap_needs_permit")
			.and_then(|v| v.as_bool())
			.unwrap_or(false);
		if needs_permit {
			let owner = signer.address();
			let (app_data, app_data_hash) =
				self.permit_app_data(chain, owner, signer).await?;
			let destination = quote
				.extra_str("cowswap_destination")
				.unwrap_or(&order.receiver)
				.to_string();
			let request = QuoteRequest {
				sell_token: order.sell_token.clone(),
				buy_token: order.buy_token.clone(),
				receiver: &destination,
				sell_amount_before_fee: quote.input_amount.to_string(),
				kind: "sell",
				from: owner.to_string(),
				app_data: &app_data,
				app_data_hash: &app_data_hash,
				signing_scheme: "eip712",
			};
			order = self.client.get_quote(chain, &request).await?.quote;
		}

		let signature = self.sign_order(info.chain_id, &order, signer)?;
		let submission = OrderSubmission {
			order: &order,
			signing_scheme: "eip712",
			signature,
			from: signer.address().to_string(),
		};

		let order_uid = self.client.submit_order(chain, &submission).await?;
		info!(chain, order_uid, "cow order submitted");

		Ok(ExecuteResult {
			tx_hash: String::new(),
			external_id: encode_external_id(chain, &order_uid),
		})
	}

	async fn check_status(&self, _tx_hash: &str, external_id: &str) -> ProviderResult<SwapStatus> {
		let (chain, order_uid) = decode_external_id(external_id)?;
		let status = self.client.order_status(chain, order_uid).await?;
		Ok(map_order_status(&status))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::signing::app_data_hash;
	use alloy::sol_types::SolStruct;

	#[test]
	fn order_status_mapping() {
		assert_eq!(map_order_status("fulfilled"), SwapStatus::Completed);
		assert_eq!(map_order_status("expired"), SwapStatus::Failed);
		assert_eq!(map_order_status("cancelled"), SwapStatus::Failed);
		for open in ["open", "presignaturePending", ""] {
			assert_eq!(map_order_status(open), SwapStatus::Pending);
		}
	}

	#[test]
	fn external_id_round_trips_chain_and_uid() {
		let encoded = encode_external_id("base", "0xuid");
		assert_eq!(decode_external_id(&encoded).unwrap(), ("base", "0xuid"));
		assert!(decode_external_id("no-separator").is_err());
	}

	#[test]
	fn order_digest_binds_app_data_hash() {
		let base = Order {
			sellToken: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse().unwrap(),
			buyToken: NATIVE_TOKEN,
			receiver: Address::ZERO,
			sellAmount: U256::from(5_000_000u64),
			buyAmount: U256::from(1_000_000_000_000_000u64),
			validTo: 1_900_000_000,
			appData: DEFAULT_APP_DATA_HASH.parse().unwrap(),
			feeAmount: U256::ZERO,
			kind: "sell".to_string(),
			partiallyFillable: false,
			sellTokenBalance: "erc20".to_string(),
			buyTokenBalance: "erc20".to_string(),
		};
		let domain = alloy::sol_types::Eip712Domain::new(
			Some("Gnosis Protocol".into()),
			Some("v2".into()),
			Some(U256::from(8453u64)),
			Some(SETTLEMENT_CONTRACT),
			None,
		);

		let mut hooked = base.clone();
		hooked.appData = app_data_hash(r#"{"version":"1.3.0","metadata":{"hooks":{}}}"#)
			.parse()
			.unwrap();

		assert_ne!(
			base.eip712_signing_hash(&domain),
			hooked.eip712_signing_hash(&domain)
		);
	}

	#[test]
	fn supports_only_venue_chains() {
		assert!(supports(&Asset::new("BASE", "ETH")));
		assert!(supports(
			&Asset::new("BASE", "LINK").with_contract("0x88fb150bdc53a65fe94dea0c9ba0a6daf8c6e196")
		));
		assert!(!supports(&Asset::new("BTC", "BTC")));
		assert!(!supports(&Asset::new("BASE", "LINK")));
	}
}
