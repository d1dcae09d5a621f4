//! Mock providers and EVM bridge for tests and examples
//!
//! Trait-level mocks: a provider with scripted quotes and an EVM bridge with
//! fixed balances, so manager behavior can be exercised without venues or
//! RPC endpoints.

#![allow(clippy::type_complexity)]

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use fundrouter_providers::{AddressBalance, EvmBridge};
use fundrouter_types::{
	Asset, ExecuteResult, ProviderError, ProviderResult, Quote, SwapProvider, SwapStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Builds a minimal quote for tests with the given raw-scale output.
pub fn mock_quote(provider: &str, from_chain: &str, raw_output: u64) -> Quote {
	Quote {
		provider: provider.to_string(),
		from_asset: fundrouter_types::usdc_asset(from_chain),
		to_asset: "BTC.BTC".parse().expect("valid notation"),
		from_chain: from_chain.to_string(),
		input_amount_usd: 25.0,
		input_amount: U256::from(25_000_000u64),
		expected_output: format!("0.{raw_output:08}"),
		expected_output_raw: U256::from(raw_output),
		memo: String::new(),
		router: String::new(),
		vault_address: String::new(),
		expiry: 0,
		extra: HashMap::new(),
	}
}

/// Scripted provider: returns configured quotes (or an error), counts calls.
pub struct MockProvider {
	name: &'static str,
	category: &'static str,
	quotes: Vec<Quote>,
	fail_quotes: bool,
	supports: bool,
	status: SwapStatus,
	pub quote_calls: AtomicUsize,
	pub executed: Mutex<Vec<Quote>>,
}

impl MockProvider {
	pub fn new(name: &'static str, category: &'static str, quotes: Vec<Quote>) -> Self {
		Self {
			name,
			category,
			quotes,
			fail_quotes: false,
			supports: true,
			status: SwapStatus::Pending,
			quote_calls: AtomicUsize::new(0),
			executed: Mutex::new(Vec::new()),
		}
	}

	pub fn failing(name: &'static str, category: &'static str) -> Self {
		let mut provider = Self::new(name, category, Vec::new());
		provider.fail_quotes = true;
		provider
	}

	pub fn with_status(mut self, status: SwapStatus) -> Self {
		self.status = status;
		self
	}

	pub fn with_supports(mut self, supports: bool) -> Self {
		self.supports = supports;
		self
	}

	pub fn quote_call_count(&self) -> usize {
		self.quote_calls.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl SwapProvider for MockProvider {
	fn name(&self) -> &'static str {
		self.name
	}

	fn category(&self) -> &'static str {
		self.category
	}

	fn supports_asset(&self, _asset: &Asset) -> bool {
		self.supports
	}

	async fn quote(
		&self,
		to_asset: &Asset,
		_usd_amount: f64,
		_destination: &str,
		_sender: Address,
	) -> ProviderResult<Vec<Quote>> {
		self.quote_calls.fetch_add(1, Ordering::SeqCst);
		if self.fail_quotes || self.quotes.is_empty() {
			return Err(ProviderError::NoQuotes {
				provider: self.name.to_string(),
				asset: to_asset.to_string(),
			});
		}
		Ok(self.quotes.clone())
	}

	async fn execute(
		&self,
		quote: &Quote,
		_signer: &PrivateKeySigner,
	) -> ProviderResult<ExecuteResult> {
		self.executed.lock().expect("mock lock").push(quote.clone());
		Ok(ExecuteResult {
			tx_hash: format!("0xmock-{}", self.name),
			external_id: String::new(),
		})
	}

	async fn check_status(&self, _tx_hash: &str, _external_id: &str) -> ProviderResult<SwapStatus> {
		Ok(self.status)
	}
}

/// EVM bridge with fixed balances and recorded transfers.
pub struct MockEvm {
	pub usdc_balances: HashMap<String, U256>,
	pub transfers: Mutex<Vec<(String, Address, U256)>>,
}

impl MockEvm {
	pub fn new(balances: &[(&str, u64)]) -> Self {
		Self {
			usdc_balances: balances
				.iter()
				.map(|(chain, units)| (chain.to_string(), U256::from(*units)))
				.collect(),
			transfers: Mutex::new(Vec::new()),
		}
	}
}

#[async_trait]
impl EvmBridge for MockEvm {
	fn chain_keys(&self) -> Vec<String> {
		let mut keys: Vec<String> = self.usdc_balances.keys().cloned().collect();
		keys.sort();
		keys
	}

	async fn usdc_balance(&self, chain: &str, _owner: Address) -> ProviderResult<U256> {
		self.usdc_balances
			.get(chain)
			.copied()
			.ok_or_else(|| ProviderError::UnknownChain { chain: chain.to_string() })
	}

	async fn erc20_decimals(&self, _chain: &str, _token: Address) -> ProviderResult<u8> {
		Ok(18)
	}

	async fn allowance(
		&self,
		_chain: &str,
		_token: Address,
		_owner: Address,
		_spender: Address,
	) -> ProviderResult<U256> {
		Ok(U256::MAX)
	}

	async fn permit_nonce(
		&self,
		_chain: &str,
		_token: Address,
		_owner: Address,
	) -> ProviderResult<U256> {
		Ok(U256::ZERO)
	}

	async fn approve(
		&self,
		_chain: &str,
		_signer: &PrivateKeySigner,
		_token: Address,
		_spender: Address,
		_amount: U256,
	) -> ProviderResult<String> {
		Ok("0xapprove".to_string())
	}

	async fn transfer(
		&self,
		chain: &str,
		_signer: &PrivateKeySigner,
		_token: Address,
		to: Address,
		amount: U256,
		_wait: bool,
	) -> ProviderResult<String> {
		self.transfers
			.lock()
			.expect("mock lock")
			.push((chain.to_string(), to, amount));
		Ok("0xtransfer".to_string())
	}

	async fn contract_call(
		&self,
		_chain: &str,
		_signer: &PrivateKeySigner,
		_to: Address,
		_data: Vec<u8>,
		_gas_limit: u64,
	) -> ProviderResult<String> {
		Ok("0xcall".to_string())
	}

	async fn batch_balances(
		&self,
		chain: &str,
		addresses: &[Address],
	) -> ProviderResult<Vec<AddressBalance>> {
		let usdc = self
			.usdc_balances
			.get(chain)
			.copied()
			.unwrap_or(U256::ZERO);
		Ok(addresses
			.iter()
			.map(|addr| AddressBalance {
				address: *addr,
				chain: chain.to_string(),
				native_balance: U256::ZERO,
				usdc_balance: usdc,
			})
			.collect())
	}
}
