//! EVM JSON-RPC bridge
//!
//! All venue integrations fund swaps from the same small set of EVM chains,
//! so the on-chain plumbing lives here once: USDC balance reads, ERC-20
//! transfers and approvals as signed legacy transactions, permit nonce and
//! allowance reads, and Multicall3-batched balance snapshots.
//!
//! [`EvmBridge`] is the seam providers and the manager depend on; tests
//! substitute fixture implementations without touching the network.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::{TransactionBuilder, TxSignerSync};
use alloy::primitives::{address, Address, Bytes, TxKind, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use fundrouter_types::chains::{chain_info, ChainInfo};
use fundrouter_types::{ProviderError, ProviderResult};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Multicall3 deployment, identical on every supported chain.
const MULTICALL3: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

/// Gas limit for plain ERC-20 approve/transfer calls.
const ERC20_GAS_LIMIT: u64 = 100_000;

sol! {
	function balanceOf(address account) external view returns (uint256);
	function allowance(address owner, address spender) external view returns (uint256);
	function nonces(address owner) external view returns (uint256);
	function decimals() external view returns (uint8);
	function approve(address spender, uint256 amount) external returns (bool);
	function transfer(address to, uint256 amount) external returns (bool);

	struct Call3 {
		address target;
		bool allowFailure;
		bytes callData;
	}

	struct Result3 {
		bool success;
		bytes returnData;
	}

	function aggregate3(Call3[] calldata calls) external payable returns (Result3[] memory returnData);
	function getEthBalance(address addr) external view returns (uint256);
}

/// Native + USDC balances for one address on one chain.
#[derive(Debug, Clone, Serialize)]
pub struct AddressBalance {
	pub address: Address,
	pub chain: String,
	/// Native balance in wei.
	pub native_balance: U256,
	/// USDC balance in smallest units.
	pub usdc_balance: U256,
}

/// On-chain operations the providers and manager need.
#[async_trait]
pub trait EvmBridge: Send + Sync {
	/// RPC registry keys of the chains this bridge is connected to.
	fn chain_keys(&self) -> Vec<String>;

	fn has_chain(&self, chain: &str) -> bool {
		self.chain_keys().iter().any(|c| c == chain)
	}

	/// USDC balance of `owner` on `chain`, in smallest units.
	async fn usdc_balance(&self, chain: &str, owner: Address) -> ProviderResult<U256>;

	/// ERC-20 `decimals()` of a token.
	async fn erc20_decimals(&self, chain: &str, token: Address) -> ProviderResult<u8>;

	/// ERC-20 `allowance(owner, spender)`.
	async fn allowance(
		&self,
		chain: &str,
		token: Address,
		owner: Address,
		spender: Address,
	) -> ProviderResult<U256>;

	/// EIP-2612 `nonces(owner)` of a permit-capable token.
	async fn permit_nonce(&self, chain: &str, token: Address, owner: Address)
		-> ProviderResult<U256>;

	/// Approves `spender` for `amount` and waits until the approval is mined.
	async fn approve(
		&self,
		chain: &str,
		signer: &PrivateKeySigner,
		token: Address,
		spender: Address,
		amount: U256,
	) -> ProviderResult<String>;

	/// Transfers ERC-20 tokens. When `wait` is set the call returns only
	/// after the transfer is mined successfully.
	async fn transfer(
		&self,
		chain: &str,
		signer: &PrivateKeySigner,
		token: Address,
		to: Address,
		amount: U256,
		wait: bool,
	) -> ProviderResult<String>;

	/// Sends an arbitrary contract call without waiting for mining.
	async fn contract_call(
		&self,
		chain: &str,
		signer: &PrivateKeySigner,
		to: Address,
		data: Vec<u8>,
		gas_limit: u64,
	) -> ProviderResult<String>;

	/// Batched native + USDC balances for several addresses on one chain.
	async fn batch_balances(
		&self,
		chain: &str,
		addresses: &[Address],
	) -> ProviderResult<Vec<AddressBalance>>;
}

struct ChainHandle {
	provider: DynProvider,
	info: &'static ChainInfo,
}

/// Live bridge over HTTP JSON-RPC endpoints.
pub struct EvmClient {
	chains: HashMap<String, ChainHandle>,
}

impl EvmClient {
	/// Connects to the given endpoints. Keys must name known source chains.
	pub fn from_endpoints(endpoints: &HashMap<String, String>) -> ProviderResult<Self> {
		let mut chains = HashMap::new();
		for (key, rpc_url) in endpoints {
			let info = chain_info(key).ok_or_else(|| ProviderError::UnknownChain {
				chain: key.clone(),
			})?;
			let url = rpc_url.parse().map_err(|e| {
				ProviderError::invalid_response(format!("invalid RPC URL for {key}: {e}"))
			})?;
			let provider = ProviderBuilder::new().connect_http(url).erased();
			chains.insert(key.clone(), ChainHandle { provider, info });
		}
		Ok(Self { chains })
	}

	fn handle(&self, chain: &str) -> ProviderResult<&ChainHandle> {
		self.chains.get(chain).ok_or_else(|| ProviderError::UnknownChain {
			chain: chain.to_string(),
		})
	}

	async fn eth_call(&self, chain: &str, to: Address, data: Vec<u8>) -> ProviderResult<Bytes> {
		let handle = self.handle(chain)?;
		let tx = TransactionRequest::default().with_to(to).with_input(data);
		Ok(handle.provider.call(tx).await?)
	}

	/// Builds, signs and submits a legacy transaction.
	async fn send_legacy(
		&self,
		chain: &str,
		signer: &PrivateKeySigner,
		to: Address,
		data: Vec<u8>,
		gas_limit: u64,
		wait: bool,
	) -> ProviderResult<String> {
		let handle = self.handle(chain)?;
		let from = signer.address();

		let nonce = handle
			.provider
			.get_transaction_count(from)
			.pending()
			.await?;
		let gas_price = handle.provider.get_gas_price().await?;

		let mut tx = TxLegacy {
			chain_id: Some(handle.info.chain_id),
			nonce,
			gas_price,
			gas_limit,
			to: TxKind::Call(to),
			value: U256::ZERO,
			input: data.into(),
		};

		let signature = signer
			.sign_transaction_sync(&mut tx)
			.map_err(|e| ProviderError::Signing(e.to_string()))?;
		let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
		let raw = envelope.encoded_2718();

		let pending = handle.provider.send_raw_transaction(&raw).await?;
		let tx_hash = (*pending.tx_hash()).to_string();
		info!(chain, tx_hash, "transaction sent");

		if wait {
			let receipt = pending
				.get_receipt()
				.await
				.map_err(|e| ProviderError::Rpc(e.to_string()))?;
			if !receipt.status() {
				return Err(ProviderError::TxReverted { tx_hash });
			}
		}

		Ok(tx_hash)
	}
}

fn decode_uint(output: &[u8]) -> U256 {
	if output.len() < 32 {
		return U256::ZERO;
	}
	U256::from_be_slice(&output[..32])
}

#[async_trait]
impl EvmBridge for EvmClient {
	fn chain_keys(&self) -> Vec<String> {
		let mut keys: Vec<String> = self.chains.keys().cloned().collect();
		keys.sort();
		keys
	}

	async fn usdc_balance(&self, chain: &str, owner: Address) -> ProviderResult<U256> {
		let usdc = self.handle(chain)?.info.usdc;
		let data = balanceOfCall { account: owner }.abi_encode();
		let output = self.eth_call(chain, usdc, data).await?;
		Ok(decode_uint(&output))
	}

	async fn erc20_decimals(&self, chain: &str, token: Address) -> ProviderResult<u8> {
		let data = decimalsCall {}.abi_encode();
		let output = self.eth_call(chain, token, data).await?;
		let value: u64 = decode_uint(&output).try_into().unwrap_or(18);
		Ok(value.min(u8::MAX as u64) as u8)
	}

	async fn allowance(
		&self,
		chain: &str,
		token: Address,
		owner: Address,
		spender: Address,
	) -> ProviderResult<U256> {
		let data = allowanceCall { owner, spender }.abi_encode();
		let output = self.eth_call(chain, token, data).await?;
		Ok(decode_uint(&output))
	}

	async fn permit_nonce(
		&self,
		chain: &str,
		token: Address,
		owner: Address,
	) -> ProviderResult<U256> {
		let data = noncesCall { owner }.abi_encode();
		let output = self.eth_call(chain, token, data).await?;
		Ok(decode_uint(&output))
	}

	async fn approve(
		&self,
		chain: &str,
		signer: &PrivateKeySigner,
		token: Address,
		spender: Address,
		amount: U256,
	) -> ProviderResult<String> {
		let data = approveCall { spender, amount }.abi_encode();
		self.send_legacy(chain, signer, token, data, ERC20_GAS_LIMIT, true)
			.await
	}

	async fn transfer(
		&self,
		chain: &str,
		signer: &PrivateKeySigner,
		token: Address,
		to: Address,
		amount: U256,
		wait: bool,
	) -> ProviderResult<String> {
		let data = transferCall { to, amount }.abi_encode();
		self.send_legacy(chain, signer, token, data, ERC20_GAS_LIMIT, wait)
			.await
	}

	async fn contract_call(
		&self,
		chain: &str,
		signer: &PrivateKeySigner,
		to: Address,
		data: Vec<u8>,
		gas_limit: u64,
	) -> ProviderResult<String> {
		self.send_legacy(chain, signer, to, data, gas_limit, false).await
	}

	async fn batch_balances(
		&self,
		chain: &str,
		addresses: &[Address],
	) -> ProviderResult<Vec<AddressBalance>> {
		if addresses.is_empty() {
			return Ok(Vec::new());
		}
		let usdc = self.handle(chain)?.info.usdc;

		let mut calls = Vec::with_capacity(addresses.len() * 2);
		for addr in addresses {
			calls.push(Call3 {
				target: MULTICALL3,
				allowFailure: true,
				callData: getEthBalanceCall { addr: *addr }.abi_encode().into(),
			});
			calls.push(Call3 {
				target: usdc,
				allowFailure: true,
				callData: balanceOfCall { account: *addr }.abi_encode().into(),
			});
		}

		let data = aggregate3Call { calls }.abi_encode();
		let output = self.eth_call(chain, MULTICALL3, data).await?;
		let results = aggregate3Call::abi_decode_returns(&output).map_err(|e| {
			ProviderError::invalid_response(format!("multicall aggregate3 decode: {e}"))
		})?;

		let mut balances = Vec::with_capacity(addresses.len());
		for (i, addr) in addresses.iter().enumerate() {
			let take = |idx: usize| -> U256 {
				results
					.get(idx)
					.filter(|r| r.success)
					.map(|r| decode_uint(&r.returnData))
					.unwrap_or(U256::ZERO)
			};
			balances.push(AddressBalance {
				address: *addr,
				chain: chain.to_string(),
				native_balance: take(i * 2),
				usdc_balance: take(i * 2 + 1),
			});
		}
		Ok(balances)
	}
}

/// Filters candidate source chains down to those where the sender holds at
/// least `required` USDC. Every venue integration gates its per-chain quote
/// attempts through this before touching the venue's API; unreadable balances
/// are skipped with a warning, not treated as errors.
pub async fn gate_source_chains(
	evm: &dyn EvmBridge,
	provider: &str,
	chains: &[String],
	sender: Address,
	required: U256,
) -> Vec<String> {
	let mut eligible = Vec::new();
	for chain in chains {
		if !evm.has_chain(chain) {
			continue;
		}
		match evm.usdc_balance(chain, sender).await {
			Ok(balance) if balance >= required => eligible.push(chain.clone()),
			Ok(balance) => {
				debug!(
					provider,
					chain,
					have = %balance,
					need = %required,
					"skipping chain, insufficient USDC"
				);
			},
			Err(e) => {
				warn!(provider, chain, error = %e, "error checking USDC balance");
			},
		}
	}
	eligible
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FixedBalances(HashMap<String, U256>);

	#[async_trait]
	impl EvmBridge for FixedBalances {
		fn chain_keys(&self) -> Vec<String> {
			let mut keys: Vec<String> = self.0.keys().cloned().collect();
			keys.sort();
			keys
		}

		async fn usdc_balance(&self, chain: &str, _owner: Address) -> ProviderResult<U256> {
			self.0
				.get(chain)
				.copied()
				.ok_or_else(|| ProviderError::UnknownChain { chain: chain.to_string() })
		}

		async fn erc20_decimals(&self, _: &str, _: Address) -> ProviderResult<u8> {
			Ok(18)
		}

		async fn allowance(&self, _: &str, _: Address, _: Address, _: Address) -> ProviderResult<U256> {
			Ok(U256::ZERO)
		}

		async fn permit_nonce(&self, _: &str, _: Address, _: Address) -> ProviderResult<U256> {
			Ok(U256::ZERO)
		}

		async fn approve(
			&self,
			_: &str,
			_: &PrivateKeySigner,
			_: Address,
			_: Address,
			_: U256,
		) -> ProviderResult<String> {
			unimplemented!()
		}

		async fn transfer(
			&self,
			_: &str,
			_: &PrivateKeySigner,
			_: Address,
			_: Address,
			_: U256,
			_: bool,
		) -> ProviderResult<String> {
			unimplemented!()
		}

		async fn contract_call(
			&self,
			_: &str,
			_: &PrivateKeySigner,
			_: Address,
			_: Vec<u8>,
			_: u64,
		) -> ProviderResult<String> {
			unimplemented!()
		}

		async fn batch_balances(
			&self,
			_: &str,
			_: &[Address],
		) -> ProviderResult<Vec<AddressBalance>> {
			Ok(Vec::new())
		}
	}

	#[tokio::test]
	async fn gating_keeps_only_funded_chains() {
		let mut balances = HashMap::new();
		balances.insert("base".to_string(), U256::from(10_000_000u64));
		balances.insert("avalanche".to_string(), U256::from(1_000u64));
		let evm = FixedBalances(balances);

		let chains = vec!["avalanche".to_string(), "base".to_string()];
		let eligible = gate_source_chains(
			&evm,
			"test",
			&chains,
			Address::ZERO,
			U256::from(5_000_000u64),
		)
		.await;

		assert_eq!(eligible, vec!["base".to_string()]);
	}

	#[tokio::test]
	async fn gating_skips_unknown_and_failing_chains() {
		let mut balances = HashMap::new();
		balances.insert("base".to_string(), U256::from(10_000_000u64));
		let evm = FixedBalances(balances);

		let chains = vec!["base".to_string(), "solana".to_string()];
		let eligible =
			gate_source_chains(&evm, "test", &chains, Address::ZERO, U256::ZERO).await;

		assert_eq!(eligible, vec!["base".to_string()]);
	}

	#[test]
	fn decode_uint_handles_short_output() {
		assert_eq!(decode_uint(&[]), U256::ZERO);
		let mut word = [0u8; 32];
		word[31] = 7;
		assert_eq!(decode_uint(&word), U256::from(7u64));
	}
}
