//! Swap manager
//!
//! Requests quotes from every provider a routing hint leaves in play, picks
//! the numerically best, and dispatches execution and status checks to the
//! owning provider by name. Per-provider quote failures are absorbed and
//! logged; execution and status failures always propagate.

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use fundrouter_providers::{EvmBridge, ProviderRegistry};
use fundrouter_types::amount::{format_usdc, usd_to_usdc_units};
use fundrouter_types::{
	Asset, ExecuteResult, HintKind, ProviderError, Quote, RoutingHint, SwapProvider, SwapStatus,
	CATEGORY_XMR_PRIVATE,
};
use futures::future::join_all;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// One line of the live balance snapshot in a no-quotes diagnostic.
#[derive(Debug, Clone)]
pub struct ChainBalanceLine {
	pub chain: String,
	pub usdc_balance: U256,
}

/// Manager-level errors.
#[derive(Error, Debug)]
pub enum ManagerError {
	#[error("no providers match routing hint {hint:?}")]
	NoMatchingProviders { hint: String },

	#[error("provider {name:?} not found")]
	UnknownProvider { name: String },

	#[error("no quotes available for {asset}")]
	NoQuotes { asset: String },

	#[error(
		"insufficient USDC balance for ${required:.2} swap to {asset}\nCurrent balances:\n{balance_lines}"
	)]
	InsufficientBalance {
		required: f64,
		asset: String,
		balance_lines: String,
	},

	#[error(transparent)]
	Provider(#[from] ProviderError),
}

/// Orchestrates swap providers and selects the best quote.
pub struct SwapManager {
	registry: ProviderRegistry,
	evm: Arc<dyn EvmBridge>,
	quote_timeout: Duration,
}

impl SwapManager {
	pub fn new(registry: ProviderRegistry, evm: Arc<dyn EvmBridge>, quote_timeout: Duration) -> Self {
		Self { registry, evm, quote_timeout }
	}

	/// Providers left in play by the routing hint. A hint matching nothing
	/// is an error before any network call. Without a hint, the XMR-routed
	/// category stays out; that path is opt-in only.
	fn filter_providers(
		&self,
		hint: &RoutingHint,
	) -> Result<Vec<Arc<dyn SwapProvider>>, ManagerError> {
		let filtered: Vec<Arc<dyn SwapProvider>> = self
			.registry
			.all()
			.iter()
			.filter(|p| match hint.kind {
				HintKind::None => p.category() != CATEGORY_XMR_PRIVATE,
				HintKind::Provider => p.name() == hint.value,
				HintKind::Category => p.category() == hint.value,
			})
			.cloned()
			.collect();

		if filtered.is_empty() {
			return Err(ManagerError::NoMatchingProviders { hint: hint.value.clone() });
		}
		Ok(filtered)
	}

	/// Queries the hinted providers concurrently and returns the quote with
	/// the largest raw-scale expected output. Equal outputs keep the earlier
	/// provider's quote.
	pub async fn best_quote(
		&self,
		to_asset: &Asset,
		usd_amount: f64,
		destination: &str,
		sender: Address,
		hint: &RoutingHint,
	) -> Result<Quote, ManagerError> {
		let providers = self.filter_providers(hint)?;
		info!(
			asset = %to_asset,
			usd_amount,
			providers = providers.len(),
			"requesting quotes"
		);

		let requests = providers.iter().map(|provider| {
			let provider = Arc::clone(provider);
			async move {
				match provider
					.quote(to_asset, usd_amount, destination, sender)
					.await
				{
					Ok(quotes) => Some(quotes),
					Err(e) => {
						warn!(provider = provider.name(), error = %e, "provider quote error");
						None
					},
				}
			}
		});

		let results = match tokio::time::timeout(self.quote_timeout, join_all(requests)).await {
			Ok(results) => results,
			Err(_) => {
				warn!(timeout_ms = self.quote_timeout.as_millis() as u64, "quote fan-out timed out");
				Vec::new()
			},
		};

		let mut best: Option<Quote> = None;
		for quote in results.into_iter().flatten().flatten() {
			let better = best
				.as_ref()
				.map(|b| quote.expected_output_raw > b.expected_output_raw)
				.unwrap_or(true);
			if better {
				best = Some(quote);
			}
		}

		match best {
			Some(quote) => {
				info!(
					provider = quote.provider,
					from_chain = quote.from_chain,
					expected = quote.expected_output,
					"selected best quote"
				);
				Ok(quote)
			},
			None => Err(self.no_quotes_error(to_asset, usd_amount, sender).await),
		}
	}

	/// Executes a previously selected quote via its owning provider.
	pub async fn execute_swap(
		&self,
		quote: &Quote,
		signer: &PrivateKeySigner,
	) -> Result<ExecuteResult, ManagerError> {
		let provider = self.registry.get(&quote.provider).ok_or_else(|| {
			ManagerError::UnknownProvider { name: quote.provider.clone() }
		})?;
		Ok(provider.execute(quote, signer).await?)
	}

	/// Checks swap progress via the named provider.
	pub async fn check_status(
		&self,
		provider_name: &str,
		tx_hash: &str,
		external_id: &str,
	) -> Result<SwapStatus, ManagerError> {
		let provider = self.registry.get(provider_name).ok_or_else(|| {
			ManagerError::UnknownProvider { name: provider_name.to_string() }
		})?;
		Ok(provider.check_status(tx_hash, external_id).await?)
	}

	/// True when at least one provider has a static mapping for the asset.
	pub fn is_statically_known(&self, asset: &Asset) -> bool {
		self.registry.all().iter().any(|p| p.supports_asset(asset))
	}

	/// Distinguishes "nobody supports this asset" from "you do not hold
	/// enough funds on any supported chain" by re-reading live balances.
	async fn no_quotes_error(
		&self,
		to_asset: &Asset,
		usd_amount: f64,
		sender: Address,
	) -> ManagerError {
		let required = usd_to_usdc_units(usd_amount);

		let mut lines: Vec<ChainBalanceLine> = Vec::new();
		let mut all_insufficient = true;
		for chain in self.evm.chain_keys() {
			match self.evm.usdc_balance(&chain, sender).await {
				Ok(balance) => {
					if balance >= required {
						all_insufficient = false;
					}
					lines.push(ChainBalanceLine { chain, usdc_balance: balance });
				},
				Err(e) => {
					warn!(chain, error = %e, "balance check failed in diagnostics");
				},
			}
		}

		if !lines.is_empty() && all_insufficient {
			let mut balance_lines = String::new();
			for line in &lines {
				let _ = write!(
					balance_lines,
					"  {}: {} USDC\n",
					title_case(&line.chain),
					format_usdc(line.usdc_balance),
				);
			}
			let balance_lines = balance_lines.trim_end_matches('\n').to_string();
			return ManagerError::InsufficientBalance {
				required: usd_amount,
				asset: to_asset.to_string(),
				balance_lines,
			};
		}

		ManagerError::NoQuotes { asset: to_asset.to_string() }
	}
}

fn title_case(s: &str) -> String {
	let mut chars = s.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
		None => String::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn title_cases_chain_keys() {
		assert_eq!(title_case("avalanche"), "Avalanche");
		assert_eq!(title_case("base"), "Base");
		assert_eq!(title_case(""), "");
	}
}
