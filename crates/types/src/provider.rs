//! The provider contract
//!
//! Every swap venue integration implements [`SwapProvider`]. The manager
//! dispatches execution and status checks to the owning provider by name, so
//! names are stable identifiers that routing hints and persisted swap records
//! reference.

use crate::asset::Asset;
use crate::errors::ProviderResult;
use crate::quote::{ExecuteResult, Quote, SwapStatus};
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;

/// On-chain DEX and intent-network venues.
pub const CATEGORY_DEX: &str = "dex";
/// Custodial privacy exchanges.
pub const CATEGORY_PRIVATE: &str = "private";
/// Privacy exchanges routing through an intermediate XMR hop. Excluded from
/// un-hinted routing; selecting this path is always an explicit choice.
pub const CATEGORY_XMR_PRIVATE: &str = "xmr-private";

/// A swap execution venue.
#[async_trait]
pub trait SwapProvider: Send + Sync {
	/// Stable provider identifier (e.g. "thorchain").
	fn name(&self) -> &'static str;

	/// Provider category, matched by category routing hints.
	fn category(&self) -> &'static str;

	/// Cheap static check whether the venue can plausibly handle the asset,
	/// used to short-circuit before any network call.
	fn supports_asset(&self, asset: &Asset) -> bool;

	/// Returns quotes for swapping `usd_amount` worth of stablecoins into
	/// `to_asset`, one per source chain the venue supports and the sender can
	/// fund. Chains with insufficient balance are skipped, not errored; zero
	/// quotes across all chains is an error.
	async fn quote(
		&self,
		to_asset: &Asset,
		usd_amount: f64,
		destination: &str,
		sender: Address,
	) -> ProviderResult<Vec<Quote>>;

	/// Submits the swap for a previously obtained quote. Calling this twice
	/// may create two real swaps; the manager calls it exactly once per
	/// accepted quote.
	async fn execute(
		&self,
		quote: &Quote,
		signer: &PrivateKeySigner,
	) -> ProviderResult<ExecuteResult>;

	/// Checks swap progress by source-chain tx hash and/or the venue's own
	/// tracking handle (ignored by venues that track by hash alone).
	async fn check_status(&self, tx_hash: &str, external_id: &str) -> ProviderResult<SwapStatus>;
}
