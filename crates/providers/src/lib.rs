//! fundrouter providers
//!
//! Venue-specific swap integrations plus the EVM and signing plumbing they
//! share. Each venue implements the `SwapProvider` contract; the registry
//! holds the assembled set and answers dispatch-by-name lookups.

pub mod cowswap;
pub mod evm;
pub mod houdini;
pub mod nearintents;
pub mod signing;
pub mod simpleswap;
pub mod thorchain;

pub use evm::{AddressBalance, EvmBridge, EvmClient};

use fundrouter_types::SwapProvider;
use std::sync::Arc;

/// Registry of assembled providers, keyed by their stable names.
///
/// Registration order is preserved: it is the tie-break order for equal
/// quotes and the display order for diagnostics.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
	providers: Vec<Arc<dyn SwapProvider>>,
}

impl ProviderRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, provider: Arc<dyn SwapProvider>) {
		self.providers.push(provider);
	}

	pub fn with(mut self, provider: Arc<dyn SwapProvider>) -> Self {
		self.register(provider);
		self
	}

	/// Looks a provider up by its stable name.
	pub fn get(&self, name: &str) -> Option<Arc<dyn SwapProvider>> {
		self.providers.iter().find(|p| p.name() == name).cloned()
	}

	pub fn all(&self) -> &[Arc<dyn SwapProvider>] {
		&self.providers
	}

	pub fn len(&self) -> usize {
		self.providers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}
}
