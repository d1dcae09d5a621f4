//! fundrouter
//!
//! Converts stablecoin value held on EVM source chains into arbitrary
//! target-chain assets: the resolver identifies the target asset across
//! external catalogs, the manager obtains and executes the best quote from
//! the assembled provider set, and status checks track the swap to a
//! terminal state.
//!
//! This crate is the assembly point: it wires settings into the EVM bridge,
//! the provider registry and the resolver, and re-exports the vocabulary the
//! excluded collaborators (bot, dashboard, tracker) program against.

pub mod mocks;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub use fundrouter_config::{load_settings, ConfigError, SecretValue, Settings};
pub use fundrouter_providers::{
	cowswap, evm, houdini, nearintents, signing, simpleswap, thorchain, AddressBalance,
	EvmBridge, EvmClient, ProviderRegistry,
};
pub use fundrouter_resolver::{
	DynamicCatalog, ExchangeLookup, PoolMatcher, Resolution, Resolver, ResolverError,
	StaticCatalog, TokenMatcher,
};
pub use fundrouter_service::{ManagerError, SwapManager};
pub use fundrouter_types::{
	amount, Asset, AssetParseError, ExecuteResult, HintKind, ProviderError, Quote, ResolvedHints,
	RoutingHint, SwapProvider, SwapStatus,
};

use fundrouter_providers::cowswap::CowSwapProvider;
use fundrouter_providers::houdini::{HoudiniClient, HoudiniProvider, HoudiniXmrProvider};
use fundrouter_providers::nearintents::NearIntentsProvider;
use fundrouter_providers::simpleswap::{SimpleSwapClient, SimpleSwapProvider};
use fundrouter_providers::thorchain::ThorchainProvider;
use fundrouter_resolver::CoinGeckoClient;

/// Errors assembling the core from settings.
#[derive(Error, Debug)]
pub enum BuildError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error(transparent)]
	Provider(#[from] ProviderError),

	#[error("no chains configured")]
	NoChains,
}

/// The assembled core: manager, resolver and the shared EVM bridge.
pub struct Core {
	pub manager: SwapManager,
	pub resolver: Resolver,
	pub evm: Arc<EvmClient>,
	/// Dynamic exchange catalogs; the external scheduler refreshes these.
	pub catalogs: Vec<Arc<DynamicCatalog>>,
}

/// Assembles the swap core from settings. Venues whose credentials resolve
/// to nothing are left out of the registry.
pub fn build_core(settings: &Settings) -> Result<Core, BuildError> {
	if settings.chains.is_empty() {
		return Err(BuildError::NoChains);
	}
	let request_timeout = Duration::from_millis(settings.timeouts.request_ms);
	let quote_timeout = Duration::from_millis(settings.timeouts.quote_global_ms);

	let evm = Arc::new(EvmClient::from_endpoints(&settings.rpc_endpoints())?);
	let evm_dyn: Arc<dyn EvmBridge> = evm.clone();

	let mut registry = ProviderRegistry::new();
	let mut exchanges: Vec<Arc<dyn ExchangeLookup>> = Vec::new();
	let mut catalogs: Vec<Arc<DynamicCatalog>> = Vec::new();

	registry.register(Arc::new(ThorchainProvider::new(evm_dyn.clone(), request_timeout)));
	registry.register(Arc::new(CowSwapProvider::new(evm_dyn.clone(), request_timeout)));

	if let Some(key) = settings.venues.simpleswap_api_key.resolve_optional() {
		let client = Arc::new(SimpleSwapClient::new(key, request_timeout));
		registry.register(Arc::new(SimpleSwapProvider::with_client(
			evm_dyn.clone(),
			client.clone(),
		)));
		exchanges.push(Arc::new(StaticCatalog::new(
			simpleswap::NAME,
			simpleswap::lookup_symbol,
		)));
		let catalog = Arc::new(DynamicCatalog::new(simpleswap::NAME, client));
		exchanges.push(catalog.clone());
		catalogs.push(catalog);
	}

	if let Some(key) = settings.venues.nearintents_api_key.resolve_optional() {
		registry.register(Arc::new(NearIntentsProvider::new(
			key,
			evm_dyn.clone(),
			request_timeout,
		)));
	}

	if let (Some(key), Some(secret)) = (
		settings.venues.houdini_api_key.resolve_optional(),
		settings.venues.houdini_api_secret.resolve_optional(),
	) {
		let client = Arc::new(HoudiniClient::new(key, secret, request_timeout));
		registry.register(Arc::new(HoudiniProvider::with_client(
			evm_dyn.clone(),
			client.clone(),
		)));
		registry.register(Arc::new(HoudiniXmrProvider::with_client(
			evm_dyn.clone(),
			client.clone(),
		)));
		exchanges.push(Arc::new(StaticCatalog::new(
			houdini::NAME,
			houdini::lookup_symbol,
		)));
		let catalog = Arc::new(DynamicCatalog::new(houdini::NAME, client));
		exchanges.push(catalog.clone());
		catalogs.push(catalog);
	}

	info!(providers = registry.len(), "assembled provider registry");

	let resolver = Resolver::new(
		CoinGeckoClient::new(
			settings.venues.coingecko_api_key.resolve_optional(),
			request_timeout,
		),
		PoolMatcher::new(request_timeout),
		TokenMatcher::new(request_timeout),
		exchanges,
	);

	let manager = SwapManager::new(registry, evm_dyn, quote_timeout);

	Ok(Core { manager, resolver, evm, catalogs })
}

/// Initializes tracing from the settings' logging level. Intended for the
/// thin binaries embedding the core; tests and libraries skip it.
pub fn init_tracing(settings: &Settings) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings.logging.level.clone()));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}
