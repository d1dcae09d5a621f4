//! fundrouter resolver
//!
//! Identifies an arbitrary chain/symbol/contract triple against independent
//! external catalogs (symbol search, liquidity pools, intent-network tokens,
//! exchange currency lists) and produces the per-provider identifiers the
//! swap providers consume.

pub mod cache;
pub mod coingecko;
pub mod exchange_index;
pub mod intents;
pub mod pools;
mod resolve;

pub use cache::TtlCache;
pub use coingecko::CoinGeckoClient;
pub use exchange_index::{DynamicCatalog, ExchangeLookup, StaticCatalog};
pub use intents::TokenMatcher;
pub use pools::PoolMatcher;
pub use resolve::{ProviderMatch, Resolution, Resolver};

use thiserror::Error;

/// Resolution errors.
#[derive(Error, Debug)]
pub enum ResolverError {
	#[error("no catalog result for symbol {symbol:?}")]
	SymbolNotFound { symbol: String },

	#[error("token {name} ({symbol}) found on catalog but not supported by any provider")]
	Unsupported { name: String, symbol: String },

	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("{endpoint} returned HTTP {status}: {body}")]
	Status {
		endpoint: String,
		status: u16,
		body: String,
	},

	#[error("invalid response: {reason}")]
	InvalidResponse { reason: String },
}

impl ResolverError {
	pub fn invalid_response(reason: impl Into<String>) -> Self {
		Self::InvalidResponse { reason: reason.into() }
	}
}

pub type ResolverResult<T> = Result<T, ResolverError>;
