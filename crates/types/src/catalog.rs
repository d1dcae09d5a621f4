//! Venue currency-catalog vocabulary
//!
//! Custodial exchanges publish flat currency lists. The resolver indexes them
//! without knowing which venue client produced them; venue clients implement
//! [`CurrencyFeed`] to supply their list in this shared shape.

use crate::errors::ProviderResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry of a venue's currency catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCurrency {
	/// Venue-specific identifier to hand back when quoting.
	pub id: String,
	pub symbol: String,
	/// Venue's network name ("eth", "avaxc", "base").
	pub network: String,
	/// Contract address, empty for native currencies.
	#[serde(default)]
	pub contract_address: String,
}

/// A source of a venue's full currency catalog.
#[async_trait]
pub trait CurrencyFeed: Send + Sync {
	async fn catalog_currencies(&self) -> ProviderResult<Vec<CatalogCurrency>>;
}
