//! fundrouter types
//!
//! Shared models and traits for the fundrouter swap core: asset notation,
//! quotes, the provider contract, and the error vocabulary every crate in the
//! workspace speaks.

pub mod amount;
pub mod asset;
pub mod catalog;
pub mod chains;
pub mod errors;
pub mod provider;
pub mod quote;

pub use asset::{Asset, AssetParseError, ResolvedHints};
pub use catalog::{CatalogCurrency, CurrencyFeed};
pub use chains::{usdc_asset, ChainInfo, SOURCE_CHAINS};
pub use errors::{ProviderError, ProviderResult};
pub use provider::{SwapProvider, CATEGORY_DEX, CATEGORY_PRIVATE, CATEGORY_XMR_PRIVATE};
pub use quote::{ExecuteResult, HintKind, Quote, RoutingHint, SwapStatus};

// Re-exported so downstream crates agree on one serde_json.
pub use serde_json;
