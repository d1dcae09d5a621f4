//! Error types shared by provider implementations

use thiserror::Error;

/// Errors raised by venue integrations and the EVM bridge.
#[derive(Error, Debug)]
pub enum ProviderError {
	#[error("{provider}: unsupported target asset {asset}")]
	UnsupportedAsset { provider: String, asset: String },

	#[error("{provider}: no quotes available for {asset}")]
	NoQuotes { provider: String, asset: String },

	#[error("{provider}: minimum swap amount is ${minimum:.2} (requested ${requested:.2})")]
	BelowMinimum {
		provider: String,
		minimum: f64,
		requested: f64,
	},

	#[error("{provider}: quote is missing {field}")]
	MissingQuoteData { provider: String, field: String },

	#[error("no RPC client configured for chain {chain}")]
	UnknownChain { chain: String },

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

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("rpc error: {0}")]
	Rpc(String),

	#[error("signing error: {0}")]
	Signing(String),

	#[error("transaction {tx_hash} reverted")]
	TxReverted { tx_hash: String },
}

impl ProviderError {
	/// Shorthand for a malformed-payload error.
	pub fn invalid_response(reason: impl Into<String>) -> Self {
		Self::InvalidResponse { reason: reason.into() }
	}

	/// Builds a non-success HTTP status error from a response body.
	pub fn http_status(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
		Self::Status {
			endpoint: endpoint.into(),
			status,
			body: body.into(),
		}
	}
}

impl From<alloy::transports::TransportError> for ProviderError {
	fn from(err: alloy::transports::TransportError) -> Self {
		Self::Rpc(err.to_string())
	}
}

pub type ProviderResult<T> = Result<T, ProviderError>;
