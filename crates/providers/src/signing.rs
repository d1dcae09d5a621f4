//! Typed-data signing and gasless permit construction
//!
//! One signing routine covers every structured-data authorization in the
//! workspace: solver orders and EIP-2612 token permits differ only in their
//! domain and type descriptors, so both go through [`sign_typed_data`] and
//! get a recoverable signature with `v` normalized to the 27/28 convention
//! venues expect.

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolCall, SolStruct};
use fundrouter_types::{ProviderError, ProviderResult};
use serde::{Deserialize, Serialize};

sol! {
	/// EIP-2612 permit message.
	struct Permit {
		address owner;
		address spender;
		uint256 value;
		uint256 nonce;
		uint256 deadline;
	}

	function permit(
		address owner,
		address spender,
		uint256 value,
		uint256 deadline,
		uint8 v,
		bytes32 r,
		bytes32 s
	) external;
}

/// Gas limit hint carried in permit pre-hooks.
pub const PERMIT_GAS_LIMIT: &str = "80000";

/// A recoverable secp256k1 signature in the 27/28 `v` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedSignature {
	pub r: B256,
	pub s: B256,
	pub v: u8,
}

impl TypedSignature {
	pub fn to_bytes(&self) -> [u8; 65] {
		let mut out = [0u8; 65];
		out[..32].copy_from_slice(self.r.as_slice());
		out[32..64].copy_from_slice(self.s.as_slice());
		out[64] = self.v;
		out
	}

	/// Hex encoding with `0x` prefix, the wire form venues take.
	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(self.to_bytes()))
	}
}

/// Signs an EIP-712 typed message: domain separator and struct hash are
/// combined under the `\x19\x01` prefix, hashed, and signed recoverably.
pub fn sign_typed_data<T: SolStruct>(
	signer: &PrivateKeySigner,
	domain: &Eip712Domain,
	message: &T,
) -> ProviderResult<TypedSignature> {
	let digest = message.eip712_signing_hash(domain);
	let signature = signer
		.sign_hash_sync(&digest)
		.map_err(|e| ProviderError::Signing(format!("typed-data signature: {e}")))?;

	Ok(TypedSignature {
		r: B256::from(signature.r().to_be_bytes::<32>()),
		s: B256::from(signature.s().to_be_bytes::<32>()),
		v: if signature.v() { 28 } else { 27 },
	})
}

/// Builds the EIP-712 domain of an EIP-2612 token (e.g. USDC uses
/// `name = "USDC"`, `version = "2"`).
pub fn erc2612_domain(name: &str, version: &str, chain_id: u64, token: Address) -> Eip712Domain {
	Eip712Domain::new(
		Some(name.to_string().into()),
		Some(version.to_string().into()),
		Some(U256::from(chain_id)),
		Some(token),
		None,
	)
}

/// One pre-transaction hook in an application-data document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PreHook {
	pub target: String,
	pub call_data: String,
	pub gas_limit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppDataHooks {
	pre: Vec<PreHook>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppDataMetadata {
	#[serde(skip_serializing_if = "Option::is_none")]
	hooks: Option<AppDataHooks>,
}

/// Application-data document attached to solver quote requests. Its
/// keccak256 hash is part of the signed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppDataDoc {
	version: String,
	metadata: AppDataMetadata,
}

/// The hook-less application-data document and its hash.
pub const DEFAULT_APP_DATA: &str = r#"{"version":"1.3.0","metadata":{}}"#;
pub const DEFAULT_APP_DATA_HASH: &str =
	"0xa872cd1c41362821123e195e2dc6a3f19502a451e1fb2a1f861131526e98fdc7";

/// keccak256 of an application-data JSON string, hex encoded.
pub fn app_data_hash(app_data_json: &str) -> String {
	format!("0x{}", hex::encode(keccak256(app_data_json.as_bytes())))
}

/// Signs an EIP-2612 permit and wraps the resulting `permit(...)` call as a
/// pre-hook application-data document. Returns `(app_data_json, app_data_hash)`.
///
/// The caller reads the token's current per-owner nonce on-chain and picks a
/// bounded future deadline. Known sharp edge: if the venue fails to simulate
/// this hook server-side (bad signature, wrong domain name or version), the
/// venue reports a misleading "insufficient allowance" error rather than a
/// signature error. The root cause is invisible to the caller, which is why
/// failures around this path are logged with full domain context and never
/// silently retried.
pub fn build_permit_app_data(
	signer: &PrivateKeySigner,
	domain: &Eip712Domain,
	token: Address,
	owner: Address,
	spender: Address,
	value: U256,
	nonce: U256,
	deadline: U256,
) -> ProviderResult<(String, String)> {
	let message = Permit { owner, spender, value, nonce, deadline };
	let signature = sign_typed_data(signer, domain, &message)?;

	let call_data = permitCall {
		owner,
		spender,
		value,
		deadline,
		v: signature.v,
		r: signature.r,
		s: signature.s,
	}
	.abi_encode();

	let doc = AppDataDoc {
		version: "1.3.0".to_string(),
		metadata: AppDataMetadata {
			hooks: Some(AppDataHooks {
				pre: vec![PreHook {
					target: token.to_string(),
					call_data: format!("0x{}", hex::encode(call_data)),
					gas_limit: PERMIT_GAS_LIMIT.to_string(),
				}],
			}),
		},
	};

	let app_data_json = serde_json::to_string(&doc)?;
	let hash = app_data_hash(&app_data_json);
	Ok((app_data_json, hash))
}

#[cfg(test)]
mod tests {
	use super::*;
	use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey};

	fn test_signer() -> PrivateKeySigner {
		"0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318"
			.parse()
			.unwrap()
	}

	fn recover(digest: B256, sig: &TypedSignature) -> Address {
		let bytes = sig.to_bytes();
		let recovery_id = RecoveryId::try_from(sig.v - 27).unwrap();
		let ecdsa_sig = EcdsaSignature::from_slice(&bytes[..64]).unwrap();
		let key =
			VerifyingKey::recover_from_prehash(digest.as_slice(), &ecdsa_sig, recovery_id)
				.unwrap();
		let point = key.to_encoded_point(false);
		let hash = keccak256(&point.as_bytes()[1..]);
		Address::from_slice(&hash[12..])
	}

	#[test]
	fn permit_signature_recovers_to_signer() {
		let signer = test_signer();
		let token: Address = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse().unwrap();
		let domain = erc2612_domain("USDC", "2", 8453, token);
		let message = Permit {
			owner: signer.address(),
			spender: "0xC92E8bdf79f0507f65a392b0ab4667716BFE0110".parse().unwrap(),
			value: U256::from(1_000_000u64),
			nonce: U256::ZERO,
			deadline: U256::from(1_900_000_000u64),
		};

		let sig = sign_typed_data(&signer, &domain, &message).unwrap();
		assert!(sig.v == 27 || sig.v == 28);

		let digest = message.eip712_signing_hash(&domain);
		assert_eq!(recover(digest, &sig), signer.address());
	}

	#[test]
	fn signing_is_deterministic() {
		let signer = test_signer();
		let token: Address = "0xB97EF9Ef8734C71904D8002F8B6BC66Dd9c48a6E".parse().unwrap();
		let domain = erc2612_domain("USDC", "2", 43114, token);
		let message = Permit {
			owner: signer.address(),
			spender: Address::ZERO,
			value: U256::MAX,
			nonce: U256::from(3u64),
			deadline: U256::from(1_900_000_000u64),
		};

		let a = sign_typed_data(&signer, &domain, &message).unwrap();
		let b = sign_typed_data(&signer, &domain, &message).unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn default_app_data_hash_matches_document() {
		assert_eq!(app_data_hash(DEFAULT_APP_DATA), DEFAULT_APP_DATA_HASH);
	}

	#[test]
	fn permit_app_data_embeds_hook() {
		let signer = test_signer();
		let token: Address = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".parse().unwrap();
		let domain = erc2612_domain("USDC", "2", 8453, token);

		let (json, hash) = build_permit_app_data(
			&signer,
			&domain,
			token,
			signer.address(),
			"0xC92E8bdf79f0507f65a392b0ab4667716BFE0110".parse().unwrap(),
			U256::MAX,
			U256::ZERO,
			U256::from(1_900_000_000u64),
		)
		.unwrap();

		assert_eq!(hash, app_data_hash(&json));
		let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
		let hooks = &doc["metadata"]["hooks"]["pre"];
		assert_eq!(hooks.as_array().unwrap().len(), 1);
		assert_eq!(hooks[0]["gasLimit"], PERMIT_GAS_LIMIT);
		assert!(hooks[0]["callData"].as_str().unwrap().starts_with("0x"));
	}
}
