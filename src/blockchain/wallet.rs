//! Key management and address derivation.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables or passed in directly
//! - Keys are never logged or serialized
//! - `Debug` prints the public address only

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bech32::{Bech32, Hrp};

use crate::blockchain::types::{BlockchainError, BlockchainResult};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "TX_BROADCASTER_PRIVATE_KEY";

const ADDRESS_LEN: usize = 20;

/// Signing key plus the account identity derived from it.
///
/// The account address is the Ethereum-style address of the secp256k1 key,
/// bech32-encoded with the chain's prefix.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    address: String,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key string.
    ///
    /// # Arguments
    /// * `private_key_hex` - Hex string (with or without 0x prefix)
    /// * `prefix` - bech32 human-readable part, e.g. `inj`
    pub fn from_private_key(private_key_hex: &str, prefix: &str) -> BlockchainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))?;
        let address = to_bech32(prefix, &signer.address())?;

        tracing::info!(address = %address, "Wallet initialized");

        Ok(Self { signer, address })
    }

    /// Load wallet from environment variable.
    ///
    /// Reads `TX_BROADCASTER_PRIVATE_KEY` from environment.
    pub fn from_env(prefix: &str) -> BlockchainResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            BlockchainError::Wallet(format!(
                "Environment variable {} not set",
                PRIVATE_KEY_ENV_VAR
            ))
        })?;

        Self::from_private_key(&private_key, prefix)
    }

    /// Bech32 account address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Underlying 20-byte address.
    pub fn eth_address(&self) -> Address {
        self.signer.address()
    }

    /// SEC1 compressed public key (33 bytes).
    pub fn public_key(&self) -> Vec<u8> {
        self.signer
            .credential()
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public_key())
    }

    /// Sign a 32-byte digest.
    ///
    /// Signatures are deterministic (RFC 6979): the same digest always
    /// yields the same 65 bytes.
    pub async fn sign_hash(&self, hash: B256) -> BlockchainResult<alloy::signers::Signature> {
        self.signer
            .sign_hash(&hash)
            .await
            .map_err(|e| BlockchainError::SigningError(format!("Signing failed: {}", e)))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Encode a 20-byte address as bech32 with `prefix`.
pub fn to_bech32(prefix: &str, address: &Address) -> BlockchainResult<String> {
    let hrp = Hrp::parse(prefix)
        .map_err(|e| BlockchainError::Wallet(format!("Invalid bech32 prefix '{}': {}", prefix, e)))?;
    bech32::encode::<Bech32>(hrp, address.as_slice())
        .map_err(|e| BlockchainError::Wallet(format!("Bech32 encoding failed: {}", e)))
}

/// Decode a bech32 account address, checking its prefix.
pub fn from_bech32(expected_prefix: &str, encoded: &str) -> BlockchainResult<Address> {
    let (hrp, data) = bech32::decode(encoded)
        .map_err(|e| BlockchainError::Wallet(format!("Invalid bech32 address '{}': {}", encoded, e)))?;

    if !hrp.to_string().eq_ignore_ascii_case(expected_prefix) {
        return Err(BlockchainError::Wallet(format!(
            "Address '{}' has prefix '{}', expected '{}'",
            encoded, hrp, expected_prefix
        )));
    }
    if data.len() != ADDRESS_LEN {
        return Err(BlockchainError::Wallet(format!(
            "Address '{}' decodes to {} bytes, expected {}",
            encoded,
            data.len(),
            ADDRESS_LEN
        )));
    }
    Ok(Address::from_slice(&data))
}
