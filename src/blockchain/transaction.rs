//! Transaction envelopes and their signed form.
//!
//! # Encoding
//! - `TransactionEnvelope::sign_bytes` is the canonical encoding that gets signed
//! - `SignedTransaction::to_bytes` wraps it with signature and public key
//! - Both are JSON with sorted keys, so identical contents give identical bytes
//!   and distinct contents give distinct bytes

use alloy::primitives::keccak256;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::blockchain::message::{canonical_bytes, Message};
use crate::blockchain::types::{BlockchainError, BlockchainResult, Fee};

/// Unsigned transaction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    messages: Vec<Message>,
    fee: Fee,
    memo: Option<String>,
    timeout_height: Option<u64>,
    sequence: u64,
    account_number: u64,
    chain_id: String,
}

impl TransactionEnvelope {
    pub(crate) fn new(
        messages: Vec<Message>,
        fee: Fee,
        memo: Option<String>,
        timeout_height: Option<u64>,
        sequence: u64,
        account_number: u64,
        chain_id: String,
    ) -> Self {
        Self {
            messages,
            fee,
            memo,
            timeout_height,
            sequence,
            account_number,
            chain_id,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn fee(&self) -> &Fee {
        &self.fee
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn timeout_height(&self) -> Option<u64> {
        self.timeout_height
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn account_number(&self) -> u64 {
        self.account_number
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// The signer shared by every message.
    pub fn signer(&self) -> Option<&str> {
        self.messages.first().and_then(Message::signer)
    }

    /// Canonical bytes covered by the signature.
    pub fn sign_bytes(&self) -> BlockchainResult<Vec<u8>> {
        canonical_bytes(self)
    }
}

/// Wire form of a signed transaction.
#[derive(Serialize, Deserialize)]
struct TxRaw {
    body: TransactionEnvelope,
    public_key: String,
    signature: String,
}

/// Envelope plus signature and public key.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    envelope: TransactionEnvelope,
    signature: Vec<u8>,
    public_key: Vec<u8>,
}

impl SignedTransaction {
    pub(crate) fn new(envelope: TransactionEnvelope, signature: Vec<u8>, public_key: Vec<u8>) -> Self {
        Self {
            envelope,
            signature,
            public_key,
        }
    }

    pub fn envelope(&self) -> &TransactionEnvelope {
        &self.envelope
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Encode for submission.
    pub fn to_bytes(&self) -> BlockchainResult<Vec<u8>> {
        canonical_bytes(&TxRaw {
            body: self.envelope.clone(),
            public_key: STANDARD.encode(&self.public_key),
            signature: STANDARD.encode(&self.signature),
        })
    }

    /// Decode bytes produced by [`SignedTransaction::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> BlockchainResult<Self> {
        let raw: TxRaw =
            serde_json::from_slice(bytes).map_err(|e| BlockchainError::Encoding(e.to_string()))?;
        let decode = |field: &str, value: &str| {
            STANDARD
                .decode(value)
                .map_err(|e| BlockchainError::Encoding(format!("invalid base64 in {}: {}", field, e)))
        };
        Ok(Self {
            signature: decode("signature", &raw.signature)?,
            public_key: decode("public_key", &raw.public_key)?,
            envelope: raw.body,
        })
    }

    /// Upper-case hex keccak256 of the encoded bytes.
    pub fn hash(&self) -> BlockchainResult<String> {
        Ok(tx_hash(&self.to_bytes()?))
    }
}

/// Hash of encoded transaction bytes, as reported to callers.
pub fn tx_hash(bytes: &[u8]) -> String {
    alloy::primitives::hex::encode_upper(keccak256(bytes))
}
