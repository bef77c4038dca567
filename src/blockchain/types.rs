//! Chain-specific types and error definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during blockchain operations.
///
/// Every variant is terminal for the call that produced it; nothing is
/// retried inside the crate. Use [`BlockchainError::sequence_effect`] to
/// decide whether a rebuilt transaction can be sent safely.
#[derive(Debug, Error)]
pub enum BlockchainError {
    /// The address has no on-chain account yet (never funded).
    #[error("Account {0} not found on chain")]
    AccountNotFound(String),

    /// Gas simulation failed; the build was aborted.
    #[error("Gas estimation failed: {0}")]
    GasEstimationFailed(String),

    /// Key material could not produce a signature.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Signed bytes could not be delivered to any node.
    #[error("Submission error: {0}")]
    SubmissionError(String),

    /// The node refused the transaction at mempool admission.
    #[error("Transaction rejected by chain (code {code}): {raw_log}")]
    ChainRejected { code: u32, raw_log: String },

    /// No inclusion observed before the timeout height or deadline.
    #[error("Transaction {tx_hash} not included before deadline")]
    TimedOut { tx_hash: String },

    /// The message set cannot form a valid envelope.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Invalid private key format or address derivation error.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Canonical encoding or decoding failed.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Query endpoint returned an unusable response.
    #[error("Query error: {0}")]
    Query(String),

    /// REST connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: String, actual: String },
}

/// Result type for blockchain operations.
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// What a failure means for the account's sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEffect {
    /// The sequence was not consumed; a rebuilt transaction may reuse it.
    NotConsumed,
    /// The transaction may still land. Re-query the account before rebuilding.
    Unknown,
}

impl BlockchainError {
    /// Classify the failure by its effect on the account sequence.
    pub fn sequence_effect(&self) -> SequenceEffect {
        match self {
            BlockchainError::SubmissionError(_) | BlockchainError::TimedOut { .. } => {
                SequenceEffect::Unknown
            }
            _ => SequenceEffect::NotConsumed,
        }
    }

    /// Terminal broadcast state this error represents, if any.
    pub fn terminal_state(&self) -> Option<TxState> {
        match self {
            BlockchainError::ChainRejected { .. } => Some(TxState::Rejected),
            BlockchainError::TimedOut { .. } => Some(TxState::TimedOut),
            _ => None,
        }
    }
}

/// Lifecycle of one transaction.
///
/// ```text
/// Built → Signed → Submitted → Confirmed | Rejected | TimedOut
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxState {
    Built,
    Signed,
    Submitted,
    Confirmed,
    Rejected,
    TimedOut,
}

impl TxState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxState::Built => "built",
            TxState::Signed => "signed",
            TxState::Submitted => "submitted",
            TxState::Confirmed => "confirmed",
            TxState::Rejected => "rejected",
            TxState::TimedOut => "timed_out",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Confirmed | TxState::Rejected | TxState::TimedOut)
    }
}

/// An amount of a single denomination, in base units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    /// Decimal string to carry 128-bit amounts through JSON.
    pub amount: String,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }

    /// Amount must be base-unit digits and the denom must start with a letter.
    pub fn validate(&self) -> BlockchainResult<()> {
        if self.amount.is_empty() || !self.amount.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BlockchainError::InvalidMessage(format!(
                "coin amount '{}' is not a whole number of base units",
                self.amount
            )));
        }
        if !self.denom.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(BlockchainError::InvalidMessage(format!(
                "coin denom '{}' must start with a letter",
                self.denom
            )));
        }
        Ok(())
    }

    pub fn is_zero(&self) -> bool {
        self.amount.bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = BlockchainError;

    /// Parse `"<amount><denom>"`, e.g. `160000inj`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| BlockchainError::InvalidMessage(format!("coin '{}' has no denom", s)))?;
        let (amount, denom) = s.split_at(split);
        let amount: u128 = amount
            .parse()
            .map_err(|_| BlockchainError::InvalidMessage(format!("coin '{}' has no amount", s)))?;
        let coin = Coin::new(amount, denom);
        coin.validate()?;
        Ok(coin)
    }
}

/// Transaction fee: what is paid and the gas it buys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas_limit: u64,
}

/// How the builder determines the fee.
#[derive(Debug, Clone, PartialEq)]
pub enum FeeConfig {
    /// Use this fee as is.
    Explicit(Fee),
    /// Pay for a fixed gas limit at the configured gas price.
    FixedGas { gas_limit: u64 },
    /// Simulate the message set and scale the gas used.
    Simulate { gas_adjustment: f64 },
}

/// Account fields as reported by the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnChainAccount {
    pub account_number: u64,
    pub sequence: u64,
}

/// Everything needed to sequence a transaction for one signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub address: String,
    pub sequence: u64,
    pub account_number: u64,
    pub chain_id: String,
}

/// Node answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub tx_hash: String,
    /// Admission (check) code; 0 means accepted into the mempool.
    pub code: u32,
    pub raw_log: String,
}

/// Inclusion status of a transaction hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxStatus {
    pub included: bool,
    pub code: u32,
    pub raw_log: String,
    pub height: Option<u64>,
}

impl TxStatus {
    pub fn pending() -> Self {
        Self {
            included: false,
            code: 0,
            raw_log: String::new(),
            height: None,
        }
    }
}

/// Result of an included transaction.
///
/// A nonzero `code` means the transaction was included and consumed the
/// sequence, but message execution failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastResult {
    pub tx_hash: String,
    pub code: u32,
    pub raw_log: String,
    pub height: Option<u64>,
    pub sequence: u64,
}

impl BroadcastResult {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    pub fn state(&self) -> TxState {
        TxState::Confirmed
    }
}

/// Smart contract metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractInfo {
    pub address: String,
    pub code_id: u64,
    pub creator: String,
    pub admin: Option<String>,
    pub label: String,
}

/// An indexed transaction that executed a contract, newest first when listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractTransaction {
    pub tx_hash: String,
    pub height: u64,
    pub code: u32,
    pub raw_log: String,
    pub timestamp: Option<String>,
    pub gas_used: Option<u64>,
}
