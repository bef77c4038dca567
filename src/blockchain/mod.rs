//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key)
//!     → wallet.rs (key loading, address derivation)
//!     → sequencer.rs (account sequence, per-account lock)
//!     → builder.rs (fee, timeout height, envelope)
//!     → signer.rs (canonical bytes, signature)
//!     → broadcaster.rs (submit, await inclusion)
//!
//! contract.rs (execute → broadcaster, query → client)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All REST calls have configurable timeouts
//! - Nothing is resubmitted automatically

pub mod broadcaster;
pub mod builder;
pub mod client;
pub mod contract;
pub mod endpoint;
pub mod message;
pub mod sequencer;
pub mod signer;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use broadcaster::{Broadcaster, SubmittedTx};
pub use builder::TransactionBuilder;
pub use client::ChainClient;
pub use contract::ContractClient;
pub use endpoint::{BroadcastEndpoint, ChainQuery};
pub use message::Message;
pub use sequencer::AccountSequencer;
pub use signer::Signer;
pub use transaction::{SignedTransaction, TransactionEnvelope};
pub use types::{
    AccountInfo, BlockchainError, BlockchainResult, BroadcastResult, Coin, ContractInfo,
    ContractTransaction, Fee, FeeConfig, SequenceEffect, TxState,
};
pub use wallet::Wallet;
