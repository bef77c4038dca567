//! Seams between the broadcast pipeline and the network.
//!
//! `ChainClient` implements both traits over REST. Tests substitute an
//! in-memory chain.

use std::future::Future;

use crate::blockchain::message::Message;
use crate::blockchain::types::{
    BlockchainResult, Coin, ContractInfo, ContractTransaction, OnChainAccount, SubmitResponse,
    TxStatus,
};

/// Read-only chain state.
pub trait ChainQuery: Send + Sync {
    /// Fails with `AccountNotFound` if the address never appeared on-chain.
    fn get_account(
        &self,
        address: &str,
    ) -> impl Future<Output = BlockchainResult<OnChainAccount>> + Send;

    fn get_latest_block_height(&self) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Gas used by executing `messages`. Failures are `GasEstimationFailed`.
    fn simulate_gas(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = BlockchainResult<u64>> + Send;

    /// Smart query: base64 JSON in, base64 JSON out.
    fn query_contract_state(
        &self,
        contract: &str,
        query_base64: &str,
    ) -> impl Future<Output = BlockchainResult<String>> + Send;

    fn get_balances(&self, address: &str) -> impl Future<Output = BlockchainResult<Vec<Coin>>> + Send;

    fn get_contract_info(
        &self,
        contract: &str,
    ) -> impl Future<Output = BlockchainResult<ContractInfo>> + Send;

    /// Up to `limit` most recent transactions that executed `contract`.
    fn get_contract_transactions(
        &self,
        contract: &str,
        limit: u32,
    ) -> impl Future<Output = BlockchainResult<Vec<ContractTransaction>>> + Send;
}

/// Transaction submission and inclusion lookup.
pub trait BroadcastEndpoint: Send + Sync {
    /// Deliver signed bytes to a mempool. Transport failures are `SubmissionError`.
    fn submit(&self, tx_bytes: &[u8]) -> impl Future<Output = BlockchainResult<SubmitResponse>> + Send;

    /// `included == false` while the hash is unknown to the node.
    fn get_tx_status(&self, tx_hash: &str) -> impl Future<Output = BlockchainResult<TxStatus>> + Send;
}
