//! Smart contract access: signed execution and read-only queries.
//!
//! Queries go straight to the query endpoint and never take the account
//! lock or touch the sequence.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::blockchain::broadcaster::Broadcaster;
use crate::blockchain::endpoint::{BroadcastEndpoint, ChainQuery};
use crate::blockchain::message::Message;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, BroadcastResult, Coin, ContractInfo, ContractTransaction,
};

pub struct ContractClient<C> {
    endpoint: Arc<C>,
    broadcaster: Option<Arc<Broadcaster<C>>>,
    address: String,
}

impl<C: ChainQuery + BroadcastEndpoint> ContractClient<C> {
    /// Client that can both query and execute.
    pub fn new(broadcaster: Arc<Broadcaster<C>>, address: impl Into<String>) -> Self {
        Self {
            endpoint: broadcaster.endpoint().clone(),
            broadcaster: Some(broadcaster),
            address: address.into(),
        }
    }

    /// Client without a key; `execute` fails.
    pub fn read_only(endpoint: Arc<C>, address: impl Into<String>) -> Self {
        Self {
            endpoint,
            broadcaster: None,
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Execute `msg` on the contract, optionally attaching `funds`.
    pub async fn execute(&self, msg: Value, funds: Option<Coin>) -> BlockchainResult<BroadcastResult> {
        let broadcaster = self.broadcaster.as_ref().ok_or_else(|| {
            BlockchainError::Wallet("contract client has no signing wallet".to_string())
        })?;

        let message = Message::execute(broadcaster.wallet().address(), &self.address, msg, funds);
        tracing::debug!(contract = %self.address, "Executing contract message");
        broadcaster.broadcast(vec![message]).await
    }

    /// Run a smart query and return the decoded JSON answer.
    pub async fn query(&self, msg: &Value) -> BlockchainResult<Value> {
        Message::query(&self.address, msg.clone()).validate()?;

        let encoded = serde_json::to_vec(msg).map_err(|e| BlockchainError::Encoding(e.to_string()))?;
        let response = self
            .endpoint
            .query_contract_state(&self.address, &STANDARD.encode(encoded))
            .await?;

        let decoded = STANDARD
            .decode(response.trim())
            .map_err(|e| BlockchainError::Query(format!("Response is not base64: {}", e)))?;
        serde_json::from_slice(&decoded)
            .map_err(|e| BlockchainError::Query(format!("Response is not JSON: {}", e)))
    }

    /// [`ContractClient::query`] deserialized into `T`.
    pub async fn query_as<T: DeserializeOwned>(&self, msg: &Value) -> BlockchainResult<T> {
        let value = self.query(msg).await?;
        serde_json::from_value(value).map_err(|e| BlockchainError::Query(e.to_string()))
    }

    pub async fn info(&self) -> BlockchainResult<ContractInfo> {
        self.endpoint.get_contract_info(&self.address).await
    }

    /// The `limit` most recent transactions that executed this contract.
    pub async fn transactions(&self, limit: u32) -> BlockchainResult<Vec<ContractTransaction>> {
        if limit == 0 {
            return Err(BlockchainError::InvalidMessage(
                "transaction limit must be at least 1".to_string(),
            ));
        }
        let txs = self
            .endpoint
            .get_contract_transactions(&self.address, limit)
            .await?;
        tracing::debug!(contract = %self.address, count = txs.len(), "Fetched contract transactions");
        Ok(txs)
    }
}
