//! Chain REST client with timeout and failover handling.
//!
//! # Responsibilities
//! - Connect to the chain's REST (LCD) endpoints
//! - Query chain state (accounts, heights, balances, contract state)
//! - Submit signed transactions and look up their inclusion
//! - Handle timeouts and network errors by moving to the next endpoint

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::blockchain::endpoint::{BroadcastEndpoint, ChainQuery};
use crate::blockchain::message::{canonical_bytes, Message};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, Coin, ContractInfo, ContractTransaction, OnChainAccount,
    SubmitResponse, TxStatus,
};
use crate::config::ChainConfig;
use crate::observability::metrics;

/// REST client wrapper with failover support.
#[derive(Clone)]
pub struct ChainClient {
    /// Base URLs (primary + failovers), without trailing slash.
    endpoints: Vec<String>,
    http: reqwest::Client,
    config: ChainConfig,
    /// Request timeout duration.
    timeout_duration: Duration,
}

impl ChainClient {
    /// Create a new chain client.
    ///
    /// A mismatching or unreachable chain is logged, not fatal, so that
    /// offline commands still work.
    pub async fn new(config: ChainConfig) -> BlockchainResult<Self> {
        let client = Self::connect(config)?;

        match client.verify_chain_id().await {
            Ok(()) => {
                tracing::info!(
                    rest_url = %client.config.rest_url,
                    chain_id = %client.config.chain_id,
                    "Chain client initialized"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Chain client initialized but chain verification failed"
                );
            }
        }

        Ok(client)
    }

    /// Create a client without contacting the chain.
    pub fn connect(config: ChainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.request_timeout_secs);
        let mut endpoints = Vec::new();

        url::Url::parse(&config.rest_url).map_err(|e| {
            BlockchainError::Rpc(format!("Invalid REST URL '{}': {}", config.rest_url, e))
        })?;
        endpoints.push(config.rest_url.trim_end_matches('/').to_string());

        for url_str in &config.failover_urls {
            if url::Url::parse(url_str).is_ok() {
                endpoints.push(url_str.trim_end_matches('/').to_string());
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover REST URL");
            }
        }

        let http = reqwest::Client::builder()
            .connect_timeout(timeout_duration)
            .timeout(timeout_duration)
            .build()
            .map_err(|e| BlockchainError::Rpc(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoints,
            http,
            config,
            timeout_duration,
        })
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let header = self.latest_header().await?;
        if header.chain_id != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id.clone(),
                actual: header.chain_id,
            });
        }
        Ok(())
    }

    /// Check if any endpoint answers a latest-block query.
    pub async fn is_healthy(&self) -> bool {
        self.latest_header().await.is_ok()
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    async fn latest_header(&self) -> BlockchainResult<BlockHeader> {
        let (status, body) = self
            .send("latest block", |http, base| {
                http.get(format!("{}/cosmos/base/tendermint/v1beta1/blocks/latest", base))
            })
            .await?;
        let response: LatestBlockResponse = parse_ok("latest block", status, &body)?;
        Ok(response.block.header)
    }

    /// Send a request to each endpoint in turn until one answers.
    ///
    /// The request and the body read share one timeout. Transport errors,
    /// timeouts and 5xx responses move on to the next endpoint; any other
    /// response is returned to the caller.
    async fn send<F>(&self, op: &'static str, make: F) -> BlockchainResult<(StatusCode, String)>
    where
        F: Fn(&reqwest::Client, &str) -> RequestBuilder,
    {
        for (i, base) in self.endpoints.iter().enumerate() {
            let attempt = async {
                let resp = make(&self.http, base.as_str()).send().await?;
                let status = resp.status();
                let body = resp.text().await?;
                Ok::<_, reqwest::Error>((status, body))
            };
            match timeout(self.timeout_duration, attempt).await {
                Ok(Ok((status, _))) if status.is_server_error() => {
                    tracing::warn!(endpoint_idx = i, op, status = %status, "Server error, trying next endpoint");
                }
                Ok(Ok((status, body))) => {
                    metrics::record_endpoint_health(base, true);
                    return Ok((status, body));
                }
                Ok(Err(e)) => tracing::warn!(endpoint_idx = i, op, error = %e, "REST error, trying next endpoint"),
                Err(_) => tracing::warn!(endpoint_idx = i, op, "REST timeout, trying next endpoint"),
            }
            metrics::record_endpoint_health(base, false);
        }
        Err(BlockchainError::Rpc(format!("All REST endpoints failed for {}", op)))
    }
}

impl ChainQuery for ChainClient {
    async fn get_account(&self, address: &str) -> BlockchainResult<OnChainAccount> {
        let (status, body) = self
            .send("account", |http, base| {
                http.get(format!("{}/cosmos/auth/v1beta1/accounts/{}", base, address))
            })
            .await?;

        if is_not_found(status, &body) {
            return Err(BlockchainError::AccountNotFound(address.to_string()));
        }
        let response: AccountResponse = parse_ok("account", status, &body)?;
        let base = response.account.into_base();
        Ok(OnChainAccount {
            account_number: base.account_number,
            sequence: base.sequence,
        })
    }

    async fn get_latest_block_height(&self) -> BlockchainResult<u64> {
        Ok(self.latest_header().await?.height)
    }

    async fn simulate_gas(&self, messages: &[Message]) -> BlockchainResult<u64> {
        let tx_bytes = STANDARD.encode(canonical_bytes(&SimulationTx { messages })?);
        let body = json!({ "tx_bytes": tx_bytes });

        let (status, text) = self
            .send("simulate", |http, base| {
                http.post(format!("{}/cosmos/tx/v1beta1/simulate", base)).json(&body)
            })
            .await
            .map_err(|e| BlockchainError::GasEstimationFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(BlockchainError::GasEstimationFailed(error_message(status, &text)));
        }
        let response: SimulateResponse = serde_json::from_str(&text)
            .map_err(|e| BlockchainError::GasEstimationFailed(format!("Malformed simulate response: {}", e)))?;
        Ok(response.gas_info.gas_used)
    }

    async fn query_contract_state(&self, contract: &str, query_base64: &str) -> BlockchainResult<String> {
        let encoded: String = url::form_urlencoded::byte_serialize(query_base64.as_bytes()).collect();
        let (status, body) = self
            .send("contract query", |http, base| {
                http.get(format!(
                    "{}/cosmwasm/wasm/v1/contract/{}/smart/{}",
                    base, contract, encoded
                ))
            })
            .await?;

        let response: SmartQueryResponse = parse_ok("contract query", status, &body)?;
        let data = serde_json::to_vec(&response.data)
            .map_err(|e| BlockchainError::Encoding(e.to_string()))?;
        Ok(STANDARD.encode(data))
    }

    async fn get_balances(&self, address: &str) -> BlockchainResult<Vec<Coin>> {
        let (status, body) = self
            .send("balances", |http, base| {
                http.get(format!("{}/cosmos/bank/v1beta1/balances/{}", base, address))
            })
            .await?;
        let response: BalancesResponse = parse_ok("balances", status, &body)?;
        Ok(response.balances)
    }

    async fn get_contract_info(&self, contract: &str) -> BlockchainResult<ContractInfo> {
        let (status, body) = self
            .send("contract info", |http, base| {
                http.get(format!("{}/cosmwasm/wasm/v1/contract/{}", base, contract))
            })
            .await?;
        let response: ContractInfoResponse = parse_ok("contract info", status, &body)?;
        let info = response.contract_info;
        Ok(ContractInfo {
            address: response.address,
            code_id: info.code_id,
            creator: info.creator,
            admin: info.admin.filter(|a| !a.is_empty()),
            label: info.label,
        })
    }

    async fn get_contract_transactions(
        &self,
        contract: &str,
        limit: u32,
    ) -> BlockchainResult<Vec<ContractTransaction>> {
        let query = format!("execute._contract_address='{}'", contract);
        let limit = limit.to_string();
        let (status, body) = self
            .send("contract transactions", |http, base| {
                http.get(format!("{}/cosmos/tx/v1beta1/txs", base)).query(&[
                    ("query", query.as_str()),
                    ("pagination.limit", limit.as_str()),
                    ("order_by", "ORDER_BY_DESC"),
                ])
            })
            .await?;

        let response: TxSearchResponse = parse_ok("contract transactions", status, &body)?;
        Ok(response
            .tx_responses
            .into_iter()
            .map(|tx| ContractTransaction {
                tx_hash: tx.txhash,
                height: tx.height,
                code: tx.code,
                raw_log: tx.raw_log,
                timestamp: tx.timestamp.filter(|t| !t.is_empty()),
                gas_used: tx.gas_used,
            })
            .collect())
    }
}

impl BroadcastEndpoint for ChainClient {
    async fn submit(&self, tx_bytes: &[u8]) -> BlockchainResult<SubmitResponse> {
        let body = json!({
            "tx_bytes": STANDARD.encode(tx_bytes),
            "mode": "BROADCAST_MODE_SYNC",
        });

        let (status, text) = self
            .send("broadcast", |http, base| {
                http.post(format!("{}/cosmos/tx/v1beta1/txs", base)).json(&body)
            })
            .await
            .map_err(|e| BlockchainError::SubmissionError(e.to_string()))?;

        if !status.is_success() {
            return Err(BlockchainError::SubmissionError(error_message(status, &text)));
        }
        let response: TxEnvelopeResponse = serde_json::from_str(&text)
            .map_err(|e| BlockchainError::SubmissionError(format!("Malformed broadcast response: {}", e)))?;
        let tx = response.tx_response;
        Ok(SubmitResponse {
            tx_hash: tx.txhash,
            code: tx.code,
            raw_log: tx.raw_log,
        })
    }

    async fn get_tx_status(&self, tx_hash: &str) -> BlockchainResult<TxStatus> {
        let (status, body) = self
            .send("tx status", |http, base| {
                http.get(format!("{}/cosmos/tx/v1beta1/txs/{}", base, tx_hash))
            })
            .await?;

        if is_not_found(status, &body) {
            return Ok(TxStatus::pending());
        }
        let response: TxEnvelopeResponse = parse_ok("tx status", status, &body)?;
        let tx = response.tx_response;
        Ok(TxStatus {
            included: tx.height > 0,
            code: tx.code,
            raw_log: tx.raw_log,
            height: (tx.height > 0).then_some(tx.height),
        })
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("rest_url", &self.config.rest_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.request_timeout_secs)
            .finish()
    }
}

fn is_not_found(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::NOT_FOUND {
        return true;
    }
    if status.is_success() {
        return false;
    }
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.code == GRPC_NOT_FOUND || e.message.contains("not found"))
        .unwrap_or(false)
}

fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(e) if !e.message.is_empty() => format!("{} (code {}): {}", status, e.code, e.message),
        _ => format!("{}: {}", status, body),
    }
}

fn parse_ok<T: DeserializeOwned>(op: &str, status: StatusCode, body: &str) -> BlockchainResult<T> {
    if !status.is_success() {
        return Err(BlockchainError::Query(format!("{} failed: {}", op, error_message(status, body))));
    }
    serde_json::from_str(body)
        .map_err(|e| BlockchainError::Query(format!("Malformed {} response: {}", op, e)))
}

const GRPC_NOT_FOUND: u32 = 5;

/// Cosmos REST encodes 64-bit integers as strings.
mod u64_string {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Str(String),
        Num(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Ok(n),
            Repr::Str(s) if s.is_empty() => Ok(0),
            Repr::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

mod opt_u64_string {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
        }
    }
}

/// Unsigned body sent for gas simulation.
#[derive(Serialize)]
struct SimulationTx<'a> {
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct AccountResponse {
    account: AccountKind,
}

/// Chains with Ethereum-style keys nest the base account.
#[derive(Deserialize)]
#[serde(untagged)]
enum AccountKind {
    Nested { base_account: BaseAccount },
    Flat(BaseAccount),
}

impl AccountKind {
    fn into_base(self) -> BaseAccount {
        match self {
            AccountKind::Nested { base_account } => base_account,
            AccountKind::Flat(base) => base,
        }
    }
}

#[derive(Deserialize)]
struct BaseAccount {
    #[serde(with = "u64_string", default)]
    account_number: u64,
    #[serde(with = "u64_string", default)]
    sequence: u64,
}

#[derive(Deserialize)]
struct LatestBlockResponse {
    block: Block,
}

#[derive(Deserialize)]
struct Block {
    header: BlockHeader,
}

#[derive(Deserialize)]
struct BlockHeader {
    #[serde(default)]
    chain_id: String,
    #[serde(with = "u64_string")]
    height: u64,
}

#[derive(Deserialize)]
struct SimulateResponse {
    gas_info: GasInfo,
}

#[derive(Deserialize)]
struct GasInfo {
    #[serde(with = "u64_string")]
    gas_used: u64,
}

#[derive(Deserialize)]
struct TxEnvelopeResponse {
    tx_response: TxResponse,
}

#[derive(Deserialize)]
struct TxResponse {
    txhash: String,
    #[serde(default)]
    code: u32,
    #[serde(default)]
    raw_log: String,
    #[serde(with = "u64_string", default)]
    height: u64,
}

#[derive(Deserialize)]
struct TxSearchResponse {
    #[serde(default)]
    tx_responses: Vec<IndexedTx>,
}

#[derive(Deserialize)]
struct IndexedTx {
    txhash: String,
    #[serde(with = "u64_string", default)]
    height: u64,
    #[serde(default)]
    code: u32,
    #[serde(default)]
    raw_log: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(with = "opt_u64_string", default)]
    gas_used: Option<u64>,
}

#[derive(Deserialize)]
struct SmartQueryResponse {
    data: Value,
}

#[derive(Deserialize)]
struct BalancesResponse {
    balances: Vec<Coin>,
}

#[derive(Deserialize)]
struct ContractInfoResponse {
    address: String,
    contract_info: ContractInfoBody,
}

#[derive(Deserialize)]
struct ContractInfoBody {
    #[serde(with = "u64_string")]
    code_id: u64,
    creator: String,
    #[serde(default)]
    admin: Option<String>,
    #[serde(default)]
    label: String,
}
