//! Shared utilities for integration testing.
//!
//! `MockChain` is an in-memory chain that enforces sequences the way a
//! node's mempool admission does.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;

use tx_broadcaster::blockchain::endpoint::{BroadcastEndpoint, ChainQuery};
use tx_broadcaster::blockchain::transaction::tx_hash;
use tx_broadcaster::blockchain::broadcaster::CODE_TX_IN_MEMPOOL;
use tx_broadcaster::blockchain::types::{ContractTransaction, OnChainAccount, SubmitResponse, TxStatus};
use tx_broadcaster::blockchain::{
    BlockchainError, BlockchainResult, Broadcaster, Coin, ContractInfo, Message, SignedTransaction,
    Signer, Wallet,
};
use tx_broadcaster::config::BroadcasterConfig;

// Anvil's first two accounts.
pub const SENDER_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const SENDER_ADDRESS: &str = "inj17w0adeg64ky0daxwd2ugyuneellmjgnxf5vkec";
pub const RECIPIENT_ADDRESS: &str = "inj1wzvhjux9rqfdcwspp37srdgwp5tac7wgplgfd7";

pub const CONTRACT_ADDRESS: &str = "inj1qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqe2hm49";

/// CheckTx code for a stale or future sequence.
pub const CODE_WRONG_SEQUENCE: u32 = 32;
pub const CODE_UNAUTHORIZED: u32 = 4;

#[derive(Default)]
struct Ledger {
    accounts: HashMap<String, OnChainAccount>,
    txs: HashMap<String, TxStatus>,
    /// (contract, tx) in admission order.
    executions: Vec<(String, ContractTransaction)>,
}

pub struct MockChain {
    ledger: Mutex<Ledger>,
    height: AtomicU64,
    pub never_include: AtomicBool,
    pub execution_code: AtomicU32,
    pub fail_simulation: AtomicBool,
    pub submissions: AtomicU64,
    pub queries: AtomicU64,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ledger: Mutex::new(Ledger::default()),
            height: AtomicU64::new(100),
            never_include: AtomicBool::new(false),
            execution_code: AtomicU32::new(0),
            fail_simulation: AtomicBool::new(false),
            submissions: AtomicU64::new(0),
            queries: AtomicU64::new(0),
        })
    }

    /// Create `address` on chain with `sequence`.
    pub fn fund(&self, address: &str, sequence: u64) {
        self.ledger.lock().unwrap().accounts.insert(
            address.to_string(),
            OnChainAccount {
                account_number: 42,
                sequence,
            },
        );
    }

    pub fn sequence_of(&self, address: &str) -> Option<u64> {
        self.ledger
            .lock()
            .unwrap()
            .accounts
            .get(address)
            .map(|a| a.sequence)
    }

    fn admit(&self, tx_bytes: &[u8]) -> SubmitResponse {
        let hash = tx_hash(tx_bytes);
        let respond = |code: u32, raw_log: String| SubmitResponse {
            tx_hash: hash.clone(),
            code,
            raw_log,
        };

        let signed = match SignedTransaction::from_bytes(tx_bytes) {
            Ok(s) => s,
            Err(e) => return respond(2, e.to_string()),
        };
        if !Signer::verify(&signed).unwrap_or(false) {
            return respond(CODE_UNAUTHORIZED, "signature verification failed".to_string());
        }

        let mut ledger = self.ledger.lock().unwrap();
        if ledger.txs.contains_key(&hash) {
            return respond(CODE_TX_IN_MEMPOOL, "tx already exists in cache".to_string());
        }

        let sender = signed.envelope().signer().unwrap_or_default().to_string();
        let Some(account) = ledger.accounts.get_mut(&sender) else {
            return respond(CODE_UNAUTHORIZED, format!("account {} not found", sender));
        };
        let got = signed.envelope().sequence();
        if got != account.sequence {
            return respond(
                CODE_WRONG_SEQUENCE,
                format!(
                    "account sequence mismatch, expected {}, got {}: incorrect account sequence",
                    account.sequence, got
                ),
            );
        }
        account.sequence += 1;

        let status = if self.never_include.load(Ordering::SeqCst) {
            TxStatus::pending()
        } else {
            let code = self.execution_code.load(Ordering::SeqCst);
            TxStatus {
                included: true,
                code,
                raw_log: if code == 0 { String::new() } else { "execute wasm contract failed".to_string() },
                height: Some(self.height.load(Ordering::SeqCst) + 1),
            }
        };
        for message in signed.envelope().messages() {
            if let Message::ContractExecute { contract, .. } = message {
                let executed = ContractTransaction {
                    tx_hash: hash.clone(),
                    height: status.height.unwrap_or_default(),
                    code: status.code,
                    raw_log: status.raw_log.clone(),
                    timestamp: None,
                    gas_used: Some(100_000),
                };
                ledger.executions.push((contract.clone(), executed));
            }
        }
        ledger.txs.insert(hash.clone(), status);
        respond(0, String::new())
    }
}

impl ChainQuery for MockChain {
    async fn get_account(&self, address: &str) -> BlockchainResult<OnChainAccount> {
        // Let concurrent callers interleave between read and use.
        tokio::task::yield_now().await;
        self.ledger
            .lock()
            .unwrap()
            .accounts
            .get(address)
            .copied()
            .ok_or_else(|| BlockchainError::AccountNotFound(address.to_string()))
    }

    async fn get_latest_block_height(&self) -> BlockchainResult<u64> {
        Ok(self.height.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn simulate_gas(&self, messages: &[Message]) -> BlockchainResult<u64> {
        if self.fail_simulation.load(Ordering::SeqCst) {
            return Err(BlockchainError::GasEstimationFailed(
                "out of gas in location: wasm contract".to_string(),
            ));
        }
        Ok(100_000 * messages.len() as u64)
    }

    async fn query_contract_state(&self, contract: &str, query_base64: &str) -> BlockchainResult<String> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let query: serde_json::Value = serde_json::from_slice(
            &STANDARD
                .decode(query_base64)
                .map_err(|e| BlockchainError::Query(e.to_string()))?,
        )
        .map_err(|e| BlockchainError::Query(e.to_string()))?;
        let answer = json!({ "contract": contract, "query": query, "round_id": 1 });
        Ok(STANDARD.encode(answer.to_string()))
    }

    async fn get_balances(&self, _address: &str) -> BlockchainResult<Vec<Coin>> {
        Ok(vec![Coin::new(1_000_000, "inj")])
    }

    async fn get_contract_info(&self, contract: &str) -> BlockchainResult<ContractInfo> {
        Ok(ContractInfo {
            address: contract.to_string(),
            code_id: 7,
            creator: SENDER_ADDRESS.to_string(),
            admin: None,
            label: "quadratic-funding".to_string(),
        })
    }

    async fn get_contract_transactions(
        &self,
        contract: &str,
        limit: u32,
    ) -> BlockchainResult<Vec<ContractTransaction>> {
        let ledger = self.ledger.lock().unwrap();
        Ok(ledger
            .executions
            .iter()
            .rev()
            .filter(|(c, _)| c == contract)
            .take(limit as usize)
            .map(|(_, tx)| tx.clone())
            .collect())
    }
}

impl BroadcastEndpoint for MockChain {
    async fn submit(&self, tx_bytes: &[u8]) -> BlockchainResult<SubmitResponse> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Ok(self.admit(tx_bytes))
    }

    async fn get_tx_status(&self, tx_hash: &str) -> BlockchainResult<TxStatus> {
        Ok(self
            .ledger
            .lock()
            .unwrap()
            .txs
            .get(tx_hash)
            .cloned()
            .unwrap_or_else(TxStatus::pending))
    }
}

/// Config with fast polling for tests.
pub fn test_config() -> BroadcasterConfig {
    let mut config = BroadcasterConfig::default();
    config.broadcast.poll_interval_ms = 10;
    config.broadcast.confirmation_timeout_secs = 5;
    config.broadcast.timeout_height_margin = Some(3);
    config
}

pub fn sender_wallet() -> Wallet {
    Wallet::from_private_key(SENDER_KEY, "inj").unwrap()
}

/// Broadcaster for a funded sender at `sequence`.
pub fn setup(sequence: u64) -> (Arc<MockChain>, Broadcaster<MockChain>) {
    setup_with(sequence, test_config())
}

pub fn setup_with(sequence: u64, config: BroadcasterConfig) -> (Arc<MockChain>, Broadcaster<MockChain>) {
    let chain = MockChain::new();
    chain.fund(SENDER_ADDRESS, sequence);
    let broadcaster = Broadcaster::new(chain.clone(), sender_wallet(), &config);
    (chain, broadcaster)
}
