//! Account sequence tracking and per-account serialization.
//!
//! Two builds racing on the same account would both read sequence N and one
//! of them would be rejected. Callers hold [`AccountSequencer::lock`] from
//! fetch until the transaction is submitted.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::blockchain::endpoint::ChainQuery;
use crate::blockchain::types::{AccountInfo, BlockchainResult};

pub struct AccountSequencer<C> {
    endpoint: Arc<C>,
    chain_id: String,
    /// Last known sequence per address; `None` when caching is disabled.
    cache: Option<Arc<DashMap<String, AccountInfo>>>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl<C> Clone for AccountSequencer<C> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            chain_id: self.chain_id.clone(),
            cache: self.cache.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl<C: ChainQuery> AccountSequencer<C> {
    /// Create a sequencer that fetches a fresh sequence on every call.
    pub fn new(endpoint: Arc<C>, chain_id: impl Into<String>) -> Self {
        Self {
            endpoint,
            chain_id: chain_id.into(),
            cache: None,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Reuse sequences across broadcasts from this process.
    ///
    /// Only safe when no other process signs for the same accounts.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(Arc::new(DashMap::new()));
        self
    }

    /// Current sequence, account number and chain id for `address`.
    pub async fn fetch_sequence(&self, address: &str) -> BlockchainResult<AccountInfo> {
        if let Some(cached) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get(address).map(|r| r.value().clone()))
        {
            tracing::debug!(address, sequence = cached.sequence, "Using cached sequence");
            return Ok(cached);
        }

        let account = self.endpoint.get_account(address).await?;
        let info = AccountInfo {
            address: address.to_string(),
            sequence: account.sequence,
            account_number: account.account_number,
            chain_id: self.chain_id.clone(),
        };
        tracing::debug!(
            address,
            sequence = info.sequence,
            account_number = info.account_number,
            "Fetched account sequence"
        );

        if let Some(cache) = &self.cache {
            cache.insert(address.to_string(), info.clone());
        }
        Ok(info)
    }

    /// Enter the critical section for `address`.
    pub async fn lock(&self, address: &str) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(address.to_string()).or_default().clone();
        mutex.lock_owned().await
    }

    /// A transaction using the cached sequence was accepted by a node.
    pub fn record_submitted(&self, address: &str) {
        if let Some(cache) = &self.cache {
            if let Some(mut entry) = cache.get_mut(address) {
                entry.sequence += 1;
            }
        }
    }

    /// Forget the cached sequence; the next fetch goes to the chain.
    pub fn invalidate(&self, address: &str) {
        if let Some(cache) = &self.cache {
            if cache.remove(address).is_some() {
                tracing::debug!(address, "Invalidated cached sequence");
            }
        }
    }

    pub fn is_caching(&self) -> bool {
        self.cache.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::message::Message;
    use crate::blockchain::types::{
        BlockchainError, Coin, ContractInfo, ContractTransaction, OnChainAccount,
    };
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    struct CountingChain {
        fetches: AtomicU64,
        sequence: u64,
    }

    impl ChainQuery for CountingChain {
        async fn get_account(&self, address: &str) -> BlockchainResult<OnChainAccount> {
            if address == "inj1missing" {
                return Err(BlockchainError::AccountNotFound(address.to_string()));
            }
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(OnChainAccount {
                account_number: 9,
                sequence: self.sequence,
            })
        }

        async fn get_latest_block_height(&self) -> BlockchainResult<u64> {
            Ok(1)
        }

        async fn simulate_gas(&self, _messages: &[Message]) -> BlockchainResult<u64> {
            Ok(0)
        }

        async fn query_contract_state(&self, _c: &str, _q: &str) -> BlockchainResult<String> {
            Ok(String::new())
        }

        async fn get_balances(&self, _address: &str) -> BlockchainResult<Vec<Coin>> {
            Ok(Vec::new())
        }

        async fn get_contract_info(&self, contract: &str) -> BlockchainResult<ContractInfo> {
            Err(BlockchainError::Query(format!("no contract {}", contract)))
        }

        async fn get_contract_transactions(
            &self,
            _contract: &str,
            _limit: u32,
        ) -> BlockchainResult<Vec<ContractTransaction>> {
            Ok(Vec::new())
        }
    }

    fn chain(sequence: u64) -> Arc<CountingChain> {
        Arc::new(CountingChain {
            fetches: AtomicU64::new(0),
            sequence,
        })
    }

    #[tokio::test]
    async fn test_fetch_without_cache_always_queries() {
        let chain = chain(5);
        let sequencer = AccountSequencer::new(chain.clone(), "injective-888");

        let info = sequencer.fetch_sequence("inj1abc").await.unwrap();
        assert_eq!(info.sequence, 5);
        assert_eq!(info.account_number, 9);
        assert_eq!(info.chain_id, "injective-888");

        sequencer.record_submitted("inj1abc");
        sequencer.fetch_sequence("inj1abc").await.unwrap();
        assert_eq!(chain.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_advances_and_invalidates() {
        let chain = chain(5);
        let sequencer = AccountSequencer::new(chain.clone(), "injective-888").with_cache();

        assert_eq!(sequencer.fetch_sequence("inj1abc").await.unwrap().sequence, 5);
        sequencer.record_submitted("inj1abc");
        assert_eq!(sequencer.fetch_sequence("inj1abc").await.unwrap().sequence, 6);
        assert_eq!(chain.fetches.load(Ordering::SeqCst), 1);

        sequencer.invalidate("inj1abc");
        assert_eq!(sequencer.fetch_sequence("inj1abc").await.unwrap().sequence, 5);
        assert_eq!(chain.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let sequencer = AccountSequencer::new(chain(0), "injective-888");
        let err = sequencer.fetch_sequence("inj1missing").await.unwrap_err();
        assert!(matches!(err, BlockchainError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_lock_is_per_account() {
        let sequencer = AccountSequencer::new(chain(0), "injective-888");

        let _held = sequencer.lock("inj1abc").await;
        // Another account is not blocked.
        let other = tokio::time::timeout(Duration::from_millis(50), sequencer.lock("inj1xyz")).await;
        assert!(other.is_ok());
        // The same account is.
        let same = tokio::time::timeout(Duration::from_millis(50), sequencer.lock("inj1abc")).await;
        assert!(same.is_err());
    }
}
