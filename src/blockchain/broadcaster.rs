//! Transaction submission and inclusion tracking.
//!
//! # Responsibilities
//! - Run the pipeline: fetch sequence, build, sign, submit, await inclusion
//! - Serialize the pipeline per account up to submission
//! - Classify every outcome as confirmed, rejected, or timed out
//!
//! # Design Decisions
//! - Nothing is resubmitted automatically. A rebuilt envelope carries a new
//!   sequence and is a different transaction.
//! - The account lock is released once the node accepts the transaction, not
//!   when it is included.
//! - An included transaction whose messages failed is still `Ok`; the
//!   sequence was consumed and the caller reads `code`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::{sleep, timeout};
use tracing::Instrument;
use uuid::Uuid;

use crate::blockchain::builder::TransactionBuilder;
use crate::blockchain::endpoint::{BroadcastEndpoint, ChainQuery};
use crate::blockchain::message::Message;
use crate::blockchain::sequencer::AccountSequencer;
use crate::blockchain::signer::Signer;
use crate::blockchain::transaction::{tx_hash, SignedTransaction};
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, BroadcastResult, Coin, FeeConfig, TxState,
};
use crate::blockchain::wallet::{from_bech32, Wallet};
use crate::config::BroadcasterConfig;
use crate::observability::metrics;

/// CheckTx code for bytes already present in the mempool cache.
pub const CODE_TX_IN_MEMPOOL: u32 = 19;

/// A transaction a node accepted into its mempool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedTx {
    pub tx_hash: String,
    pub sequence: u64,
    pub timeout_height: Option<u64>,
}

pub struct Broadcaster<C> {
    endpoint: Arc<C>,
    wallet: Wallet,
    prefix: String,
    sequencer: AccountSequencer<C>,
    builder: TransactionBuilder<C>,
    fee_config: FeeConfig,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl<C: ChainQuery + BroadcastEndpoint> Broadcaster<C> {
    /// Create a broadcaster signing with `wallet`.
    ///
    /// A fixed `fees.gas_limit` is priced at build time; otherwise every
    /// build simulates gas.
    pub fn new(endpoint: Arc<C>, wallet: Wallet, config: &BroadcasterConfig) -> Self {
        let mut sequencer = AccountSequencer::new(endpoint.clone(), config.chain.chain_id.clone());
        if config.broadcast.cache_sequences {
            sequencer = sequencer.with_cache();
        }

        let builder = TransactionBuilder::new(endpoint.clone(), &config.fees)
            .with_memo(config.broadcast.memo.clone())
            .with_timeout_margin(config.broadcast.timeout_height_margin);

        let fee_config = match config.fees.gas_limit {
            Some(gas_limit) => FeeConfig::FixedGas { gas_limit },
            None => FeeConfig::Simulate {
                gas_adjustment: config.fees.gas_adjustment,
            },
        };

        Self {
            endpoint,
            wallet,
            prefix: config.chain.bech32_prefix.clone(),
            sequencer,
            builder,
            fee_config,
            poll_interval: Duration::from_millis(config.broadcast.poll_interval_ms),
            confirmation_timeout: Duration::from_secs(config.broadcast.confirmation_timeout_secs),
        }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn sequencer(&self) -> &AccountSequencer<C> {
        &self.sequencer
    }

    pub fn endpoint(&self) -> &Arc<C> {
        &self.endpoint
    }

    /// Broadcast `messages` with the configured fee and wait for inclusion.
    pub async fn broadcast(&self, messages: Vec<Message>) -> BlockchainResult<BroadcastResult> {
        self.broadcast_with_fee(messages, &self.fee_config).await
    }

    /// Broadcast `messages` paying `fee` and wait for inclusion.
    pub async fn broadcast_with_fee(
        &self,
        messages: Vec<Message>,
        fee: &FeeConfig,
    ) -> BlockchainResult<BroadcastResult> {
        let span = tracing::info_span!(
            "broadcast",
            broadcast_id = %Uuid::new_v4(),
            address = %self.wallet.address(),
        );
        self.run(messages, fee).instrument(span).await
    }

    /// Transfer `amount` from the wallet to `to`.
    pub async fn send_coins(&self, to: &str, amount: Vec<Coin>) -> BlockchainResult<BroadcastResult> {
        from_bech32(&self.prefix, to)?;
        let message = Message::transfer(self.wallet.address(), to, amount);
        self.broadcast(vec![message]).await
    }

    async fn run(&self, messages: Vec<Message>, fee: &FeeConfig) -> BlockchainResult<BroadcastResult> {
        let address = self.wallet.address();

        let submitted = {
            let _guard = self.sequencer.lock(address).await;
            match self.sign_and_submit(messages, fee).await {
                Ok(submitted) => {
                    self.sequencer.record_submitted(address);
                    submitted
                }
                Err(e) => {
                    self.sequencer.invalidate(address);
                    if let Some(state) = e.terminal_state() {
                        metrics::record_outcome(state);
                    }
                    return Err(e);
                }
            }
        };

        match self.await_inclusion(&submitted, self.confirmation_timeout).await {
            Ok(result) => {
                metrics::record_outcome(result.state());
                Ok(result)
            }
            Err(e) => {
                self.sequencer.invalidate(address);
                if let Some(state) = e.terminal_state() {
                    metrics::record_outcome(state);
                }
                Err(e)
            }
        }
    }

    async fn sign_and_submit(
        &self,
        messages: Vec<Message>,
        fee: &FeeConfig,
    ) -> BlockchainResult<SubmittedTx> {
        let account = self.sequencer.fetch_sequence(self.wallet.address()).await?;
        let envelope = self.builder.build(messages, &account, fee).await?;
        tracing::debug!(
            state = TxState::Built.as_str(),
            sequence = envelope.sequence(),
            gas_limit = envelope.fee().gas_limit,
            "Transaction built"
        );

        let signed = Signer::sign(envelope, &self.wallet).await?;
        tracing::debug!(state = TxState::Signed.as_str(), "Transaction signed");

        self.submit(&signed).await
    }

    /// Deliver `signed` to a node.
    ///
    /// Fails with `SubmissionError` when no node took the bytes and with
    /// `ChainRejected` when a node refused them at admission. Bytes a node
    /// already holds count as submitted.
    pub async fn submit(&self, signed: &SignedTransaction) -> BlockchainResult<SubmittedTx> {
        let bytes = signed.to_bytes()?;
        let local_hash = tx_hash(&bytes);
        let sequence = signed.envelope().sequence();

        let response = self.endpoint.submit(&bytes).await?;
        let tx_hash = match response.code {
            0 if !response.tx_hash.is_empty() => response.tx_hash,
            0 => local_hash,
            // Identical bytes already sit in a mempool, e.g. after failover
            // from a node that accepted them but timed out answering.
            CODE_TX_IN_MEMPOOL => {
                tracing::info!(tx_hash = %local_hash, sequence, "Transaction already in mempool");
                local_hash
            }
            code => {
                tracing::warn!(
                    tx_hash = %local_hash,
                    sequence,
                    code,
                    raw_log = %response.raw_log,
                    "Transaction rejected at admission"
                );
                return Err(BlockchainError::ChainRejected {
                    code,
                    raw_log: response.raw_log,
                });
            }
        };

        metrics::record_submitted();
        tracing::info!(
            tx_hash = %tx_hash,
            sequence,
            state = TxState::Submitted.as_str(),
            "Transaction submitted"
        );

        Ok(SubmittedTx {
            tx_hash,
            sequence,
            timeout_height: signed.envelope().timeout_height(),
        })
    }

    /// Poll until `submitted` is included, its timeout height passes, or
    /// `deadline` elapses.
    pub async fn await_inclusion(
        &self,
        submitted: &SubmittedTx,
        deadline: Duration,
    ) -> BlockchainResult<BroadcastResult> {
        let started = Instant::now();

        let result = timeout(deadline, async {
            loop {
                // Height first: a status read after it that is still pending
                // proves the transaction missed that height.
                let height = match submitted.timeout_height {
                    Some(_) => match self.endpoint.get_latest_block_height().await {
                        Ok(h) => Some(h),
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to read block height");
                            None
                        }
                    },
                    None => None,
                };

                match self.endpoint.get_tx_status(&submitted.tx_hash).await {
                    Ok(status) if status.included => {
                        return Ok(BroadcastResult {
                            tx_hash: submitted.tx_hash.clone(),
                            code: status.code,
                            raw_log: status.raw_log,
                            height: status.height,
                            sequence: submitted.sequence,
                        });
                    }
                    Ok(_) => {
                        if let (Some(limit), Some(h)) = (submitted.timeout_height, height) {
                            if h > limit {
                                tracing::warn!(
                                    tx_hash = %submitted.tx_hash,
                                    height = h,
                                    timeout_height = limit,
                                    "Timeout height passed without inclusion"
                                );
                                return Err(BlockchainError::TimedOut {
                                    tx_hash: submitted.tx_hash.clone(),
                                });
                            }
                        }
                        tracing::debug!(tx_hash = %submitted.tx_hash, "Transaction pending");
                    }
                    Err(e) => {
                        tracing::warn!(tx_hash = %submitted.tx_hash, error = %e, "Status check failed");
                    }
                }

                sleep(self.poll_interval + jitter(self.poll_interval)).await;
            }
        })
        .await;

        match result {
            Ok(Ok(included)) => {
                metrics::record_confirmation_latency(started.elapsed().as_secs_f64());
                tracing::info!(
                    tx_hash = %included.tx_hash,
                    code = included.code,
                    height = ?included.height,
                    state = TxState::Confirmed.as_str(),
                    "Transaction included"
                );
                Ok(included)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::warn!(
                    tx_hash = %submitted.tx_hash,
                    waited_secs = deadline.as_secs(),
                    "Inclusion deadline elapsed"
                );
                Err(BlockchainError::TimedOut {
                    tx_hash: submitted.tx_hash.clone(),
                })
            }
        }
    }
}

/// Up to 10% of `interval`.
fn jitter(interval: Duration) -> Duration {
    let max_ms = (interval.as_millis() / 10) as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(fastrand::u64(0..=max_ms))
}

impl<C> std::fmt::Debug for Broadcaster<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("wallet", &self.wallet)
            .field("fee_config", &self.fee_config)
            .field("poll_interval", &self.poll_interval)
            .field("confirmation_timeout", &self.confirmation_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(jitter(Duration::from_millis(5)), Duration::ZERO);
        for _ in 0..100 {
            assert!(jitter(Duration::from_millis(1_000)) <= Duration::from_millis(100));
        }
    }
}
