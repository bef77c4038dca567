//! Assembles unsigned transaction envelopes.
//!
//! # Responsibilities
//! - Validate the message set before anything touches the chain
//! - Determine the fee, either fixed or from a gas simulation
//! - Stamp sequence, account number, chain id and timeout height
//!
//! # Design Decisions
//! - The builder never fetches sequences itself. The caller passes the
//!   `AccountInfo` it read while holding the account lock.
//! - A failed simulation aborts the build; there is no fallback gas limit.

use std::sync::Arc;

use crate::blockchain::endpoint::ChainQuery;
use crate::blockchain::message::Message;
use crate::blockchain::transaction::TransactionEnvelope;
use crate::blockchain::types::{AccountInfo, BlockchainError, BlockchainResult, Coin, Fee, FeeConfig};
use crate::config::FeeSettings;

pub struct TransactionBuilder<C> {
    endpoint: Arc<C>,
    gas_price: f64,
    fee_denom: String,
    memo: Option<String>,
    timeout_margin: Option<u64>,
}

impl<C: ChainQuery> TransactionBuilder<C> {
    pub fn new(endpoint: Arc<C>, fees: &FeeSettings) -> Self {
        Self {
            endpoint,
            gas_price: fees.gas_price,
            fee_denom: fees.denom.clone(),
            memo: None,
            timeout_margin: None,
        }
    }

    pub fn with_memo(mut self, memo: Option<String>) -> Self {
        self.memo = memo;
        self
    }

    /// Expire transactions `margin` blocks after the height seen at build time.
    pub fn with_timeout_margin(mut self, margin: Option<u64>) -> Self {
        self.timeout_margin = margin;
        self
    }

    /// Build an envelope for `messages` signed by `signer`.
    ///
    /// Fails with `InvalidMessage` for an empty set, a read-only message, or
    /// a message whose signer is not `signer.address`.
    pub async fn build(
        &self,
        messages: Vec<Message>,
        signer: &AccountInfo,
        fee: &FeeConfig,
    ) -> BlockchainResult<TransactionEnvelope> {
        check_messages(&messages, &signer.address)?;

        let fee = match fee {
            FeeConfig::Explicit(fee) => fee.clone(),
            FeeConfig::FixedGas { gas_limit } => self.fee_for_limit(*gas_limit)?,
            FeeConfig::Simulate { gas_adjustment } => {
                let gas_used = self.endpoint.simulate_gas(&messages).await?;
                let fee = self.fee_for_gas(gas_used, *gas_adjustment)?;
                tracing::debug!(gas_used, gas_limit = fee.gas_limit, "Simulated gas");
                fee
            }
        };

        let timeout_height = match self.timeout_margin {
            Some(margin) => Some(self.endpoint.get_latest_block_height().await? + margin),
            None => None,
        };

        Ok(TransactionEnvelope::new(
            messages,
            fee,
            self.memo.clone(),
            timeout_height,
            signer.sequence,
            signer.account_number,
            signer.chain_id.clone(),
        ))
    }

    /// Fee paying for `gas_used` scaled by `gas_adjustment`, rounded up.
    pub fn fee_for_gas(&self, gas_used: u64, gas_adjustment: f64) -> BlockchainResult<Fee> {
        let gas_limit = (gas_used as f64 * gas_adjustment).ceil() as u64;
        self.fee_for_limit(gas_limit)
    }

    /// `ceil(gas_limit * gas_price)` computed exactly in integers.
    pub fn fee_for_limit(&self, gas_limit: u64) -> BlockchainResult<Fee> {
        let overflow = || {
            BlockchainError::InvalidMessage(format!(
                "fee for gas limit {} at price {} overflows",
                gas_limit, self.gas_price
            ))
        };
        let (mantissa, scale) = decimal_parts(self.gas_price).ok_or_else(|| {
            BlockchainError::InvalidMessage(format!("unusable gas price {}", self.gas_price))
        })?;
        let numerator = u128::from(gas_limit).checked_mul(mantissa).ok_or_else(overflow)?;
        let denominator = 10u128.checked_pow(scale).ok_or_else(overflow)?;
        let amount = numerator.div_ceil(denominator);

        Ok(Fee {
            amount: vec![Coin::new(amount, self.fee_denom.clone())],
            gas_limit,
        })
    }
}

/// Split a non-negative float into `mantissa / 10^scale` using its shortest
/// decimal form, e.g. `0.025` → `(25, 3)`.
fn decimal_parts(value: f64) -> Option<(u128, u32)> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let text = value.to_string();
    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let mantissa = format!("{}{}", int, frac).parse().ok()?;
    Some((mantissa, frac.len() as u32))
}

fn check_messages(messages: &[Message], signer: &str) -> BlockchainResult<()> {
    if messages.is_empty() {
        return Err(BlockchainError::InvalidMessage(
            "transaction has no messages".to_string(),
        ));
    }

    for message in messages {
        message.validate()?;
        match message.signer() {
            None => {
                return Err(BlockchainError::InvalidMessage(format!(
                    "{} is read-only and cannot be broadcast",
                    message.type_url()
                )))
            }
            Some(s) if s != signer => {
                return Err(BlockchainError::InvalidMessage(format!(
                    "message signer {} does not match account {}",
                    s, signer
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}
