//! Application messages carried by a transaction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::blockchain::types::{BlockchainError, BlockchainResult, Coin};

pub const MSG_SEND_TYPE: &str = "/cosmos.bank.v1beta1.MsgSend";
pub const MSG_EXECUTE_CONTRACT_TYPE: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";
pub const QUERY_SMART_CONTRACT_TYPE: &str = "/cosmwasm.wasm.v1.QuerySmartContractStateRequest";

/// One application-level message, tagged by its type URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Message {
    #[serde(rename = "/cosmos.bank.v1beta1.MsgSend")]
    CoinTransfer {
        from_address: String,
        to_address: String,
        amount: Vec<Coin>,
    },

    #[serde(rename = "/cosmwasm.wasm.v1.MsgExecuteContract")]
    ContractExecute {
        sender: String,
        contract: String,
        msg: Value,
        funds: Vec<Coin>,
    },

    /// Read-only; never signed or broadcast.
    #[serde(rename = "/cosmwasm.wasm.v1.QuerySmartContractStateRequest")]
    ContractQuery { contract: String, msg: Value },
}

impl Message {
    pub fn transfer(from: impl Into<String>, to: impl Into<String>, amount: Vec<Coin>) -> Self {
        Message::CoinTransfer {
            from_address: from.into(),
            to_address: to.into(),
            amount,
        }
    }

    pub fn execute(
        sender: impl Into<String>,
        contract: impl Into<String>,
        msg: Value,
        funds: Option<Coin>,
    ) -> Self {
        Message::ContractExecute {
            sender: sender.into(),
            contract: contract.into(),
            msg,
            funds: funds.into_iter().collect(),
        }
    }

    pub fn query(contract: impl Into<String>, msg: Value) -> Self {
        Message::ContractQuery {
            contract: contract.into(),
            msg,
        }
    }

    /// Type discriminator.
    pub fn type_url(&self) -> &'static str {
        match self {
            Message::CoinTransfer { .. } => MSG_SEND_TYPE,
            Message::ContractExecute { .. } => MSG_EXECUTE_CONTRACT_TYPE,
            Message::ContractQuery { .. } => QUERY_SMART_CONTRACT_TYPE,
        }
    }

    /// Address that must sign, or `None` for read-only messages.
    pub fn signer(&self) -> Option<&str> {
        match self {
            Message::CoinTransfer { from_address, .. } => Some(from_address),
            Message::ContractExecute { sender, .. } => Some(sender),
            Message::ContractQuery { .. } => None,
        }
    }

    /// Structural checks that do not need the chain.
    pub fn validate(&self) -> BlockchainResult<()> {
        match self {
            Message::CoinTransfer { amount, to_address, .. } => {
                if to_address.is_empty() {
                    return Err(BlockchainError::InvalidMessage(
                        "transfer has no recipient".to_string(),
                    ));
                }
                for coin in amount {
                    coin.validate()?;
                }
                if amount.iter().all(Coin::is_zero) {
                    return Err(BlockchainError::InvalidMessage(
                        "transfer amount must be positive".to_string(),
                    ));
                }
                Ok(())
            }
            Message::ContractExecute { msg, contract, funds, .. } => {
                for coin in funds {
                    coin.validate()?;
                }
                check_contract_msg(contract, msg)
            }
            Message::ContractQuery { msg, contract } => check_contract_msg(contract, msg),
        }
    }

    /// Canonical bytes of this message alone.
    pub fn encode(&self) -> BlockchainResult<Vec<u8>> {
        canonical_bytes(self)
    }
}

fn check_contract_msg(contract: &str, msg: &Value) -> BlockchainResult<()> {
    if contract.is_empty() {
        return Err(BlockchainError::InvalidMessage(
            "contract address is empty".to_string(),
        ));
    }
    if !msg.is_object() {
        return Err(BlockchainError::InvalidMessage(format!(
            "contract message must be a JSON object, got {}",
            msg
        )));
    }
    Ok(())
}

/// Serialize to JSON with every object's keys sorted.
///
/// Struct fields and enum tags are serialized through `serde_json::Value`
/// first so the output does not depend on declaration order or on whether
/// `serde_json` preserves insertion order.
pub fn canonical_bytes<T: Serialize>(value: &T) -> BlockchainResult<Vec<u8>> {
    let value = serde_json::to_value(value).map_err(|e| BlockchainError::Encoding(e.to_string()))?;
    serde_json::to_vec(&sorted(value)).map_err(|e| BlockchainError::Encoding(e.to_string()))
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = Map::new();
            for (k, v) in entries {
                out.insert(k, sorted(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}
