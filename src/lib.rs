//! Signed transaction broadcast client for Cosmos-SDK style chains.

pub mod blockchain;
pub mod config;
pub mod observability;

pub use blockchain::{Broadcaster, ChainClient, ContractClient, Wallet};
pub use config::BroadcasterConfig;
