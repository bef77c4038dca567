//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the broadcaster.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the transaction broadcaster.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BroadcasterConfig {
    /// Chain endpoints and identity.
    pub chain: ChainConfig,

    /// Fee and gas settings.
    pub fees: FeeSettings,

    /// Submission and confirmation settings.
    pub broadcast: BroadcastSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub contract: ContractConfig,
}

/// Chain connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// REST (LCD) endpoint URL.
    pub rest_url: String,

    /// Failover REST endpoint URLs, tried in order.
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., "injective-1" for mainnet, "injective-888" for testnet).
    pub chain_id: String,

    /// Human-readable part used for bech32 account addresses.
    pub bech32_prefix: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rest_url: "https://testnet.sentry.lcd.injective.network".to_string(),
            failover_urls: Vec::new(),
            chain_id: "injective-888".to_string(),
            bech32_prefix: "inj".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Fee configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeSettings {
    /// Denomination fees are paid in.
    pub denom: String,

    /// Price per unit of gas, in base units of `denom`.
    pub gas_price: f64,

    /// Multiplier applied to simulated gas (1.0 = exact, 1.3 = 30% buffer).
    pub gas_adjustment: f64,

    /// Fixed gas limit. When unset, gas is simulated before every build.
    pub gas_limit: Option<u64>,
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            denom: "inj".to_string(),
            gas_price: 500_000_000.0,
            gas_adjustment: 1.3,
            gas_limit: None,
        }
    }
}

/// Broadcast and confirmation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastSettings {
    /// Inclusion polling interval in milliseconds.
    pub poll_interval_ms: u64,

    /// Wall-clock deadline for inclusion in seconds.
    pub confirmation_timeout_secs: u64,

    /// Blocks added to the latest height to form the timeout height.
    /// `None` disables height-based expiry.
    pub timeout_height_margin: Option<u64>,

    /// Reuse fetched sequences between broadcasts from this process.
    pub cache_sequences: bool,

    /// Memo attached to every transaction.
    pub memo: Option<String>,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            confirmation_timeout_secs: 60,
            timeout_height_margin: Some(90),
            cache_sequences: false,
            memo: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable output.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Default smart contract targeted by `execute` and `query`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ContractConfig {
    /// Bech32 address of the contract.
    pub address: Option<String>,
}
