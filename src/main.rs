//! tx-broadcaster command line.
//!
//! ```text
//! tx-broadcaster --config broadcaster.toml account
//! tx-broadcaster send --to inj1... --amount 1000 --denom inj
//! tx-broadcaster execute --msg '{"start_round":{}}' --funds 160000inj
//! tx-broadcaster query --msg '{"config":{}}'
//! tx-broadcaster contract-txs --limit 5
//! ```
//!
//! The signing key is read from `TX_BROADCASTER_PRIVATE_KEY`. Read-only
//! commands (`block`, `query`, `contract-info`, `contract-txs`,
//! `account --address`) work without it.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};

use tx_broadcaster::blockchain::{
    Broadcaster, ChainClient, ChainQuery, Coin, ContractClient, Wallet,
};
use tx_broadcaster::config::{load_config, BroadcasterConfig};
use tx_broadcaster::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "tx-broadcaster")]
#[command(about = "Build, sign and broadcast transactions", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Contract address, overriding `contract.address`.
    #[arg(long, global = true)]
    contract: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sequence, account number and balances
    Account {
        /// Inspect this address instead of the wallet's
        #[arg(long)]
        address: Option<String>,
    },
    /// Show the latest block height
    Block,
    /// Transfer coins from the wallet
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u128,
        /// Defaults to the fee denom
        #[arg(long)]
        denom: Option<String>,
    },
    /// Execute a contract message
    Execute {
        /// JSON message
        #[arg(long)]
        msg: String,
        /// Attached funds, e.g. 160000inj
        #[arg(long)]
        funds: Option<Coin>,
    },
    /// Run a read-only contract query
    Query {
        /// JSON query
        #[arg(long)]
        msg: String,
    },
    /// Show contract metadata
    ContractInfo,
    /// List recent transactions that executed the contract, newest first
    ContractTxs {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BroadcasterConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::warn!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Invalid metrics address, metrics disabled"
            ),
        }
    }

    let client = Arc::new(ChainClient::new(config.chain.clone()).await?);
    let contract_address = cli.contract.clone().or_else(|| config.contract.address.clone());

    match cli.command {
        Commands::Account { address } => {
            let address = match address {
                Some(a) => a,
                None => Wallet::from_env(&config.chain.bech32_prefix)?.address().to_string(),
            };
            let account = client.get_account(&address).await?;
            let balances = client.get_balances(&address).await?;
            print_json(&json!({
                "address": address,
                "account_number": account.account_number,
                "sequence": account.sequence,
                "balances": balances,
            }))?;
        }
        Commands::Block => {
            let height = client.get_latest_block_height().await?;
            print_json(&json!({ "chain_id": config.chain.chain_id, "height": height }))?;
        }
        Commands::Send { to, amount, denom } => {
            let broadcaster = broadcaster(client, &config)?;
            let denom = denom.unwrap_or_else(|| config.fees.denom.clone());
            let result = broadcaster.send_coins(&to, vec![Coin::new(amount, denom)]).await?;
            print_json(&result)?;
        }
        Commands::Execute { msg, funds } => {
            let address = require_contract(contract_address)?;
            let msg: Value = serde_json::from_str(&msg)?;
            let contract = ContractClient::new(Arc::new(broadcaster(client, &config)?), address);
            let result = contract.execute(msg, funds).await?;
            print_json(&result)?;
        }
        Commands::Query { msg } => {
            let address = require_contract(contract_address)?;
            let msg: Value = serde_json::from_str(&msg)?;
            let contract = ContractClient::read_only(client, address);
            print_json(&contract.query(&msg).await?)?;
        }
        Commands::ContractInfo => {
            let address = require_contract(contract_address)?;
            let contract = ContractClient::read_only(client, address);
            print_json(&contract.info().await?)?;
        }
        Commands::ContractTxs { limit } => {
            let address = require_contract(contract_address)?;
            let contract = ContractClient::read_only(client, address);
            print_json(&contract.transactions(limit).await?)?;
        }
    }

    Ok(())
}

fn broadcaster(
    client: Arc<ChainClient>,
    config: &BroadcasterConfig,
) -> Result<Broadcaster<ChainClient>, Box<dyn std::error::Error>> {
    let wallet = Wallet::from_env(&config.chain.bech32_prefix)?;
    Ok(Broadcaster::new(client, wallet, config))
}

fn require_contract(address: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    address.ok_or_else(|| "no contract address: pass --contract or set contract.address".into())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
