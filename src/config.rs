use alloy_primitives::Address;

use crate::error::{AppError, Result};

pub const WS_URL: &str = "wss://testnet-rpc.monad.xyz";
pub const RPC_HTTP_URL: &str = "https://testnet-rpc.monad.xyz";

/// PredictionMarket deployment the indexer follows when CONTRACT_ADDRESS is unset.
pub const CONTRACT_ADDRESS: &str = "0xb88ae24564251ec870bf8e4c144b8c501dd403f3";

/// Heartbeat ping interval (seconds).
pub const WS_PING_INTERVAL_SECS: u64 = 30;

/// Channel capacity between the log source and the ingestion loop.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Log an ingestion summary every N records.
pub const INGEST_SUMMARY_EVERY: u64 = 500;

/// Timeout for each backfill JSON-RPC request.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub ws_url: String,
    /// HTTP JSON-RPC endpoint, only used for backfill (RPC_HTTP_URL)
    pub rpc_http_url: String,
    pub contract: Address,
    pub log_level: String,
    pub api_port: u16,
    /// First block to replay before going live; 0 = live only (START_BLOCK)
    pub start_block: u64,
    /// Blocks per eth_getLogs request during backfill (BLOCK_RANGE)
    pub block_range: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let contract_raw =
            std::env::var("CONTRACT_ADDRESS").unwrap_or_else(|_| CONTRACT_ADDRESS.to_string());
        let contract = contract_raw.trim().parse::<Address>().map_err(|_| {
            AppError::Config(format!("CONTRACT_ADDRESS is not a valid address: {contract_raw}"))
        })?;

        let block_range = std::env::var("BLOCK_RANGE")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Config("BLOCK_RANGE must be a positive integer".to_string()))?;
        if block_range == 0 {
            return Err(AppError::Config("BLOCK_RANGE must be a positive integer".to_string()));
        }

        Ok(Self {
            ws_url: std::env::var("WS_URL").unwrap_or_else(|_| WS_URL.to_string()),
            rpc_http_url: std::env::var("RPC_HTTP_URL")
                .unwrap_or_else(|_| RPC_HTTP_URL.to_string()),
            contract,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            start_block: std::env::var("START_BLOCK")
                .unwrap_or_else(|_| "0".to_string())
                .parse::<u64>()
                .map_err(|_| AppError::Config("START_BLOCK must be a block number".to_string()))?,
            block_range,
        })
    }
}
