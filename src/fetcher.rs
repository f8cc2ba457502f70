use std::time::Duration;

use alloy_primitives::U64;
use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::{Config, HTTP_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::types::RawLog;
use crate::ws::messages::{RpcLog, RpcResponse};

/// Replays the contract's logs from `cfg.start_block` to the current head over HTTP
/// JSON-RPC, in `cfg.block_range`-sized `eth_getLogs` windows, onto `log_tx`.
pub async fn backfill(cfg: &Config, log_tx: &mpsc::Sender<RawLog>) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?;

    let head: U64 = rpc_call(&client, &cfg.rpc_http_url, "eth_blockNumber", serde_json::json!([])).await?;
    let head = head.to::<u64>();
    let chunks = block_chunks(cfg.start_block, head, cfg.block_range);
    info!(
        "[BACKFILL] blocks {}..={} in {} request(s) of up to {} blocks",
        cfg.start_block,
        head,
        chunks.len(),
        cfg.block_range
    );

    let mut replayed = 0usize;
    for (from, to) in chunks {
        let filter = serde_json::json!([{
            "address": cfg.contract,
            "fromBlock": format!("{from:#x}"),
            "toBlock": format!("{to:#x}"),
        }]);
        let logs: Vec<RpcLog> = rpc_call(&client, &cfg.rpc_http_url, "eth_getLogs", filter).await?;
        debug!(from, to, logs = logs.len(), "[BACKFILL] window fetched");

        for log in logs {
            log_tx
                .send(log.into_raw(Utc::now()))
                .await
                .map_err(|_| AppError::StreamFailure("ingestion loop dropped the log channel".to_string()))?;
            replayed += 1;
        }
    }

    info!("[BACKFILL] replayed {replayed} logs up to block {head}");
    Ok(())
}

async fn rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> Result<T> {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });
    let resp: RpcResponse<T> = client.post(url).json(&body).send().await?.json().await?;

    if let Some(err) = resp.error {
        return Err(AppError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    resp.result
        .ok_or_else(|| AppError::StreamFailure(format!("{method} returned neither result nor error")))
}

/// Inclusive `(from, to)` windows covering `start..=head`, each at most `range` blocks.
/// Empty when `start` is past `head`.
pub fn block_chunks(start: u64, head: u64, range: u64) -> Vec<(u64, u64)> {
    let range = range.max(1);
    let mut chunks = Vec::new();
    let mut from = start;
    while from <= head {
        let to = from.saturating_add(range - 1).min(head);
        chunks.push((from, to));
        if to == u64::MAX {
            break;
        }
        from = to + 1;
    }
    chunks
}
