use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes, B256, U64};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::types::RawLog;

static PARSE_FAILURES: AtomicU64 = AtomicU64::new(0);

/// One log as returned by `eth_getLogs` and inside `eth_subscription` notifications.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub topics: Vec<B256>,
    pub data: Bytes,
    /// Absent on pending logs.
    pub block_number: Option<U64>,
    pub transaction_hash: Option<B256>,
    /// Set when a reorg retracts the log. Passed through untouched.
    #[serde(default)]
    pub removed: bool,
}

impl RpcLog {
    pub fn into_raw(self, observed_at: DateTime<Utc>) -> RawLog {
        RawLog {
            topics: self.topics,
            data: self.data,
            tx_hash: self.transaction_hash.unwrap_or_default(),
            block_number: self.block_number.map(|b| b.to::<u64>()).unwrap_or_default(),
            observed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

/// Response envelope for an HTTP JSON-RPC call.
#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    id: Option<u64>,
    method: Option<String>,
    params: Option<NotificationParams>,
    result: Option<serde_json::Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    subscription: String,
    result: RpcLog,
}

/// Parsed WebSocket JSON-RPC frame.
#[derive(Debug)]
pub enum RpcFrame {
    /// Successful reply to a request we sent (e.g. eth_subscribe → subscription id).
    Reply { id: u64, result: serde_json::Value },
    /// Error reply to a request we sent.
    ReplyError { id: Option<u64>, error: RpcErrorObject },
    /// `eth_subscription` notification carrying one log.
    Log { subscription: String, log: RpcLog },
    Unrecognized,
}

/// Parse a raw WebSocket text frame from the node.
pub fn parse_rpc_frame(raw: &str) -> RpcFrame {
    let frame = match serde_json::from_str::<RawFrame>(raw) {
        Ok(f) => f,
        Err(_) => {
            note_parse_failure(raw);
            return RpcFrame::Unrecognized;
        }
    };

    if let Some(error) = frame.error {
        return RpcFrame::ReplyError { id: frame.id, error };
    }
    match (frame.method.as_deref(), frame.params, frame.id, frame.result) {
        (Some("eth_subscription"), Some(params), _, _) => RpcFrame::Log {
            subscription: params.subscription,
            log: params.result,
        },
        (None, _, Some(id), Some(result)) => RpcFrame::Reply { id, result },
        _ => {
            note_parse_failure(raw);
            RpcFrame::Unrecognized
        }
    }
}

fn note_parse_failure(raw: &str) {
    let count = PARSE_FAILURES.fetch_add(1, Ordering::Relaxed) + 1;
    if count <= 10 || count % 1000 == 0 {
        let end = raw.char_indices().nth(500).map_or(raw.len(), |(i, _)| i);
        warn!(count, "[WS PARSE] unrecognized frame: {}", &raw[..end]);
    }
}

/// `eth_subscribe` request for every log the contract emits.
pub fn build_subscribe_msg(id: u64, contract: &Address) -> String {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "eth_subscribe",
        "params": ["logs", { "address": contract }]
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::test_logs::observed_at;

    const LOG_NOTIFICATION: &str = r#"{"jsonrpc":"2.0","method":"eth_subscription","params":{"subscription":"0xcd0c3e8af590364c09d0fa6a1210faf5","result":{"address":"0xb88ae24564251ec870bf8e4c144b8c501dd403f3","topics":["0x1111111111111111111111111111111111111111111111111111111111111111","0x0000000000000000000000000000000000000000000000000000000000000001"],"data":"0x0102","blockNumber":"0x66a8ce","transactionHash":"0x2222222222222222222222222222222222222222222222222222222222222222","transactionIndex":"0x0","blockHash":"0x3333333333333333333333333333333333333333333333333333333333333333","logIndex":"0x1","removed":false}}}"#;

    #[test]
    fn parses_subscription_reply() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":"0xcd0c3e8af590364c09d0fa6a1210faf5"}"#;
        match parse_rpc_frame(raw) {
            RpcFrame::Reply { id, result } => {
                assert_eq!(id, 1);
                assert_eq!(result.as_str(), Some("0xcd0c3e8af590364c09d0fa6a1210faf5"));
            }
            other => panic!("expected Reply, got {other:?}"),
        }
    }

    #[test]
    fn parses_log_notification() {
        match parse_rpc_frame(LOG_NOTIFICATION) {
            RpcFrame::Log { subscription, log } => {
                assert_eq!(subscription, "0xcd0c3e8af590364c09d0fa6a1210faf5");
                let raw = log.into_raw(observed_at());
                assert_eq!(raw.topics.len(), 2);
                assert_eq!(raw.signature(), Some(&B256::repeat_byte(0x11)));
                assert_eq!(&raw.data[..], &[0x01u8, 0x02]);
                assert_eq!(raw.block_number, 0x66a8ce);
                assert_eq!(raw.tx_hash, B256::repeat_byte(0x22));
                assert_eq!(raw.observed_at, observed_at());
            }
            other => panic!("expected Log, got {other:?}"),
        }
    }

    #[test]
    fn pending_log_defaults_block_and_tx() {
        let raw = r#"{"topics":[],"data":"0x"}"#;
        let log: RpcLog = serde_json::from_str(raw).unwrap();
        let raw_log = log.into_raw(observed_at());
        assert_eq!(raw_log.block_number, 0);
        assert_eq!(raw_log.tx_hash, B256::ZERO);
    }

    #[test]
    fn parses_error_reply() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"the method eth_subscribe does not exist"}}"#;
        match parse_rpc_frame(raw) {
            RpcFrame::ReplyError { id, error } => {
                assert_eq!(id, Some(1));
                assert_eq!(error.code, -32601);
            }
            other => panic!("expected ReplyError, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_unrecognized() {
        assert!(matches!(parse_rpc_frame("not json"), RpcFrame::Unrecognized));
        assert!(matches!(parse_rpc_frame(r#"{"totally":"unrelated"}"#), RpcFrame::Unrecognized));
    }

    #[test]
    fn subscribe_msg_filters_on_contract() {
        let contract: Address = "0xb88ae24564251ec870bf8e4c144b8c501dd403f3".parse().unwrap();
        let msg: serde_json::Value = serde_json::from_str(&build_subscribe_msg(7, &contract)).unwrap();
        assert_eq!(msg["id"], 7);
        assert_eq!(msg["method"], "eth_subscribe");
        assert_eq!(msg["params"][0], "logs");
        let addr = msg["params"][1]["address"].as_str().unwrap();
        assert_eq!(addr.to_lowercase(), "0xb88ae24564251ec870bf8e4c144b8c501dd403f3");
    }
}
