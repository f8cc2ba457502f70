//! Builders for ABI-encoded logs used across the crate's tests.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, Bytes, B256, U256};
use chrono::{DateTime, Utc};

use crate::abi::registry::{EventKind, EventRegistry};
use crate::types::RawLog;

pub fn uint_topic(n: u64) -> B256 {
    B256::from(U256::from(n).to_be_bytes::<32>())
}

pub fn observed_at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn uint(n: u64) -> DynSolValue {
    DynSolValue::Uint(U256::from(n), 256)
}

fn string(s: &str) -> DynSolValue {
    DynSolValue::String(s.to_string())
}

pub fn raw_log(
    registry: &EventRegistry,
    kind: EventKind,
    market_id: u64,
    who: Address,
    payload: Vec<DynSolValue>,
) -> RawLog {
    let signature = registry.signature_of(kind).unwrap();
    RawLog {
        topics: vec![signature, uint_topic(market_id), who.into_word()],
        data: Bytes::from(DynSolValue::Tuple(payload).abi_encode_params()),
        tx_hash: B256::repeat_byte(0xaa),
        block_number: 1,
        observed_at: observed_at(),
    }
}

pub fn market_created(
    registry: &EventRegistry,
    market_id: u64,
    creator: Address,
    question: &str,
    end_time: u64,
    yes: u64,
    no: u64,
) -> RawLog {
    raw_log(
        registry,
        EventKind::MarketCreated,
        market_id,
        creator,
        vec![string(question), uint(end_time), uint(yes), uint(no)],
    )
}

pub fn shares_bought(registry: &EventRegistry, market_id: u64, user: Address, is_yes: bool, pred_in: u64, shares_out: u64) -> RawLog {
    raw_log(
        registry,
        EventKind::SharesBought,
        market_id,
        user,
        vec![DynSolValue::Bool(is_yes), uint(pred_in), uint(shares_out)],
    )
}

pub fn shares_sold(registry: &EventRegistry, market_id: u64, user: Address, is_yes: bool, shares_in: u64, pred_out: u64) -> RawLog {
    raw_log(
        registry,
        EventKind::SharesSold,
        market_id,
        user,
        vec![DynSolValue::Bool(is_yes), uint(shares_in), uint(pred_out)],
    )
}

pub fn comment(registry: &EventRegistry, market_id: u64, user: Address, text: &str) -> RawLog {
    raw_log(registry, EventKind::Comment, market_id, user, vec![string(text)])
}

pub fn danmaku(registry: &EventRegistry, market_id: u64, user: Address, text: &str) -> RawLog {
    raw_log(registry, EventKind::Danmaku, market_id, user, vec![string(text)])
}
