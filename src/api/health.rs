//! Shared ingestion health for the /health endpoint.
//! Updated by the log source and the ingestion loop, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::Serialize;

#[derive(Default)]
pub struct HealthState {
    /// True once the live subscription is confirmed, false after it drops.
    stream_connected: AtomicBool,
    last_block: AtomicU64,
    records_received: AtomicU64,
    events_applied: AtomicU64,
    unknown_events: AtomicU64,
    malformed_records: AtomicU64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub stream_connected: bool,
    pub last_block: u64,
    pub records_received: u64,
    pub events_applied: u64,
    pub unknown_events: u64,
    pub malformed_records: u64,
    pub markets: usize,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stream_connected(&self, v: bool) {
        self.stream_connected.store(v, Ordering::Relaxed);
    }

    /// Counts a received record and returns the running total.
    pub fn record_received(&self, block_number: u64) -> u64 {
        self.last_block.fetch_max(block_number, Ordering::Relaxed);
        self.records_received.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_events_applied(&self) {
        self.events_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the running total so callers can rate-limit their diagnostics.
    pub fn inc_unknown_events(&self) -> u64 {
        self.unknown_events.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_malformed_records(&self) {
        self.malformed_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stream_connected(&self) -> bool {
        self.stream_connected.load(Ordering::Relaxed)
    }

    pub fn records_received(&self) -> u64 {
        self.records_received.load(Ordering::Relaxed)
    }

    pub fn events_applied(&self) -> u64 {
        self.events_applied.load(Ordering::Relaxed)
    }

    pub fn unknown_events(&self) -> u64 {
        self.unknown_events.load(Ordering::Relaxed)
    }

    pub fn malformed_records(&self) -> u64 {
        self.malformed_records.load(Ordering::Relaxed)
    }

    pub fn report(&self, markets: usize) -> HealthReport {
        HealthReport {
            status: "ok",
            stream_connected: self.stream_connected(),
            last_block: self.last_block.load(Ordering::Relaxed),
            records_received: self.records_received(),
            events_applied: self.events_applied(),
            unknown_events: self.unknown_events(),
            malformed_records: self.malformed_records(),
            markets,
        }
    }
}
