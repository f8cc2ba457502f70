use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::abi::{decode, EventRegistry};
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::INGEST_SUMMARY_EVERY;
use crate::error::{AppError, DecodeError, Result};
use crate::state::MarketStore;
use crate::types::{Event, RawLog};

/// Consumer side of a log source: records in arrival order, plus a one-shot
/// failure signal. Dropping the failure sender without sending also ends the stream.
pub struct LogSubscription {
    pub logs: mpsc::Receiver<RawLog>,
    pub failure: oneshot::Receiver<AppError>,
}

/// The single writer: drains the log stream, decodes each record and folds it into the store.
pub struct Ingestor {
    registry: Arc<EventRegistry>,
    store: Arc<MarketStore>,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
}

impl Ingestor {
    pub fn new(
        registry: Arc<EventRegistry>,
        store: Arc<MarketStore>,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
    ) -> Self {
        Self {
            registry,
            store,
            health,
            latency,
        }
    }

    /// Runs until shutdown (`Ok`) or until the source fails or ends (`Err(StreamFailure)`).
    /// Records already queued are applied before a source failure is reported.
    pub async fn run(
        self,
        mut subscription: LogSubscription,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut watching_shutdown = true;

        loop {
            if *shutdown.borrow() {
                info!("[INGEST] shutdown requested, stopping");
                return Ok(());
            }

            tokio::select! {
                biased;

                changed = shutdown.changed(), if watching_shutdown => {
                    // Sender gone: nobody can ask us to stop any more.
                    if changed.is_err() {
                        watching_shutdown = false;
                    }
                }

                next = subscription.logs.recv() => match next {
                    Some(log) => self.handle_log(log),
                    None => {
                        let err = (&mut subscription.failure).await.unwrap_or_else(|_| {
                            AppError::StreamFailure("log source closed".to_string())
                        });
                        return Err(into_stream_failure(err));
                    }
                },

                failure = &mut subscription.failure => {
                    let err = failure.unwrap_or_else(|_| {
                        AppError::StreamFailure("log source exited".to_string())
                    });
                    return Err(into_stream_failure(err));
                }
            }
        }
    }

    fn handle_log(&self, log: RawLog) {
        let started = Instant::now();
        let received = self.health.record_received(log.block_number);

        if log.topics.is_empty() {
            debug!(tx = %log.tx_hash, block = log.block_number, "[INGEST] skipping log without topics");
        } else {
            match decode(&self.registry, &log) {
                Ok(event) => {
                    log_event(&event);
                    self.store.fold(event);
                    self.health.inc_events_applied();
                    self.latency.record(started.elapsed());
                }
                Err(DecodeError::UnknownEvent(signature)) => {
                    let count = self.health.inc_unknown_events();
                    debug!(
                        topic = %signature,
                        tx = %log.tx_hash,
                        block = log.block_number,
                        "[INGEST] skipping unhandled event topic"
                    );
                    // Warn for the first 10, then every 1000th; each drop is still at debug.
                    if count <= 10 || count % 1000 == 0 {
                        warn!(
                            count,
                            topic = %signature,
                            tx = %log.tx_hash,
                            "[INGEST] unhandled event topic, skipping"
                        );
                    }
                }
                Err(e) => {
                    self.health.inc_malformed_records();
                    warn!(
                        tx = %log.tx_hash,
                        block = log.block_number,
                        "[INGEST] dropping malformed log: {e}"
                    );
                }
            }
        }

        if received % INGEST_SUMMARY_EVERY == 0 {
            info!(
                records = received,
                applied = self.health.events_applied(),
                unknown = self.health.unknown_events(),
                malformed = self.health.malformed_records(),
                markets = self.store.market_count(),
                "[INGEST] summary"
            );
        }
    }
}

fn into_stream_failure(err: AppError) -> AppError {
    match err {
        AppError::StreamFailure(_) => err,
        other => AppError::StreamFailure(other.to_string()),
    }
}

fn log_event(event: &Event) {
    let market_id = event.market_id();
    let tx = event.meta().tx_id;
    match event {
        Event::MarketCreated(e) => info!(
            event = "MarketCreated",
            market_id = %market_id,
            creator = %e.creator,
            end_time = %e.end_time,
            initial_yes = %e.initial_yes_odds,
            initial_no = %e.initial_no_odds,
            tx = %tx,
            "MarketCreated | market: {} | question: {:?}",
            market_id, e.question,
        ),
        Event::SharesTraded(t) => info!(
            event = "SharesTraded",
            market_id = %market_id,
            user = %t.user,
            direction = t.fill.direction(),
            side = %t.side,
            amount_in = %t.fill.amount_in(),
            amount_out = %t.fill.amount_out(),
            tx = %tx,
            "Shares {} | market: {} | side: {}",
            t.fill.direction(), market_id, t.side,
        ),
        Event::Comment(p) => info!(
            event = "Comment",
            market_id = %market_id,
            user = %p.user,
            tx = %tx,
            "Comment | market: {} | {:?}",
            market_id, p.text,
        ),
        Event::Danmaku(p) => info!(
            event = "Danmaku",
            market_id = %market_id,
            user = %p.user,
            tx = %tx,
            "Danmaku | market: {} | {:?}",
            market_id, p.text,
        ),
    }
}
