use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::api::health::HealthState;
use crate::config::{Config, CHANNEL_CAPACITY, WS_PING_INTERVAL_SECS};
use crate::error::{AppError, Result};
use crate::fetcher::backfill;
use crate::ingest::LogSubscription;
use crate::types::RawLog;
use crate::ws::messages::{build_subscribe_msg, parse_rpc_frame, RpcFrame};

const SUBSCRIBE_REQUEST_ID: u64 = 1;

/// Follows the contract's logs: optional HTTP backfill, then a live
/// `eth_subscribe` over one WebSocket. There is no reconnect; the first
/// error ends the source and is reported on the subscription's failure channel.
pub struct LogSubscriber {
    cfg: Config,
    health: Arc<HealthState>,
}

impl LogSubscriber {
    pub fn new(cfg: Config, health: Arc<HealthState>) -> Self {
        Self { cfg, health }
    }

    /// Starts the source task and hands back its consumer side.
    pub fn spawn(self) -> LogSubscription {
        let (log_tx, logs) = mpsc::channel(CHANNEL_CAPACITY);
        let (failure_tx, failure) = oneshot::channel();

        tokio::spawn(async move {
            let err = match self.stream(&log_tx).await {
                Ok(()) => AppError::StreamFailure("log stream closed".to_string()),
                Err(e) => e,
            };
            self.health.set_stream_connected(false);
            error!("[WS] log source stopped: {err}");
            // The ingestor may already be gone during shutdown.
            let _ = failure_tx.send(err);
        });

        LogSubscription { logs, failure }
    }

    async fn stream(&self, log_tx: &mpsc::Sender<RawLog>) -> Result<()> {
        if self.cfg.start_block > 0 {
            backfill(&self.cfg, log_tx).await?;
        }
        self.stream_live(log_tx).await
    }

    async fn stream_live(&self, log_tx: &mpsc::Sender<RawLog>) -> Result<()> {
        info!("WS connecting to {}", self.cfg.ws_url);
        let (ws_stream, _) = connect_async(&self.cfg.ws_url).await?;
        let (mut write, mut read) = ws_stream.split();

        let sub_msg = build_subscribe_msg(SUBSCRIBE_REQUEST_ID, &self.cfg.contract);
        write.send(Message::Text(sub_msg.into())).await?;
        debug!(contract = %self.cfg.contract, "WS eth_subscribe sent");

        let mut subscription_id: Option<String> = None;
        let mut ping_interval = interval(Duration::from_secs(WS_PING_INTERVAL_SECS));
        ping_interval.tick().await; // consume immediate first tick

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_frame(&text, &mut subscription_id, log_tx).await?;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame
                                .map(|f| f.reason.to_string())
                                .unwrap_or_else(|| "no reason given".to_string());
                            return Err(AppError::StreamFailure(format!("node closed the socket: {reason}")));
                        }
                        None => {
                            return Err(AppError::StreamFailure("socket ended".to_string()));
                        }
                        Some(Err(e)) => return Err(e.into()),
                        Some(Ok(_)) => {}
                    }
                }

                _ = ping_interval.tick() => {
                    debug!("WS ping");
                    write.send(Message::Ping(vec![].into())).await?;
                }
            }
        }
    }

    async fn handle_frame(
        &self,
        text: &str,
        subscription_id: &mut Option<String>,
        log_tx: &mpsc::Sender<RawLog>,
    ) -> Result<()> {
        match parse_rpc_frame(text) {
            RpcFrame::Reply { id, result } if id == SUBSCRIBE_REQUEST_ID => {
                let sub = result.as_str().map(str::to_string).ok_or_else(|| {
                    AppError::StreamFailure(format!("eth_subscribe returned {result}"))
                })?;
                info!(subscription = %sub, contract = %self.cfg.contract, "WS subscribed to contract logs");
                *subscription_id = Some(sub);
                self.health.set_stream_connected(true);
            }
            RpcFrame::ReplyError { id, error } => {
                // eth_subscribe is the only request on this socket, so any error reply is fatal.
                let request = match id {
                    Some(SUBSCRIBE_REQUEST_ID) => "eth_subscribe".to_string(),
                    Some(other) => format!("request {other}"),
                    None => "unidentified request".to_string(),
                };
                return Err(AppError::Rpc {
                    code: error.code,
                    message: format!("{request} rejected: {}", error.message),
                });
            }
            RpcFrame::Log { subscription, log } if subscription_id.as_deref() == Some(subscription.as_str()) => {
                if log.removed {
                    debug!(tx = ?log.transaction_hash, "WS log flagged removed by reorg");
                }
                log_tx
                    .send(log.into_raw(Utc::now()))
                    .await
                    .map_err(|_| AppError::StreamFailure("ingestion loop dropped the log channel".to_string()))?;
            }
            RpcFrame::Log { subscription, .. } => {
                warn!(subscription = %subscription, "WS notification for a foreign subscription, ignoring");
            }
            other => debug!("WS frame ignored: {other:?}"),
        }
        Ok(())
    }
}
