//! Process shutdown signal shared by the ingestion loop and the HTTP server.

use tokio::sync::watch;
use tracing::{info, warn};

/// Broadcasts `true` once SIGTERM/SIGINT arrives or `trigger` is called.
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    /// Spawns the OS signal listener.
    pub fn listen(&self) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let signal = wait_for_signal().await;
            info!("Received {signal}, shutting down");
            let _ = tx.send(true);
        });
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once `rx` reads `true`, or never if every sender is gone first.
pub async fn wait(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        },
        (Err(e), _) | (_, Err(e)) => {
            warn!("unix signal handlers unavailable ({e}), falling back to ctrl-c");
            ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

async fn ctrl_c() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "Ctrl+C",
        Err(e) => {
            warn!("ctrl-c handler unavailable ({e}), only programmatic shutdown remains");
            std::future::pending().await
        }
    }
}
