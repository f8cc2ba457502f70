mod abi;
mod api;
mod config;
mod error;
mod fetcher;
mod ingest;
mod shutdown;
mod state;
mod types;
mod ws;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::abi::{EventKind, EventRegistry};
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::ingest::Ingestor;
use crate::shutdown::ShutdownSignal;
use crate::state::MarketStore;
use crate::ws::LogSubscriber;

#[tokio::main]
async fn main() {
    // A missing .env is fine; the environment alone can configure the indexer.
    dotenv::dotenv().ok();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Event registry ---
    let registry = Arc::new(EventRegistry::prediction_market()?);
    for kind in EventKind::ALL {
        let (Some(schema), Some(signature)) = (registry.schema(kind), registry.signature_of(kind)) else {
            continue;
        };
        info!(
            signature = %signature,
            indexed = ?registry.indexed_arguments(kind),
            "registered {}",
            schema.canonical_signature()
        );
    }
    info!("Event registry ready: {} events", registry.len());

    // --- Shared state ---
    let store = MarketStore::new();
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());

    let shutdown = ShutdownSignal::new();
    shutdown.listen();

    // HTTP API server
    let api_state = ApiState {
        store: Arc::clone(&store),
        health: Arc::clone(&health),
        latency: Arc::clone(&latency),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    let api_shutdown = shutdown.subscribe();
    let api_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(api_shutdown))
            .await
    });

    // --- Log source ---
    info!(
        contract = %cfg.contract,
        start_block = cfg.start_block,
        "Following contract logs via {}",
        cfg.ws_url
    );
    let subscription = LogSubscriber::new(cfg, Arc::clone(&health)).spawn();

    // --- Ingestion (runs on this task until shutdown or stream failure) ---
    let ingestor = Ingestor::new(registry, Arc::clone(&store), health, latency);
    if let Err(e) = ingestor.run(subscription, shutdown.subscribe()).await {
        // Stop the API as well; the process is about to exit non-zero.
        shutdown.trigger();
        return Err(e);
    }

    info!("Ingestion stopped, waiting for HTTP API to drain");
    match api_task.await {
        Ok(served) => served?,
        Err(e) => error!("HTTP API task panicked: {e}"),
    }
    info!("Shutdown complete: {} markets indexed", store.market_count());
    Ok(())
}
