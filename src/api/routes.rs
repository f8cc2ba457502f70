use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::health::{HealthReport, HealthState};
use crate::api::latency::{LatencyReport, LatencyStats};
use crate::error::AppError;
use crate::state::{MarketSnapshot, MarketStore};
use crate::types::{MarketCreated, MarketId, TextPost, Trade};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<MarketStore>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/markets", get(get_markets))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/created", get(get_market_created))
        .route("/markets/:id/comments", get(get_market_comments))
        .route("/markets/:id/danmaku", get(get_market_danmaku))
        .route("/markets/:id/trades", get(get_market_trades))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

/// Path ids must be non-negative decimal integers; anything else names no market.
fn parse_market_id(raw: &str) -> Result<MarketId, AppError> {
    MarketId::parse(raw).ok_or_else(|| AppError::NotFound(format!("market {raw}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthReport> {
    Json(state.health.report(state.store.market_count()))
}

async fn get_markets(State(state): State<ApiState>) -> Json<Vec<MarketCreated>> {
    let mut markets = state.store.list_created();
    markets.sort_by(|a, b| a.market_id.cmp(&b.market_id));
    Json(markets)
}

async fn get_market(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<MarketSnapshot>, AppError> {
    let id = parse_market_id(&id)?;
    Ok(Json(state.store.snapshot(&id)))
}

async fn get_market_created(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<MarketCreated>, AppError> {
    let id = parse_market_id(&id)?;
    state
        .store
        .created(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("creation record for market {id}")))
}

async fn get_market_comments(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TextPost>>, AppError> {
    let id = parse_market_id(&id)?;
    Ok(Json(state.store.snapshot(&id).comments))
}

async fn get_market_danmaku(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TextPost>>, AppError> {
    let id = parse_market_id(&id)?;
    Ok(Json(state.store.snapshot(&id).danmaku))
}

async fn get_market_trades(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Trade>>, AppError> {
    let id = parse_market_id(&id)?;
    Ok(Json(state.store.snapshot(&id).trades))
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyReport> {
    Json(state.latency.report())
}
