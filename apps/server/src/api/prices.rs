use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use networth_core::prices::{BatchRefreshResult, FreshnessReport, PriceResult, StockPrice};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

const DEFAULT_HISTORY_LIMIT: usize = 100;
const MAX_BATCH_SYMBOLS: usize = 50;

#[derive(Deserialize)]
struct RefreshQuery {
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchRefreshRequest {
    symbols: Vec<String>,
    #[serde(default)]
    force: bool,
}

async fn refresh_price(
    Path(symbol): Path<String>,
    Query(query): Query<RefreshQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<PriceResult>> {
    let result = state
        .price_service
        .refresh_symbol(&symbol, query.force)
        .await?;
    Ok(Json(result))
}

async fn refresh_prices(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BatchRefreshRequest>,
) -> ApiResult<Json<BatchRefreshResult>> {
    if body.symbols.is_empty() {
        return Err(ApiError::BadRequest("symbols must not be empty".to_string()));
    }
    if body.symbols.len() > MAX_BATCH_SYMBOLS {
        return Err(ApiError::BadRequest(format!(
            "at most {} symbols per batch, got {}",
            MAX_BATCH_SYMBOLS,
            body.symbols.len()
        )));
    }
    let result = state
        .price_service
        .refresh_symbols(&body.symbols, body.force)
        .await;
    Ok(Json(result))
}

async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<FreshnessReport>> {
    Ok(Json(state.price_service.get_status()?))
}

async fn get_price(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<StockPrice>> {
    match state.price_service.get_cached_price(&symbol)? {
        Some(price) => Ok(Json(price)),
        None => Err(ApiError::NotFound(format!(
            "No cached price for '{}'",
            symbol.trim().to_uppercase()
        ))),
    }
}

async fn get_history(
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<StockPrice>>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(state.price_service.price_history(&symbol, limit)?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/prices/refresh", post(refresh_prices))
        .route("/prices/status", get(get_status))
        .route("/prices/{symbol}", get(get_price))
        .route("/prices/{symbol}/refresh", post(refresh_price))
        .route("/prices/{symbol}/history", get(get_history))
}
