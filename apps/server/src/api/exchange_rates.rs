use std::sync::Arc;

use allfi_exchange_rate::{BatchResolution, ProviderSummary, Resolution};
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{config::split_symbols, error::ApiResult, main_lib::AppState};

#[derive(Deserialize)]
struct PricesQuery {
    symbols: Option<String>,
}

/// Batch prices. An empty or missing `symbols` list prices the defaults.
async fn get_prices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PricesQuery>,
) -> ApiResult<Json<BatchResolution>> {
    let mut symbols = query
        .symbols
        .as_deref()
        .map(split_symbols)
        .unwrap_or_default();
    if symbols.is_empty() {
        symbols = state.default_symbols.clone();
    }

    let cancel = state.shutdown.child_token();
    let batch = state.registry.fetch_rates(&cancel, &symbols).await?;

    let missing = batch.missing(&symbols);
    if !missing.is_empty() {
        tracing::warn!("Partial price result, missing: {}", missing.join(", "));
    }
    Ok(Json(batch))
}

async fn get_price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<Json<Resolution>> {
    let cancel = state.shutdown.child_token();
    let resolution = state.registry.fetch_rate(&cancel, &symbol).await?;
    Ok(Json(resolution))
}

async fn get_providers(State(state): State<Arc<AppState>>) -> Json<Vec<ProviderSummary>> {
    Json(state.registry.providers())
}

async fn refresh_health(State(state): State<Arc<AppState>>) -> Json<Vec<ProviderSummary>> {
    let cancel = state.shutdown.child_token();
    state.registry.refresh_health(&cancel).await;
    Json(state.registry.providers())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/exchange-rates/prices", get(get_prices))
        .route("/exchange-rates/prices/{symbol}", get(get_price))
        .route("/exchange-rates/providers", get(get_providers))
        .route(
            "/exchange-rates/providers/refresh-health",
            post(refresh_health),
        )
}
