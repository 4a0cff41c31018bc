use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::AppState;
use crate::models::dashboard::{
    CategoryDistribution, ChainDiversity, ChainDiversityParams, DashboardParams,
    DashboardSnapshot, ErrorResponse, RiskDistribution, TvlDistribution,
};
use crate::services::dashboard::DashboardQuery;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn resolve_top(requested: Option<usize>, default: usize) -> Result<usize, ApiError> {
    match requested {
        Some(0) => Err(bad_request("top must be greater than zero")),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}

async fn load(state: &AppState, top_chains: usize) -> Result<Arc<DashboardSnapshot>, ApiError> {
    state
        .dashboard
        .snapshot(DashboardQuery { top_chains })
        .await
        .map_err(|e| {
            tracing::error!("Failed to build dashboard snapshot: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Database error: {}", e),
                }),
            )
        })
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardSnapshot>, ApiError> {
    let top = resolve_top(params.top_chains, state.top_chains)?;
    let snapshot = load(&state, top).await?;
    Ok(Json(snapshot.as_ref().clone()))
}

pub async fn get_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryDistribution>>, ApiError> {
    let snapshot = load(&state, state.top_chains).await?;
    Ok(Json(snapshot.category_data.clone()))
}

pub async fn get_tvl_distribution(
    State(state): State<AppState>,
) -> Result<Json<Vec<TvlDistribution>>, ApiError> {
    let snapshot = load(&state, state.top_chains).await?;
    Ok(Json(snapshot.tvl_distribution_data.clone()))
}

pub async fn get_risk_distribution(
    State(state): State<AppState>,
) -> Result<Json<Vec<RiskDistribution>>, ApiError> {
    let snapshot = load(&state, state.top_chains).await?;
    Ok(Json(snapshot.risk_distribution_data.clone()))
}

pub async fn get_chain_diversity(
    State(state): State<AppState>,
    Query(params): Query<ChainDiversityParams>,
) -> Result<Json<Vec<ChainDiversity>>, ApiError> {
    let top = resolve_top(params.top, state.top_chains)?;
    let snapshot = load(&state, top).await?;
    Ok(Json(snapshot.chain_diversity_data.clone()))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
