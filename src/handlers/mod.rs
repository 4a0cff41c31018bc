use axum::{Router, routing::get};

use crate::AppState;

pub mod dashboard;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(dashboard::health))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/dashboard/categories", get(dashboard::get_categories))
        .route("/dashboard/tvl-distribution", get(dashboard::get_tvl_distribution))
        .route("/dashboard/risk-distribution", get(dashboard::get_risk_distribution))
        .route("/dashboard/chains", get(dashboard::get_chain_diversity))
        .with_state(state)
}
