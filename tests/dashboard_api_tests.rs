mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;

use defi_risk_backend::AppState;
use defi_risk_backend::handlers;
use defi_risk_backend::models::dashboard::{ChainDiversity, DashboardSnapshot, TvlDistribution};
use defi_risk_backend::services::dashboard::DashboardService;
use defi_risk_backend::services::memory_store::MemoryStore;
use defi_risk_backend::services::metrics_aggregator::TvlRanges;

use common::{StubSource, ingestor, sample_protocols, settings};

async fn server() -> TestServer {
    let source = Arc::new(StubSource::new(sample_protocols()));
    let store = Arc::new(MemoryStore::new());
    let result = ingestor(source, store.clone(), settings(10)).run().await;
    assert!(result.success);

    let state = AppState {
        dashboard: DashboardService::new(store, TvlRanges::default(), Duration::from_secs(60)),
        top_chains: 15,
    };

    TestServer::new(handlers::router(state)).unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_dashboard_snapshot() {
    let server = server().await;
    let response = server.get("/dashboard").await;
    response.assert_status_ok();

    let snapshot: DashboardSnapshot = response.json();
    assert_eq!(snapshot.category_data.len(), 1);
    assert_eq!(snapshot.category_data[0].category, "Dexes");
    assert_eq!(snapshot.category_data[0].protocol_count, 3);
    assert_eq!(snapshot.category_data[0].total_tvl, 1000.0);

    let counted: usize = snapshot.tvl_distribution_data.iter().map(|b| b.protocol_count).sum();
    assert_eq!(counted, 3);
    assert_eq!(snapshot.chain_diversity_data.len(), 2);
    assert_eq!(snapshot.chain_diversity_data[0].name, "Ethereum");
}

#[tokio::test]
async fn test_dashboard_uses_camel_case_keys() {
    let server = server().await;
    let body: Value = server.get("/dashboard").await.json();
    assert!(body.get("categoryData").is_some());
    assert!(body.get("tvlDistributionData").is_some());
    assert!(body.get("riskDistributionData").is_some());
    assert!(body.get("chainDiversityData").is_some());
}

#[tokio::test]
async fn test_chain_diversity_respects_top() {
    let server = server().await;
    let response = server.get("/dashboard/chains").add_query_param("top", 1).await;
    response.assert_status_ok();

    let chains: Vec<ChainDiversity> = response.json();
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].name, "Ethereum");
    assert_eq!(chains[0].chain_count, 2);
}

#[tokio::test]
async fn test_zero_top_is_rejected() {
    let server = server().await;
    let response = server
        .get("/dashboard")
        .add_query_param("top_chains", 0)
        .expect_failure()
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tvl_distribution_lists_every_range() {
    let server = server().await;
    let buckets: Vec<TvlDistribution> = server.get("/dashboard/tvl-distribution").await.json();
    assert_eq!(buckets.len(), TvlRanges::default().ranges().len());
}

#[tokio::test]
async fn test_risk_distribution() {
    let server = server().await;
    let response = server.get("/dashboard/risk-distribution").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let levels = body.as_array().unwrap();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0]["risk_level"], "Medium");
    assert_eq!(levels[0]["protocol_count"], 3);
}
