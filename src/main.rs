use std::sync::Arc;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use defi_risk_backend::AppState;
use defi_risk_backend::config::AppConfig;
use defi_risk_backend::handlers;
use defi_risk_backend::jobs::protocol_sync::start_protocol_sync_job;
use defi_risk_backend::services::dashboard::DashboardService;
use defi_risk_backend::services::defillama::DefiLlamaService;
use defi_risk_backend::services::metrics_aggregator::TvlRanges;
use defi_risk_backend::services::protocol_ingestor::{IngestorSettings, ProtocolIngestor};
use defi_risk_backend::services::sea_orm_store::SeaOrmStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,defi_risk_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(config.require_database_url()?).await?;

    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None).await?;

    let store = Arc::new(SeaOrmStore::new(db.clone()));
    let source = Arc::new(DefiLlamaService::new(
        config.ingest.defillama_base_url.clone(),
        config.ingest.fetch_timeout,
    )?);
    tracing::info!("Using DeFiLlama at {}", source.base_url());

    let ingestor = Arc::new(ProtocolIngestor::new(
        source,
        store.clone(),
        IngestorSettings::from(&config.ingest),
    ));
    let dashboard = DashboardService::new(store, TvlRanges::default(), config.dashboard.cache_ttl);

    start_protocol_sync_job(db, ingestor, dashboard.clone(), config.ingest.clone()).await;

    let state = AppState {
        dashboard,
        top_chains: config.dashboard.top_chains,
    };

    let app = handlers::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
