// src/bin/run_ingestion.rs

use std::env;
use std::sync::Arc;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use defi_risk_backend::config::AppConfig;
use defi_risk_backend::services::defillama::DefiLlamaService;
use defi_risk_backend::services::memory_store::MemoryStore;
use defi_risk_backend::services::protocol_ingestor::{IngestorSettings, ProtocolIngestor};
use defi_risk_backend::services::protocol_store::ProtocolStore;
use defi_risk_backend::services::sea_orm_store::SeaOrmStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,defi_risk_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    // Usage: cargo run --bin run_ingestion -- [--dry-run]
    let args: Vec<String> = env::args().collect();
    let dry_run = match args.get(1).map(String::as_str) {
        None => false,
        Some("--dry-run") => true,
        Some(_) => {
            eprintln!("Usage: {} [--dry-run]", args[0]);
            std::process::exit(2);
        }
    };

    let config = AppConfig::from_env()?;

    let store: Arc<dyn ProtocolStore> = if dry_run {
        tracing::info!("Dry run: writing to an in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let db = Database::connect(config.require_database_url()?).await?;
        migration::Migrator::up(&db, None).await?;
        Arc::new(SeaOrmStore::new(db))
    };

    let source = Arc::new(DefiLlamaService::new(
        config.ingest.defillama_base_url.clone(),
        config.ingest.fetch_timeout,
    )?);

    let ingestor = ProtocolIngestor::new(source, store, IngestorSettings::from(&config.ingest));
    let result = ingestor.run_with_timeout(config.ingest.run_timeout).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
