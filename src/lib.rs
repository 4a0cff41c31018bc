// src/lib.rs

use services::dashboard::DashboardService;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: DashboardService,
    /// Chain count used when a request does not ask for one
    pub top_chains: usize,
}

pub mod config;
pub mod error;

pub mod entities {
    pub mod prelude;
    pub mod chain_metrics;
    pub mod protocol_tvl_history;
    pub mod protocol_volumes;
    pub mod protocols;
    pub mod sync_status;
}

pub mod models {
    pub mod chain;
    pub mod dashboard;
    pub mod health;
    pub mod protocol;
    pub mod run;
    pub mod volume;
}

pub mod services {
    pub mod chain_metrics;
    pub mod dashboard;
    pub mod defillama;
    pub mod memory_store;
    pub mod metrics_aggregator;
    pub mod protocol_ingestor;
    pub mod protocol_store;
    pub mod risk_classifier;
    pub mod sea_orm_store;
    pub mod sync_status;
    pub mod volume_reconciler;
}

pub mod handlers;
pub mod jobs;
