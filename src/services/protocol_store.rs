//! Persistence contract used by the ingestion pipeline and the dashboard
//!
//! Every write keyed by a natural identifier is an upsert (`id`, `chain_name`,
//! `protocol_name`); TVL history is append-only.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::chain::ChainMetric;
use crate::models::health::HealthMetrics;
use crate::models::protocol::{ChainData, Protocol, ProtocolSnapshot};
use crate::models::volume::ProtocolVolume;

/// Row written to `protocols`
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub symbol: Option<String>,
    pub url: Option<String>,
    pub tvl: f64,
    pub mcap: Option<f64>,
    pub category: String,
    pub chain_data: ChainData,
    pub health_metrics: HealthMetrics,
    pub last_updated: DateTime<Utc>,
}

impl ProtocolRow {
    pub fn new(protocol: &Protocol, health_metrics: HealthMetrics, now: DateTime<Utc>) -> Self {
        Self {
            id: protocol.id.clone(),
            name: protocol.name.clone(),
            description: protocol.description.clone(),
            symbol: protocol.symbol.clone(),
            url: protocol.url.clone(),
            tvl: protocol.tvl,
            mcap: protocol.mcap,
            category: protocol.category.clone(),
            chain_data: protocol.chain_data(),
            health_metrics,
            last_updated: now,
        }
    }

    pub fn snapshot(&self) -> ProtocolSnapshot {
        ProtocolSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            tvl: self.tvl,
            category: Some(self.category.clone()),
            risk_level: Some(self.health_metrics.risk_level),
        }
    }
}

/// Row appended to `protocol_tvl_history`
#[derive(Debug, Clone, PartialEq)]
pub struct TvlHistoryRow {
    pub protocol_id: String,
    pub tvl: f64,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait ProtocolStore: Send + Sync {
    /// Insert-or-update by `id`
    async fn upsert_protocol(&self, row: &ProtocolRow) -> Result<(), StoreError>;

    async fn insert_tvl_history(&self, row: &TvlHistoryRow) -> Result<(), StoreError>;

    /// Insert-or-update by `chain_name`
    async fn upsert_chain_metric(&self, metric: &ChainMetric) -> Result<(), StoreError>;

    /// Insert-or-update by `protocol_name`; returns rows written
    async fn upsert_volumes(&self, rows: &[ProtocolVolume]) -> Result<usize, StoreError>;

    /// Names of every persisted protocol, exactly as stored
    async fn protocol_names(&self) -> Result<HashSet<String>, StoreError>;

    /// All protocols, highest TVL first
    async fn load_protocols(&self) -> Result<Vec<ProtocolSnapshot>, StoreError>;

    /// All chain metrics, highest TVL first
    async fn load_chain_metrics(&self) -> Result<Vec<ChainMetric>, StoreError>;
}
