//! Dashboard read path with an explicitly owned cache
//!
//! Snapshots are cached per query parameters; the ingestion job calls
//! `invalidate` after every completed run.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::error::StoreError;
use crate::models::dashboard::DashboardSnapshot;
use crate::services::metrics_aggregator::{
    TvlRanges, aggregate_by_category, aggregate_by_risk, aggregate_by_tvl_range,
    aggregate_chain_diversity,
};
use crate::services::protocol_store::ProtocolStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DashboardQuery {
    pub top_chains: usize,
}

#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn ProtocolStore>,
    ranges: Arc<TvlRanges>,
    cache: Cache<DashboardQuery, Arc<DashboardSnapshot>>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn ProtocolStore>, ranges: TvlRanges, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(32)
            .time_to_live(ttl)
            .build();

        Self {
            store,
            ranges: Arc::new(ranges),
            cache,
        }
    }

    pub async fn snapshot(&self, query: DashboardQuery) -> Result<Arc<DashboardSnapshot>, StoreError> {
        if let Some(cached) = self.cache.get(&query).await {
            tracing::debug!(?query, "Dashboard cache hit");
            return Ok(cached);
        }

        let protocols = self.store.load_protocols().await?;
        let chains = self.store.load_chain_metrics().await?;

        tracing::debug!(
            protocols = protocols.len(),
            chains = chains.len(),
            "Computing dashboard snapshot"
        );

        let snapshot = Arc::new(DashboardSnapshot {
            category_data: aggregate_by_category(&protocols),
            tvl_distribution_data: aggregate_by_tvl_range(&protocols, &self.ranges),
            risk_distribution_data: aggregate_by_risk(&protocols),
            chain_diversity_data: aggregate_chain_diversity(&chains, query.top_chains),
        });

        self.cache.insert(query, snapshot.clone()).await;

        Ok(snapshot)
    }

    /// Drop every cached snapshot, e.g. after new data was ingested
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::health::RiskLevel;
    use crate::services::memory_store::MemoryStore;
    use crate::services::protocol_store::ProtocolRow;
    use crate::services::risk_classifier::compute_health_metrics;
    use chrono::Utc;

    fn seed(store: &MemoryStore, id: &str, tvl: f64) {
        let protocol = crate::models::protocol::RawProtocol {
            id: Some(id.to_string()),
            name: Some(id.to_string()),
            tvl: Some(tvl),
            ..Default::default()
        }
        .validate(0)
        .unwrap();
        let now = Utc::now();
        store.seed_protocol(ProtocolRow::new(&protocol, compute_health_metrics(&protocol, now), now));
    }

    #[tokio::test]
    async fn test_snapshot_is_cached_until_invalidated() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "aave", 5e9);
        let service = DashboardService::new(store.clone(), TvlRanges::default(), Duration::from_secs(60));
        let query = DashboardQuery { top_chains: 15 };

        let first = service.snapshot(query).await.unwrap();
        assert_eq!(first.category_data[0].protocol_count, 1);
        assert_eq!(first.risk_distribution_data[0].risk_level, RiskLevel::Low.to_string());

        seed(&store, "curve", 2e8);
        let cached = service.snapshot(query).await.unwrap();
        assert_eq!(cached.category_data[0].protocol_count, 1);

        service.invalidate();
        let fresh = service.snapshot(query).await.unwrap();
        assert_eq!(fresh.category_data[0].protocol_count, 2);
    }
}
