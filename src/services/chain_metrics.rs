//! Chain-level aggregation and persistence
//!
//! Chain rows are recomputed from whatever protocols the caller passes in and
//! upserted by `chain_name`; nothing is patched incrementally.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::WriteError;
use crate::models::chain::{ChainMetric, ChainMetricsDetail};
use crate::models::protocol::Protocol;
use crate::models::run::ChainFailure;
use crate::services::protocol_store::ProtocolStore;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChainUpdateReport {
    pub updated: usize,
    pub failed: Vec<ChainFailure>,
}

/// Sum of protocol TVL, the default dominance denominator
pub fn total_tvl(protocols: &[Protocol]) -> f64 {
    protocols.iter().map(|p| p.tvl).sum()
}

/// Fold every `(chain, tvl)` pair of every protocol into one metric per chain.
///
/// `reference_tvl` is the dominance denominator; dominance is a percentage and
/// 0 when the denominator is not positive.
pub fn aggregate_chains(
    protocols: &[Protocol],
    reference_tvl: f64,
    now: DateTime<Utc>,
) -> Vec<ChainMetric> {
    let per_chain = protocols.iter().fold(
        BTreeMap::<&str, (f64, BTreeSet<&str>)>::new(),
        |mut acc, protocol| {
            for (chain, tvl) in &protocol.chain_tvls {
                let entry = acc.entry(chain.as_str()).or_default();
                entry.0 += tvl;
                entry.1.insert(protocol.id.as_str());
            }
            acc
        },
    );

    per_chain
        .into_iter()
        .map(|(chain, (tvl, protocol_ids))| {
            let dominance = if reference_tvl > 0.0 {
                tvl / reference_tvl * 100.0
            } else {
                0.0
            };
            ChainMetric {
                chain_name: chain.to_string(),
                tvl,
                protocol_count: protocol_ids.len(),
                metrics: ChainMetricsDetail {
                    dominance,
                    protocol_distribution: protocol_ids.len(),
                    stability: None,
                },
                last_updated: now,
            }
        })
        .collect()
}

#[derive(Clone)]
pub struct ChainMetricsUpdater {
    store: Arc<dyn ProtocolStore>,
}

impl ChainMetricsUpdater {
    pub fn new(store: Arc<dyn ProtocolStore>) -> Self {
        Self { store }
    }

    /// Recompute and upsert chain metrics for `protocols`.
    ///
    /// Without `reference_tvl` dominance is relative to these protocols only,
    /// so figures from different batches are not comparable.
    pub async fn update(
        &self,
        protocols: &[Protocol],
        reference_tvl: Option<f64>,
    ) -> ChainUpdateReport {
        let reference = reference_tvl.unwrap_or_else(|| total_tvl(protocols));
        let metrics = aggregate_chains(protocols, reference, Utc::now());

        let mut report = ChainUpdateReport::default();
        for metric in &metrics {
            match self.store.upsert_chain_metric(metric).await {
                Ok(()) => report.updated += 1,
                Err(e) => {
                    let error = WriteError::ChainUpsert(e);
                    tracing::warn!(
                        chain = %metric.chain_name,
                        error = %error,
                        "Failed to upsert chain metrics"
                    );
                    report.failed.push(ChainFailure {
                        chain_name: metric.chain_name.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            chains = metrics.len(),
            updated = report.updated,
            failed = report.failed.len(),
            "Chain metrics updated"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::MemoryStore;

    fn protocol(id: &str, tvl: f64, chains: &[(&str, f64)]) -> Protocol {
        Protocol {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            symbol: None,
            url: None,
            tvl,
            mcap: None,
            category: "Dexes".to_string(),
            chains: chains.iter().map(|(c, _)| c.to_string()).collect(),
            chain_tvls: chains.iter().map(|(c, t)| (c.to_string(), *t)).collect(),
            change_1h: None,
            change_1d: None,
            change_7d: None,
        }
    }

    #[test]
    fn test_aggregate_sums_tvl_and_counts_protocols() {
        let protocols = vec![
            protocol("a", 100.0, &[("Ethereum", 60.0), ("Arbitrum", 40.0)]),
            protocol("b", 100.0, &[("Ethereum", 100.0)]),
        ];

        let metrics = aggregate_chains(&protocols, total_tvl(&protocols), Utc::now());
        assert_eq!(metrics.len(), 2);

        let eth = metrics.iter().find(|m| m.chain_name == "Ethereum").unwrap();
        assert_eq!(eth.tvl, 160.0);
        assert_eq!(eth.protocol_count, 2);
        assert_eq!(eth.metrics.protocol_distribution, 2);
        assert_eq!(eth.metrics.dominance, 80.0);

        let arb = metrics.iter().find(|m| m.chain_name == "Arbitrum").unwrap();
        assert_eq!(arb.protocol_count, 1);
        assert_eq!(arb.metrics.dominance, 20.0);
    }

    #[test]
    fn test_zero_reference_gives_zero_dominance() {
        let protocols = vec![protocol("a", 0.0, &[("Ethereum", 0.0)])];
        let metrics = aggregate_chains(&protocols, 0.0, Utc::now());
        assert_eq!(metrics[0].metrics.dominance, 0.0);
    }

    #[test]
    fn test_protocol_without_chain_tvls_contributes_nothing() {
        let protocols = vec![protocol("a", 50.0, &[])];
        assert!(aggregate_chains(&protocols, 50.0, Utc::now()).is_empty());
    }

    #[tokio::test]
    async fn test_update_uses_explicit_reference_total() {
        let store = Arc::new(MemoryStore::new());
        let updater = ChainMetricsUpdater::new(store.clone());
        let batch = vec![protocol("a", 100.0, &[("Ethereum", 100.0)])];

        updater.update(&batch, Some(400.0)).await;
        assert_eq!(store.chain_metric("Ethereum").unwrap().metrics.dominance, 25.0);

        updater.update(&batch, None).await;
        assert_eq!(store.chain_metric("Ethereum").unwrap().metrics.dominance, 100.0);
        assert_eq!(store.chain_metric_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_chain_does_not_stop_others() {
        let store = Arc::new(MemoryStore::new());
        store.fail_chain_upserts_for("Arbitrum");
        let updater = ChainMetricsUpdater::new(store.clone());
        let batch = vec![protocol("a", 100.0, &[("Arbitrum", 30.0), ("Ethereum", 70.0)])];

        let report = updater.update(&batch, None).await;
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].chain_name, "Arbitrum");
        assert!(store.chain_metric("Ethereum").is_some());
    }
}
