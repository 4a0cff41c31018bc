//! In-process `ProtocolStore` used for dry runs and tests
//!
//! Upserts replace by key exactly like the database store, so row counts can be
//! compared across repeated runs. Individual keys can be made to fail.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::models::chain::ChainMetric;
use crate::models::protocol::ProtocolSnapshot;
use crate::models::volume::ProtocolVolume;
use crate::services::protocol_store::{ProtocolRow, ProtocolStore, TvlHistoryRow};

#[derive(Default)]
struct Tables {
    protocols: BTreeMap<String, ProtocolRow>,
    history: Vec<TvlHistoryRow>,
    chain_metrics: BTreeMap<String, ChainMetric>,
    volumes: BTreeMap<String, ProtocolVolume>,
}

#[derive(Default)]
struct FailureRules {
    protocols: HashSet<String>,
    history: HashSet<String>,
    chains: HashSet<String>,
    volumes: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failures: Mutex<FailureRules>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a protocol row, e.g. to seed names for volume reconciliation
    pub fn seed_protocol(&self, row: ProtocolRow) {
        self.tables.lock().protocols.insert(row.id.clone(), row);
    }

    pub fn fail_protocol_upserts_for(&self, protocol_id: &str) {
        self.failures.lock().protocols.insert(protocol_id.to_string());
    }

    pub fn fail_history_inserts_for(&self, protocol_id: &str) {
        self.failures.lock().history.insert(protocol_id.to_string());
    }

    pub fn fail_chain_upserts_for(&self, chain_name: &str) {
        self.failures.lock().chains.insert(chain_name.to_string());
    }

    pub fn fail_volume_upserts(&self) {
        self.failures.lock().volumes = true;
    }

    pub fn protocol(&self, id: &str) -> Option<ProtocolRow> {
        self.tables.lock().protocols.get(id).cloned()
    }

    pub fn protocol_count(&self) -> usize {
        self.tables.lock().protocols.len()
    }

    pub fn history(&self) -> Vec<TvlHistoryRow> {
        self.tables.lock().history.clone()
    }

    pub fn chain_metric(&self, chain_name: &str) -> Option<ChainMetric> {
        self.tables.lock().chain_metrics.get(chain_name).cloned()
    }

    pub fn chain_metric_count(&self) -> usize {
        self.tables.lock().chain_metrics.len()
    }

    pub fn volumes(&self) -> Vec<ProtocolVolume> {
        self.tables.lock().volumes.values().cloned().collect()
    }
}

#[async_trait]
impl ProtocolStore for MemoryStore {
    async fn upsert_protocol(&self, row: &ProtocolRow) -> Result<(), StoreError> {
        if self.failures.lock().protocols.contains(&row.id) {
            return Err(StoreError::Rejected(format!("protocol {}", row.id)));
        }
        self.tables.lock().protocols.insert(row.id.clone(), row.clone());
        Ok(())
    }

    async fn insert_tvl_history(&self, row: &TvlHistoryRow) -> Result<(), StoreError> {
        if self.failures.lock().history.contains(&row.protocol_id) {
            return Err(StoreError::Rejected(format!("history for {}", row.protocol_id)));
        }
        self.tables.lock().history.push(row.clone());
        Ok(())
    }

    async fn upsert_chain_metric(&self, metric: &ChainMetric) -> Result<(), StoreError> {
        if self.failures.lock().chains.contains(&metric.chain_name) {
            return Err(StoreError::Rejected(format!("chain {}", metric.chain_name)));
        }
        self.tables
            .lock()
            .chain_metrics
            .insert(metric.chain_name.clone(), metric.clone());
        Ok(())
    }

    async fn upsert_volumes(&self, rows: &[ProtocolVolume]) -> Result<usize, StoreError> {
        if self.failures.lock().volumes {
            return Err(StoreError::Rejected("protocol volumes".to_string()));
        }
        let mut tables = self.tables.lock();
        for row in rows {
            tables.volumes.insert(row.protocol_name.clone(), row.clone());
        }
        Ok(rows.len())
    }

    async fn protocol_names(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .tables
            .lock()
            .protocols
            .values()
            .map(|row| row.name.clone())
            .collect())
    }

    async fn load_protocols(&self) -> Result<Vec<ProtocolSnapshot>, StoreError> {
        let mut snapshots: Vec<ProtocolSnapshot> = self
            .tables
            .lock()
            .protocols
            .values()
            .map(ProtocolRow::snapshot)
            .collect();
        snapshots.sort_by(|a, b| b.tvl.total_cmp(&a.tvl));
        Ok(snapshots)
    }

    async fn load_chain_metrics(&self) -> Result<Vec<ChainMetric>, StoreError> {
        let mut metrics: Vec<ChainMetric> =
            self.tables.lock().chain_metrics.values().cloned().collect();
        metrics.sort_by(|a, b| b.tvl.total_cmp(&a.tvl));
        Ok(metrics)
    }
}
