//! Matches DeFiLlama dex volumes against persisted protocol names
//!
//! Names must match exactly (no case folding, no fuzzy matching). Records that
//! do not match or have no positive volume are dropped, not zero-filled.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::IngestError;
use crate::models::volume::{ProtocolVolume, VolumeRecord};
use crate::services::defillama::ProtocolSource;
use crate::services::protocol_store::ProtocolStore;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub written: usize,
}

/// Keep positive volumes for known protocol names. A name repeated upstream
/// keeps its last value.
pub fn filter_volumes(
    records: Vec<VolumeRecord>,
    known_names: &HashSet<String>,
    now: DateTime<Utc>,
) -> Vec<ProtocolVolume> {
    records
        .into_iter()
        .filter(|record| {
            let keep = record.volume_24h > 0.0 && known_names.contains(&record.name);
            if !keep {
                tracing::trace!(name = %record.name, volume = record.volume_24h, "Dropping volume record");
            }
            keep
        })
        .fold(BTreeMap::new(), |mut rows, record| {
            rows.insert(record.name, record.volume_24h);
            rows
        })
        .into_iter()
        .map(|(protocol_name, volume_24h)| ProtocolVolume {
            protocol_name,
            volume_24h,
            updated_at: now,
        })
        .collect()
}

#[derive(Clone)]
pub struct VolumeReconciler {
    source: Arc<dyn ProtocolSource>,
    store: Arc<dyn ProtocolStore>,
}

impl VolumeReconciler {
    pub fn new(source: Arc<dyn ProtocolSource>, store: Arc<dyn ProtocolStore>) -> Self {
        Self { source, store }
    }

    pub async fn reconcile(&self) -> Result<ReconcileReport, IngestError> {
        let records = self
            .source
            .fetch_dex_volumes()
            .await
            .map_err(IngestError::VolumeFetch)?;
        let fetched = records.len();

        let known_names = self
            .store
            .protocol_names()
            .await
            .map_err(IngestError::Reconcile)?;

        let rows = filter_volumes(records, &known_names, Utc::now());
        let written = self
            .store
            .upsert_volumes(&rows)
            .await
            .map_err(IngestError::Reconcile)?;

        tracing::info!(
            fetched,
            matched = rows.len(),
            written,
            "Volume reconciliation complete"
        );

        Ok(ReconcileReport { written })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, volume: f64) -> VolumeRecord {
        VolumeRecord {
            name: name.to_string(),
            volume_24h: volume,
        }
    }

    fn names(list: &[&str]) -> HashSet<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_filter_keeps_only_positive_known_volumes() {
        let rows = filter_volumes(
            vec![record("Aave", 100.0), record("Ghost", 50.0), record("Uniswap", 0.0)],
            &names(&["Aave", "Uniswap"]),
            Utc::now(),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].protocol_name, "Aave");
        assert_eq!(rows[0].volume_24h, 100.0);
    }

    #[test]
    fn test_filter_is_case_sensitive() {
        let rows = filter_volumes(
            vec![record("aave", 100.0), record("AAVE", 10.0)],
            &names(&["Aave"]),
            Utc::now(),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn test_duplicate_names_keep_last_value() {
        let rows = filter_volumes(
            vec![record("Curve", 5.0), record("Curve", 7.0), record("Curve", -1.0)],
            &names(&["Curve"]),
            Utc::now(),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].volume_24h, 7.0);
    }
}
