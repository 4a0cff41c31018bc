#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use defi_risk_backend::error::{FetchError, StoreError};
use defi_risk_backend::models::chain::ChainMetric;
use defi_risk_backend::models::protocol::{DecodedProtocols, ProtocolSnapshot, decode_protocols};
use defi_risk_backend::models::volume::{ProtocolVolume, VolumeRecord};
use defi_risk_backend::services::memory_store::MemoryStore;
use defi_risk_backend::services::defillama::ProtocolSource;
use defi_risk_backend::services::protocol_ingestor::{IngestorSettings, ProtocolIngestor};
use defi_risk_backend::services::protocol_store::{ProtocolRow, ProtocolStore, TvlHistoryRow};

/// Canned upstream payloads; either endpoint can be made to fail or stall
#[derive(Default)]
pub struct StubSource {
    protocols: Mutex<Vec<Value>>,
    volumes: Mutex<Vec<VolumeRecord>>,
    fail_protocols: Mutex<bool>,
    fail_volumes: Mutex<bool>,
    protocol_delay: Mutex<Option<Duration>>,
}

impl StubSource {
    pub fn new(protocols: Vec<Value>) -> Self {
        let source = Self::default();
        *source.protocols.lock() = protocols;
        source
    }

    pub fn with_volumes(self, volumes: &[(&str, f64)]) -> Self {
        *self.volumes.lock() = volumes
            .iter()
            .map(|(name, volume)| VolumeRecord {
                name: name.to_string(),
                volume_24h: *volume,
            })
            .collect();
        self
    }

    pub fn set_protocols(&self, protocols: Vec<Value>) {
        *self.protocols.lock() = protocols;
    }

    pub fn fail_protocols(&self) {
        *self.fail_protocols.lock() = true;
    }

    pub fn fail_volumes(&self) {
        *self.fail_volumes.lock() = true;
    }

    pub fn delay_protocols(&self, delay: Duration) {
        *self.protocol_delay.lock() = Some(delay);
    }
}

fn upstream_error(endpoint: &str) -> FetchError {
    FetchError::Status {
        endpoint: endpoint.to_string(),
        status: 503,
        body: "service unavailable".to_string(),
    }
}

#[async_trait]
impl ProtocolSource for StubSource {
    async fn fetch_protocols(&self) -> Result<DecodedProtocols, FetchError> {
        let delay = *self.protocol_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_protocols.lock() {
            return Err(upstream_error("/protocols"));
        }
        let records = self.protocols.lock().clone();
        Ok(decode_protocols(records))
    }

    async fn fetch_dex_volumes(&self) -> Result<Vec<VolumeRecord>, FetchError> {
        if *self.fail_volumes.lock() {
            return Err(upstream_error("/overview/dexs"));
        }
        Ok(self.volumes.lock().clone())
    }
}

/// `MemoryStore` whose protocol upserts stall for selected ids
pub struct SlowStore {
    pub inner: Arc<MemoryStore>,
    slow_ids: HashSet<String>,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: Arc<MemoryStore>, slow_ids: &[&str], delay: Duration) -> Self {
        Self {
            inner,
            slow_ids: slow_ids.iter().map(|id| id.to_string()).collect(),
            delay,
        }
    }
}

#[async_trait]
impl ProtocolStore for SlowStore {
    async fn upsert_protocol(&self, row: &ProtocolRow) -> Result<(), StoreError> {
        if self.slow_ids.contains(&row.id) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.upsert_protocol(row).await
    }

    async fn insert_tvl_history(&self, row: &TvlHistoryRow) -> Result<(), StoreError> {
        self.inner.insert_tvl_history(row).await
    }

    async fn upsert_chain_metric(&self, metric: &ChainMetric) -> Result<(), StoreError> {
        self.inner.upsert_chain_metric(metric).await
    }

    async fn upsert_volumes(&self, rows: &[ProtocolVolume]) -> Result<usize, StoreError> {
        self.inner.upsert_volumes(rows).await
    }

    async fn protocol_names(&self) -> Result<HashSet<String>, StoreError> {
        self.inner.protocol_names().await
    }

    async fn load_protocols(&self) -> Result<Vec<ProtocolSnapshot>, StoreError> {
        self.inner.load_protocols().await
    }

    async fn load_chain_metrics(&self) -> Result<Vec<ChainMetric>, StoreError> {
        self.inner.load_chain_metrics().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    ProtocolUpsert(String),
    ChainUpsert(String),
}

/// `MemoryStore` that logs write order and tracks concurrent protocol upserts.
/// Each protocol upsert holds its slot for `hold` so overlapping writes overlap.
pub struct RecordingStore {
    pub inner: Arc<MemoryStore>,
    hold: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    events: Mutex<Vec<StoreEvent>>,
}

impl RecordingStore {
    pub fn new(hold: Duration) -> Self {
        Self {
            inner: Arc::new(MemoryStore::new()),
            hold,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl ProtocolStore for RecordingStore {
    async fn upsert_protocol(&self, row: &ProtocolRow) -> Result<(), StoreError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.events.lock().push(StoreEvent::ProtocolUpsert(row.id.clone()));

        tokio::time::sleep(self.hold).await;
        let result = self.inner.upsert_protocol(row).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn insert_tvl_history(&self, row: &TvlHistoryRow) -> Result<(), StoreError> {
        self.inner.insert_tvl_history(row).await
    }

    async fn upsert_chain_metric(&self, metric: &ChainMetric) -> Result<(), StoreError> {
        self.events
            .lock()
            .push(StoreEvent::ChainUpsert(metric.chain_name.clone()));
        self.inner.upsert_chain_metric(metric).await
    }

    async fn upsert_volumes(&self, rows: &[ProtocolVolume]) -> Result<usize, StoreError> {
        self.inner.upsert_volumes(rows).await
    }

    async fn protocol_names(&self) -> Result<HashSet<String>, StoreError> {
        self.inner.protocol_names().await
    }

    async fn load_protocols(&self) -> Result<Vec<ProtocolSnapshot>, StoreError> {
        self.inner.load_protocols().await
    }

    async fn load_chain_metrics(&self) -> Result<Vec<ChainMetric>, StoreError> {
        self.inner.load_chain_metrics().await
    }
}

/// `count` protocols, each on its own chain `chain-<i>`
pub fn single_chain_protocols(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let chain = format!("chain-{}", i);
            protocol_json(&format!("p{}", i), &format!("Protocol {}", i), 10.0, &[(chain.as_str(), 10.0)])
        })
        .collect()
}

pub fn protocol_json(id: &str, name: &str, tvl: f64, chains: &[(&str, f64)]) -> Value {
    let chain_tvls: serde_json::Map<String, Value> = chains
        .iter()
        .map(|(chain, tvl)| (chain.to_string(), json!(tvl)))
        .collect();

    json!({
        "id": id,
        "name": name,
        "tvl": tvl,
        "category": "Dexes",
        "chains": chains.iter().map(|(chain, _)| *chain).collect::<Vec<_>>(),
        "chainTvls": chain_tvls,
        "change_1h": 0.5,
        "change_1d": 1.0,
        "change_7d": 2.0,
    })
}

/// Three protocols over two chains, total TVL 1000
pub fn sample_protocols() -> Vec<Value> {
    vec![
        protocol_json("1", "Aave", 600.0, &[("Ethereum", 400.0), ("Arbitrum", 200.0)]),
        protocol_json("2", "Uniswap", 300.0, &[("Ethereum", 300.0)]),
        protocol_json("3", "Curve", 100.0, &[("Arbitrum", 100.0)]),
    ]
}

pub fn ingestor(
    source: Arc<StubSource>,
    store: Arc<dyn ProtocolStore>,
    settings: IngestorSettings,
) -> ProtocolIngestor {
    ProtocolIngestor::new(source, store, settings)
}

pub fn settings(batch_size: usize) -> IngestorSettings {
    IngestorSettings {
        batch_size,
        ..IngestorSettings::default()
    }
}
