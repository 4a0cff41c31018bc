//! Drives one ingestion run end to end
//!
//! Fetch the protocol list once, write it in fixed-size batches (protocols
//! within a batch concurrently, batches strictly one after another), refresh
//! chain metrics per batch, then reconcile dex volumes once.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{DominanceScope, IngestConfig};
use crate::error::{IngestError, WriteError};
use crate::models::protocol::Protocol;
use crate::models::run::{
    ChainFailure, ErrorInfo, ProtocolFailure, ProtocolOutcome, RunPhase, RunResult,
};
use crate::services::chain_metrics::{ChainMetricsUpdater, ChainUpdateReport, total_tvl};
use crate::services::defillama::ProtocolSource;
use crate::services::protocol_store::{ProtocolRow, ProtocolStore, TvlHistoryRow};
use crate::services::risk_classifier::compute_health_metrics;
use crate::services::volume_reconciler::VolumeReconciler;

#[derive(Debug, Clone)]
pub struct IngestorSettings {
    /// Protocols written concurrently; also the size of each chain-metrics batch
    pub batch_size: usize,
    /// Budget for one protocol's upsert + history insert
    pub write_timeout: Duration,
    pub dominance_scope: DominanceScope,
}

impl Default for IngestorSettings {
    fn default() -> Self {
        IngestorSettings::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for IngestorSettings {
    fn from(config: &IngestConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            write_timeout: config.write_timeout,
            dominance_scope: config.dominance_scope,
        }
    }
}

struct BatchReport {
    outcomes: Vec<ProtocolOutcome>,
    chains: ChainUpdateReport,
}

#[derive(Default)]
struct RunTally {
    processed: usize,
    skipped: usize,
    failures: Vec<ProtocolFailure>,
    chains_updated: usize,
    chain_failures: Vec<ChainFailure>,
    volumes_written: usize,
}

impl RunTally {
    fn absorb(&mut self, report: BatchReport) {
        for outcome in report.outcomes {
            match outcome.result {
                Ok(()) => self.processed += 1,
                Err(e) => self.failures.push(ProtocolFailure {
                    protocol_id: outcome.protocol_id,
                    name: outcome.name,
                    reason: e.to_string(),
                }),
            }
        }
        self.chains_updated += report.chains.updated;
        self.chain_failures.extend(report.chains.failed);
    }
}

type Deadline = (Instant, Duration);

/// Await `fut`, failing the run if the overall deadline passes first
async fn within<F: Future>(deadline: Option<Deadline>, fut: F) -> Result<F::Output, IngestError> {
    match deadline {
        None => Ok(fut.await),
        Some((at, limit)) => tokio::time::timeout_at(at, fut)
            .await
            .map_err(|_| IngestError::Timeout(limit)),
    }
}

fn transition(phase: &mut RunPhase, next: RunPhase) {
    tracing::debug!(from = %phase, to = %next, "Run phase change");
    *phase = next;
}

pub struct ProtocolIngestor {
    source: Arc<dyn ProtocolSource>,
    store: Arc<dyn ProtocolStore>,
    chain_updater: ChainMetricsUpdater,
    reconciler: VolumeReconciler,
    settings: IngestorSettings,
}

impl ProtocolIngestor {
    pub fn new(
        source: Arc<dyn ProtocolSource>,
        store: Arc<dyn ProtocolStore>,
        settings: IngestorSettings,
    ) -> Self {
        Self {
            chain_updater: ChainMetricsUpdater::new(store.clone()),
            reconciler: VolumeReconciler::new(source.clone(), store.clone()),
            source,
            store,
            settings,
        }
    }

    /// Run the pipeline to completion or fatal failure
    pub async fn run(&self) -> RunResult {
        self.run_until(None).await
    }

    /// Same as `run`, but the whole run fails once `limit` elapses.
    /// Writes already issued are not rolled back.
    pub async fn run_with_timeout(&self, limit: Duration) -> RunResult {
        self.run_until(Some(limit)).await
    }

    async fn run_until(&self, limit: Option<Duration>) -> RunResult {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("ingestion_run", run_id = %run_id);

        async move {
            let started_at = Utc::now();
            let deadline = limit.map(|limit| (Instant::now() + limit, limit));
            let mut tally = RunTally::default();
            let mut phase = RunPhase::Fetching;

            tracing::info!(
                batch_size = self.settings.batch_size,
                dominance = ?self.settings.dominance_scope,
                "Starting protocol ingestion run"
            );

            let outcome = self.execute(deadline, &mut tally, &mut phase).await;

            let error = match outcome {
                Ok(()) => {
                    tracing::info!(
                        processed = tally.processed,
                        failed = tally.failures.len(),
                        skipped = tally.skipped,
                        chains = tally.chains_updated,
                        volumes = tally.volumes_written,
                        "Protocol ingestion run complete"
                    );
                    None
                }
                Err(e) => {
                    tracing::error!(
                        phase = %phase,
                        error = %e,
                        processed = tally.processed,
                        failed = tally.failures.len(),
                        "Protocol ingestion run failed"
                    );
                    let info = ErrorInfo::from_error(&e, phase);
                    transition(&mut phase, RunPhase::Failed);
                    Some(info)
                }
            };

            RunResult {
                run_id,
                success: error.is_none(),
                protocols_processed: tally.processed,
                protocols_failed: tally.failures.len(),
                protocols_skipped: tally.skipped,
                chains_updated: tally.chains_updated,
                chains_failed: tally.chain_failures.len(),
                volumes_written: tally.volumes_written,
                failures: tally.failures,
                chain_failures: tally.chain_failures,
                error,
                started_at,
                finished_at: Utc::now(),
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        deadline: Option<Deadline>,
        tally: &mut RunTally,
        phase: &mut RunPhase,
    ) -> Result<(), IngestError> {
        let decoded = within(deadline, self.source.fetch_protocols())
            .await?
            .map_err(IngestError::ProtocolFetch)?;
        tally.skipped = decoded.rejected.len();
        let protocols = decoded.protocols;

        let reference_tvl = match self.settings.dominance_scope {
            DominanceScope::Global => Some(total_tvl(&protocols)),
            DominanceScope::Batch => None,
        };

        let batches: Vec<&[Protocol]> = protocols.chunks(self.settings.batch_size).collect();
        let total = batches.len();
        tracing::info!(
            protocols = protocols.len(),
            batches = total,
            "Processing protocols in batches"
        );

        for (i, batch) in batches.into_iter().enumerate() {
            transition(phase, RunPhase::BatchProcessing { index: i + 1, total });

            let report = within(deadline, self.process_batch(batch, reference_tvl)).await?;
            let failed = report.outcomes.iter().filter(|o| o.result.is_err()).count();
            tracing::info!(
                batch = i + 1,
                total,
                written = batch.len() - failed,
                failed,
                chains = report.chains.updated,
                "Batch complete"
            );
            tally.absorb(report);
        }

        transition(phase, RunPhase::VolumeReconciling);
        let reconciled = within(deadline, self.reconciler.reconcile()).await??;
        tally.volumes_written = reconciled.written;

        transition(phase, RunPhase::Done);
        Ok(())
    }

    async fn process_batch(&self, batch: &[Protocol], reference_tvl: Option<f64>) -> BatchReport {
        let outcomes = join_all(batch.iter().map(|p| self.process_protocol(p))).await;
        // Runs only once every protocol write above has settled
        let chains = self.chain_updater.update(batch, reference_tvl).await;

        BatchReport { outcomes, chains }
    }

    async fn process_protocol(&self, protocol: &Protocol) -> ProtocolOutcome {
        let limit = self.settings.write_timeout;
        let result = tokio::time::timeout(limit, self.write_protocol(protocol))
            .await
            .unwrap_or(Err(WriteError::Timeout(limit)));

        if let Err(e) = &result {
            tracing::warn!(
                protocol_id = %protocol.id,
                protocol = %protocol.name,
                error = %e,
                "Failed to process protocol"
            );
        }

        ProtocolOutcome {
            protocol_id: protocol.id.clone(),
            name: protocol.name.clone(),
            result,
        }
    }

    async fn write_protocol(&self, protocol: &Protocol) -> Result<(), WriteError> {
        let now = Utc::now();
        let health = compute_health_metrics(protocol, now);
        let row = ProtocolRow::new(protocol, health, now);

        self.store
            .upsert_protocol(&row)
            .await
            .map_err(WriteError::ProtocolUpsert)?;

        self.store
            .insert_tvl_history(&TvlHistoryRow {
                protocol_id: protocol.id.clone(),
                tvl: protocol.tvl,
                timestamp: now,
            })
            .await
            .map_err(WriteError::HistoryInsert)?;

        Ok(())
    }
}
