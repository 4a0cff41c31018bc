//! Outcome types for a single ingestion run
//!
//! A run moves Fetching -> BatchProcessing(1..n) -> VolumeReconciling -> Done,
//! and may enter Failed from any of those phases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, WriteError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunPhase {
    Fetching,
    BatchProcessing { index: usize, total: usize },
    VolumeReconciling,
    Done,
    Failed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Fetching => write!(f, "fetching"),
            RunPhase::BatchProcessing { index, total } => {
                write!(f, "batch_processing({}/{})", index, total)
            }
            RunPhase::VolumeReconciling => write!(f, "volume_reconciling"),
            RunPhase::Done => write!(f, "done"),
            RunPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Typed per-protocol result accumulated by the ingestor
#[derive(Debug)]
pub struct ProtocolOutcome {
    pub protocol_id: String,
    pub name: String,
    pub result: Result<(), WriteError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolFailure {
    pub protocol_id: String,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainFailure {
    pub chain_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: String,
    pub message: String,
    pub phase: RunPhase,
}

impl ErrorInfo {
    pub fn from_error(error: &IngestError, phase: RunPhase) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
            phase,
        }
    }
}

/// What the triggering surface sees after `ProtocolIngestor::run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: String,
    pub success: bool,
    pub protocols_processed: usize,
    pub protocols_failed: usize,
    /// Upstream records dropped at decode time
    pub protocols_skipped: usize,
    pub chains_updated: usize,
    pub chains_failed: usize,
    pub volumes_written: usize,
    pub failures: Vec<ProtocolFailure>,
    pub chain_failures: Vec<ChainFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}
