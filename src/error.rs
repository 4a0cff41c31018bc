//! Error taxonomy for the ingestion pipeline
//!
//! Fatal errors abort a run (`IngestError`), write errors are caught per item
//! (`WriteError`), and decode errors drop a single upstream record.

use std::time::Duration;

/// Failure talking to the DeFiLlama API
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("DeFiLlama API error {status} on {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("unexpected payload from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// A single upstream protocol record that could not be turned into a `Protocol`
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("record {index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("record {index}: malformed protocol: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure inside the persistence layer
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Recoverable failure while writing one protocol
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("protocol upsert failed: {0}")]
    ProtocolUpsert(#[source] StoreError),

    #[error("tvl history insert failed: {0}")]
    HistoryInsert(#[source] StoreError),

    #[error("chain metrics upsert failed: {0}")]
    ChainUpsert(#[source] StoreError),

    #[error("write timed out after {0:?}")]
    Timeout(Duration),
}

/// Fatal failure that aborts an ingestion run
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to fetch protocols: {0}")]
    ProtocolFetch(#[source] FetchError),

    #[error("failed to fetch dex volumes: {0}")]
    VolumeFetch(#[source] FetchError),

    #[error("volume reconciliation failed: {0}")]
    Reconcile(#[source] StoreError),

    #[error("run exceeded its {0:?} time limit")]
    Timeout(Duration),
}

impl IngestError {
    /// Stable machine-readable kind, reported in `ErrorInfo`
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::ProtocolFetch(_) | IngestError::VolumeFetch(_) => "fetch",
            IngestError::Reconcile(_) => "store",
            IngestError::Timeout(_) => "timeout",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid TVL ranges: {0}")]
    TvlRanges(String),
}
