use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-chain aggregate, recomputed from a set of protocols and upserted by `chain_name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainMetric {
    pub chain_name: String,
    pub tvl: f64,
    pub protocol_count: usize,
    pub metrics: ChainMetricsDetail,
    pub last_updated: DateTime<Utc>,
}

/// Contents of the `chain_metrics.metrics` document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChainMetricsDetail {
    /// Chain TVL as a percentage of the reference total
    #[serde(default)]
    pub dominance: f64,
    #[serde(default)]
    pub protocol_distribution: usize,
    /// Optional stability indicator; dashboards fall back to "Medium" without it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability: Option<String>,
}
