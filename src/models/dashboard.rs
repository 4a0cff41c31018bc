use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDistribution {
    pub category: String,
    pub protocol_count: usize,
    pub total_tvl: f64,
    pub avg_tvl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TvlDistribution {
    pub tvl_range: String,
    pub protocol_count: usize,
    pub total_tvl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub risk_level: String,
    pub protocol_count: usize,
    pub total_tvl: f64,
    pub avg_tvl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDiversity {
    pub name: String,
    pub tvl: f64,
    pub chain_count: usize,
    pub risk_level: String,
}

/// All four dashboard views computed from one read of the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub category_data: Vec<CategoryDistribution>,
    pub tvl_distribution_data: Vec<TvlDistribution>,
    pub risk_distribution_data: Vec<RiskDistribution>,
    pub chain_diversity_data: Vec<ChainDiversity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardParams {
    pub top_chains: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainDiversityParams {
    pub top: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
