//! Read-side aggregations over persisted protocols and chain metrics
//!
//! All functions fold over borrowed inputs and return fresh values; nothing
//! here touches the store.

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::models::chain::ChainMetric;
use crate::models::dashboard::{
    CategoryDistribution, ChainDiversity, RiskDistribution, TvlDistribution,
};
use crate::models::health::RiskLevel;
use crate::models::protocol::{DEFAULT_CATEGORY, ProtocolSnapshot};

/// Risk level assumed for protocols or chains that carry none
pub const DEFAULT_RISK_LEVEL: RiskLevel = RiskLevel::Medium;

/// Labelled half-open TVL interval `[min, max)`
#[derive(Debug, Clone, PartialEq)]
pub struct TvlRange {
    pub label: String,
    pub min: f64,
    pub max: f64,
}

impl TvlRange {
    pub fn new(label: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            label: label.into(),
            min,
            max,
        }
    }

    fn contains(&self, tvl: f64) -> bool {
        tvl >= self.min && tvl < self.max
    }
}

/// Ordered set of ranges that partitions `[0, inf)` with no gaps or overlaps
#[derive(Debug, Clone, PartialEq)]
pub struct TvlRanges {
    ranges: Vec<TvlRange>,
    unbounded: usize,
}

impl TvlRanges {
    /// Validate a configured partition. Output keeps the configured order.
    pub fn new(ranges: Vec<TvlRange>) -> Result<Self, ConfigError> {
        if ranges.is_empty() {
            return Err(ConfigError::TvlRanges("no ranges configured".to_string()));
        }

        let mut sorted: Vec<&TvlRange> = ranges.iter().collect();
        sorted.sort_by(|a, b| a.min.total_cmp(&b.min));

        for range in &sorted {
            if !range.min.is_finite() || range.max.is_nan() || range.min >= range.max {
                return Err(ConfigError::TvlRanges(format!(
                    "range {:?} must satisfy finite min < max",
                    range.label
                )));
            }
        }
        if sorted[0].min != 0.0 {
            return Err(ConfigError::TvlRanges(format!(
                "lowest range {:?} must start at 0",
                sorted[0].label
            )));
        }
        for pair in sorted.windows(2) {
            if pair[0].max != pair[1].min {
                return Err(ConfigError::TvlRanges(format!(
                    "ranges {:?} and {:?} leave a gap or overlap",
                    pair[0].label, pair[1].label
                )));
            }
        }
        let last = sorted[sorted.len() - 1];
        if last.max != f64::INFINITY {
            return Err(ConfigError::TvlRanges(format!(
                "highest range {:?} must be unbounded",
                last.label
            )));
        }

        let unbounded = ranges
            .iter()
            .position(|r| r.max == f64::INFINITY)
            .unwrap_or(ranges.len() - 1);

        Ok(Self { ranges, unbounded })
    }

    pub fn ranges(&self) -> &[TvlRange] {
        &self.ranges
    }

    /// Index of the bucket holding `tvl`. Negative values count as 0.
    pub fn bucket_for(&self, tvl: f64) -> usize {
        let tvl = if tvl.is_nan() { 0.0 } else { tvl.max(0.0) };
        self.ranges
            .iter()
            .position(|r| r.contains(tvl))
            .unwrap_or(self.unbounded)
    }
}

impl Default for TvlRanges {
    fn default() -> Self {
        Self {
            ranges: vec![
                TvlRange::new("Above $1B", 1e9, f64::INFINITY),
                TvlRange::new("$100M-$1B", 1e8, 1e9),
                TvlRange::new("$10M-$100M", 1e7, 1e8),
                TvlRange::new("Below $10M", 0.0, 1e7),
            ],
            unbounded: 0,
        }
    }
}

#[derive(Default)]
struct Tally {
    count: usize,
    total: f64,
}

impl Tally {
    fn add(mut self, tvl: f64) -> Self {
        self.count += 1;
        self.total += tvl;
        self
    }

    fn avg(&self) -> f64 {
        self.total / self.count as f64
    }
}

fn group_by<K: Ord>(
    protocols: &[ProtocolSnapshot],
    key: impl Fn(&ProtocolSnapshot) -> K,
) -> BTreeMap<K, Tally> {
    protocols.iter().fold(BTreeMap::new(), |mut groups, p| {
        let k = key(p);
        let tally = groups.remove(&k).unwrap_or_default().add(p.tvl);
        groups.insert(k, tally);
        groups
    })
}

/// Per-category counts and TVL, categories in name order
pub fn aggregate_by_category(protocols: &[ProtocolSnapshot]) -> Vec<CategoryDistribution> {
    group_by(protocols, |p| {
        p.category
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())
    })
    .into_iter()
    .map(|(category, tally)| CategoryDistribution {
        category,
        protocol_count: tally.count,
        total_tvl: tally.total,
        avg_tvl: tally.avg(),
    })
    .collect()
}

/// One entry per configured range, in configured order, empty buckets included
pub fn aggregate_by_tvl_range(
    protocols: &[ProtocolSnapshot],
    ranges: &TvlRanges,
) -> Vec<TvlDistribution> {
    let buckets = protocols.iter().fold(
        ranges.ranges().iter().map(|_| (0usize, 0.0f64)).collect::<Vec<_>>(),
        |mut buckets, p| {
            let bucket = &mut buckets[ranges.bucket_for(p.tvl)];
            bucket.0 += 1;
            bucket.1 += p.tvl;
            buckets
        },
    );

    ranges
        .ranges()
        .iter()
        .zip(buckets)
        .map(|(range, (protocol_count, total_tvl))| TvlDistribution {
            tvl_range: range.label.clone(),
            protocol_count,
            total_tvl,
        })
        .collect()
}

/// Per-risk-level counts and TVL, ordered Low, Medium, High
pub fn aggregate_by_risk(protocols: &[ProtocolSnapshot]) -> Vec<RiskDistribution> {
    group_by(protocols, |p| p.risk_level.unwrap_or(DEFAULT_RISK_LEVEL))
        .into_iter()
        .map(|(level, tally)| RiskDistribution {
            risk_level: level.to_string(),
            protocol_count: tally.count,
            total_tvl: tally.total,
            avg_tvl: tally.avg(),
        })
        .collect()
}

/// Top `top_n` chains by TVL
pub fn aggregate_chain_diversity(chains: &[ChainMetric], top_n: usize) -> Vec<ChainDiversity> {
    let mut ranked: Vec<&ChainMetric> = chains.iter().collect();
    ranked.sort_by(|a, b| b.tvl.total_cmp(&a.tvl));

    ranked
        .into_iter()
        .take(top_n)
        .map(|chain| ChainDiversity {
            name: chain.chain_name.clone(),
            tvl: chain.tvl,
            chain_count: chain.protocol_count,
            risk_level: chain
                .metrics
                .stability
                .clone()
                .unwrap_or_else(|| DEFAULT_RISK_LEVEL.to_string()),
        })
        .collect()
}
