//! Pure risk classification for a single protocol
//!
//! Every function here is deterministic: identical inputs (and `now`) give an
//! identical `HealthMetrics`, which keeps repeated upserts idempotent.

use chrono::{DateTime, Utc};

use crate::models::health::{
    HealthMetrics, RiskFactors, RiskLevel, RiskTier, Stability, StabilityScore, TvlChanges,
};
use crate::models::protocol::Protocol;

/// TVL above this is low risk
pub const LOW_RISK_TVL: f64 = 1_000_000_000.0;
/// TVL above this (and not above `LOW_RISK_TVL`) is medium risk
pub const MEDIUM_RISK_TVL: f64 = 100_000_000.0;

/// Absolute percentage-point change at or above which a horizon is volatile
pub const HOURLY_VOLATILITY_THRESHOLD: f64 = 5.0;
pub const DAILY_VOLATILITY_THRESHOLD: f64 = 20.0;
pub const WEEKLY_VOLATILITY_THRESHOLD: f64 = 40.0;

pub fn classify_tvl_risk(tvl: f64) -> RiskTier {
    if tvl > LOW_RISK_TVL {
        RiskTier::Low
    } else if tvl > MEDIUM_RISK_TVL {
        RiskTier::Medium
    } else {
        RiskTier::High
    }
}

pub fn classify_chain_diversification(chain_count: usize) -> RiskTier {
    if chain_count > 5 {
        RiskTier::High
    } else if chain_count > 2 {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

fn stability(change: f64, threshold: f64) -> Stability {
    if change.abs() < threshold {
        Stability::Stable
    } else {
        Stability::Volatile
    }
}

pub fn classify_stability(changes: &TvlChanges) -> StabilityScore {
    StabilityScore {
        short_term: stability(changes.hour, HOURLY_VOLATILITY_THRESHOLD),
        medium_term: stability(changes.day, DAILY_VOLATILITY_THRESHOLD),
        long_term: stability(changes.week, WEEKLY_VOLATILITY_THRESHOLD),
    }
}

/// Sum of tier points: <= 3 Low, 4 Medium, otherwise High.
/// Stability does not contribute.
pub fn determine_risk_level(tvl_risk: RiskTier, chain_diversification: RiskTier) -> RiskLevel {
    match tvl_risk.points() + chain_diversification.points() {
        0..=3 => RiskLevel::Low,
        4 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

pub fn compute_health_metrics(protocol: &Protocol, now: DateTime<Utc>) -> HealthMetrics {
    let tvl_changes = protocol.tvl_changes();
    let risk_factors = RiskFactors {
        tvl_risk: classify_tvl_risk(protocol.tvl),
        chain_diversification: classify_chain_diversification(protocol.chains.len()),
        stability_score: classify_stability(&tvl_changes),
    };

    HealthMetrics {
        risk_level: determine_risk_level(
            risk_factors.tvl_risk,
            risk_factors.chain_diversification,
        ),
        risk_factors,
        tvl_changes,
        last_calculated: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::protocol::RawProtocol;
    use chrono::TimeZone;

    fn protocol(tvl: f64, chains: usize) -> Protocol {
        RawProtocol {
            id: Some("p".to_string()),
            name: Some("P".to_string()),
            tvl: Some(tvl),
            chains: Some((0..chains).map(|i| format!("chain-{}", i)).collect()),
            ..Default::default()
        }
        .validate(0)
        .unwrap()
    }

    #[test]
    fn test_tvl_risk_boundaries_are_strict() {
        assert_eq!(classify_tvl_risk(1_000_000_000.0), RiskTier::Medium);
        assert_eq!(classify_tvl_risk(1_000_000_001.0), RiskTier::Low);
        assert_eq!(classify_tvl_risk(100_000_000.0), RiskTier::High);
        assert_eq!(classify_tvl_risk(100_000_001.0), RiskTier::Medium);
        assert_eq!(classify_tvl_risk(0.0), RiskTier::High);
    }

    #[test]
    fn test_chain_diversification_boundaries() {
        assert_eq!(classify_chain_diversification(0), RiskTier::Low);
        assert_eq!(classify_chain_diversification(2), RiskTier::Low);
        assert_eq!(classify_chain_diversification(3), RiskTier::Medium);
        assert_eq!(classify_chain_diversification(5), RiskTier::Medium);
        assert_eq!(classify_chain_diversification(6), RiskTier::High);
    }

    #[test]
    fn test_stability_thresholds() {
        let calm = classify_stability(&TvlChanges { hour: -4.99, day: 19.9, week: -39.0 });
        assert_eq!(calm.short_term, Stability::Stable);
        assert_eq!(calm.medium_term, Stability::Stable);
        assert_eq!(calm.long_term, Stability::Stable);

        let wild = classify_stability(&TvlChanges { hour: -5.0, day: 20.0, week: 40.0 });
        assert_eq!(wild.short_term, Stability::Volatile);
        assert_eq!(wild.medium_term, Stability::Volatile);
        assert_eq!(wild.long_term, Stability::Volatile);

        let missing = classify_stability(&TvlChanges::default());
        assert_eq!(missing.short_term, Stability::Stable);
    }

    #[test]
    fn test_risk_level_scenarios() {
        assert_eq!(determine_risk_level(RiskTier::High, RiskTier::Low), RiskLevel::Medium);
        assert_eq!(determine_risk_level(RiskTier::Low, RiskTier::Low), RiskLevel::Low);
        assert_eq!(determine_risk_level(RiskTier::High, RiskTier::High), RiskLevel::High);
        assert_eq!(determine_risk_level(RiskTier::Low, RiskTier::Medium), RiskLevel::Low);
        assert_eq!(determine_risk_level(RiskTier::Medium, RiskTier::Medium), RiskLevel::Medium);
        assert_eq!(determine_risk_level(RiskTier::Medium, RiskTier::High), RiskLevel::High);
    }

    #[test]
    fn test_stability_does_not_affect_risk_level() {
        let now = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        let mut calm = protocol(2e9, 1);
        let mut volatile = calm.clone();
        calm.change_1d = Some(1.0);
        volatile.change_1h = Some(50.0);
        volatile.change_1d = Some(-80.0);
        volatile.change_7d = Some(90.0);

        assert_eq!(
            compute_health_metrics(&calm, now).risk_level,
            compute_health_metrics(&volatile, now).risk_level
        );
    }

    #[test]
    fn test_health_metrics_are_deterministic() {
        let now = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        let mut p = protocol(350_000_000.0, 4);
        p.change_1h = Some(-6.2);
        p.change_7d = Some(12.0);

        let first = serde_json::to_vec(&compute_health_metrics(&p, now)).unwrap();
        let second = serde_json::to_vec(&compute_health_metrics(&p, now)).unwrap();
        assert_eq!(first, second);

        let metrics = compute_health_metrics(&p, now);
        assert_eq!(metrics.risk_factors.tvl_risk, RiskTier::Medium);
        assert_eq!(metrics.risk_factors.chain_diversification, RiskTier::Medium);
        assert_eq!(metrics.risk_level, RiskLevel::Medium);
        assert_eq!(metrics.risk_factors.stability_score.short_term, Stability::Volatile);
        assert_eq!(metrics.tvl_changes.day, 0.0);
    }

    #[test]
    fn test_health_metrics_json_shape() {
        let now = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        let json = serde_json::to_value(compute_health_metrics(&protocol(5e9, 8), now)).unwrap();

        assert_eq!(json["risk_level"], "Medium");
        assert_eq!(json["risk_factors"]["tvlRisk"], "low");
        assert_eq!(json["risk_factors"]["chainDiversification"], "high");
        assert_eq!(json["risk_factors"]["stabilityScore"]["long_term"], "stable");
        assert_eq!(json["tvl_changes"]["week"], 0.0);
    }

    #[test]
    fn test_risk_never_improves_as_tvl_decreases() {
        let now = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap();
        let tvls = [5e9, 1e9 + 1.0, 1e9, 5e8, 1e8 + 1.0, 1e8, 1e7, 0.0];

        for chains in [0, 3, 6] {
            let levels: Vec<RiskLevel> = tvls
                .iter()
                .map(|&tvl| compute_health_metrics(&protocol(tvl, chains), now).risk_level)
                .collect();
            assert!(
                levels.windows(2).all(|w| w[0] <= w[1]),
                "risk improved as tvl decreased with {} chains: {:?}",
                chains,
                levels
            );
        }
    }
}
