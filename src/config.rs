//! Environment-driven configuration
//!
//! `.env` is loaded by the binaries through `dotenvy`; everything here reads
//! plain environment variables and falls back to defaults.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::services::defillama::DEFAULT_BASE_URL;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 1800; // 30 minutes
pub const DEFAULT_INGEST_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_DASHBOARD_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_TOP_CHAINS: usize = 15;

/// Denominator used for chain dominance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DominanceScope {
    /// Relative to the TVL of the batch being written
    #[default]
    Batch,
    /// Relative to the TVL of every protocol fetched in the run
    Global,
}

impl FromStr for DominanceScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batch" => Ok(DominanceScope::Batch),
            "global" => Ok(DominanceScope::Global),
            _ => Err("expected `batch` or `global`".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub defillama_base_url: String,
    pub batch_size: usize,
    pub fetch_timeout: Duration,
    pub write_timeout: Duration,
    pub run_timeout: Duration,
    pub dominance_scope: DominanceScope,
    /// Minimum time between scheduled runs
    pub interval: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            defillama_base_url: DEFAULT_BASE_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS),
            run_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            dominance_scope: DominanceScope::Batch,
            interval: Duration::from_secs(DEFAULT_INGEST_INTERVAL_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub cache_ttl: Duration,
    pub top_chains: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(DEFAULT_DASHBOARD_CACHE_TTL_SECS),
            top_chains: DEFAULT_TOP_CHAINS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub ingest: IngestConfig,
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let ingest = IngestConfig {
            defillama_base_url: lookup("DEFILLAMA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            batch_size: positive(&lookup, "INGEST_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            fetch_timeout: seconds(&lookup, "FETCH_TIMEOUT_SECS", DEFAULT_FETCH_TIMEOUT_SECS)?,
            write_timeout: seconds(&lookup, "WRITE_TIMEOUT_SECS", DEFAULT_WRITE_TIMEOUT_SECS)?,
            run_timeout: seconds(&lookup, "RUN_TIMEOUT_SECS", DEFAULT_RUN_TIMEOUT_SECS)?,
            dominance_scope: parse_or(&lookup, "DOMINANCE_SCOPE", DominanceScope::Batch)?,
            interval: seconds(&lookup, "INGEST_INTERVAL_SECS", DEFAULT_INGEST_INTERVAL_SECS)?,
        };

        let dashboard = DashboardConfig {
            cache_ttl: seconds(
                &lookup,
                "DASHBOARD_CACHE_TTL_SECS",
                DEFAULT_DASHBOARD_CACHE_TTL_SECS,
            )?,
            top_chains: positive(&lookup, "DASHBOARD_TOP_CHAINS", DEFAULT_TOP_CHAINS)?,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL"),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            ingest,
            dashboard,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: value.clone(),
            reason: e.to_string(),
        }),
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    let value = parse_or(lookup, key, default)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let secs = parse_or(lookup, key, default)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
