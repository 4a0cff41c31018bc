//! Protocol records as received from DeFiLlama and as used internally
//!
//! `RawProtocol` mirrors the untyped `/protocols` payload; `Protocol` is the
//! validated form with every optional numeric field defaulted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::models::health::{RiskLevel, TvlChanges};

pub const DEFAULT_CATEGORY: &str = "Other";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProtocol {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub tvl: Option<f64>,
    #[serde(default)]
    pub mcap: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub chains: Option<Vec<String>>,
    #[serde(default, rename = "chainTvls")]
    pub chain_tvls: Option<BTreeMap<String, Option<f64>>>,
    #[serde(default)]
    pub change_1h: Option<f64>,
    #[serde(default)]
    pub change_1d: Option<f64>,
    #[serde(default)]
    pub change_7d: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Protocol {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub symbol: Option<String>,
    pub url: Option<String>,
    pub tvl: f64,
    pub mcap: Option<f64>,
    pub category: String,
    pub chains: Vec<String>,
    pub chain_tvls: BTreeMap<String, f64>,
    pub change_1h: Option<f64>,
    pub change_1d: Option<f64>,
    pub change_7d: Option<f64>,
}

/// Chain breakdown stored alongside each protocol row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainData {
    pub chains: Vec<String>,
    pub chain_tvls: BTreeMap<String, f64>,
    pub total_chains: usize,
}

impl RawProtocol {
    /// Validate one upstream record. Only `id` and `name` are mandatory.
    pub fn validate(self, index: usize) -> Result<Protocol, DecodeError> {
        let id = non_blank(self.id).ok_or(DecodeError::MissingField { index, field: "id" })?;
        let name =
            non_blank(self.name).ok_or(DecodeError::MissingField { index, field: "name" })?;

        let chain_tvls = self
            .chain_tvls
            .unwrap_or_default()
            .into_iter()
            .map(|(chain, tvl)| (chain, tvl.unwrap_or(0.0)))
            .collect();

        Ok(Protocol {
            id,
            name,
            description: self.description,
            symbol: self.symbol,
            url: self.url,
            tvl: self.tvl.unwrap_or(0.0),
            mcap: self.mcap,
            category: non_blank(self.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            chains: self.chains.unwrap_or_default(),
            chain_tvls,
            change_1h: self.change_1h,
            change_1d: self.change_1d,
            change_7d: self.change_7d,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Protocol {
    pub fn tvl_changes(&self) -> TvlChanges {
        TvlChanges {
            hour: self.change_1h.unwrap_or(0.0),
            day: self.change_1d.unwrap_or(0.0),
            week: self.change_7d.unwrap_or(0.0),
        }
    }

    pub fn chain_data(&self) -> ChainData {
        ChainData {
            chains: self.chains.clone(),
            chain_tvls: self.chain_tvls.clone(),
            total_chains: self.chains.len(),
        }
    }
}

/// Result of decoding a whole `/protocols` payload
#[derive(Debug, Default)]
pub struct DecodedProtocols {
    pub protocols: Vec<Protocol>,
    pub rejected: Vec<DecodeError>,
}

/// Decode each record independently so one bad entry cannot sink the payload
pub fn decode_protocols(records: Vec<serde_json::Value>) -> DecodedProtocols {
    records
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value::<RawProtocol>(value)
                .map_err(|source| DecodeError::Malformed { index, source })
                .and_then(|raw| raw.validate(index))
        })
        .fold(DecodedProtocols::default(), |mut decoded, result| {
            match result {
                Ok(protocol) => decoded.protocols.push(protocol),
                Err(e) => decoded.rejected.push(e),
            }
            decoded
        })
}

/// Read-side view of a persisted protocol, enough for dashboard aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSnapshot {
    pub id: String,
    pub name: String,
    pub tvl: f64,
    pub category: Option<String>,
    pub risk_level: Option<RiskLevel>,
}
