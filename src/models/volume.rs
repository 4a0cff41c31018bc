use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of `/overview/dexs` `protocols`
///
/// Older payloads report the 24h figure as `total24h`, newer ones as `volume24h`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDexProtocol {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub total24h: Option<f64>,
    #[serde(default)]
    pub volume24h: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDexOverview {
    #[serde(default)]
    pub protocols: Vec<serde_json::Value>,
}

/// Normalized upstream volume record
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRecord {
    pub name: String,
    pub volume_24h: f64,
}

impl RawDexProtocol {
    pub fn normalize(self) -> Option<VolumeRecord> {
        let name = self.name?;
        Some(VolumeRecord {
            name,
            volume_24h: self.volume24h.or(self.total24h).unwrap_or(0.0),
        })
    }
}

/// Row written to `protocol_volumes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolVolume {
    pub protocol_name: String,
    pub volume_24h: f64,
    pub updated_at: DateTime<Utc>,
}
