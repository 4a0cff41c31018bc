use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::models::protocol::{DecodedProtocols, decode_protocols};
use crate::models::volume::{RawDexOverview, RawDexProtocol, VolumeRecord};

pub const DEFAULT_BASE_URL: &str = "https://api.llama.fi";

const PROTOCOLS_PATH: &str = "/protocols";
const DEX_OVERVIEW_PATH: &str = "/overview/dexs";

/// Upstream source of protocol and volume data
#[async_trait]
pub trait ProtocolSource: Send + Sync {
    async fn fetch_protocols(&self) -> Result<DecodedProtocols, FetchError>;

    async fn fetch_dex_volumes(&self) -> Result<Vec<VolumeRecord>, FetchError>;
}

#[derive(Clone)]
pub struct DefiLlamaService {
    client: Client,
    base_url: String,
}

impl DefiLlamaService {
    /// `timeout` applies to each request as a whole; the protocol list is a
    /// multi-megabyte payload so keep it generous.
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|source| FetchError::Request {
                endpoint: path.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|source| FetchError::Request {
            endpoint: path.to_string(),
            source,
        })?;

        serde_json::from_slice(&bytes).map_err(|source| FetchError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }
}

/// Normalize dex overview entries, dropping ones without a usable name
pub fn normalize_dex_volumes(overview: RawDexOverview) -> Vec<VolumeRecord> {
    overview
        .protocols
        .into_iter()
        .filter_map(|value| serde_json::from_value::<RawDexProtocol>(value).ok())
        .filter_map(RawDexProtocol::normalize)
        .collect()
}

#[async_trait]
impl ProtocolSource for DefiLlamaService {
    async fn fetch_protocols(&self) -> Result<DecodedProtocols, FetchError> {
        tracing::info!("Fetching protocols from DeFiLlama");

        let records: Vec<serde_json::Value> = self.get_json(PROTOCOLS_PATH).await?;
        let decoded = decode_protocols(records);

        for rejected in &decoded.rejected {
            tracing::warn!(error = %rejected, "Skipping undecodable protocol record");
        }
        tracing::info!(
            protocols = decoded.protocols.len(),
            rejected = decoded.rejected.len(),
            "Fetched protocols from DeFiLlama"
        );

        Ok(decoded)
    }

    async fn fetch_dex_volumes(&self) -> Result<Vec<VolumeRecord>, FetchError> {
        tracing::info!("Fetching dex volumes from DeFiLlama");

        let overview: RawDexOverview = self.get_json(DEX_OVERVIEW_PATH).await?;
        let volumes = normalize_dex_volumes(overview);

        tracing::info!(records = volumes.len(), "Fetched dex volumes from DeFiLlama");

        Ok(volumes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_trims_trailing_slash() {
        let service =
            DefiLlamaService::new("https://api.llama.fi/".to_string(), Duration::from_secs(30))
                .unwrap();
        assert_eq!(service.base_url(), "https://api.llama.fi");
    }

    #[test]
    fn test_normalize_dex_volumes_skips_malformed_entries() {
        let overview: RawDexOverview = serde_json::from_value(json!({
            "totalDataChart": [],
            "protocols": [
                { "name": "Uniswap", "total24h": 1500.0 },
                { "name": "Curve", "volume24h": 300.0, "total24h": 250.0 },
                { "name": "Broken", "total24h": "n/a" },
                { "total24h": 10.0 },
                { "name": "Quiet" }
            ]
        }))
        .unwrap();

        let volumes = normalize_dex_volumes(overview);
        assert_eq!(
            volumes,
            vec![
                VolumeRecord { name: "Uniswap".to_string(), volume_24h: 1500.0 },
                VolumeRecord { name: "Curve".to_string(), volume_24h: 300.0 },
                VolumeRecord { name: "Quiet".to_string(), volume_24h: 0.0 },
            ]
        );
    }
}
