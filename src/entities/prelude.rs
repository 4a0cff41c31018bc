pub use super::chain_metrics::Entity as ChainMetrics;
pub use super::protocol_tvl_history::Entity as ProtocolTvlHistory;
pub use super::protocol_volumes::Entity as ProtocolVolumes;
pub use super::protocols::Entity as Protocols;
pub use super::sync_status::Entity as SyncStatus;
