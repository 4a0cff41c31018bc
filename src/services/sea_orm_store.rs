//! PostgreSQL-backed `ProtocolStore` using `INSERT ... ON CONFLICT DO UPDATE`

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set};

use crate::entities::{chain_metrics, prelude::*, protocol_tvl_history, protocol_volumes, protocols};
use crate::error::StoreError;
use crate::models::chain::{ChainMetric, ChainMetricsDetail};
use crate::models::protocol::ProtocolSnapshot;
use crate::models::volume::ProtocolVolume;
use crate::services::protocol_store::{ProtocolRow, ProtocolStore, TvlHistoryRow};

#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn snapshot_from_model(model: protocols::Model) -> ProtocolSnapshot {
    let risk_level = model
        .health_metrics
        .get("risk_level")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok());

    ProtocolSnapshot {
        id: model.id,
        name: model.name,
        tvl: model.tvl,
        category: model.category,
        risk_level,
    }
}

fn chain_metric_from_model(model: chain_metrics::Model) -> ChainMetric {
    let metrics = serde_json::from_value::<ChainMetricsDetail>(model.metrics).unwrap_or_else(|e| {
        tracing::warn!(chain = %model.chain_name, error = %e, "Unreadable chain metrics document");
        ChainMetricsDetail::default()
    });

    ChainMetric {
        chain_name: model.chain_name,
        tvl: model.tvl,
        protocol_count: usize::try_from(model.protocol_count).unwrap_or(0),
        metrics,
        last_updated: model.last_updated.with_timezone(&Utc),
    }
}

#[async_trait]
impl ProtocolStore for SeaOrmStore {
    async fn upsert_protocol(&self, row: &ProtocolRow) -> Result<(), StoreError> {
        let model = protocols::ActiveModel {
            id: Set(row.id.clone()),
            name: Set(row.name.clone()),
            description: Set(row.description.clone()),
            symbol: Set(row.symbol.clone()),
            url: Set(row.url.clone()),
            tvl: Set(row.tvl),
            mcap: Set(row.mcap),
            category: Set(Some(row.category.clone())),
            chain_data: Set(serde_json::to_value(&row.chain_data)?),
            health_metrics: Set(serde_json::to_value(&row.health_metrics)?),
            last_updated: Set(row.last_updated.fixed_offset()),
        };

        Protocols::insert(model)
            .on_conflict(
                OnConflict::column(protocols::Column::Id)
                    .update_columns([
                        protocols::Column::Name,
                        protocols::Column::Description,
                        protocols::Column::Symbol,
                        protocols::Column::Url,
                        protocols::Column::Tvl,
                        protocols::Column::Mcap,
                        protocols::Column::Category,
                        protocols::Column::ChainData,
                        protocols::Column::HealthMetrics,
                        protocols::Column::LastUpdated,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    async fn insert_tvl_history(&self, row: &TvlHistoryRow) -> Result<(), StoreError> {
        protocol_tvl_history::ActiveModel {
            protocol_id: Set(row.protocol_id.clone()),
            tvl: Set(row.tvl),
            timestamp: Set(row.timestamp.fixed_offset()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(())
    }

    async fn upsert_chain_metric(&self, metric: &ChainMetric) -> Result<(), StoreError> {
        let model = chain_metrics::ActiveModel {
            chain_name: Set(metric.chain_name.clone()),
            tvl: Set(metric.tvl),
            protocol_count: Set(i32::try_from(metric.protocol_count).unwrap_or(i32::MAX)),
            metrics: Set(serde_json::to_value(&metric.metrics)?),
            last_updated: Set(metric.last_updated.fixed_offset()),
        };

        ChainMetrics::insert(model)
            .on_conflict(
                OnConflict::column(chain_metrics::Column::ChainName)
                    .update_columns([
                        chain_metrics::Column::Tvl,
                        chain_metrics::Column::ProtocolCount,
                        chain_metrics::Column::Metrics,
                        chain_metrics::Column::LastUpdated,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }

    async fn upsert_volumes(&self, rows: &[ProtocolVolume]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let models = rows.iter().map(|row| protocol_volumes::ActiveModel {
            protocol_name: Set(row.protocol_name.clone()),
            volume_24h: Set(row.volume_24h),
            updated_at: Set(row.updated_at.fixed_offset()),
        });

        let written = ProtocolVolumes::insert_many(models)
            .on_conflict(
                OnConflict::column(protocol_volumes::Column::ProtocolName)
                    .update_columns([
                        protocol_volumes::Column::Volume24h,
                        protocol_volumes::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(usize::try_from(written).unwrap_or(rows.len()))
    }

    async fn protocol_names(&self) -> Result<HashSet<String>, StoreError> {
        let names: Vec<String> = Protocols::find()
            .select_only()
            .column(protocols::Column::Name)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(names.into_iter().collect())
    }

    async fn load_protocols(&self) -> Result<Vec<ProtocolSnapshot>, StoreError> {
        let models = Protocols::find()
            .order_by_desc(protocols::Column::Tvl)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(snapshot_from_model).collect())
    }

    async fn load_chain_metrics(&self) -> Result<Vec<ChainMetric>, StoreError> {
        let models = ChainMetrics::find()
            .order_by_desc(chain_metrics::Column::Tvl)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(chain_metric_from_model).collect())
    }
}
