//! `SeaORM` Entity for protocols table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "protocols")]
pub struct Model {
    /// Upstream DeFiLlama protocol id
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub symbol: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub url: Option<String>,
    pub tvl: f64,
    pub mcap: Option<f64>,
    pub category: Option<String>,
    /// `{chains, chainTvls, totalChains}`
    #[sea_orm(column_type = "JsonBinary")]
    pub chain_data: Json,
    /// Serialized `HealthMetrics`
    #[sea_orm(column_type = "JsonBinary")]
    pub health_metrics: Json,
    pub last_updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
