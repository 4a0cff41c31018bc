//! `SeaORM` Entity for chain_metrics table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chain_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub chain_name: String,
    pub tvl: f64,
    pub protocol_count: i32,
    /// `{dominance, protocol_distribution}` plus optional `stability`
    #[sea_orm(column_type = "JsonBinary")]
    pub metrics: Json,
    pub last_updated: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
