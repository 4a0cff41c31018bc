//! `SeaORM` Entity for protocol_volumes table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "protocol_volumes")]
pub struct Model {
    /// Must equal a persisted `protocols.name` exactly
    #[sea_orm(primary_key, auto_increment = false)]
    pub protocol_name: String,
    pub volume_24h: f64,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
