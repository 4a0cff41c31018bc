use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChainMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChainMetrics::ChainName)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChainMetrics::Tvl).double().not_null().default(0.0))
                    .col(
                        ColumnDef::new(ChainMetrics::ProtocolCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ChainMetrics::Metrics).json_binary().not_null())
                    .col(
                        ColumnDef::new(ChainMetrics::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChainMetrics::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ChainMetrics {
    Table,
    ChainName,
    Tvl,
    ProtocolCount,
    Metrics,
    LastUpdated,
}
