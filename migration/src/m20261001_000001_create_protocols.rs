use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per DeFiLlama protocol, keyed by the upstream id
        manager
            .create_table(
                Table::create()
                    .table(Protocols::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Protocols::Id)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Protocols::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Protocols::Description).text().null())
                    .col(ColumnDef::new(Protocols::Symbol).string_len(64).null())
                    .col(ColumnDef::new(Protocols::Url).text().null())
                    .col(ColumnDef::new(Protocols::Tvl).double().not_null().default(0.0))
                    .col(ColumnDef::new(Protocols::Mcap).double().null())
                    .col(ColumnDef::new(Protocols::Category).string_len(128).null())
                    .col(ColumnDef::new(Protocols::ChainData).json_binary().not_null())
                    .col(ColumnDef::new(Protocols::HealthMetrics).json_binary().not_null())
                    .col(
                        ColumnDef::new(Protocols::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Volume reconciliation matches on the exact protocol name
        manager
            .create_index(
                Index::create()
                    .name("idx_protocols_name")
                    .table(Protocols::Table)
                    .col(Protocols::Name)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_protocols_tvl")
                    .table(Protocols::Table)
                    .col(Protocols::Tvl)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Protocols::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Protocols {
    Table,
    Id,
    Name,
    Description,
    Symbol,
    Url,
    Tvl,
    Mcap,
    Category,
    ChainData,
    HealthMetrics,
    LastUpdated,
}
