use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only audit trail, one row per protocol per ingestion run
        manager
            .create_table(
                Table::create()
                    .table(ProtocolTvlHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProtocolTvlHistory::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ProtocolTvlHistory::ProtocolId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProtocolTvlHistory::Tvl).double().not_null())
                    .col(
                        ColumnDef::new(ProtocolTvlHistory::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_protocol_tvl_history_protocol_ts")
                    .table(ProtocolTvlHistory::Table)
                    .col(ProtocolTvlHistory::ProtocolId)
                    .col(ProtocolTvlHistory::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProtocolTvlHistory::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ProtocolTvlHistory {
    Table,
    Id,
    ProtocolId,
    Tvl,
    Timestamp,
}
