use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProtocolVolumes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProtocolVolumes::ProtocolName)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProtocolVolumes::Volume24h).double().not_null())
                    .col(
                        ColumnDef::new(ProtocolVolumes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProtocolVolumes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ProtocolVolumes {
    Table,
    ProtocolName,
    #[iden = "volume_24h"]
    Volume24h,
    UpdatedAt,
}
