//! Create tickets table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tickets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tickets::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tickets::Title).string().not_null())
                    .col(ColumnDef::new(Tickets::Price).double().not_null())
                    .col(
                        ColumnDef::new(Tickets::DateCreated)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Tickets::DateUpdated).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Listing order: date_created DESC, id DESC
        manager
            .create_index(
                Index::create()
                    .name("idx_tickets_date_created_id")
                    .table(Tickets::Table)
                    .col(Tickets::DateCreated)
                    .col(Tickets::Id)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tickets::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Tickets {
    Table,
    Id,
    Title,
    Price,
    DateCreated,
    DateUpdated,
}
