//! Create counters table and seed the default counter

use sea_orm_migration::prelude::*;

use crate::domain::ticket::DEFAULT_COUNTER_KEY;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Counters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Counters::Name)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Counters::TotalTickets)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        let insert = Query::insert()
            .into_table(Counters::Table)
            .columns([Counters::Name, Counters::TotalTickets])
            .values_panic([DEFAULT_COUNTER_KEY.into(), 0i64.into()])
            .to_owned();

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Counters::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Counters {
    Table,
    Name,
    TotalTickets,
}
