//! Create boosted post table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BoostedPost::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BoostedPost::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BoostedPost::PostId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BoostedPost::BoosterId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BoostedPost::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(BoostedPost::EndDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(BoostedPost::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(BoostedPost::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boosted_post_post")
                            .from(BoostedPost::Table, BoostedPost::PostId)
                            .to(Post::Table, Post::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boosted_post_booster")
                            .from(BoostedPost::Table, BoostedPost::BoosterId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Rate-limit counting scans on booster within the window
        manager
            .create_index(
                Index::create()
                    .name("idx_boosted_post_booster_id")
                    .table(BoostedPost::Table)
                    .col(BoostedPost::BoosterId)
                    .col(BoostedPost::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Expiry sweep scans on (status, end_date)
        manager
            .create_index(
                Index::create()
                    .name("idx_boosted_post_status_end_date")
                    .table(BoostedPost::Table)
                    .col(BoostedPost::Status)
                    .col(BoostedPost::EndDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BoostedPost::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BoostedPost {
    Table,
    Id,
    PostId,
    BoosterId,
    Status,
    EndDate,
    DeletedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Post {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Account {
    Table,
    Id,
}
