//! Create page, page membership, page follow, and page like tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Page::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Page::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Page::OwnerId).string_len(32).not_null())
                    .col(ColumnDef::new(Page::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Page::Description).text())
                    .col(
                        ColumnDef::new(Page::IsPublic)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Page::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Page::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_owner")
                            .from(Page::Table, Page::OwnerId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_page_owner_id")
                    .table(Page::Table)
                    .col(Page::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PageMembership::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PageMembership::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PageMembership::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PageMembership::PageId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PageMembership::Role)
                            .string_len(16)
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        ColumnDef::new(PageMembership::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(PageMembership::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PageMembership::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_membership_user")
                            .from(PageMembership::Table, PageMembership::UserId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_membership_page")
                            .from(PageMembership::Table, PageMembership::PageId)
                            .to(Page::Table, Page::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One membership row per (user, page); duplicate join requests
        // surface as a constraint violation
        manager
            .create_index(
                Index::create()
                    .name("idx_page_membership_user_page")
                    .table(PageMembership::Table)
                    .col(PageMembership::UserId)
                    .col(PageMembership::PageId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_page_membership_page_id")
                    .table(PageMembership::Table)
                    .col(PageMembership::PageId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PageFollow::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PageFollow::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PageFollow::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(PageFollow::PageId).string_len(32).not_null())
                    .col(ColumnDef::new(PageFollow::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PageFollow::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_follow_user")
                            .from(PageFollow::Table, PageFollow::UserId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_follow_page")
                            .from(PageFollow::Table, PageFollow::PageId)
                            .to(Page::Table, Page::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_page_follow_user_page")
                    .table(PageFollow::Table)
                    .col(PageFollow::UserId)
                    .col(PageFollow::PageId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PageLike::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PageLike::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PageLike::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(PageLike::PageId).string_len(32).not_null())
                    .col(ColumnDef::new(PageLike::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PageLike::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_like_user")
                            .from(PageLike::Table, PageLike::UserId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_page_like_page")
                            .from(PageLike::Table, PageLike::PageId)
                            .to(Page::Table, Page::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_page_like_user_page")
                    .table(PageLike::Table)
                    .col(PageLike::UserId)
                    .col(PageLike::PageId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PageLike::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PageFollow::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PageMembership::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Page::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Page {
    Table,
    Id,
    OwnerId,
    Name,
    Description,
    IsPublic,
    DeletedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PageMembership {
    Table,
    Id,
    UserId,
    PageId,
    Role,
    Status,
    DeletedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PageFollow {
    Table,
    Id,
    UserId,
    PageId,
    DeletedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PageLike {
    Table,
    Id,
    UserId,
    PageId,
    DeletedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Account {
    Table,
    Id,
}
