//! Create friendship table migration.

use sea_orm_migration::prelude::*;

/// Unique index over the normalized pair. A plain `(user_a_id, user_b_id)`
/// tuple would let `(a, b)` and `(b, a)` coexist, so the index normalizes
/// with LEAST/GREATEST and serializes concurrent crossing requests.
const IDX_FRIENDSHIP_PAIR: &str = "CREATE UNIQUE INDEX IF NOT EXISTS idx_friendship_pair \
     ON friendship (LEAST(user_a_id, user_b_id), GREATEST(user_a_id, user_b_id))";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Friendship::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Friendship::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Friendship::UserAId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Friendship::UserBId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Friendship::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Friendship::DeletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Friendship::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Friendship::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_user_a")
                            .from(Friendship::Table, Friendship::UserAId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_user_b")
                            .from(Friendship::Table, Friendship::UserBId)
                            .to(Account::Table, Account::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(IDX_FRIENDSHIP_PAIR)
            .await?;

        // Index: user_b_id (for listing received requests)
        manager
            .create_index(
                Index::create()
                    .name("idx_friendship_user_b_id")
                    .table(Friendship::Table)
                    .col(Friendship::UserBId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Friendship::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Friendship {
    Table,
    Id,
    UserAId,
    UserBId,
    Status,
    DeletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Account {
    Table,
    Id,
}

#[cfg(test)]
mod tests {
    use super::IDX_FRIENDSHIP_PAIR;

    #[test]
    fn test_pair_index_covers_both_orderings() {
        assert!(IDX_FRIENDSHIP_PAIR.contains("UNIQUE INDEX"));
        assert!(IDX_FRIENDSHIP_PAIR.contains("LEAST(user_a_id, user_b_id)"));
        assert!(IDX_FRIENDSHIP_PAIR.contains("GREATEST(user_a_id, user_b_id)"));
    }
}
