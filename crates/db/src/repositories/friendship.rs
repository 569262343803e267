//! Friendship repository.
//!
//! Friendships are unique per unordered pair, so every pair lookup queries
//! both orderings of `(user_a_id, user_b_id)`.

use std::sync::Arc;

use crate::entities::{Friendship, friendship};
use crate::entities::friendship::FriendshipStatus;
use crate::visibility;
use chrono::Utc;
use commune_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

fn pair_condition(user_id: &str, other_id: &str) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(friendship::Column::UserAId.eq(user_id))
                .add(friendship::Column::UserBId.eq(other_id)),
        )
        .add(
            Condition::all()
                .add(friendship::Column::UserAId.eq(other_id))
                .add(friendship::Column::UserBId.eq(user_id)),
        )
}

/// Friendship repository for database operations.
#[derive(Clone)]
pub struct FriendshipRepository {
    db: Arc<DatabaseConnection>,
}

impl FriendshipRepository {
    /// Create a new friendship repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an alive friendship by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<friendship::Model>> {
        Friendship::find_by_id(id)
            .filter(visibility::alive_friendships())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the alive friendship between two accounts, in either ordering.
    pub async fn find_between(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> AppResult<Option<friendship::Model>> {
        Friendship::find()
            .filter(pair_condition(user_id, other_id))
            .filter(visibility::alive_friendships())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the friendship between two accounts including soft-deleted rows.
    ///
    /// Used to revive a previously removed friendship instead of violating
    /// the unique pair index with a second insert.
    pub async fn find_between_any(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> AppResult<Option<friendship::Model>> {
        Friendship::find()
            .filter(pair_condition(user_id, other_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Transition a friendship to a new status.
    pub async fn set_status(
        &self,
        model: friendship::Model,
        status: FriendshipStatus,
    ) -> AppResult<friendship::Model> {
        let mut active: friendship::ActiveModel = model.into();
        active.status = Set(status);
        active.updated_at = Set(Some(Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-delete a friendship.
    pub async fn soft_delete(&self, model: friendship::Model) -> AppResult<()> {
        let mut active: friendship::ActiveModel = model.into();
        active.deleted_at = Set(Some(Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// All alive accepted friendships involving `user_id`.
    pub async fn find_accepted_for_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<friendship::Model>> {
        Friendship::find()
            .filter(
                Condition::any()
                    .add(friendship::Column::UserAId.eq(user_id))
                    .add(friendship::Column::UserBId.eq(user_id)),
            )
            .filter(friendship::Column::Status.eq(FriendshipStatus::Accepted))
            .filter(visibility::alive_friendships())
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// IDs of `user_id`'s accepted friends.
    pub async fn accepted_friend_ids(&self, user_id: &str) -> AppResult<Vec<String>> {
        let friendships = self.find_accepted_for_user(user_id).await?;
        Ok(friendships
            .iter()
            .map(|f| f.other_party(user_id).to_string())
            .collect())
    }

    /// Pending requests received by `user_id` (paginated, newest first).
    pub async fn find_pending_received(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<friendship::Model>> {
        Friendship::find()
            .filter(friendship::Column::UserBId.eq(user_id))
            .filter(friendship::Column::Status.eq(FriendshipStatus::Pending))
            .filter(visibility::alive_friendships())
            .order_by_desc(friendship::Column::CreatedAt)
            .order_by_asc(friendship::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Pending requests sent by `user_id` (paginated, newest first).
    pub async fn find_pending_sent(
        &self,
        user_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<friendship::Model>> {
        Friendship::find()
            .filter(friendship::Column::UserAId.eq(user_id))
            .filter(friendship::Column::Status.eq(FriendshipStatus::Pending))
            .filter(visibility::alive_friendships())
            .order_by_desc(friendship::Column::CreatedAt)
            .order_by_asc(friendship::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock::test_friendship;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_between_either_ordering() {
        let f = test_friendship("f1", "alice", "bob", FriendshipStatus::Pending);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[f.clone()], [f.clone()]])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        // Both orderings resolve to the same stored row
        let forward = repo.find_between("alice", "bob").await.unwrap();
        let reverse = repo.find_between("bob", "alice").await.unwrap();

        assert_eq!(forward.map(|m| m.id), Some("f1".to_string()));
        assert_eq!(reverse.map(|m| m.id), Some("f1".to_string()));
    }

    #[tokio::test]
    async fn test_accepted_friend_ids_maps_other_party() {
        let f1 = test_friendship("f1", "alice", "bob", FriendshipStatus::Accepted);
        let f2 = test_friendship("f2", "carol", "alice", FriendshipStatus::Accepted);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[f1, f2]])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let ids = repo.accepted_friend_ids("alice").await.unwrap();

        assert_eq!(ids, vec!["bob".to_string(), "carol".to_string()]);
    }

    #[tokio::test]
    async fn test_find_between_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<friendship::Model>::new()])
                .into_connection(),
        );

        let repo = FriendshipRepository::new(db);
        let result = repo.find_between("alice", "dave").await.unwrap();

        assert!(result.is_none());
    }
}
