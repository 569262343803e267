//! Reaction repository.

use std::sync::Arc;

use crate::entities::{Reaction, reaction};
use crate::visibility;
use chrono::Utc;
use commune_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an alive reaction by user and post.
    pub async fn find_by_pair(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> AppResult<Option<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::PostId.eq(post_id))
            .filter(visibility::alive_reactions())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a reaction by pair, including soft-deleted rows.
    pub async fn find_by_pair_any(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> AppResult<Option<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::UserId.eq(user_id))
            .filter(reaction::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new reaction.
    pub async fn create(&self, model: reaction::ActiveModel) -> AppResult<reaction::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Revive a soft-deleted reaction.
    pub async fn revive(&self, model: reaction::Model) -> AppResult<reaction::Model> {
        let mut active: reaction::ActiveModel = model.into();
        active.deleted_at = Set(None);
        active.created_at = Set(Utc::now().into());
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-delete a reaction.
    pub async fn soft_delete(&self, model: reaction::Model) -> AppResult<()> {
        let mut active: reaction::ActiveModel = model.into();
        active.deleted_at = Set(Some(Utc::now().into()));
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Count alive reactions on a post.
    pub async fn count_for_post(&self, post_id: &str) -> AppResult<u64> {
        Reaction::find()
            .filter(reaction::Column::PostId.eq(post_id))
            .filter(visibility::alive_reactions())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
