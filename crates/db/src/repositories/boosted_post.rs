//! Boosted post repository.

use std::sync::Arc;

use crate::entities::boosted_post::BoostStatus;
use crate::entities::{BoostedPost, Post, boosted_post, post};
use crate::repositories::post::audience_condition;
use crate::visibility;
use chrono::{DateTime, FixedOffset};
use commune_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Predicate matching currently active boosts: accepted and inside the
/// promotion window.
fn active_condition(now: DateTime<FixedOffset>) -> Condition {
    Condition::all()
        .add(boosted_post::Column::Status.eq(BoostStatus::Accepted))
        .add(
            Condition::any()
                .add(boosted_post::Column::EndDate.is_null())
                .add(boosted_post::Column::EndDate.gt(now)),
        )
}

/// Boosted post repository for database operations.
#[derive(Clone)]
pub struct BoostedPostRepository {
    db: Arc<DatabaseConnection>,
}

impl BoostedPostRepository {
    /// Create a new boosted post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an alive boost by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<boosted_post::Model>> {
        BoostedPost::find_by_id(id)
            .filter(visibility::alive_boosts())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an alive boost by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<boosted_post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("boost {id}")))
    }

    /// Create a new boost.
    pub async fn create(&self, model: boosted_post::ActiveModel) -> AppResult<boosted_post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Transition a boost to a new status.
    pub async fn set_status(
        &self,
        model: boosted_post::Model,
        status: BoostStatus,
    ) -> AppResult<boosted_post::Model> {
        let mut active: boosted_post::ActiveModel = model.into();
        active.status = Set(status);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active boosts whose promoted post matches the viewer's audience,
    /// newest first, capped at `quota`. Returns the boost together with its
    /// post so the feed does not refetch it.
    pub async fn find_active_for_audience(
        &self,
        user_ids: &[String],
        page_ids: &[String],
        quota: u64,
        now: DateTime<FixedOffset>,
    ) -> AppResult<Vec<(boosted_post::Model, Option<post::Model>)>> {
        BoostedPost::find()
            .find_also_related(Post)
            .filter(active_condition(now))
            .filter(visibility::alive_boosts())
            .filter(audience_condition(user_ids, page_ids))
            .filter(visibility::alive_posts())
            .order_by_desc(boosted_post::Column::CreatedAt)
            .order_by_asc(boosted_post::Column::Id)
            .limit(quota)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count active boosts whose promoted post matches the viewer's audience.
    pub async fn count_active_for_audience(
        &self,
        user_ids: &[String],
        page_ids: &[String],
        now: DateTime<FixedOffset>,
    ) -> AppResult<u64> {
        BoostedPost::find()
            .inner_join(Post)
            .filter(active_condition(now))
            .filter(visibility::alive_boosts())
            .filter(audience_condition(user_ids, page_ids))
            .filter(visibility::alive_posts())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count boosts created by `booster_id` since `since`, regardless of
    /// review outcome (the creation quota counts purchases, not approvals).
    pub async fn count_recent_by_user(
        &self,
        booster_id: &str,
        since: DateTime<FixedOffset>,
    ) -> AppResult<u64> {
        BoostedPost::find()
            .filter(boosted_post::Column::BoosterId.eq(booster_id))
            .filter(boosted_post::Column::CreatedAt.gte(since))
            .filter(boosted_post::Column::DeletedAt.is_null())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Transition every accepted boost whose window has passed to `expired`.
    ///
    /// Idempotent: already-expired rows no longer match the predicate, so a
    /// second run affects zero rows.
    pub async fn expire_due(&self, now: DateTime<FixedOffset>) -> AppResult<u64> {
        let result = BoostedPost::update_many()
            .col_expr(boosted_post::Column::Status, Expr::value(BoostStatus::Expired))
            .filter(boosted_post::Column::Status.eq(BoostStatus::Accepted))
            .filter(boosted_post::Column::EndDate.is_not_null())
            .filter(boosted_post::Column::EndDate.lte(now))
            .filter(boosted_post::Column::DeletedAt.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Alive boosts created by an account, newest first (paginated).
    pub async fn find_by_booster(
        &self,
        booster_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<boosted_post::Model>> {
        BoostedPost::find()
            .filter(boosted_post::Column::BoosterId.eq(booster_id))
            .filter(visibility::alive_boosts())
            .order_by_desc(boosted_post::Column::CreatedAt)
            .order_by_asc(boosted_post::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
